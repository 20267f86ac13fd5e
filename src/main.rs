use anyhow::{bail, Result};
use finscrape::{
    collect::PanelOrchestrator,
    config::Config,
    driver::WebDriverSession,
    output,
};
use std::env;
use tokio::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) entities & config ────────────────────────────────────────
    let entities: Vec<String> = env::args().skip(1).collect();
    if entities.is_empty() {
        bail!("usage: finscrape <ENTITY>...");
    }
    let cfg = Config::load()?;

    let pending: Vec<&String> = entities
        .iter()
        .filter(|e| {
            let path = cfg.output_path(e.as_str());
            if path.exists() {
                info!(entity = %e, path = %path.display(), "already collected; skipping");
                false
            } else {
                true
            }
        })
        .collect();
    if pending.is_empty() {
        info!("nothing to collect; exit");
        return Ok(());
    }
    info!("{} entities to collect", pending.len());

    // ─── 3) browser session ──────────────────────────────────────────
    let session = WebDriverSession::start(&cfg.webdriver).await?;
    let outcome = run(&session, &cfg, &pending).await;

    // ─── 4) always release the browser ───────────────────────────────
    if let Err(e) = session.quit().await {
        error!("failed to close browser session: {}", e);
    }
    outcome?;

    info!("all done");
    Ok(())
}

async fn run(session: &WebDriverSession, cfg: &Config, entities: &[&String]) -> Result<()> {
    session.goto(&cfg.webdriver.start_url).await?;
    let orchestrator = PanelOrchestrator::new(session, cfg);

    for entity in entities {
        let start = Instant::now();
        let report = orchestrator.collect(entity.as_str()).await;
        let Some(table) = report.table.as_ref() else {
            warn!(entity = %entity, "no data collected; nothing written");
            continue;
        };

        let path = cfg.output_path(entity.as_str());
        match output::write_csv(table, &path) {
            Ok(()) => info!(
                entity = %entity,
                path = %path.display(),
                dates = table.len(),
                columns = table.columns().len(),
                panels = report.collected(),
                elapsed = ?start.elapsed(),
                "wrote combined table"
            ),
            Err(e) => error!("writing {} failed: {:#}", path.display(), e),
        }
    }
    Ok(())
}
