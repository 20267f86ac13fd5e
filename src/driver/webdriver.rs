// src/driver/webdriver.rs
//! Minimal W3C WebDriver client over HTTP.
//!
//! Covers just the endpoints [`PageDriver`] needs: element lookup, clicks,
//! keyboard input, attribute/text/rect reads, script execution and a
//! pointer-action drag. Works against chromedriver and geckodriver.

use super::{ElementHandle, Locator, PageDriver};
use crate::config::WebDriverConfig;
use crate::error::{Result, ScrapeError};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};
use url::Url;

/// Key under which W3C serializes element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4a4b4d8d5d52";

/// One live browser session.
pub struct WebDriverSession {
    client: Client,
    base: Url,
    session_id: String,
}

impl WebDriverSession {
    /// Start a new browser session at `cfg.url`.
    #[instrument(level = "info", skip(cfg), fields(url = %cfg.url, browser = %cfg.browser))]
    pub async fn start(cfg: &WebDriverConfig) -> Result<Self> {
        let client = Client::new();
        let base = base_url(&cfg.url)?;

        let body = json!({
            "capabilities": {
                "alwaysMatch": capabilities(&cfg.browser, &cfg.args)
            }
        });
        let resp = send(&client, Method::POST, base.join("session")?, Some(body)).await?;
        let session_id = resp
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ScrapeError::UnexpectedResponse(format!("no sessionId in {}", resp)))?
            .to_string();
        info!(session = %session_id, "webdriver session started");

        Ok(Self {
            client,
            base,
            session_id,
        })
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        self.cmd(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    /// End the session; the browser closes.
    pub async fn quit(self) -> Result<()> {
        self.cmd(Method::DELETE, "", None).await?;
        info!(session = %self.session_id, "webdriver session closed");
        Ok(())
    }

    async fn cmd(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let mut endpoint = format!("session/{}", self.session_id);
        if !path.is_empty() {
            endpoint.push('/');
            endpoint.push_str(path);
        }
        send(&self.client, method, self.base.join(&endpoint)?, body).await
    }

    async fn elements(&self, path: &str, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let (using, value) = locator.strategy();
        let resp = self
            .cmd(
                Method::POST,
                path,
                Some(json!({ "using": using, "value": value })),
            )
            .await?;
        let items = resp
            .as_array()
            .ok_or_else(|| ScrapeError::UnexpectedResponse(format!("expected array, got {}", resp)))?;
        items.iter().map(element_from_value).collect()
    }
}

impl PageDriver for WebDriverSession {
    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        self.elements("elements", locator).await
    }

    async fn find_all_in(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>> {
        self.elements(&format!("element/{}/elements", parent.id()), locator)
            .await
    }

    async fn click(&self, el: &ElementHandle) -> Result<()> {
        self.cmd(
            Method::POST,
            &format!("element/{}/click", el.id()),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn clear(&self, el: &ElementHandle) -> Result<()> {
        self.cmd(
            Method::POST,
            &format!("element/{}/clear", el.id()),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn send_keys(&self, el: &ElementHandle, text: &str) -> Result<()> {
        self.cmd(
            Method::POST,
            &format!("element/{}/value", el.id()),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn is_displayed(&self, el: &ElementHandle) -> Result<bool> {
        let v = self
            .cmd(Method::GET, &format!("element/{}/displayed", el.id()), None)
            .await?;
        Ok(v.as_bool().unwrap_or(false))
    }

    async fn attribute(&self, el: &ElementHandle, name: &str) -> Result<Option<String>> {
        let v = self
            .cmd(
                Method::GET,
                &format!("element/{}/attribute/{}", el.id(), name),
                None,
            )
            .await?;
        Ok(v.as_str().map(str::to_string))
    }

    async fn text(&self, el: &ElementHandle) -> Result<String> {
        let v = self
            .cmd(Method::GET, &format!("element/{}/text", el.id()), None)
            .await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    async fn location(&self, el: &ElementHandle) -> Result<(f64, f64)> {
        let v = self
            .cmd(Method::GET, &format!("element/{}/rect", el.id()), None)
            .await?;
        let x = v.get("x").and_then(Value::as_f64);
        let y = v.get("y").and_then(Value::as_f64);
        match (x, y) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(ScrapeError::UnexpectedResponse(format!("bad rect {}", v))),
        }
    }

    async fn drag_by(&self, el: &ElementHandle, dx: i64, dy: i64) -> Result<()> {
        let body = json!({
            "actions": [{
                "type": "pointer",
                "id": "mouse",
                "parameters": { "pointerType": "mouse" },
                "actions": [
                    { "type": "pointerMove", "duration": 0, "origin": self.element_arg(el), "x": 0, "y": 0 },
                    { "type": "pointerDown", "button": 0 },
                    { "type": "pointerMove", "duration": 100, "origin": "pointer", "x": dx, "y": dy },
                    { "type": "pointerUp", "button": 0 }
                ]
            }]
        });
        self.cmd(Method::POST, "actions", Some(body)).await?;
        self.cmd(Method::DELETE, "actions", None).await?;
        Ok(())
    }

    async fn execute_script(&self, code: &str, args: Vec<Value>) -> Result<Value> {
        self.cmd(
            Method::POST,
            "execute/sync",
            Some(json!({ "script": code, "args": args })),
        )
        .await
    }

    fn element_arg(&self, el: &ElementHandle) -> Value {
        json!({ ELEMENT_KEY: el.id() })
    }
}

/// Ensure a trailing slash so `Url::join` appends instead of replacing the last segment.
fn base_url(raw: &str) -> Result<Url> {
    let mut s = raw.to_string();
    if !s.ends_with('/') {
        s.push('/');
    }
    Ok(Url::parse(&s)?)
}

fn capabilities(browser: &str, args: &[String]) -> Value {
    match browser {
        "firefox" => json!({
            "browserName": "firefox",
            "moz:firefoxOptions": { "args": args }
        }),
        other => json!({
            "browserName": other,
            "goog:chromeOptions": { "args": args }
        }),
    }
}

fn element_from_value(v: &Value) -> Result<ElementHandle> {
    v.get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementHandle(id.to_string()))
        .ok_or_else(|| ScrapeError::UnexpectedResponse(format!("not an element reference: {}", v)))
}

/// Issue one command and unwrap the W3C `{"value": ...}` envelope.
async fn send(client: &Client, method: Method, url: Url, body: Option<Value>) -> Result<Value> {
    debug!(%method, %url, "webdriver command");
    let mut req = client.request(method, url);
    if let Some(body) = body {
        req = req.json(&body);
    }
    let resp = req.send().await?;
    let status = resp.status();
    let payload: Value = resp.json().await?;
    unwrap_envelope(status.is_success(), payload)
}

fn unwrap_envelope(ok: bool, mut payload: Value) -> Result<Value> {
    let value = payload
        .get_mut("value")
        .map(Value::take)
        .unwrap_or(Value::Null);
    if ok {
        return Ok(value);
    }
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if error == "no such element" {
        return Err(ScrapeError::ElementNotFound(message));
    }
    Err(ScrapeError::WebDriver { error, message })
}
