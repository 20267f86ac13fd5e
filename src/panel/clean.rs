// src/panel/clean.rs

/// Turn one rendered cell into a number.
///
/// `"-"` means zero; `$`, `,` and `%` are stripped. Empty or unparseable
/// cells give `None` and are zero-filled when the table is finalized.
pub fn clean_cell(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw == "-" {
        return Some(0.0);
    }
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%'))
        .collect();
    let stripped = stripped.trim();
    if stripped.is_empty() {
        return None;
    }
    stripped.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer count as shown in the employee table; `"N/A"` is zero.
pub fn parse_count(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("n/a") {
        return Some(0);
    }
    raw.replace(',', "").trim().parse().ok()
}
