use coyote_core::config::{ConfigWarning, WarnLevel};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Print a shock receipt as raw JSON or as its one-line summary.
pub fn print_receipt(receipt: &serde_json::Value, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(receipt)
    } else {
        println!("{}", receipt_line(receipt));
        Ok(())
    }
}

/// `Pulse A: amp=50 (req 80, owner max 50) freq=20 copies=5 (~500ms)`.
/// Fields the API left out show as `?`.
pub fn receipt_line(receipt: &serde_json::Value) -> String {
    let field = |name: &str| match &receipt[name] {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "?".to_string(),
        other => other.to_string(),
    };
    format!(
        "Pulse {}: amp={} (req {}, owner max {}) freq={} copies={} (~{}ms)",
        field("channel"),
        field("amp_effective"),
        field("amp_requested"),
        field("owner_max"),
        field("freq"),
        field("copies"),
        field("approx_duration_ms"),
    )
}

fn level_label(level: &WarnLevel) -> &'static str {
    match level {
        WarnLevel::Warning => "warning",
        WarnLevel::Error => "error",
    }
}

/// Two-column LEVEL / MESSAGE table, level column padded to its widest entry.
pub fn render_warnings(warnings: &[ConfigWarning]) -> String {
    const HEADER: &str = "LEVEL";
    let width = warnings
        .iter()
        .map(|w| level_label(&w.level).len())
        .fold(HEADER.len(), usize::max);

    let mut out = format!("{HEADER:width$}  MESSAGE\n");
    out.push_str(&format!("{}  {}\n", "-".repeat(width), "-".repeat(7)));
    for w in warnings {
        out.push_str(&format!("{:width$}  {}\n", level_label(&w.level), w.message));
    }
    out
}

pub fn print_warnings(warnings: &[ConfigWarning]) {
    print!("{}", render_warnings(warnings));
}
