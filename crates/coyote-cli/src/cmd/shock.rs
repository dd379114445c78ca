use crate::output::print_receipt;
use anyhow::{anyhow, bail, Context};
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_API: &str = "http://127.0.0.1:8000";

const DEFAULT_FREQ: i64 = 20;
const DEFAULT_COPIES: i64 = 5;
const FREQ_CAP: i64 = 200;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShockPayload {
    pub channel: String,
    pub amp: i64,
    pub freq: i64,
    pub copies: i64,
}

/// Check arguments before anything is sent. Returns the payload and, when
/// the frequency had to be lowered to the cap, the value that was asked for.
pub fn parse_args(
    channel: &str,
    amp: i64,
    freq: Option<i64>,
    copies: Option<i64>,
) -> anyhow::Result<(ShockPayload, Option<i64>)> {
    let channel = channel.trim().to_ascii_uppercase();
    if channel != "A" && channel != "B" {
        bail!("channel must be A or B");
    }
    if !(0..=100).contains(&amp) {
        bail!("amp must be 0..100");
    }

    let mut freq = freq.unwrap_or(DEFAULT_FREQ);
    let mut clamped_from = None;
    if freq < 0 {
        bail!("freq must be >= 0");
    }
    if freq > FREQ_CAP {
        clamped_from = Some(freq);
        freq = FREQ_CAP;
    }

    let copies = copies.unwrap_or(DEFAULT_COPIES);
    if !(1..=100).contains(&copies) {
        bail!("copies must be 1..100");
    }

    Ok((
        ShockPayload {
            channel,
            amp,
            freq,
            copies,
        },
        clamped_from,
    ))
}

fn shock_url(api: &str) -> String {
    format!("{}/shock", api.trim_end_matches('/'))
}

/// Error text from an API error body, falling back to the raw body.
fn api_error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

pub fn run(
    api: &str,
    channel: &str,
    amp: i64,
    freq: Option<i64>,
    copies: Option<i64>,
    json: bool,
) -> anyhow::Result<()> {
    let (payload, clamped_from) = parse_args(channel, amp, freq, copies)?;
    if let Some(asked) = clamped_from {
        eprintln!("warning: freq {asked} clamped to {FREQ_CAP}");
    }

    let url = shock_url(api);
    tracing::debug!(%url, ?payload, "sending shock");

    let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
    let receipt: serde_json::Value = match agent.post(&url).send_json(&payload) {
        Ok(resp) => resp.into_json().context("API returned a non-JSON body")?,
        Err(ureq::Error::Status(code, resp)) => {
            let body = resp.into_string().unwrap_or_default();
            return Err(anyhow!("API error ({code}): {}", api_error_detail(&body)));
        }
        Err(e) => return Err(anyhow!("network error: {e}")),
    };

    print_receipt(&receipt, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fills_defaults_and_uppercases_channel() {
        let (payload, clamped) = parse_args("b", 30, None, None).unwrap();
        assert_eq!(
            payload,
            ShockPayload {
                channel: "B".into(),
                amp: 30,
                freq: 20,
                copies: 5
            }
        );
        assert_eq!(clamped, None);
    }

    #[test]
    fn parse_clamps_high_freq() {
        let (payload, clamped) = parse_args("A", 10, Some(300), Some(2)).unwrap();
        assert_eq!(payload.freq, 200);
        assert_eq!(clamped, Some(300));
    }

    #[test]
    fn parse_rejects_out_of_range_values() {
        assert!(parse_args("C", 10, None, None).is_err());
        assert!(parse_args("A", 101, None, None).is_err());
        assert!(parse_args("A", -1, None, None).is_err());
        assert!(parse_args("A", 10, Some(-5), None).is_err());
        assert!(parse_args("A", 10, Some(20), Some(0)).is_err());
        assert!(parse_args("A", 10, Some(20), Some(101)).is_err());
    }

    #[test]
    fn url_joins_without_double_slash() {
        assert_eq!(shock_url("http://h:8000/"), "http://h:8000/shock");
        assert_eq!(shock_url("http://h:8000"), "http://h:8000/shock");
    }

    #[test]
    fn error_detail_prefers_error_field() {
        assert_eq!(api_error_detail(r#"{"error":"not bound"}"#), "not bound");
        assert_eq!(api_error_detail("Bad Gateway\n"), "Bad Gateway");
    }
}
