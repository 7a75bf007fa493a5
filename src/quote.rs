use anyhow::{anyhow, bail, Result};
use log::{debug, info};
use serde::Deserialize;

use crate::hal::QuoteTransport;

pub const DEFAULT_QUOTE_URL: &str = "https://zenquotes.io/api/random";

/// Response bodies above this size are rejected.
pub const MAX_BODY_BYTES: usize = 32 * 1024;

const EMPTY_QUOTE: &str = "Stay curious.";
const EMPTY_AUTHOR: &str = "Unknown";

// ── Data types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRecord {
    pub quote_text: String,
    pub author_name: String,
}

impl QuoteRecord {
    pub fn new(quote_text: impl Into<String>, author_name: impl Into<String>) -> Self {
        Self {
            quote_text: quote_text.into(),
            author_name: author_name.into(),
        }
    }

    /// Shown when the very first fetch after boot fails.
    pub fn placeholder() -> Self {
        Self::new(
            "Perseverance is not a long race; it is many short races one after the other.",
            "Walter Elliot",
        )
    }
}

// ── JSON response types (zenquotes) ─────────────────────────────────

#[derive(Deserialize)]
struct ZenQuote {
    #[serde(default)]
    q: String,
    #[serde(default)]
    a: String,
}

// ── Parsing ─────────────────────────────────────────────────────────

/// Parse a zenquotes payload: a JSON array whose first element carries the
/// quote in `q` and the author in `a`.
pub fn parse_quote(body: &str) -> Result<QuoteRecord> {
    if !body.trim_start().starts_with('[') {
        bail!("JSON parse error.");
    }
    let items: Vec<ZenQuote> = serde_json::from_str(body).map_err(|e| {
        debug!("quote JSON: {}", e);
        anyhow!("JSON parse error.")
    })?;
    let Some(first) = items.into_iter().next() else {
        bail!("JSON parse error.");
    };

    let quote = first.q.trim();
    let author = first.a.trim();
    Ok(QuoteRecord::new(
        if quote.is_empty() { EMPTY_QUOTE } else { quote },
        if author.is_empty() { EMPTY_AUTHOR } else { author },
    ))
}

// ── Fetch ───────────────────────────────────────────────────────────

/// One fetch attempt. The error's `Display` is the reason shown on screen.
pub fn fetch_quote<T: QuoteTransport + ?Sized>(transport: &mut T, url: &str) -> Result<QuoteRecord> {
    if !transport.link_up() {
        info!("WiFi link down, rejoining before fetch");
        if !transport.reconnect() {
            bail!("No Wi-Fi connection.");
        }
    }

    debug!("HTTP GET: {}", url);
    let resp = transport
        .get(url)
        .map_err(|e| anyhow!("HTTPS request failed: {}", e))?;
    debug!("HTTP status: {}", resp.status);

    if resp.status != 200 {
        bail!("HTTP error {}", resp.status);
    }
    if resp.body.len() > MAX_BODY_BYTES {
        bail!("Response too large (>32KB)");
    }

    let record = parse_quote(&resp.body)?;
    info!(
        "Quote: {} chars by {}",
        record.quote_text.chars().count(),
        record.author_name
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::HttpResponse;

    struct CannedTransport {
        link: bool,
        rejoin: bool,
        rejoins: usize,
        reply: Option<HttpResponse>,
        requests: Vec<String>,
    }

    impl CannedTransport {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                link: true,
                rejoin: false,
                rejoins: 0,
                reply: Some(HttpResponse { status, body: body.to_string() }),
                requests: Vec::new(),
            }
        }
    }

    impl QuoteTransport for CannedTransport {
        fn link_up(&self) -> bool {
            self.link
        }

        fn reconnect(&mut self) -> bool {
            self.rejoins += 1;
            self.link = self.rejoin;
            self.link
        }

        fn get(&mut self, url: &str) -> Result<HttpResponse> {
            self.requests.push(url.to_string());
            self.reply.clone().ok_or_else(|| anyhow!("connection reset"))
        }
    }

    #[test]
    fn parses_first_array_element() {
        let body = r#"[{"q":"Simplicity is the soul of efficiency","a":"Austin Freeman","h":"<b>x</b>"},{"q":"x","a":"y"}]"#;
        let rec = parse_quote(body).unwrap();
        assert_eq!(rec, QuoteRecord::new("Simplicity is the soul of efficiency", "Austin Freeman"));
    }

    #[test]
    fn empty_fields_fall_back() {
        let rec = parse_quote(r#"[{"q":"  ","a":""}]"#).unwrap();
        assert_eq!(rec, QuoteRecord::new("Stay curious.", "Unknown"));
        let rec = parse_quote(r#"[{}]"#).unwrap();
        assert_eq!(rec.author_name, "Unknown");
    }

    #[test]
    fn malformed_payloads_are_parse_errors() {
        for body in ["", "{}", r#"{"q":"a","a":"b"}"#, "[]", "[1,2]", "[{\"q\":"] {
            let err = parse_quote(body).unwrap_err();
            assert_eq!(err.to_string(), "JSON parse error.", "body {:?}", body);
        }
    }

    #[test]
    fn http_500_reports_status() {
        let mut t = CannedTransport::replying(500, "oops");
        let err = fetch_quote(&mut t, DEFAULT_QUOTE_URL).unwrap_err();
        assert!(err.to_string().contains("HTTP error 500"));
        assert_eq!(t.requests, vec![DEFAULT_QUOTE_URL.to_string()]);
    }

    #[test]
    fn no_link_skips_request() {
        let mut t = CannedTransport::replying(200, "[]");
        t.link = false;
        let err = fetch_quote(&mut t, DEFAULT_QUOTE_URL).unwrap_err();
        assert_eq!(err.to_string(), "No Wi-Fi connection.");
        assert!(t.requests.is_empty());
        assert_eq!(t.rejoins, 1);
    }

    #[test]
    fn dropped_link_is_rejoined_before_fetch() {
        let mut t = CannedTransport::replying(200, r#"[{"q":"Back again.","a":"Anon"}]"#);
        t.link = false;
        t.rejoin = true;
        let rec = fetch_quote(&mut t, DEFAULT_QUOTE_URL).unwrap();
        assert_eq!(rec.quote_text, "Back again.");
        assert_eq!(t.rejoins, 1);
        assert_eq!(t.requests.len(), 1);

        // a healthy link is not touched
        fetch_quote(&mut t, DEFAULT_QUOTE_URL).unwrap();
        assert_eq!(t.rejoins, 1);
    }

    #[test]
    fn transport_failure_is_wrapped() {
        let mut t = CannedTransport::replying(200, "");
        t.reply = None;
        let err = fetch_quote(&mut t, DEFAULT_QUOTE_URL).unwrap_err();
        assert_eq!(err.to_string(), "HTTPS request failed: connection reset");
    }

    #[test]
    fn oversized_body_is_rejected() {
        let body = format!("[{{\"q\":\"{}\",\"a\":\"x\"}}]", "a".repeat(MAX_BODY_BYTES));
        let mut t = CannedTransport::replying(200, &body);
        assert!(fetch_quote(&mut t, DEFAULT_QUOTE_URL).is_err());
    }

    #[test]
    fn successful_fetch() {
        let mut t = CannedTransport::replying(200, r#"[{"q":"Be here now.","a":"Ram Dass"}]"#);
        let rec = fetch_quote(&mut t, DEFAULT_QUOTE_URL).unwrap();
        assert_eq!(rec.author_name, "Ram Dass");
    }
}
