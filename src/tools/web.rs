//! Web content tool.
//!
//! `fetch_urls` downloads one or more http(s) pages and returns readable
//! text extracted from each. Hosts on local or private networks are refused,
//! both before the request (including after DNS resolution) and after
//! redirects.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use serde_json::{json, Value};
use tokio::net::lookup_host;

use crate::error::{HelmError, Result};

use super::{Tool, ToolCategory, ToolContext, ToolOutput};

const WEB_USER_AGENT: &str = "helmsman/0.3 (+https://github.com/helmsman-dev/helmsman)";
pub const DEFAULT_MAX_FETCH_CHARS: usize = 20_000;
const MIN_FETCH_CHARS: usize = 256;
const MAX_FETCH_CHARS: usize = 100_000;
pub const DEFAULT_MAX_URLS: usize = 5;

/// Fetches URLs and returns extracted text for each.
pub struct FetchUrlsTool {
    client: Client,
    max_chars: usize,
    max_urls: usize,
}

impl FetchUrlsTool {
    pub fn new() -> Self {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            max_chars: DEFAULT_MAX_FETCH_CHARS,
            max_urls: DEFAULT_MAX_URLS,
        }
    }

    /// Cap the text returned per URL.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.clamp(MIN_FETCH_CHARS, MAX_FETCH_CHARS);
        self
    }

    /// Cap the number of URLs accepted in one call.
    pub fn with_max_urls(mut self, max_urls: usize) -> Self {
        self.max_urls = max_urls.max(1);
        self
    }

    async fn fetch_one(&self, raw: &str) -> Result<Value> {
        let parsed = Url::parse(raw)
            .map_err(|e| HelmError::Tool(format!("Invalid URL '{}': {}", raw, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HelmError::Tool(
                "Only http/https URLs are allowed".to_string(),
            ));
        }
        if is_blocked_host(&parsed) {
            return Err(HelmError::SecurityViolation(
                "Blocked URL host (local or private network)".to_string(),
            ));
        }
        resolve_and_check_host(&parsed).await?;

        let response = self
            .client
            .get(parsed)
            .header("User-Agent", WEB_USER_AGENT)
            .send()
            .await
            .map_err(|e| HelmError::Tool(format!("Fetch failed: {}", e)))?;

        if is_blocked_host(response.url()) {
            return Err(HelmError::SecurityViolation(format!(
                "Redirect destination is blocked: {}",
                response.url()
            )));
        }

        let status = response.status();
        if !status.is_success() {
            return Err(HelmError::Tool(format!("HTTP error: {}", status)));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = read_body_limited(response, self.max_chars * 4).await?;
        let text = extract_readable(&content_type, &body);
        let (text, truncated) = truncate_chars(&text, self.max_chars);

        Ok(json!({
            "url": raw,
            "final_url": final_url,
            "truncated": truncated,
            "text": text,
        }))
    }
}

impl Default for FetchUrlsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FetchUrlsTool {
    fn name(&self) -> &str {
        "fetch_urls"
    }

    fn description(&self) -> &str {
        "Fetch web pages (documentation, issues, articles) and return their readable text."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "urls": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "http/https URLs to fetch"
                }
            },
            "required": ["urls"]
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::NetworkRead
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let urls: Vec<&str> = args
            .get("urls")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if urls.is_empty() {
            return Err(HelmError::Tool("Missing 'urls' parameter".to_string()));
        }
        if urls.len() > self.max_urls {
            return Err(HelmError::Tool(format!(
                "At most {} URLs per call",
                self.max_urls
            )));
        }

        let pages: Vec<Value> = join_all(urls.iter().map(|url| async move {
            match self.fetch_one(url).await {
                Ok(page) => page,
                Err(e) => json!({ "url": url, "error": e.to_string() }),
            }
        }))
        .await;

        Ok(ToolOutput::success(json!(pages)))
    }
}

fn extract_readable(content_type: &str, body: &str) -> String {
    if content_type.contains("application/json") {
        return body.to_string();
    }
    if content_type.contains("text/html") || body.trim_start().starts_with('<') {
        let text = html_to_text(body);
        return match html_title(body) {
            Some(title) if !title.is_empty() => format!("# {}\n\n{}", title, text),
            _ => text,
        };
    }
    body.to_string()
}

struct HtmlPatterns {
    title: Regex,
    blocks: Regex,
    breaks: Regex,
    tags: Regex,
}

static HTML_PATTERNS: Lazy<Option<HtmlPatterns>> = Lazy::new(|| {
    Some(HtmlPatterns {
        title: Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok()?,
        blocks: Regex::new(
            r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>|<noscript[^>]*>.*?</noscript>",
        )
        .ok()?,
        breaks: Regex::new(r"(?i)</?(p|div|h[1-6]|li|tr|td|th|br|pre)\b[^>]*>").ok()?,
        tags: Regex::new(r"(?s)<[^>]+>").ok()?,
    })
});

fn html_patterns() -> Option<&'static HtmlPatterns> {
    HTML_PATTERNS.as_ref()
}

fn html_title(html: &str) -> Option<String> {
    let captures = html_patterns()?.title.captures(html)?;
    Some(normalize_whitespace(&decode_entities(captures.get(1)?.as_str())))
}

fn html_to_text(html: &str) -> String {
    let Some(p) = html_patterns() else {
        return normalize_whitespace(html);
    };
    let text = p.blocks.replace_all(html, " ");
    let text = p.breaks.replace_all(&text, "\n");
    let text = p.tags.replace_all(&text, " ");
    normalize_whitespace(&decode_entities(&text))
}

/// Collapse runs of spaces inside lines and drop blank lines.
fn normalize_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(input: &str) -> String {
    input
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Truncate on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (text[..idx].to_string(), true),
        None => (text.to_string(), false),
    }
}

async fn read_body_limited(mut response: reqwest::Response, max_bytes: usize) -> Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    while buf.len() < max_bytes {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(max_bytes - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) => break,
            Err(e) => {
                return Err(HelmError::Tool(format!(
                    "Failed to read response body: {}",
                    e
                )));
            }
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn is_blocked_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return true;
    };
    let host = host.to_ascii_lowercase();
    if host == "localhost" || host.ends_with(".local") || host.ends_with(".localhost") {
        return true;
    }
    let ip_str = host
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(&host);
    ip_str
        .parse::<IpAddr>()
        .map(is_private_or_local_ip)
        .unwrap_or(false)
}

async fn resolve_and_check_host(url: &Url) -> Result<()> {
    let host = url
        .host_str()
        .ok_or_else(|| HelmError::SecurityViolation("URL has no host".to_string()))?;
    if host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    let port = url.port_or_known_default().unwrap_or(443);
    let addrs = lookup_host(format!("{}:{}", host, port))
        .await
        .map_err(|e| HelmError::Tool(format!("DNS lookup failed for '{}': {}", host, e)))?;

    for addr in addrs {
        if is_private_or_local_ip(addr.ip()) {
            return Err(HelmError::SecurityViolation(format!(
                "'{}' resolves to private/local address {}",
                host,
                addr.ip()
            )));
        }
    }
    Ok(())
}

fn is_private_or_local_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => is_private_or_local_ipv4(addr),
        IpAddr::V6(addr) => match addr.to_ipv4_mapped() {
            Some(v4) => is_private_or_local_ipv4(v4),
            None => is_private_or_local_ipv6(addr),
        },
    }
}

fn is_private_or_local_ipv4(addr: Ipv4Addr) -> bool {
    addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_broadcast()
        || addr.is_documentation()
        || addr.is_unspecified()
        || addr.octets()[0] == 0
}

fn is_private_or_local_ipv6(addr: Ipv6Addr) -> bool {
    let first = addr.segments()[0];
    addr.is_loopback()
        || addr.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
        || (first & 0xff00) == 0xff00
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_hosts() {
        for url in [
            "http://localhost/x",
            "http://printer.local/",
            "http://127.0.0.1:8080/",
            "http://10.1.2.3/",
            "http://169.254.169.254/latest/meta-data",
            "http://[::1]/",
            "http://[::ffff:192.168.0.1]/",
        ] {
            assert!(is_blocked_host(&Url::parse(url).unwrap()), "{url}");
        }
        assert!(!is_blocked_host(&Url::parse("https://docs.rs/tokio").unwrap()));
        assert!(!is_blocked_host(&Url::parse("http://8.8.8.8/").unwrap()));
    }

    #[test]
    fn test_html_extraction() {
        let html = r#"<html><head><title>Tokio &amp; You</title>
            <style>body { color: red }</style><script>alert(1)</script></head>
            <body><h1>Intro</h1><p>Async   runtime</p><p>for Rust</p></body></html>"#;
        let text = extract_readable("text/html; charset=utf-8", html);

        assert!(text.starts_with("# Tokio & You"));
        assert!(text.contains("Async runtime"));
        assert!(text.contains("for Rust"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn test_json_passthrough() {
        assert_eq!(extract_readable("application/json", r#"{"a":1}"#), r#"{"a":1}"#);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        let (text, truncated) = truncate_chars("héllo wörld", 4);
        assert_eq!(text, "héll");
        assert!(truncated);
        let (text, truncated) = truncate_chars("short", 10);
        assert_eq!(text, "short");
        assert!(!truncated);
    }

    #[tokio::test]
    async fn test_missing_urls_is_error() {
        let tool = FetchUrlsTool::new();
        let err = tool.execute(json!({}), &ToolContext::new()).await.unwrap_err();
        assert!(err.to_string().contains("Missing 'urls'"));
    }

    #[tokio::test]
    async fn test_too_many_urls_is_error() {
        let tool = FetchUrlsTool::new().with_max_urls(1);
        let err = tool
            .execute(
                json!({"urls": ["https://a.example", "https://b.example"]}),
                &ToolContext::new(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("At most 1 URLs"));
    }

    #[tokio::test]
    async fn test_blocked_url_reported_inline() {
        let tool = FetchUrlsTool::new();
        let output = tool
            .execute(
                json!({"urls": ["http://127.0.0.1/admin", "ftp://example.com/file"]}),
                &ToolContext::new(),
            )
            .await
            .unwrap();
        let ToolOutput::Success(pages) = output else {
            panic!("expected success");
        };
        assert!(pages[0]["error"].as_str().unwrap().contains("Blocked"));
        assert!(pages[1]["error"].as_str().unwrap().contains("http/https"));
    }

    #[test]
    fn test_max_chars_clamped() {
        assert_eq!(FetchUrlsTool::new().with_max_chars(1).max_chars, MIN_FETCH_CHARS);
    }
}
