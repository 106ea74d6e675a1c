//! Page loading from URLs, files, and stdin.
//!
//! A fetched page carries the URL it finally came from after redirects; that
//! URL is the base every relative link and image source is resolved against.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::{EzyCopyError, Result};

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (compatible; EzyCopy/0.3; +https://github.com/ezycopy/ezycopy)".to_string(),
        }
    }
}

/// A downloaded page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    /// Final URL after redirects.
    pub url: Url,
}

/// Parses and validates an http(s) URL.
pub fn parse_page_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| EzyCopyError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(EzyCopyError::InvalidUrl(format!("unsupported scheme '{other}' (expected http or https)"))),
    }
}

/// Fetches a page over HTTP.
///
/// Follows redirects, respects the configured timeout, and sends a
/// browser-like `Accept` header. Non-success statuses are errors.
pub async fn fetch_page(url: &str, config: &FetchConfig) -> Result<FetchedPage> {
    let parsed_url = parse_page_url(url)?;

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(EzyCopyError::HttpError)?;

    let to_error = |e: reqwest::Error| {
        if e.is_timeout() { EzyCopyError::Timeout { timeout: config.timeout } } else { EzyCopyError::HttpError(e) }
    };

    let response = client
        .get(parsed_url)
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(to_error)?;

    let final_url = response.url().clone();
    let html = response.text().await.map_err(to_error)?;

    Ok(FetchedPage { html, url: final_url })
}

/// Reads HTML content from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(EzyCopyError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(EzyCopyError::from)
    }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(EzyCopyError::from)?;

    Ok(buffer)
}
