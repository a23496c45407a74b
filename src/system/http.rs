// src/system/http.rs

use crate::{
    constants::REQUEST_TIMEOUT,
    system::services::{FetchResult, UrlFetcher},
};
use reqwest::blocking::Client;

/// Blocking HTTP client used by `$request()`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a client with the request timeout applied.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl UrlFetcher for HttpFetcher {
    fn get(&self, url: &str, label: &str) -> FetchResult {
        log::debug!("[{}] GET {}", label, url);
        let response = match self.client.get(url).send() {
            Ok(response) => response,
            Err(e) => {
                log::warn!("[{}] Request to '{}' failed: {}", label, url, e);
                return FetchResult {
                    error: Some(describe(&e)),
                    ..FetchResult::default()
                };
            }
        };

        let status = response.status();
        match response.text() {
            Ok(body) if status.is_success() => FetchResult {
                body: Some(body),
                status: status.as_u16(),
                error: None,
            },
            Ok(_) => FetchResult {
                body: None,
                status: status.as_u16(),
                error: Some(format!("Request failed ({})", status.as_u16())),
            },
            Err(e) => FetchResult {
                body: None,
                status: status.as_u16(),
                error: Some(describe(&e)),
            },
        }
    }
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timed out".to_string()
    } else if error.is_connect() {
        "Could not connect".to_string()
    } else {
        error.to_string()
    }
}
