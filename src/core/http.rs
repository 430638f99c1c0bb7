use std::time::Duration;

use reqwest::{
    blocking::{
        Client,
        Response,
    },
    header::USER_AGENT,
};

use crate::core::SyncError;

pub const JSON_TIMEOUT: Duration = Duration::from_secs(5);
pub const REVIEW_TIMEOUT: Duration = Duration::from_secs(10);

pub const USER_AGENT_VALUE: &str = concat!("jpdb-sync/", env!("CARGO_PKG_VERSION"), " (+reqwest)");

pub fn http_client() -> Result<Client, SyncError> {
    Client::builder()
        .default_headers({
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(USER_AGENT, reqwest::header::HeaderValue::from_static(USER_AGENT_VALUE));
            headers
        })
        .build()
        .map_err(|e| SyncError::unexpected("client", format!("HTTP client build failed: {e}")))
}

pub fn ensure_success(resp: &Response) -> Result<(), SyncError> {
    if !resp.status().is_success() {
        return Err(SyncError::Status {
            status: resp.status().as_u16(),
            url: resp.url().to_string(),
        });
    }
    Ok(())
}
