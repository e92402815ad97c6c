use crate::error::{AztrackError, Result};
use reqwest::blocking::{Client, Response};
use std::time::Duration;

const USER_AGENT: &str = concat!("aztrack/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn client(headers: reqwest::header::HeaderMap) -> Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(TIMEOUT)
        .build()?;
    Ok(client)
}

/// Turn a non-2xx response into [`AztrackError::Api`], keeping the body for
/// the error message.
pub(crate) fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().to_string();
    let body = resp.text().unwrap_or_default();
    Err(AztrackError::Api {
        status: status.as_u16(),
        url,
        body,
    })
}
