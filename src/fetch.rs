use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::config::HttpProfile;
use crate::error::FetchError;

/// Client that sends the profile's browser headers and cookies on every request.
pub fn build_client(profile: &HttpProfile) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &profile.headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "skipping invalid header in http profile"),
        }
    }
    if let Some(cookie) = profile.cookie_header() {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(_) => warn!("skipping cookies with invalid characters"),
        }
    }

    let client = Client::builder()
        .user_agent(profile.user_agent.as_str())
        .default_headers(headers)
        .timeout(profile.timeout())
        .build()?;
    Ok(client)
}

/// Body of `url`. Anything but 200 is a failure; no retries.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, FetchError> {
    let res = client.get(url).send().await?;
    let status = res.status();
    if status != StatusCode::OK {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let body = res.text().await?;
    debug!(url, bytes = body.len(), "page fetched");
    Ok(body)
}
