use super::ResolverConfig;
use crate::{Error, Result};
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

pub(crate) fn build_client(config: &ResolverConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(concat!("markweave/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// GETs `url` as text, refusing non-HTTP(S) URLs and bodies over `max_bytes`.
///
/// The size cap is checked against `Content-Length` up front and again
/// while the body streams in, so a missing or lying header cannot bypass it.
pub async fn fetch_text(client: &Client, url: &str, max_bytes: usize) -> Result<String> {
    let parsed = Url::parse(url).map_err(|_| Error::InvalidUrl(url.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(url.to_string()));
    }

    let mut response = client
        .get(parsed)
        .header(ACCEPT, "text/plain, text/markdown, */*")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::FetchStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    if response
        .content_length()
        .is_some_and(|len| len > max_bytes as u64)
    {
        return Err(Error::ContentTooLarge { limit: max_bytes });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > max_bytes {
            return Err(Error::ContentTooLarge { limit: max_bytes });
        }
        body.extend_from_slice(&chunk);
    }
    debug!(url, bytes = body.len(), "fetched remote text");
    Ok(String::from_utf8_lossy(&body).into_owned())
}
