//! Raw payload acquisition.
//!
//! One attempt, no retries: a request either lands its bytes in a
//! [`ScratchPayload`] or fails with [`PipelineError::Auth`] (401/403) or
//! [`PipelineError::Network`] (anything else).

mod basic;
mod client;
mod scratch;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use scratch::ScratchPayload;

use std::path::PathBuf;

use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::{ApiKeySecret, CredentialPlacement, DEFAULT_CREDENTIAL_PARAM};
use crate::error::{PipelineError, Result};
use crate::redact::{has_query_param, redact_url};
use auth::{ApiKey, UrlParam};

/// `true` for sources fetched over HTTP; anything else is a local path.
pub fn is_remote(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Wraps `inner` so requests carry `api_key` in the configured place.
///
/// No credential is added when there is no key, or when `source` already
/// carries the key's query parameter (`api_key` for header placement).
pub fn authenticated_client<C>(
    inner: C,
    source: &str,
    api_key: Option<&ApiKeySecret>,
    placement: &CredentialPlacement,
) -> Result<Box<dyn HttpClient>>
where
    C: HttpClient + 'static,
{
    let Some(key) = api_key else {
        return Ok(Box::new(inner));
    };

    let embedded = match placement {
        CredentialPlacement::QueryParam { name } => name.as_str(),
        CredentialPlacement::Header { .. } => DEFAULT_CREDENTIAL_PARAM,
    };
    if has_query_param(source, embedded) {
        debug!("Source URL already carries a credential, not adding another");
        return Ok(Box::new(inner));
    }

    Ok(match placement {
        CredentialPlacement::Header { name } => {
            Box::new(ApiKey::new(inner, name, key.expose())?)
        }
        CredentialPlacement::QueryParam { name } => {
            Box::new(UrlParam::new(inner, name.as_str(), key.clone()))
        }
    })
}

/// Maps a response status onto the acquirer's error taxonomy.
fn check_status(status: StatusCode, url: &str) -> Result<()> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(PipelineError::Auth {
            status: status.as_u16(),
            url: redact_url(url),
        });
    }
    if !status.is_success() {
        return Err(PipelineError::Network(format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unexpected status")
        )));
    }
    Ok(())
}

/// Streams the body at `url` into a scratch file.
///
/// # Errors
///
/// [`PipelineError::Auth`] on 401/403, [`PipelineError::Network`] on any other
/// non-success status, transport failure, or a body larger than `max_bytes`.
#[tracing::instrument(skip_all, fields(source = %redact_url(url)))]
pub async fn download_to_scratch<C>(client: &C, url: &str, max_bytes: u64) -> Result<ScratchPayload>
where
    C: HttpClient + ?Sized,
{
    let parsed = url
        .parse()
        .map_err(|e| PipelineError::Config(format!("invalid source URL {}: {e}", redact_url(url))))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    info!("Downloading feed");
    let fetch_start = std::time::Instant::now();
    let mut resp = client.execute(req).await?;
    check_status(resp.status(), url)?;

    let scratch = tempfile::Builder::new()
        .prefix("gtfsrt-")
        .suffix(".bin")
        .tempfile()?;
    let mut file = tokio::fs::File::from_std(scratch.reopen()?);

    let mut total: u64 = 0;
    while let Some(chunk) = resp.chunk().await? {
        total += chunk.len() as u64;
        if total > max_bytes {
            return Err(PipelineError::Network(format!(
                "download exceeded size limit at {total} bytes (max {max_bytes} bytes)"
            )));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    debug!(
        bytes = total,
        elapsed_ms = fetch_start.elapsed().as_millis() as u64,
        "Feed bytes received"
    );
    Ok(ScratchPayload::scratch(scratch.into_temp_path(), total))
}

/// Acquires the payload behind `source`: downloaded when it is an HTTP(S)
/// URL, otherwise read in place from the local filesystem.
pub async fn acquire<C>(client: &C, source: &str, max_bytes: u64) -> Result<ScratchPayload>
where
    C: HttpClient + ?Sized,
{
    if is_remote(source) {
        return download_to_scratch(client, source, max_bytes).await;
    }

    let path = PathBuf::from(source);
    let len = tokio::fs::metadata(&path).await?.len();
    info!(path = %path.display(), bytes = len, "Reading local feed payload");
    Ok(ScratchPayload::local(path, len))
}
