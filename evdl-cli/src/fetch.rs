//! Master playlist loading from a URL or a local file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rendition::Manifest;
use reqwest::Client;
use rustls::{ClientConfig, crypto::aws_lc_rs};
use rustls_platform_verifier::BuilderVerifierExt;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{CliError, Result};

/// HTTP settings for manifest requests.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub retries: u32,
    pub user_agent: Option<String>,
}

/// A playlist location as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Url(Url),
    File(PathBuf),
}

impl ManifestSource {
    /// `http(s)://` sources are fetched, anything else is read from disk.
    pub fn parse(source: &str) -> Self {
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => ManifestSource::Url(url),
            _ => ManifestSource::File(PathBuf::from(source)),
        }
    }
}

/// Create a reqwest Client using the platform certificate verifier.
pub fn create_client(settings: &HttpSettings) -> Result<Client> {
    let provider = Arc::new(aws_lc_rs::default_provider());

    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| CliError::Tls(e.to_string()))?
        .with_platform_verifier()
        .map_err(|e| CliError::Tls(e.to_string()))?
        .with_no_client_auth();

    let mut builder = Client::builder()
        .use_preconfigured_tls(tls_config)
        .redirect(reqwest::redirect::Policy::limited(10));

    if !settings.timeout.is_zero() {
        builder = builder.timeout(settings.timeout);
    }
    if let Some(user_agent) = &settings.user_agent {
        builder = builder.user_agent(user_agent);
    }

    Ok(builder.build()?)
}

pub struct ManifestLoader {
    client: Client,
    settings: HttpSettings,
}

impl ManifestLoader {
    pub fn new(settings: HttpSettings) -> Result<Self> {
        Ok(Self {
            client: create_client(&settings)?,
            settings,
        })
    }

    /// Load and normalize the master playlist at `source`.
    ///
    /// Relative URIs are resolved against `base_url` when given, otherwise
    /// against the playlist URL itself. Local files without a base URL keep
    /// their URIs as written.
    pub async fn load(&self, source: &str, base_url: Option<&Url>) -> Result<Manifest> {
        let (bytes, base) = match ManifestSource::parse(source) {
            ManifestSource::Url(url) => {
                let bytes = self.fetch_with_retry(&url).await?;
                (bytes, Some(base_url.cloned().unwrap_or(url)))
            }
            ManifestSource::File(path) => {
                debug!(path = %path.display(), "Reading playlist from file");
                (tokio::fs::read(&path).await?, base_url.cloned())
            }
        };

        let manifest = Manifest::parse(&bytes, base.as_ref())?;
        info!(renditions = manifest.renditions().len(), "Loaded master playlist");
        Ok(manifest)
    }

    async fn fetch_with_retry(&self, url: &Url) -> Result<Vec<u8>> {
        let retries = self.settings.retries;
        let mut last_error = None;

        for attempt in 0..=retries {
            let request = async {
                let response = self.client.get(url.clone()).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(CliError::HttpStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                Ok::<_, CliError>(response.bytes().await?.to_vec())
            };

            let result = if self.settings.timeout.is_zero() {
                request.await
            } else {
                timeout(self.settings.timeout, request)
                    .await
                    .unwrap_or_else(|_| Err(CliError::timeout(self.settings.timeout.as_secs())))
            };

            match result {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_retryable() && attempt < retries => {
                    let delay = backoff(attempt);
                    warn!(attempt = attempt + 1, error = %e, "Playlist request failed, retrying in {:?}", delay);
                    last_error = Some(e);
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| CliError::timeout(self.settings.timeout.as_secs())))
    }
}

/// 1s, 2s, 4s, ... capped at 64s.
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(1000u64.saturating_mul(1 << attempt.min(6)))
}
