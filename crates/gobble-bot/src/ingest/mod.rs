//! Catalog ingestion from the open-data dataset service.
//!
//! Two requests: `poll-download` returns an envelope `{code, errMsg, data:{url}}`
//! pointing at the real payload, which is a GeoJSON feature collection. A
//! non-zero `code` aborts before anything is written.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use gobble::{build_catalog, CatalogWriter, Feature, FeatureCollection};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors raised while ingesting the catalog. All are fatal.
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Dataset service returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Dataset service error {code}: {message}")]
    Service { code: i64, message: String },

    #[error("Dataset service response has no download url")]
    MissingUrl,

    #[error("Catalog error: {0}")]
    Catalog(#[from] gobble::GobbleError),
}

#[derive(Debug, Deserialize)]
struct PollEnvelope {
    code: i64,
    #[serde(rename = "errMsg", default)]
    err_msg: Option<String>,
    #[serde(default)]
    data: Option<PollData>,
}

#[derive(Debug, Deserialize)]
struct PollData {
    #[serde(default)]
    url: Option<String>,
}

/// Client for the dataset download API.
#[derive(Clone)]
pub struct DatasetClient {
    client: reqwest::Client,
    api_base: String,
}

impl DatasetClient {
    pub fn new(api_base: &str) -> Self {
        Self::with_timeout(api_base, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_base: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("gobble-bot/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Ask the service where the dataset can be downloaded.
    pub async fn poll_download(&self, dataset_id: &str) -> Result<String, IngestError> {
        let url = format!("{}/{dataset_id}/poll-download", self.api_base);
        tracing::info!("Polling dataset {dataset_id}");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let envelope: PollEnvelope = match response.json().await {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(IngestError::Status {
                    status: status.as_u16(),
                    url,
                })
            }
            Err(e) => return Err(e.into()),
        };

        if envelope.code != 0 {
            return Err(IngestError::Service {
                code: envelope.code,
                message: envelope.err_msg.unwrap_or_default(),
            });
        }
        if !status.is_success() {
            return Err(IngestError::Status {
                status: status.as_u16(),
                url,
            });
        }

        envelope
            .data
            .and_then(|d| d.url)
            .filter(|u| !u.is_empty())
            .ok_or(IngestError::MissingUrl)
    }

    /// Download the feature collection.
    pub async fn fetch_features(&self, url: &str) -> Result<Vec<Feature>, IngestError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let collection: FeatureCollection = response.json().await?;
        tracing::info!("Downloaded {} records", collection.features.len());
        Ok(collection.features)
    }
}

/// Result of a successful ingest.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub entries: usize,
    pub path: PathBuf,
}

/// Download, parse and persist the catalog at `catalog_path`.
pub async fn ingest(
    client: &DatasetClient,
    dataset_id: &str,
    catalog_path: &Path,
) -> Result<IngestReport, IngestError> {
    let url = client.poll_download(dataset_id).await?;
    let features = client.fetch_features(&url).await?;
    let catalog = build_catalog(&features)?;

    CatalogWriter::write_to_file(&catalog, catalog_path)?;
    tracing::info!(
        "Wrote {} entries to {}",
        catalog.len(),
        catalog_path.display()
    );

    Ok(IngestReport {
        entries: catalog.len(),
        path: catalog_path.to_path_buf(),
    })
}
