use anyhow::{Context, Result};
use bytes::Bytes;
use log::info;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::gbif::{Section, segment};

/// Result of cancelling a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// 204: the download was cancelled.
    Cancelled,
    /// 404: no download with that key.
    NotFound,
    /// Any other status, returned untouched.
    Other(u16),
}

impl CancelOutcome {
    pub fn from_status(status: u16) -> Self {
        match status {
            204 => CancelOutcome::Cancelled,
            404 => CancelOutcome::NotFound,
            other => CancelOutcome::Other(other),
        }
    }
}

impl fmt::Display for CancelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelOutcome::Cancelled => f.write_str("Occurrence download canceled"),
            CancelOutcome::NotFound => f.write_str("Invalid occurrence download key"),
            CancelOutcome::Other(status) => write!(f, "{}", status),
        }
    }
}

/// Result of validating an SQL download request.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValidation {
    /// The validated request as echoed by the server.
    Valid(Value),
    /// The server rejected the query with a 404.
    Invalid,
}

impl fmt::Display for SqlValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValidation::Valid(value) => write!(f, "{}", value),
            SqlValidation::Invalid => f.write_str("Invalid query, see other documentation."),
        }
    }
}

/// Occurrence download requests. All writes require credentials.
pub struct OccurrenceDownloads {
    pub(crate) section: Section,
}

impl OccurrenceDownloads {
    pub(crate) fn new(section: Section) -> Self {
        Self { section }
    }

    /// Starts a download described by a predicate or SQL request body.
    pub async fn request_download(&self, body: &Value) -> Result<Value> {
        let credential = self.section.credential().await?;
        let key = self
            .section
            .client
            .submit_json(
                &self.section.url("request"),
                body,
                credential.basic(),
                credential.headers(),
            )
            .await
            .context("Failed to request occurrence download")?;
        Ok(key)
    }

    pub async fn download_status(&self, download_key: &str) -> Result<Value> {
        let status = self
            .section
            .client
            .fetch(&self.section.url(&segment(download_key)), None)
            .await?;
        Ok(status)
    }

    /// Fetches the finished archive.
    pub async fn retrieve_download(&self, download_key: &str) -> Result<Bytes> {
        let archive = self
            .section
            .client
            .fetch_raw(&self.section.url(&format!("request/{}", segment(download_key))), None)
            .await
            .with_context(|| format!("Failed to retrieve download {}", download_key))?;
        Ok(archive)
    }

    /// Fetches the archive and writes it to `<dir>/<key>.zip`, with the key
    /// percent-encoded so it cannot leave `dir`.
    pub async fn save_download(&self, download_key: &str, dir: &Path) -> Result<PathBuf> {
        let archive = self.retrieve_download(download_key).await?;
        let path = dir.join(format!("{}.zip", segment(download_key)));
        tokio::fs::write(&path, &archive)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("{} successfully downloaded", path.display());
        Ok(path)
    }

    pub async fn cancel_download(&self, download_key: &str) -> Result<CancelOutcome> {
        let credential = self.section.credential().await?;
        let status = self
            .section
            .client
            .remove_with_auth(
                &self.section.url(&format!("request/{}", segment(download_key))),
                credential.basic(),
                credential.headers(),
                None,
            )
            .await?;
        Ok(CancelOutcome::from_status(status))
    }

    pub async fn validate_sql(&self, body: &Value) -> Result<SqlValidation> {
        let credential = self.section.credential().await?;
        let result = self
            .section
            .client
            .submit_json(
                &self.section.url("request/validate"),
                body,
                credential.basic(),
                credential.headers(),
            )
            .await;

        match result {
            Ok(value) => Ok(SqlValidation::Valid(value)),
            Err(e) if e.status() == Some(404) => Ok(SqlValidation::Invalid),
            Err(e) => Err(anyhow::Error::from(e).context("Failed to validate SQL")),
        }
    }
}
