use anyhow::Result;
use serde_json::Value;

use crate::gbif::{ExportFormat, Section};
use crate::http::Params;

/// Filters for download statistics. Dates are `YYYY-MM`.
#[derive(Debug, Clone, Default)]
pub struct ExportQuery {
    pub from_date: String,
    pub to_date: String,
    pub publishing_country: String,
    pub format: ExportFormat,
    pub dataset_key: Option<String>,
    pub publishing_org_key: Option<String>,
}

impl ExportQuery {
    pub fn new(
        from_date: impl Into<String>,
        to_date: impl Into<String>,
        publishing_country: impl Into<String>,
    ) -> Self {
        Self {
            from_date: from_date.into(),
            to_date: to_date.into(),
            publishing_country: publishing_country.into(),
            ..Default::default()
        }
    }

    fn filters(&self) -> Params {
        Params::new()
            .set("fromDate", &self.from_date)
            .set("toDate", &self.to_date)
            .set("publishingCountry", &self.publishing_country)
            .opt("datasetKey", self.dataset_key.as_ref())
            .opt("publishingOrgKey", self.publishing_org_key.as_ref())
    }
}

/// Counts of downloads and downloaded records.
pub struct DownloadStatistics {
    pub(crate) section: Section,
}

impl DownloadStatistics {
    pub(crate) fn new(section: Section) -> Self {
        Self { section }
    }

    /// Download counts matching the query, as JSON.
    pub async fn summary(&self, query: &ExportQuery) -> Result<Value> {
        let stats = self
            .section
            .client
            .fetch_with_params(&self.section.url(""), &query.filters(), None)
            .await?;
        Ok(stats)
    }

    /// Counts by year, month and dataset as a TSV or CSV table.
    pub async fn export(&self, query: &ExportQuery) -> Result<String> {
        let params = Params::new()
            .set("format", query.format.to_string())
            .merge(query.filters());
        self.section.export("export", &params).await
    }
}
