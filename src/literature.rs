//! Literature citing GBIF-mediated data.

use anyhow::Result;
use serde_json::Value;

use crate::gbif::{ExportFormat, Section, segment};
use crate::http::Params;

/// Filters for `literature/search` and its export.
#[derive(Debug, Clone, Default)]
pub struct LiteratureQuery {
    pub q: Option<String>,
    pub citation_type: Vec<String>,
    pub countries_of_coverage: Vec<String>,
    pub countries_of_researcher: Vec<String>,
    pub doi: Vec<String>,
    pub gbif_dataset_key: Option<String>,
    pub gbif_download_key: Vec<String>,
    pub gbif_higher_taxon_key: Vec<i64>,
    pub gbif_network_key: Option<String>,
    pub gbif_occurrence_key: Vec<i64>,
    pub gbif_project_identifier: Option<String>,
    pub gbif_programme_acronym: Option<String>,
    pub gbif_taxon_key: Vec<i64>,
    pub literature_type: Vec<String>,
    pub open_access: Option<bool>,
    pub peer_review: Option<bool>,
    pub publisher: Vec<String>,
    pub publishing_organization_key: Vec<String>,
    pub relevance: Vec<String>,
    pub source: Vec<String>,
    pub topics: Vec<String>,
    pub year: Option<String>,
    pub language: Option<String>,
    /// Search only.
    pub highlight: Option<bool>,
    pub facet: Vec<String>,
    pub facet_mincount: Option<u32>,
    pub facet_multiselect: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl LiteratureQuery {
    fn filters(&self) -> Params {
        Params::new()
            .list("citationType", &self.citation_type)
            .list("countriesOfCoverage", &self.countries_of_coverage)
            .list("countriesOfResearcher", &self.countries_of_researcher)
            .list("doi", &self.doi)
            .opt("gbifDatasetKey", self.gbif_dataset_key.as_ref())
            .list("gbifDownloadKey", &self.gbif_download_key)
            .list("gbifHigherTaxonKey", self.gbif_higher_taxon_key.iter().copied())
            .opt("gbifNetworkKey", self.gbif_network_key.as_ref())
            .list("gbifOccurrenceKey", self.gbif_occurrence_key.iter().copied())
            .opt("gbifProjectIdentifier", self.gbif_project_identifier.as_ref())
            .opt("gbifProgrammeAcronym", self.gbif_programme_acronym.as_ref())
            .list("gbifTaxonKey", self.gbif_taxon_key.iter().copied())
            .list("literatureType", &self.literature_type)
            .opt("openAccess", self.open_access)
            .opt("peerReview", self.peer_review)
            .list("publisher", &self.publisher)
            .list("publishingOrganizationKey", &self.publishing_organization_key)
            .list("relevance", &self.relevance)
            .list("source", &self.source)
            .list("topics", &self.topics)
            .opt("year", self.year.as_ref())
            .opt("language", self.language.as_ref())
            .opt("q", self.q.as_ref())
    }

    pub fn to_params(&self) -> Params {
        self.filters()
            .opt("hl", self.highlight)
            .opt("limit", self.limit)
            .opt("offset", self.offset)
            .list("facet", &self.facet)
            .opt("facetMincount", self.facet_mincount)
            .opt("facetMultiselect", self.facet_multiselect)
    }
}

pub struct Literature {
    pub(crate) section: Section,
}

impl Literature {
    pub(crate) fn new(section: Section) -> Self {
        Self { section }
    }

    /// One literature item by UUID.
    pub async fn get(&self, uuid: &str) -> Result<Value> {
        let item = self
            .section
            .client
            .fetch(&self.section.url(&segment(uuid)), None)
            .await?;
        Ok(item)
    }

    pub async fn search(&self, query: &LiteratureQuery) -> Result<Value> {
        let items = self
            .section
            .client
            .fetch_with_params(&self.section.url("search"), &query.to_params(), None)
            .await?;
        Ok(items)
    }

    /// The search results as a TSV or CSV table.
    pub async fn export(&self, query: &LiteratureQuery, format: ExportFormat) -> Result<String> {
        let params = Params::new()
            .set("format", format.to_string())
            .merge(query.filters());
        self.section.export("export", &params).await
    }
}
