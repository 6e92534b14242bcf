use anyhow::{Context, Result};
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::gbif::Section;
use crate::http::Params;

/// Filters shared by `species/search` and `species/suggest`.
///
/// Enumerated filters (`rank`, `status`, `habitat`...) take the API's
/// upper-case names, e.g. `SPECIES` or `ACCEPTED`.
#[derive(Debug, Clone, Default)]
pub struct SpeciesQuery {
    pub q: Option<String>,
    pub dataset_key: Option<String>,
    pub constituent_key: Option<String>,
    pub rank: Option<String>,
    pub higher_taxon_key: Option<i64>,
    pub status: Option<String>,
    pub is_extinct: Option<bool>,
    pub habitat: Option<String>,
    pub threat: Option<String>,
    pub name_type: Option<String>,
    pub nomenclatural_status: Option<String>,
    pub origin: Option<String>,
    pub issue: Option<String>,
    /// Search only.
    pub highlight: Option<bool>,
    pub facet: Vec<String>,
    pub facet_mincount: Option<u32>,
    pub facet_multiselect: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl SpeciesQuery {
    fn filters(&self) -> Params {
        Params::new()
            .opt("datasetKey", self.dataset_key.as_ref())
            .opt("constituentKey", self.constituent_key.as_ref())
            .opt("rank", self.rank.as_ref())
            .opt("higherTaxonKey", self.higher_taxon_key)
            .opt("status", self.status.as_ref())
            .opt("isExtinct", self.is_extinct)
            .opt("habitat", self.habitat.as_ref())
            .opt("threat", self.threat.as_ref())
            .opt("nameType", self.name_type.as_ref())
            .opt("nomenclaturalStatus", self.nomenclatural_status.as_ref())
            .opt("origin", self.origin.as_ref())
            .opt("issue", self.issue.as_ref())
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

/// A name, optionally with classification, to match against the backbone.
///
/// Unless `strict` is set, the classification is also used as a fallback
/// when the name alone has no match.
#[derive(Debug, Clone, Default)]
pub struct NameMatch {
    pub name: Option<String>,
    pub usage_key: Option<i64>,
    pub authorship: Option<String>,
    pub rank: Option<String>,
    pub generic_name: Option<String>,
    pub specific_epithet: Option<String>,
    pub infraspecific_epithet: Option<String>,
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub strict: Option<bool>,
    pub verbose: Option<bool>,
}

impl NameMatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn to_params(&self) -> Params {
        Params::new()
            .opt("usageKey", self.usage_key)
            .opt("name", self.name.as_ref())
            .opt("authorship", self.authorship.as_ref())
            .opt("rank", self.rank.as_ref())
            .opt("genericName", self.generic_name.as_ref())
            .opt("specificEpithet", self.specific_epithet.as_ref())
            .opt("infraspecificEpithet", self.infraspecific_epithet.as_ref())
            .opt("strict", self.strict)
            .opt("verbose", self.verbose)
            .opt("kingdom", self.kingdom.as_ref())
            .opt("phylum", self.phylum.as_ref())
            .opt("order", self.order.as_ref())
            .opt("class", self.class.as_ref())
            .opt("family", self.family.as_ref())
            .opt("genus", self.genus.as_ref())
    }
}

/// Filters for listing name usages across all checklists.
#[derive(Debug, Clone, Default)]
pub struct NameUsageQuery {
    pub dataset_key: Vec<String>,
    pub source_id: Option<String>,
    pub name: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl NameUsageQuery {
    fn to_params(&self) -> Params {
        Params::new()
            .opt("limit", self.limit)
            .opt("offset", self.offset)
            .list("datasetKey", &self.dataset_key)
            .opt("sourceId", self.source_id.as_ref())
            .opt("name", self.name.as_ref())
    }
}

/// Search, autocomplete and fuzzy matching of species names.
pub struct NameSearch {
    pub(crate) section: Section,
}

impl NameSearch {
    pub(crate) fn new(section: Section) -> Self {
        Self { section }
    }

    /// Full-text search over name usages from all checklists.
    pub async fn search(&self, query: &SpeciesQuery) -> Result<Value> {
        let results = self
            .section
            .client
            .fetch_with_params(&self.section.url("search"), &query.to_params(), None)
            .await?;
        Ok(results)
    }

    /// Up to 20 name usages starting with `query.q`, for autocompletion.
    pub async fn suggest(&self, query: &SpeciesQuery) -> Result<Value> {
        let suggestions = self
            .section
            .client
            .fetch_with_params(&self.section.url("suggest"), &query.filters(), None)
            .await?;
        Ok(suggestions)
    }

    /// Fuzzy match against the backbone taxonomy.
    pub async fn match_name(&self, name: &NameMatch) -> Result<Value> {
        let matched = self
            .section
            .client
            .fetch_with_params(&self.section.url("match"), &name.to_params(), None)
            .await?;
        Ok(matched)
    }

    /// Name usages with vernacular names in `language` (ISO 639-1).
    pub async fn name_usages(&self, language: &str, query: &NameUsageQuery) -> Result<Value> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(language).context("Invalid language code")?,
        );
        let usages = self
            .section
            .client
            .fetch_with_params(&self.section.url(""), &query.to_params(), Some(&headers))
            .await?;
        Ok(usages)
    }
}
