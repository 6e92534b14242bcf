use anyhow::{Result, anyhow};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::gbif::Section;
use crate::http::Params;

/// Filters for `occurrence/search`.
///
/// List fields are sent as repeated parameters (`taxonKey=1&taxonKey=2`) and
/// empty lists are omitted. Range fields take the API's `from,to` syntax.
#[derive(Debug, Clone, Default)]
pub struct OccurrenceQuery {
    /// Full-text query.
    pub q: Option<String>,
    pub taxon_key: Vec<i64>,
    pub accepted_taxon_key: Vec<i64>,
    pub scientific_name: Vec<String>,
    pub dataset_key: Vec<String>,
    pub basis_of_record: Vec<String>,
    pub country: Vec<String>,
    pub continent: Vec<String>,
    pub recorded_by: Vec<String>,
    /// Year or `from,to` range.
    pub year: Option<String>,
    pub month: Option<String>,
    pub elevation: Option<String>,
    pub has_coordinate: Option<bool>,
    pub has_geospatial_issue: Option<bool>,
    pub facet: Vec<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl OccurrenceQuery {
    pub fn to_params(&self) -> Params {
        Params::new()
            .opt("q", self.q.as_ref())
            .list("taxonKey", self.taxon_key.iter().copied())
            .list("acceptedTaxonKey", self.accepted_taxon_key.iter().copied())
            .list("scientificName", &self.scientific_name)
            .list("datasetKey", &self.dataset_key)
            .list("basisOfRecord", &self.basis_of_record)
            .list("country", &self.country)
            .list("continent", &self.continent)
            .list("recordedBy", &self.recorded_by)
            .opt("year", self.year.as_ref())
            .opt("month", self.month.as_ref())
            .opt("elevation", self.elevation.as_ref())
            .opt("hasCoordinate", self.has_coordinate)
            .opt("hasGeospatialIssue", self.has_geospatial_issue)
            .list("facet", &self.facet)
            .opt("limit", self.limit)
            .opt("offset", self.offset)
    }
}

/// Fields with an autocomplete endpoint below `occurrence/search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestField {
    CatalogNumber,
    CollectionCode,
    DatasetName,
    EventId,
    IdentifiedBy,
    InstitutionCode,
    Locality,
    OccurrenceId,
    OrganismId,
    OtherCatalogNumbers,
    ParentEventId,
    RecordNumber,
    RecordedBy,
    SamplingProtocol,
    StateProvince,
    WaterBody,
}

impl SuggestField {
    const ALL: [SuggestField; 16] = [
        SuggestField::CatalogNumber,
        SuggestField::CollectionCode,
        SuggestField::DatasetName,
        SuggestField::EventId,
        SuggestField::IdentifiedBy,
        SuggestField::InstitutionCode,
        SuggestField::Locality,
        SuggestField::OccurrenceId,
        SuggestField::OrganismId,
        SuggestField::OtherCatalogNumbers,
        SuggestField::ParentEventId,
        SuggestField::RecordNumber,
        SuggestField::RecordedBy,
        SuggestField::SamplingProtocol,
        SuggestField::StateProvince,
        SuggestField::WaterBody,
    ];

    /// Path segment, which is also the field's name in the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestField::CatalogNumber => "catalogNumber",
            SuggestField::CollectionCode => "collectionCode",
            SuggestField::DatasetName => "datasetName",
            SuggestField::EventId => "eventId",
            SuggestField::IdentifiedBy => "identifiedBy",
            SuggestField::InstitutionCode => "institutionCode",
            SuggestField::Locality => "locality",
            SuggestField::OccurrenceId => "occurrenceId",
            SuggestField::OrganismId => "organismId",
            SuggestField::OtherCatalogNumbers => "otherCatalogNumbers",
            SuggestField::ParentEventId => "parentEventId",
            SuggestField::RecordNumber => "recordNumber",
            SuggestField::RecordedBy => "recordedBy",
            SuggestField::SamplingProtocol => "samplingProtocol",
            SuggestField::StateProvince => "stateProvince",
            SuggestField::WaterBody => "waterBody",
        }
    }
}

impl fmt::Display for SuggestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuggestField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("Unknown suggest field: {}", s))
    }
}

/// Occurrence search and autocomplete.
pub struct OccurrenceSearch {
    pub(crate) section: Section,
}

impl OccurrenceSearch {
    pub(crate) fn new(section: Section) -> Self {
        Self { section }
    }

    pub async fn search(&self, query: &OccurrenceQuery) -> Result<Value> {
        let results = self
            .section
            .client
            .fetch_with_params(&self.section.url(""), &query.to_params(), None)
            .await?;
        Ok(results)
    }

    /// Values of `field` starting with `q`, at most `limit` of them.
    pub async fn suggest(&self, field: SuggestField, q: &str, limit: u32) -> Result<Value> {
        let params = Params::new().set("q", q).set("limit", limit);
        let suggestions = self
            .section
            .client
            .fetch_with_params(&self.section.url(field.as_str()), &params, None)
            .await?;
        Ok(suggestions)
    }
}
