use anyhow::Result;
use serde_json::Value;

use crate::gbif::{ExportFormat, Section, segment};
use crate::http::Params;

/// Filters for GRSciColl institutions and collections.
///
/// Count fields accept ranges (`100,*`). Fields marked as specific to one
/// entity are ignored by the other endpoint.
#[derive(Debug, Clone, Default)]
pub struct GrSciCollQuery {
    pub q: Option<String>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub fuzzy_name: Option<String>,
    pub alternative_code: Option<String>,
    pub contact: Option<String>,
    pub machine_tag_namespace: Option<String>,
    pub machine_tag_name: Option<String>,
    pub machine_tag_value: Option<String>,
    pub identifier_type: Option<String>,
    pub identifier: Option<String>,
    pub country: Vec<String>,
    pub gbif_region: Vec<String>,
    pub city: Option<String>,
    pub active: Option<bool>,
    pub master_source_type: Option<String>,
    pub number_specimens: Option<String>,
    pub display_on_nhc_portal: Option<bool>,
    pub replaced_by: Option<String>,
    pub occurrence_count: Option<String>,
    pub type_specimen_count: Option<String>,
    pub institution_key: Vec<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    /// Institutions only.
    pub institution_type: Vec<String>,
    /// Institutions only.
    pub institutional_governance: Vec<String>,
    /// Institutions only.
    pub discipline: Vec<String>,
    /// Collections only.
    pub content_type: Vec<String>,
    /// Collections only.
    pub preservation_type: Vec<String>,
    /// Collections only.
    pub accession_status: Option<String>,
    /// Collections only.
    pub personal_collection: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl GrSciCollQuery {
    pub fn to_params(&self) -> Params {
        Params::new()
            .list("type", &self.institution_type)
            .list("institutionalGovernance", &self.institutional_governance)
            .list("discipline", &self.discipline)
            .list("contentType", &self.content_type)
            .list("preservationType", &self.preservation_type)
            .opt("accessionStatus", self.accession_status.as_ref())
            .opt("personalCollection", self.personal_collection)
            .opt("code", self.code.as_ref())
            .opt("name", self.name.as_ref())
            .opt("alternativeCode", self.alternative_code.as_ref())
            .opt("contact", self.contact.as_ref())
            .opt("machineTagNamespace", self.machine_tag_namespace.as_ref())
            .opt("machineTagName", self.machine_tag_name.as_ref())
            .opt("machineTagValue", self.machine_tag_value.as_ref())
            .opt("identifierType", self.identifier_type.as_ref())
            .opt("identifier", self.identifier.as_ref())
            .list("country", &self.country)
            .list("gbifRegion", &self.gbif_region)
            .opt("city", self.city.as_ref())
            .opt("fuzzyName", self.fuzzy_name.as_ref())
            .opt("active", self.active)
            .opt("masterSourceType", self.master_source_type.as_ref())
            .opt("numberSpecimens", self.number_specimens.as_ref())
            .opt("displayOnNHCPortal", self.display_on_nhc_portal)
            .opt("replacedBy", self.replaced_by.as_ref())
            .opt("occurrenceCount", self.occurrence_count.as_ref())
            .opt("typeSpecimenCount", self.type_specimen_count.as_ref())
            .list("institutionKey", &self.institution_key)
            .opt("sortBy", self.sort_by.as_ref())
            .opt("sortOrder", self.sort_order.as_ref())
            .opt("q", self.q.as_ref())
            .opt("limit", self.limit)
            .opt("offset", self.offset)
    }
}

async fn list(section: &Section, query: &GrSciCollQuery) -> Result<Value> {
    let entities = section
        .client
        .fetch_with_params(&section.url(""), &query.to_params(), None)
        .await?;
    Ok(entities)
}

async fn export(section: &Section, query: &GrSciCollQuery, format: ExportFormat) -> Result<String> {
    let params = Params::new()
        .set("format", format.to_string())
        .merge(query.to_params());
    section.export("export", &params).await
}

async fn get(section: &Section, key: &str) -> Result<Value> {
    let entity = section
        .client
        .fetch_or_fallback_to_raw(&section.base_url, &section.endpoint, &format!("/{}", segment(key)))
        .await?;
    Ok(entity)
}

/// GRSciColl institutions.
pub struct Institutions {
    pub(crate) section: Section,
}

impl Institutions {
    pub(crate) fn new(section: Section) -> Self {
        Self { section }
    }

    pub async fn list(&self, query: &GrSciCollQuery) -> Result<Value> {
        list(&self.section, query).await
    }

    pub async fn export(&self, query: &GrSciCollQuery, format: ExportFormat) -> Result<String> {
        export(&self.section, query, format).await
    }

    pub async fn get(&self, key: &str) -> Result<Value> {
        get(&self.section, key).await
    }
}

/// GRSciColl collections.
pub struct Collections {
    pub(crate) section: Section,
}

impl Collections {
    pub(crate) fn new(section: Section) -> Self {
        Self { section }
    }

    pub async fn list(&self, query: &GrSciCollQuery) -> Result<Value> {
        list(&self.section, query).await
    }

    pub async fn export(&self, query: &GrSciCollQuery, format: ExportFormat) -> Result<String> {
        export(&self.section, query, format).await
    }

    pub async fn get(&self, key: &str) -> Result<Value> {
        get(&self.section, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbif::test_support::section;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_list_institutions() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/grscicoll/institution")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "HERBARIUM".into()),
                Matcher::UrlEncoded("country".into(), "DK".into()),
                Matcher::UrlEncoded("active".into(), "true".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"count": 1, "results": [{"code": "C"}]}"#)
            .create_async()
            .await;

        let institutions = Institutions::new(section(&server.url(), "grscicoll/institution"));
        let query = GrSciCollQuery {
            institution_type: vec!["HERBARIUM".into()],
            country: vec!["DK".into()],
            active: Some(true),
            ..Default::default()
        };
        let found = institutions.list(&query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(found["results"][0]["code"], "C");
    }

    #[tokio::test]
    async fn test_export_collections() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/grscicoll/collection/export")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("format".into(), "TSV".into()),
                Matcher::UrlEncoded("contentType".into(), "BIOLOGICAL_PRESERVED_ORGANISMS".into()),
            ]))
            .with_status(200)
            .with_body("code\tname\nNHMD\tNatural History Museum of Denmark\n")
            .create_async()
            .await;

        let collections = Collections::new(section(&server.url(), "grscicoll/collection"));
        let query = GrSciCollQuery {
            content_type: vec!["BIOLOGICAL_PRESERVED_ORGANISMS".into()],
            ..Default::default()
        };
        let table = collections.export(&query, ExportFormat::default()).await.unwrap();

        mock.assert_async().await;
        assert!(table.contains("NHMD\t"));
    }

    #[tokio::test]
    async fn test_get_collection_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/grscicoll/collection/missing")
            .with_status(404)
            .with_body(r#"{"message": "No collection"}"#)
            .create_async()
            .await;

        let collections = Collections::new(section(&server.url(), "grscicoll/collection"));
        let err = collections.get("missing").await.unwrap_err();

        assert_eq!(crate::http::status_of(&err), Some(404));
    }
}
