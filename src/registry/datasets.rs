use anyhow::{Context, Result};
use serde_json::Value;

use crate::gbif::{ExportFormat, Section, segment};
use crate::http::Params;

/// Filters for `dataset/search`, its export and its suggest endpoint.
#[derive(Debug, Clone, Default)]
pub struct DatasetQuery {
    pub q: Option<String>,
    /// `OCCURRENCE`, `CHECKLIST`, `METADATA` or `SAMPLING_EVENT`.
    pub dataset_type: Vec<String>,
    pub subtype: Vec<String>,
    pub publishing_org: Vec<String>,
    pub hosting_org: Vec<String>,
    pub keyword: Vec<String>,
    pub decade: Vec<u32>,
    pub publishing_country: Vec<String>,
    pub hosting_country: Vec<String>,
    pub license: Vec<String>,
    pub project_id: Vec<String>,
    pub taxon_key: Vec<i64>,
    /// Count or `from,to` range.
    pub record_count: Option<String>,
    pub modified_date: Option<String>,
    pub doi: Vec<String>,
    pub network_key: Vec<String>,
    pub endorsing_node_key: Vec<String>,
    pub installation_key: Vec<String>,
    pub endpoint_type: Vec<String>,
    /// Search only.
    pub highlight: Option<bool>,
    pub facet: Vec<String>,
    pub facet_mincount: Option<u32>,
    pub facet_multiselect: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl DatasetQuery {
    fn filters(&self) -> Params {
        Params::new()
            .list("type", &self.dataset_type)
            .list("subtype", &self.subtype)
            .list("publishingOrg", &self.publishing_org)
            .list("hostingOrg", &self.hosting_org)
            .list("keyword", &self.keyword)
            .list("decade", self.decade.iter().copied())
            .list("publishingCountry", &self.publishing_country)
            .list("hostingCountry", &self.hosting_country)
            .list("license", &self.license)
            .list("projectId", &self.project_id)
            .list("taxonKey", self.taxon_key.iter().copied())
            .opt("recordCount", self.record_count.as_ref())
            .opt("modifiedDate", self.modified_date.as_ref())
            .list("doi", &self.doi)
            .list("networkKey", &self.network_key)
            .list("endorsingNodeKey", &self.endorsing_node_key)
            .list("installationKey", &self.installation_key)
            .list("endpointType", &self.endpoint_type)
            .opt("q", self.q.as_ref())
    }

    pub fn to_params(&self) -> Params {
        self.filters()
            .opt("hl", self.highlight)
            .list("facet", &self.facet)
            .opt("facetMincount", self.facet_mincount)
            .opt("facetMultiselect", self.facet_multiselect)
            .opt("limit", self.limit)
            .opt("offset", self.offset)
    }
}

/// Filters for the plain dataset listing.
#[derive(Debug, Clone, Default)]
pub struct DatasetListQuery {
    pub q: Option<String>,
    pub country: Option<String>,
    pub dataset_type: Option<String>,
    pub identifier_type: Option<String>,
    pub identifier: Option<String>,
    pub machine_tag_namespace: Option<String>,
    pub machine_tag_name: Option<String>,
    pub machine_tag_value: Option<String>,
    pub modified: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl DatasetListQuery {
    fn to_params(&self) -> Params {
        Params::new()
            .opt("country", self.country.as_ref())
            .opt("type", self.dataset_type.as_ref())
            .opt("identifierType", self.identifier_type.as_ref())
            .opt("identifier", self.identifier.as_ref())
            .opt("machineTagNamespace", self.machine_tag_namespace.as_ref())
            .opt("machineTagName", self.machine_tag_name.as_ref())
            .opt("machineTagValue", self.machine_tag_value.as_ref())
            .opt("modified", self.modified.as_ref())
            .opt("q", self.q.as_ref())
            .opt("limit", self.limit)
            .opt("offset", self.offset)
    }
}

/// Registered datasets.
pub struct Datasets {
    pub(crate) section: Section,
}

impl Datasets {
    pub(crate) fn new(section: Section) -> Self {
        Self { section }
    }

    pub async fn list(&self, query: &DatasetListQuery) -> Result<Value> {
        let datasets = self
            .section
            .client
            .fetch_with_params(&self.section.url(""), &query.to_params(), None)
            .await?;
        Ok(datasets)
    }

    pub async fn search(&self, query: &DatasetQuery) -> Result<Value> {
        let datasets = self
            .section
            .client
            .fetch_with_params(&self.section.url("search"), &query.to_params(), None)
            .await?;
        Ok(datasets)
    }

    /// Up to 20 datasets whose title starts with `query.q`.
    pub async fn suggest(&self, query: &DatasetQuery) -> Result<Value> {
        let datasets = self
            .section
            .client
            .fetch_with_params(&self.section.url("suggest"), &query.filters(), None)
            .await?;
        Ok(datasets)
    }

    /// The search results as a TSV or CSV table.
    pub async fn export(&self, query: &DatasetQuery, format: ExportFormat) -> Result<String> {
        let params = Params::new()
            .set("format", format.to_string())
            .merge(query.filters());
        self.section.export("search/export", &params).await
    }

    /// Datasets registered under a DOI such as `10.15468/igasai`.
    pub async fn by_doi(
        &self,
        prefix: &str,
        suffix: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Value> {
        let params = Params::new().opt("limit", limit).opt("offset", offset);
        let url = self
            .section
            .url(&format!("doi/{}/{}", segment(prefix), segment(suffix)));
        let datasets = self
            .section
            .client
            .fetch_with_params(&url, &params, None)
            .await?;
        Ok(datasets)
    }

    /// One dataset; a non-JSON reply comes back as `{"Error": <text>}`.
    pub async fn get(&self, key: &str) -> Result<Value> {
        let dataset = self
            .section
            .client
            .fetch_or_fallback_to_raw(
                &self.section.base_url,
                &self.section.endpoint,
                &format!("/{}", segment(key)),
            )
            .await?;
        Ok(dataset)
    }

    /// Registers a new dataset and returns its key. Requires credentials.
    pub async fn create(&self, dataset: &Value) -> Result<Value> {
        let credential = self.section.credential().await?;
        let key = self
            .section
            .client
            .submit_json(
                &self.section.url(""),
                dataset,
                credential.basic(),
                credential.headers(),
            )
            .await
            .context("Failed to create dataset")?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbif::test_support::{BASIC_USER_PASS, basic_section, section};
    use crate::http::status_of;
    use mockito::Matcher;
    use serde_json::json;

    fn datasets(server: &mockito::ServerGuard) -> Datasets {
        Datasets::new(section(&server.url(), "dataset"))
    }

    #[tokio::test]
    async fn test_search_repeats_list_filters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/dataset/search?type=OCCURRENCE&type=CHECKLIST&q=birds&limit=2")
            .with_status(200)
            .with_body(r#"{"count": 2, "results": []}"#)
            .create_async()
            .await;

        let query = DatasetQuery {
            q: Some("birds".into()),
            dataset_type: vec!["OCCURRENCE".into(), "CHECKLIST".into()],
            limit: Some(2),
            ..Default::default()
        };
        let found = datasets(&server).search(&query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(found["count"], 2);
    }

    #[tokio::test]
    async fn test_list_and_suggest() {
        let mut server = mockito::Server::new_async().await;
        let list = server
            .mock("GET", "/dataset")
            .match_query(Matcher::UrlEncoded("country".into(), "DK".into()))
            .with_status(200)
            .with_body(r#"{"results": []}"#)
            .create_async()
            .await;
        let suggest = server
            .mock("GET", "/dataset/suggest")
            .match_query(Matcher::Exact("q=Danish".into()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let datasets = datasets(&server);
        datasets
            .list(&DatasetListQuery {
                country: Some("DK".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        datasets
            .suggest(&DatasetQuery {
                q: Some("Danish".into()),
                limit: Some(10),
                ..Default::default()
            })
            .await
            .unwrap();

        list.assert_async().await;
        suggest.assert_async().await;
    }

    #[tokio::test]
    async fn test_export_as_csv() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/dataset/search/export")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("format".into(), "CSV".into()),
                Matcher::UrlEncoded("publishingCountry".into(), "DK".into()),
            ]))
            .with_status(200)
            .with_body("datasetKey,title\nabc,Birds\n")
            .create_async()
            .await;

        let query = DatasetQuery {
            publishing_country: vec!["DK".into()],
            ..Default::default()
        };
        let table = datasets(&server).export(&query, ExportFormat::Csv).await.unwrap();

        mock.assert_async().await;
        assert!(table.starts_with("datasetKey,title"));
    }

    #[tokio::test]
    async fn test_by_doi_and_get() {
        let mut server = mockito::Server::new_async().await;
        let by_doi = server
            .mock("GET", "/dataset/doi/10.15468/igasai")
            .with_status(200)
            .with_body(r#"{"results": [{"key": "abc"}]}"#)
            .create_async()
            .await;
        let get = server
            .mock("GET", "/dataset/abc")
            .with_status(200)
            .with_body("Dataset not found")
            .expect(2)
            .create_async()
            .await;

        let datasets = datasets(&server);
        let found = datasets.by_doi("10.15468", "igasai", None, None).await.unwrap();
        let dataset = datasets.get("abc").await.unwrap();

        by_doi.assert_async().await;
        get.assert_async().await;
        assert_eq!(found["results"][0]["key"], "abc");
        assert_eq!(dataset, json!({ "Error": "Dataset not found" }));
    }

    #[tokio::test]
    async fn test_create_requires_credentials() {
        let server = mockito::Server::new_async().await;
        let err = datasets(&server).create(&json!({})).await.unwrap_err();
        assert!(err.to_string().contains("requires authentication"));
    }

    #[tokio::test]
    async fn test_create() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/dataset")
            .match_header("authorization", BASIC_USER_PASS)
            .match_body(Matcher::Json(json!({ "title": "Birds" })))
            .with_status(403)
            .create_async()
            .await;

        let datasets = Datasets::new(basic_section(&server.url(), "dataset"));
        let err = datasets.create(&json!({ "title": "Birds" })).await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(status_of(&err), Some(403));
        assert!(format!("{:#}", err).contains("Forbidden"));
    }
}
