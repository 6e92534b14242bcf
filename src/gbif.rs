use anyhow::{Context, Result, anyhow};
use log::debug;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::auth::{Authenticator, BasicAuth, Credential, OAuthConfig};
use crate::config::{ClientConfig, join_url};
use crate::http::{CacheStats, Params, RequestClient};
use crate::literature::Literature;
use crate::maps::Maps;
use crate::occurrence::{DownloadStatistics, OccurrenceDownloads, OccurrenceSearch, SingleOccurrence};
use crate::registry::{Collections, Datasets, Institutions};
use crate::species::{NameParser, NameSearch};
use crate::vocabulary::Concepts;

/// Table format of the `export` endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Tsv,
    Csv,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Tsv => f.write_str("TSV"),
            ExportFormat::Csv => f.write_str("CSV"),
        }
    }
}

/// Entry point to the API.
///
/// Owns one [`RequestClient`] and hands out resource modules that share it,
/// together with the credential used for write operations.
#[derive(Clone)]
pub struct Gbif {
    client: RequestClient,
    config: ClientConfig,
    auth: Option<Arc<Authenticator>>,
}

impl Gbif {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = RequestClient::from_config(&config)?;
        debug!("GBIF client for {} (maps {})", config.api_url, config.maps_url);
        Ok(Self {
            client,
            config,
            auth: None,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Uses HTTP Basic credentials for write operations.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(Arc::new(Authenticator::Basic(BasicAuth::new(username, password))));
        self
    }

    /// Obtains an OAuth token now and uses it, refreshed as needed, for write
    /// operations.
    pub async fn with_oauth(mut self, oauth: OAuthConfig) -> Result<Self> {
        let authenticator = Authenticator::oauth(self.client.clone(), oauth).await?;
        self.auth = Some(Arc::new(authenticator));
        Ok(self)
    }

    pub fn client(&self) -> &RequestClient {
        &self.client
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.client.cache_stats()
    }

    pub fn name_parser(&self) -> NameParser {
        NameParser::new(self.section(&self.config.api_url, "parser"))
    }

    pub fn occurrence_search(&self) -> OccurrenceSearch {
        OccurrenceSearch::new(self.section(&self.config.api_url, "occurrence/search"))
    }

    pub fn single_occurrence(&self) -> SingleOccurrence {
        SingleOccurrence::new(self.section(&self.config.api_url, "occurrence"))
    }

    pub fn occurrence_downloads(&self) -> OccurrenceDownloads {
        OccurrenceDownloads::new(self.section(&self.config.api_url, "occurrence/download"))
    }

    pub fn download_statistics(&self) -> DownloadStatistics {
        DownloadStatistics::new(self.section(&self.config.api_url, "occurrence/download/statistics"))
    }

    pub fn maps(&self) -> Maps {
        Maps::new(self.section(&self.config.maps_url, "map/occurrence"))
    }

    pub fn concepts(&self) -> Concepts {
        Concepts::new(self.section(&self.config.api_url, "vocabularies"))
    }

    pub fn name_search(&self) -> NameSearch {
        NameSearch::new(self.section(&self.config.api_url, "species"))
    }

    pub fn datasets(&self) -> Datasets {
        Datasets::new(self.section(&self.config.api_url, "dataset"))
    }

    pub fn institutions(&self) -> Institutions {
        Institutions::new(self.section(&self.config.api_url, "grscicoll/institution"))
    }

    pub fn collections(&self) -> Collections {
        Collections::new(self.section(&self.config.api_url, "grscicoll/collection"))
    }

    pub fn literature(&self) -> Literature {
        Literature::new(self.section(&self.config.api_url, "literature"))
    }

    fn section(&self, base_url: &str, endpoint: &str) -> Section {
        Section {
            client: self.client.clone(),
            base_url: base_url.to_string(),
            endpoint: endpoint.to_string(),
            auth: self.auth.clone(),
        }
    }
}

/// One area of the API: a base URL, an endpoint below it, the shared client
/// and the optional write credential.
#[derive(Clone)]
pub(crate) struct Section {
    pub(crate) client: RequestClient,
    pub(crate) base_url: String,
    pub(crate) endpoint: String,
    auth: Option<Arc<Authenticator>>,
}

impl Section {
    /// Full URL of `resource` below this section's endpoint.
    pub(crate) fn url(&self, resource: &str) -> String {
        let root = join_url(&self.base_url, &self.endpoint);
        if resource.is_empty() {
            root
        } else {
            join_url(&root, resource)
        }
    }

    /// GET `resource` as a TSV or CSV table. The body must be valid UTF-8.
    pub(crate) async fn export(&self, resource: &str, params: &Params) -> Result<String> {
        let table = self
            .client
            .fetch_raw_with_params(&self.url(resource), params, None)
            .await?;
        String::from_utf8(table.to_vec())
            .with_context(|| format!("Export from {} is not valid UTF-8", self.endpoint))
    }

    /// Credential for one write call; errors when none was configured.
    pub(crate) async fn credential(&self) -> Result<Credential> {
        match &self.auth {
            Some(auth) => auth.credential().await,
            None => Err(anyhow!(
                "This operation requires authentication; configure basic or OAuth credentials"
            )),
        }
    }
}

/// Percent-encodes a caller-supplied value for use as one path segment.
pub(crate) fn segment(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_section_url() {
        let section = section("https://api.gbif.org/v1/", "occurrence");
        assert_eq!(section.url(""), "https://api.gbif.org/v1/occurrence");
        assert_eq!(section.url("/42/verbatim"), "https://api.gbif.org/v1/occurrence/42/verbatim");
        assert_eq!(section.url("search"), "https://api.gbif.org/v1/occurrence/search");
    }

    #[test]
    fn test_segment_escapes_path_separators() {
        assert_eq!(segment("0001-230810"), "0001-230810");
        assert_eq!(segment("urn:catalog:a/b?c#d"), "urn%3Acatalog%3Aa%2Fb%3Fc%23d");
        assert_eq!(segment("Life Stage"), "Life%20Stage");
    }

    #[tokio::test]
    async fn test_credential_requires_auth() {
        let err = section("http://localhost", "parser").credential().await.unwrap_err();
        assert!(err.to_string().contains("requires authentication"));

        let credential = basic_section("http://localhost", "parser").credential().await.unwrap();
        assert_eq!(credential.basic().unwrap().username, "user");
    }

    #[test]
    fn test_resource_modules_use_configured_urls() {
        let gbif = Gbif::new(
            ClientConfig::default()
                .with_api_url("http://localhost:1/v1")
                .with_maps_url("http://localhost:2/v2"),
        )
        .unwrap();

        assert_eq!(gbif.maps().section.url(""), "http://localhost:2/v2/map/occurrence");
        assert_eq!(gbif.name_parser().section.url("name"), "http://localhost:1/v1/parser/name");
        assert_eq!(gbif.name_search().section.url("match"), "http://localhost:1/v1/species/match");
        assert_eq!(gbif.datasets().section.url(""), "http://localhost:1/v1/dataset");
        assert_eq!(
            gbif.institutions().section.url(""),
            "http://localhost:1/v1/grscicoll/institution"
        );
        assert_eq!(
            gbif.collections().section.url(""),
            "http://localhost:1/v1/grscicoll/collection"
        );
        assert_eq!(gbif.literature().section.url("search"), "http://localhost:1/v1/literature/search");
        assert!(gbif.cache_stats().is_none());
    }

    #[tokio::test]
    async fn test_with_oauth_fetches_token_up_front() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token": "abc", "expires_in": 3600}"#)
            .expect(1)
            .create_async()
            .await;

        let oauth = OAuthConfig::new("id", "secret", format!("{}/token", server.url())).unwrap();
        let gbif = Gbif::new(ClientConfig::default()).unwrap().with_oauth(oauth).await.unwrap();

        token.assert_async().await;
        let credential = gbif.concepts().section.credential().await.unwrap();
        assert_eq!(credential.headers().unwrap().get("authorization").unwrap(), "Bearer abc");
    }
}
