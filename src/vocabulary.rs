//! Vocabulary concepts.

use anyhow::Result;
use serde_json::Value;
use std::fmt;

use crate::gbif::{Section, segment};
use crate::http::{Params, RequestError};

/// Why the vocabulary service refused a concept mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConceptRejection {
    /// 400
    Malformed,
    /// 422
    InvalidFields,
}

impl ConceptRejection {
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            400 => Some(ConceptRejection::Malformed),
            422 => Some(ConceptRejection::InvalidFields),
            _ => None,
        }
    }
}

impl fmt::Display for ConceptRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConceptRejection::Malformed => f.write_str(
                "Bad request: the JSON is invalid or the request is not well-formed.",
            ),
            ConceptRejection::InvalidFields => f.write_str(
                "The request is syntactically correct but the fields are invalid (required fields not set, duplicated keys, inconsistent keys, etc.)",
            ),
        }
    }
}

impl std::error::Error for ConceptRejection {}

/// Adds the rejection reason to a failed mutation when the status explains it.
fn explain(error: RequestError) -> anyhow::Error {
    let rejection = error.status().and_then(ConceptRejection::from_status);
    let error = anyhow::Error::from(error);
    match rejection {
        Some(rejection) => error.context(rejection),
        None => error,
    }
}

/// Concepts of a named vocabulary. Mutations require credentials.
pub struct Concepts {
    pub(crate) section: Section,
}

impl Concepts {
    pub(crate) fn new(section: Section) -> Self {
        Self { section }
    }

    /// `<vocabulary>/concepts[/<name>][/<action>]` with the names encoded.
    fn concepts_url(&self, vocabulary: &str, name: Option<&str>, action: Option<&str>) -> String {
        let mut path = format!("{}/concepts", segment(vocabulary));
        if let Some(name) = name {
            path = format!("{}/{}", path, segment(name));
        }
        if let Some(action) = action {
            path = format!("{}/{}", path, action);
        }
        self.section.url(&path)
    }

    pub async fn list(&self, vocabulary: &str, tags: Option<&str>) -> Result<Value> {
        let params = Params::new().opt("tags", tags);
        let concepts = self
            .section
            .client
            .fetch_with_params(&self.concepts_url(vocabulary, None, None), &params, None)
            .await?;
        Ok(concepts)
    }

    pub async fn details(
        &self,
        vocabulary: &str,
        name: &str,
        include_parents: Option<bool>,
        include_children: Option<bool>,
    ) -> Result<Value> {
        let params = Params::new()
            .opt("includeParents", include_parents)
            .opt("includeChildren", include_children);
        let concept = self
            .section
            .client
            .fetch_with_params(&self.concepts_url(vocabulary, Some(name), None), &params, None)
            .await?;
        Ok(concept)
    }

    /// Up to 20 concepts matching `q`, ordered by relevance.
    pub async fn suggest(&self, vocabulary: &str, locale: &str, q: Option<&str>) -> Result<Value> {
        let params = Params::new().set("locale", locale).opt("q", q);
        let suggestions = self
            .section
            .client
            .fetch_with_params(&self.concepts_url(vocabulary, None, Some("suggest")), &params, None)
            .await?;
        Ok(suggestions)
    }

    pub async fn create(&self, vocabulary: &str, concept: &Value) -> Result<Value> {
        let credential = self.section.credential().await?;
        self.section
            .client
            .submit_json(
                &self.concepts_url(vocabulary, None, None),
                concept,
                credential.basic(),
                credential.headers(),
            )
            .await
            .map_err(explain)
    }

    pub async fn update(&self, vocabulary: &str, name: &str, concept: &Value) -> Result<Value> {
        let credential = self.section.credential().await?;
        self.section
            .client
            .submit_json_put(
                &self.concepts_url(vocabulary, Some(name), None),
                concept,
                credential.basic(),
                credential.headers(),
            )
            .await
            .map_err(explain)
    }

    /// Deprecates a concept, optionally naming its replacement in `body`.
    pub async fn deprecate(&self, vocabulary: &str, name: &str, body: &Value) -> Result<Value> {
        let credential = self.section.credential().await?;
        self.section
            .client
            .submit_json_put(
                &self.concepts_url(vocabulary, Some(name), Some("deprecate")),
                body,
                credential.basic(),
                credential.headers(),
            )
            .await
            .map_err(explain)
    }

    /// Restores a deprecated concept and returns the response status.
    pub async fn restore(
        &self,
        vocabulary: &str,
        name: &str,
        restore_deprecated_children: Option<bool>,
    ) -> Result<u16> {
        let credential = self.section.credential().await?;
        let params = Params::new().opt("restoreDeprecatedChildren", restore_deprecated_children);
        let status = self
            .section
            .client
            .remove_with_auth(
                &self.concepts_url(vocabulary, Some(name), Some("deprecate")),
                credential.basic(),
                credential.headers(),
                Some(&params),
            )
            .await
            .map_err(explain)?;

        if let Some(rejection) = ConceptRejection::from_status(status) {
            return Err(rejection.into());
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbif::test_support::{BASIC_USER_PASS, basic_section, section};
    use crate::http::status_of;
    use mockito::Matcher;
    use serde_json::json;

    fn concepts(server: &mockito::ServerGuard) -> Concepts {
        Concepts::new(basic_section(&server.url(), "vocabularies"))
    }

    #[test]
    fn test_rejection_from_status() {
        assert_eq!(ConceptRejection::from_status(400), Some(ConceptRejection::Malformed));
        assert_eq!(ConceptRejection::from_status(422), Some(ConceptRejection::InvalidFields));
        assert_eq!(ConceptRejection::from_status(404), None);
    }

    #[tokio::test]
    async fn test_list_and_details() {
        let mut server = mockito::Server::new_async().await;
        let list = server
            .mock("GET", "/vocabularies/LifeStage/concepts")
            .with_status(200)
            .with_body(r#"{"results": [{"name": "Adult"}]}"#)
            .create_async()
            .await;
        let details = server
            .mock("GET", "/vocabularies/LifeStage/concepts/Adult")
            .match_query(Matcher::UrlEncoded("includeParents".into(), "true".into()))
            .with_status(200)
            .with_body(r#"{"name": "Adult", "parents": []}"#)
            .create_async()
            .await;

        let concepts = Concepts::new(section(&server.url(), "vocabularies"));
        let all = concepts.list("LifeStage", None).await.unwrap();
        let adult = concepts.details("LifeStage", "Adult", Some(true), None).await.unwrap();

        list.assert_async().await;
        details.assert_async().await;
        assert_eq!(all["results"][0]["name"], "Adult");
        assert_eq!(adult["parents"], json!([]));
    }

    #[tokio::test]
    async fn test_concept_names_are_encoded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/vocabularies/LifeStage/concepts/Sub%2Fadult%3F")
            .with_status(200)
            .with_body(r#"{"name": "Sub/adult?"}"#)
            .create_async()
            .await;

        let concepts = Concepts::new(section(&server.url(), "vocabularies"));
        let concept = concepts.details("LifeStage", "Sub/adult?", None, None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(concept["name"], "Sub/adult?");
    }

    #[tokio::test]
    async fn test_suggest() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/vocabularies/LifeStage/concepts/suggest")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("locale".into(), "en".into()),
                Matcher::UrlEncoded("q".into(), "adu".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"name": "Adult"}]"#)
            .create_async()
            .await;

        let concepts = Concepts::new(section(&server.url(), "vocabularies"));
        concepts.suggest("LifeStage", "en", Some("adu")).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/vocabularies/LifeStage/concepts")
            .match_header("authorization", BASIC_USER_PASS)
            .match_body(Matcher::Json(json!({ "name": "Larva" })))
            .with_status(201)
            .with_body(r#"{"key": 12, "name": "Larva"}"#)
            .create_async()
            .await;

        let created = concepts(&server)
            .create("LifeStage", &json!({ "name": "Larva" }))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(created["key"], 12);
    }

    #[tokio::test]
    async fn test_update_rejections_are_explained() {
        let mut server = mockito::Server::new_async().await;
        let _malformed = server
            .mock("PUT", "/vocabularies/LifeStage/concepts/Adult")
            .with_status(400)
            .create_async()
            .await;
        let _invalid = server
            .mock("PUT", "/vocabularies/LifeStage/concepts/Larva/deprecate")
            .with_status(422)
            .create_async()
            .await;

        let concepts = concepts(&server);

        let err = concepts
            .update("LifeStage", "Adult", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.downcast_ref::<ConceptRejection>(), Some(&ConceptRejection::Malformed));
        assert_eq!(status_of(&err), Some(400));

        let err = concepts
            .deprecate("LifeStage", "Larva", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConceptRejection>(),
            Some(&ConceptRejection::InvalidFields)
        );
    }

    #[tokio::test]
    async fn test_other_failures_are_not_rejections() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/vocabularies/LifeStage/concepts")
            .with_status(401)
            .create_async()
            .await;

        let err = concepts(&server).create("LifeStage", &json!({})).await.unwrap_err();

        assert!(err.downcast_ref::<ConceptRejection>().is_none());
        assert_eq!(err.to_string(), "Unauthorized: Check your API credentials.");
    }

    #[tokio::test]
    async fn test_restore() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("DELETE", "/vocabularies/LifeStage/concepts/Adult/deprecate")
            .match_query(Matcher::UrlEncoded(
                "restoreDeprecatedChildren".into(),
                "true".into(),
            ))
            .with_status(204)
            .create_async()
            .await;
        let _bad = server
            .mock("DELETE", "/vocabularies/LifeStage/concepts/Larva/deprecate")
            .with_status(422)
            .create_async()
            .await;

        let concepts = concepts(&server);

        let status = concepts.restore("LifeStage", "Adult", Some(true)).await.unwrap();
        ok.assert_async().await;
        assert_eq!(status, 204);

        let err = concepts.restore("LifeStage", "Larva", None).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConceptRejection>(),
            Some(&ConceptRejection::InvalidFields)
        );
    }
}
