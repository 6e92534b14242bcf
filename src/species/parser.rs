//! Scientific name parsing.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::gbif::Section;
use crate::http::Params;

/// Splits scientific names into their parts (genus, epithets, authorship...).
pub struct NameParser {
    pub(crate) section: Section,
}

impl NameParser {
    pub(crate) fn new(section: Section) -> Self {
        Self { section }
    }

    /// Parses one or more names with a single GET; each name becomes a
    /// repeated `name` parameter.
    pub async fn parse_scientific_name<S: AsRef<str>>(&self, names: &[S]) -> Result<Value> {
        let params = Params::new().list("name", names.iter().map(|name| name.as_ref()));
        let parsed = self
            .section
            .client
            .fetch_with_params(&self.section.url("name"), &params, None)
            .await?;
        Ok(parsed)
    }

    /// Parses a list of names posted as a JSON array. Requires credentials.
    pub async fn parse_scientific_name_list<S: AsRef<str>>(&self, names: &[S]) -> Result<Value> {
        let body = Value::from(names.iter().map(|name| name.as_ref()).collect::<Vec<_>>());
        let credential = self.section.credential().await?;
        let parsed = self
            .section
            .client
            .submit_json(
                &self.section.url("name"),
                &body,
                credential.basic(),
                credential.headers(),
            )
            .await
            .context("Failed to parse name list")?;
        Ok(parsed)
    }
}
