//! Catalog collaborator boundary.
//!
//! The catalog owns titles and the stored files behind them. The server only
//! needs to look one title up; [`JsonCatalog`] provides that from a JSON
//! file for single-host deployments.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use reelgate_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// One stored copy of a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEntry {
    /// Stream token of the message holding the file.
    pub id: String,
    pub name: String,
    pub quality: String,
    /// Size in bytes.
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub media_type: String,
    pub id: i64,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub telegram: Vec<StreamEntry>,
}

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Look up one title; `None` when it does not exist.
    async fn get_document(
        &self,
        media_type: &str,
        id: i64,
        index: u32,
    ) -> Result<Option<CatalogDocument>>;
}

type DocumentKey = (String, i64, u32);

/// Read-only catalog loaded once from a JSON array of documents.
#[derive(Debug, Default)]
pub struct JsonCatalog {
    documents: HashMap<DocumentKey, CatalogDocument>,
}

impl JsonCatalog {
    pub fn from_documents(documents: impl IntoIterator<Item = CatalogDocument>) -> Self {
        let documents = documents
            .into_iter()
            .map(|d| ((d.media_type.clone(), d.id, d.index), d))
            .collect();
        Self { documents }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let documents: Vec<CatalogDocument> = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("invalid catalog: {e}")))?;
        Ok(Self::from_documents(documents))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            documents = catalog.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl Catalog for JsonCatalog {
    async fn get_document(
        &self,
        media_type: &str,
        id: i64,
        index: u32,
    ) -> Result<Option<CatalogDocument>> {
        Ok(self
            .documents
            .get(&(media_type.to_string(), id, index))
            .cloned())
    }
}
