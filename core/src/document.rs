//! Minimal document store: id assignment, namespace interning and the
//! per-document facts the query side needs.

use crate::error::{Error, Result};
use crate::hit::{DocumentId, NamespaceId, SchemaTypeId, MAX_DOCUMENT_ID};
use crate::namespace_checker::NamespaceChecker;
use crate::persist::{load_bincode_if_exists, save_bincode, IndexPaths};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub namespace: String,
    pub uri: String,
    pub schema_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub namespace_id: NamespaceId,
    pub uri: String,
    pub schema_type_id: SchemaTypeId,
    pub deleted: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DocumentStore {
    documents: Vec<DocumentMetadata>,
    namespaces: Vec<String>,
    namespace_ids: HashMap<String, NamespaceId>,
    live_uris: HashMap<(NamespaceId, String), DocumentId>,
}

impl DocumentStore {
    pub fn open(paths: &IndexPaths) -> Result<Self> {
        Ok(load_bincode_if_exists(&paths.documents())?.unwrap_or_default())
    }

    pub fn persist(&self, paths: &IndexPaths) -> Result<()> {
        save_bincode(&paths.documents(), self)
    }

    /// Records `document` under the next document id. A document with the
    /// same namespace and uri is replaced: the older id is marked deleted.
    pub fn put(&mut self, document: &Document, schema_type_id: SchemaTypeId) -> Result<(DocumentId, NamespaceId)> {
        let document_id = self.documents.len() as DocumentId;
        if document_id > MAX_DOCUMENT_ID {
            return Err(Error::ResourceExhausted(format!(
                "document store is full ({} documents)",
                self.documents.len()
            )));
        }
        let namespace_id = self.intern_namespace(&document.namespace)?;
        let key = (namespace_id, document.uri.clone());
        if let Some(old_id) = self.live_uris.insert(key, document_id) {
            if let Some(old) = self.documents.get_mut(old_id as usize) {
                old.deleted = true;
            }
        }
        self.documents.push(DocumentMetadata {
            namespace_id,
            uri: document.uri.clone(),
            schema_type_id,
            deleted: false,
        });
        Ok((document_id, namespace_id))
    }

    pub fn delete(&mut self, namespace: &str, uri: &str) -> Result<DocumentId> {
        let namespace_id = self
            .namespace_id(namespace)
            .ok_or_else(|| Error::NotFound(format!("unknown namespace '{namespace}'")))?;
        let document_id = self
            .live_uris
            .remove(&(namespace_id, uri.to_string()))
            .ok_or_else(|| Error::NotFound(format!("no document '{uri}' in '{namespace}'")))?;
        if let Some(meta) = self.documents.get_mut(document_id as usize) {
            meta.deleted = true;
        }
        Ok(document_id)
    }

    fn intern_namespace(&mut self, namespace: &str) -> Result<NamespaceId> {
        if let Some(&id) = self.namespace_ids.get(namespace) {
            return Ok(id);
        }
        let id = NamespaceId::try_from(self.namespaces.len())
            .map_err(|_| Error::ResourceExhausted("too many namespaces".to_string()))?;
        self.namespaces.push(namespace.to_string());
        self.namespace_ids.insert(namespace.to_string(), id);
        Ok(id)
    }

    pub fn namespace_id(&self, namespace: &str) -> Option<NamespaceId> {
        self.namespace_ids.get(namespace).copied()
    }

    pub fn namespace_name(&self, namespace_id: NamespaceId) -> Option<&str> {
        self.namespaces.get(namespace_id as usize).map(String::as_str)
    }

    pub fn metadata(&self, document_id: DocumentId) -> Option<&DocumentMetadata> {
        self.documents.get(document_id as usize)
    }

    pub fn is_alive(&self, document_id: DocumentId) -> bool {
        self.metadata(document_id).is_some_and(|m| !m.deleted)
    }

    pub fn last_document_id(&self) -> Option<DocumentId> {
        self.documents.len().checked_sub(1).map(|id| id as DocumentId)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Namespace checker backed by a `DocumentStore`. Deleted documents never
/// belong to any namespace. An empty target list admits every namespace.
pub struct StoreNamespaceChecker<'a> {
    store: &'a DocumentStore,
    target_namespace_ids: Option<HashSet<NamespaceId>>,
}

impl<'a> StoreNamespaceChecker<'a> {
    pub fn new<S: AsRef<str>>(store: &'a DocumentStore, target_namespaces: &[S]) -> Self {
        let target_namespace_ids = if target_namespaces.is_empty() {
            None
        } else {
            Some(
                target_namespaces
                    .iter()
                    .filter_map(|name| store.namespace_id(name.as_ref()))
                    .collect(),
            )
        };
        StoreNamespaceChecker {
            store,
            target_namespace_ids,
        }
    }
}

impl NamespaceChecker for StoreNamespaceChecker<'_> {
    fn belongs_to_target_namespaces(&self, document_id: DocumentId) -> bool {
        match self.store.metadata(document_id) {
            Some(meta) if !meta.deleted => self
                .target_namespace_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&meta.namespace_id)),
            _ => false,
        }
    }
}
