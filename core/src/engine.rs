//! Everything needed to index documents and answer queries, behind one
//! owner.

use crate::document::{Document, DocumentStore, StoreNamespaceChecker};
use crate::error::{Error, Result};
use crate::hit::{DocumentId, TermMatchType, TermMetadata, SECTION_ID_MASK_ALL};
use crate::index::{Index, IndexStorageInfo, Options};
use crate::index_processor::IndexProcessor;
use crate::iterator::collect_doc_hit_infos;
use crate::namespace_checker::NamespaceChecker;
use crate::persist::IndexPaths;
use crate::schema::{SchemaConfig, SchemaRegistry, SchemaStore};
use crate::scoring::rank_doc_hit_infos;
use crate::search_spec::{ScoringSpec, SuggestionSpec};
use crate::section_weights::SectionWeights;
use crate::suggestion_processor::SuggestionProcessor;
use crate::tokenizer::{LanguageSegmenter, Normalizer, RegexSegmenter, UnicodeNormalizer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document_id: DocumentId,
    pub namespace: String,
    pub uri: String,
    pub score: f64,
}

pub struct SearchEngine {
    paths: IndexPaths,
    index: Index,
    documents: DocumentStore,
    schema: SchemaRegistry,
    segmenter: RegexSegmenter,
    normalizer: UnicodeNormalizer,
}

impl SearchEngine {
    /// Opens or creates the engine under `options.base_dir`. Index data
    /// for documents the store never recorded is thrown away.
    pub fn open(options: Options, schema_config: &SchemaConfig) -> Result<Self> {
        let paths = IndexPaths::new(&options.base_dir);
        let schema = SchemaRegistry::new(schema_config)?;
        let documents = DocumentStore::open(&paths)?;
        let mut index = Index::create(options)?;
        match documents.last_document_id() {
            Some(last) => index.truncate_to(last)?,
            None => index.reset(),
        }
        info!(
            dir = %paths.index_dir().display(),
            documents = documents.len(),
            "opened search engine"
        );
        Ok(SearchEngine {
            paths,
            index,
            documents,
            schema,
            segmenter: RegexSegmenter,
            normalizer: UnicodeNormalizer::default(),
        })
    }

    /// Stores and indexes `document`, replacing any earlier document with
    /// the same namespace and uri.
    pub fn put(&mut self, document: &Document) -> Result<DocumentId> {
        let (schema_type_id, sections) = self.schema.extract_sections(document)?;
        let (document_id, namespace_id) = self.documents.put(document, schema_type_id)?;
        IndexProcessor::new(&mut self.index, &self.segmenter, &self.normalizer).index_document(
            &sections,
            document_id,
            namespace_id,
        )?;
        debug!(document_id, uri = %document.uri, sections = sections.len(), "indexed document");
        Ok(document_id)
    }

    pub fn delete(&mut self, namespace: &str, uri: &str) -> Result<DocumentId> {
        self.documents.delete(namespace, uri)
    }

    /// Completions restricted to live documents in `namespaces` (all
    /// namespaces when empty).
    pub fn suggest<S: AsRef<str>>(&self, spec: &SuggestionSpec, namespaces: &[S]) -> Result<Vec<TermMetadata>> {
        let checker = StoreNamespaceChecker::new(&self.documents, namespaces);
        let processor = SuggestionProcessor::create(
            Some(&self.index),
            Some(&self.segmenter as &dyn LanguageSegmenter),
            &self.normalizer,
        )?;
        processor.query_suggestions(spec, Some(&checker as &dyn NamespaceChecker))
    }

    /// Documents matching one term, scored by weighted term frequency.
    pub fn search<S: AsRef<str>>(
        &self,
        term: &str,
        term_match_type: TermMatchType,
        num_to_return: usize,
        namespaces: &[S],
        scoring_spec: &ScoringSpec,
    ) -> Result<Vec<SearchResult>> {
        let term = self.normalizer.normalize_term(term.trim());
        if term.is_empty() {
            return Err(Error::InvalidArgument("search term is empty".to_string()));
        }
        let checker = StoreNamespaceChecker::new(&self.documents, namespaces);
        let mut iter = self.index.get_iterator(&term, SECTION_ID_MASK_ALL, term_match_type)?;
        let candidates: Vec<_> = collect_doc_hit_infos(iter.as_mut())?
            .into_iter()
            .filter(|info| checker.belongs_to_target_namespaces(info.document_id()))
            .collect();
        let section_weights = SectionWeights::create(Some(&self.schema as &dyn SchemaStore), scoring_spec)?;
        let ranked = rank_doc_hit_infos(&candidates, num_to_return, &section_weights, |info| {
            self.documents.metadata(info.document_id()).map(|m| m.schema_type_id)
        });
        debug!(term = %term, candidates = candidates.len(), returned = ranked.len(), "search");
        Ok(ranked
            .into_iter()
            .filter_map(|hit| {
                let meta = self.documents.metadata(hit.document_id)?;
                Some(SearchResult {
                    document_id: hit.document_id,
                    namespace: self.documents.namespace_name(meta.namespace_id)?.to_string(),
                    uri: meta.uri.clone(),
                    score: hit.score,
                })
            })
            .collect())
    }

    pub fn storage_info(&self) -> Result<IndexStorageInfo> {
        self.index.get_storage_info()
    }

    pub fn persist_to_disk(&self) -> Result<()> {
        self.documents.persist(&self.paths)?;
        self.index.persist_to_disk()
    }

    pub fn merge(&mut self) -> Result<()> {
        self.index.merge()
    }

    pub fn num_documents(&self) -> usize {
        self.documents.len()
    }

    pub fn index(&self) -> &Index {
        &self.index
    }
}
