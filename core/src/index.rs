//! The term index: a lite index taking writes, a main index holding
//! merged data, and a codec giving their terms one id space.

use crate::error::{Error, Result};
use crate::hit::{
    DocumentId, Hit, NamespaceId, SectionId, SectionIdMask, TermFrequency, TermMatchType, TermMetadata,
    MAX_DOCUMENT_ID, MAX_SECTION_ID, MAX_TERM_FREQUENCY,
};
use crate::iterator::{
    DocHitInfoIterator, OrIterator, TermLiteExactIterator, TermLitePrefixIterator, TermMainExactIterator,
    TermMainPrefixIterator,
};
use crate::lite_index::{LiteIndex, LiteIndexOptions, TermIdHitPair, DEFAULT_LITE_LEXICON_MAX_VALUE_INDEX};
use crate::main_index::{MainIndex, DEFAULT_MAIN_LEXICON_MAX_VALUE_INDEX};
use crate::namespace_checker::NamespaceChecker;
use crate::persist::{directory_size, load_meta, save_meta, IndexPaths, MetaFile, FORMAT_VERSION};
use crate::ranker::merge_and_rank_term_metadatas;
use crate::term_id_codec::{TermIdCodec, TviType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Roughly one MiB of buffered hits.
pub const DEFAULT_INDEX_MERGE_SIZE: u32 = (1 << 20) / std::mem::size_of::<TermIdHitPair>() as u32;

fn default_index_merge_size() -> u32 {
    DEFAULT_INDEX_MERGE_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    pub base_dir: PathBuf,
    /// Number of lite hits after which the index wants a merge.
    #[serde(default = "default_index_merge_size")]
    pub index_merge_size: u32,
}

impl Options {
    pub fn new(base_dir: impl Into<PathBuf>, index_merge_size: u32) -> Self {
        Options {
            base_dir: base_dir.into(),
            index_merge_size,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStorageInfo {
    pub index_size: u64,
    pub lite_lexicon_size: u64,
    pub num_lite_terms: u64,
    pub lite_hit_buffer_size: u64,
    pub num_lite_hits: u64,
    pub main_lexicon_size: u64,
    pub num_main_terms: u64,
    pub main_postings_size: u64,
}

pub struct Index {
    options: Options,
    paths: IndexPaths,
    term_id_codec: TermIdCodec,
    lite_index: LiteIndex,
    main_index: MainIndex,
}

impl Index {
    pub fn create(options: Options) -> Result<Self> {
        if options.index_merge_size == 0 || options.index_merge_size > LiteIndex::max_hit_buffer_size() {
            return Err(Error::InvalidArgument(format!(
                "index_merge_size {} is not in (0, {}]",
                options.index_merge_size,
                LiteIndex::max_hit_buffer_size()
            )));
        }
        let paths = IndexPaths::new(&options.base_dir);
        if let Some(meta) = load_meta(&paths)? {
            if meta.version != FORMAT_VERSION {
                return Err(Error::FailedPrecondition(format!(
                    "index at {} has format version {}, expected {FORMAT_VERSION}",
                    paths.index_dir().display(),
                    meta.version
                )));
            }
        }
        let lite_options = LiteIndexOptions {
            hit_buffer_want_merge: options.index_merge_size,
            lexicon_max_value_index: DEFAULT_LITE_LEXICON_MAX_VALUE_INDEX,
        };
        let lite_index = LiteIndex::open(&lite_options, &paths)?;
        let main_index = MainIndex::open(DEFAULT_MAIN_LEXICON_MAX_VALUE_INDEX, &paths)?;
        let term_id_codec = TermIdCodec::create(
            main_index.lexicon().max_value_index(),
            lite_index.lexicon().max_value_index(),
        )?;
        Ok(Index {
            options,
            paths,
            term_id_codec,
            lite_index,
            main_index,
        })
    }

    /// Throws away both structures.
    pub fn reset(&mut self) {
        debug!("resetting lite and main index");
        self.lite_index.reset();
        self.main_index.reset();
    }

    /// Drops every structure that holds hits for documents newer than
    /// `document_id`. Structures are reset whole, never partially.
    pub fn truncate_to(&mut self, document_id: DocumentId) -> Result<()> {
        if let Some(last) = self.lite_index.last_added_document_id() {
            if last > document_id {
                debug!(document_id, last, "truncating: throwing out lite index");
                self.lite_index.reset();
            }
        }
        if let Some(last) = self.main_index.last_added_document_id() {
            if last > document_id {
                debug!(document_id, last, "truncating: throwing out main index");
                self.main_index.reset();
            }
        }
        Ok(())
    }

    pub fn get_iterator(
        &self,
        term: &str,
        section_id_mask: SectionIdMask,
        term_match_type: TermMatchType,
    ) -> Result<Box<dyn DocHitInfoIterator + '_>> {
        let (lite, main): (Box<dyn DocHitInfoIterator + '_>, Box<dyn DocHitInfoIterator + '_>) = match term_match_type {
            TermMatchType::ExactOnly => (
                Box::new(TermLiteExactIterator::new(&self.term_id_codec, &self.lite_index, term, section_id_mask)),
                Box::new(TermMainExactIterator::new(&self.main_index, term, section_id_mask)),
            ),
            TermMatchType::Prefix => (
                Box::new(TermLitePrefixIterator::new(&self.term_id_codec, &self.lite_index, term, section_id_mask)),
                Box::new(TermMainPrefixIterator::new(&self.main_index, term, section_id_mask)),
            ),
            other => {
                return Err(Error::InvalidArgument(format!("invalid term match type: {other}")));
            }
        };
        Ok(Box::new(OrIterator::new(lite, main)))
    }

    /// Completions of `prefix` from both structures, most frequent first.
    pub fn find_terms_by_prefix(
        &self,
        prefix: &str,
        num_to_return: i32,
        term_match_type: TermMatchType,
        namespace_checker: Option<&dyn NamespaceChecker>,
    ) -> Result<Vec<TermMetadata>> {
        if num_to_return <= 0 {
            return Ok(Vec::new());
        }
        if term_match_type == TermMatchType::Unknown {
            return Err(Error::InvalidArgument(format!("invalid term match type: {term_match_type}")));
        }
        let lite_terms = self.find_lite_terms_by_prefix(prefix, namespace_checker)?;
        let main_terms = self.main_index.find_terms_by_prefix(prefix, namespace_checker)?;
        Ok(merge_and_rank_term_metadatas(lite_terms, main_terms, num_to_return as usize))
    }

    /// Lite terms starting with `prefix` that have at least one hit left
    /// after namespace filtering, sorted by content.
    pub fn find_lite_terms_by_prefix(
        &self,
        prefix: &str,
        namespace_checker: Option<&dyn NamespaceChecker>,
    ) -> Result<Vec<TermMetadata>> {
        let mut terms = Vec::new();
        for (term, tvi) in self.lite_index.lexicon().prefix_iter(prefix) {
            let term_id = self.term_id_codec.encode_tvi(tvi, TviType::Lite)?;
            let hit_count = self.lite_index.count_hits(term_id, namespace_checker);
            if hit_count > 0 {
                terms.push(TermMetadata::new(term, hit_count));
            }
        }
        Ok(terms)
    }

    /// Starts buffering terms for one section of one document.
    pub fn edit(
        &mut self,
        document_id: DocumentId,
        section_id: SectionId,
        term_match_type: TermMatchType,
        namespace_id: NamespaceId,
    ) -> Result<Editor<'_>> {
        if document_id > MAX_DOCUMENT_ID {
            return Err(Error::InvalidArgument(format!("document id {document_id} is out of range")));
        }
        if section_id > MAX_SECTION_ID {
            return Err(Error::InvalidArgument(format!("section id {section_id} is out of range")));
        }
        if term_match_type == TermMatchType::Unknown {
            return Err(Error::InvalidArgument(format!("invalid term match type: {term_match_type}")));
        }
        Ok(Editor {
            lite_index: &mut self.lite_index,
            term_id_codec: &self.term_id_codec,
            document_id,
            section_id,
            term_match_type,
            namespace_id,
            seen_tokens: HashMap::new(),
        })
    }

    pub fn last_added_document_id(&self) -> Option<DocumentId> {
        match (self.lite_index.last_added_document_id(), self.main_index.last_added_document_id()) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn wants_merge(&self) -> bool {
        self.lite_index.wants_merge()
    }

    /// Moves all lite terms and hits into the main index, then empties
    /// the lite index. Lite terms without hits are dropped.
    pub fn merge(&mut self) -> Result<()> {
        let num_hits = self.lite_index.size();
        for (term, lite_tvi) in self.lite_index.lexicon().iter() {
            let term_id = self.term_id_codec.encode_tvi(lite_tvi, TviType::Lite)?;
            let hits: Vec<Hit> = self.lite_index.hits_for_term(term_id).to_vec();
            if hits.is_empty() {
                continue;
            }
            let properties = self.lite_index.term_properties(lite_tvi)?;
            self.main_index.add_term_hits(term, properties, hits)?;
        }
        self.main_index
            .set_last_added_document_id(self.lite_index.last_added_document_id());
        self.lite_index.reset();
        info!(
            num_hits,
            num_main_terms = self.main_index.lexicon().len(),
            "merged lite index into main index"
        );
        Ok(())
    }

    pub fn persist_to_disk(&self) -> Result<()> {
        save_meta(
            &self.paths,
            &MetaFile {
                version: FORMAT_VERSION,
                index_merge_size: self.options.index_merge_size,
            },
        )?;
        self.lite_index.persist(&self.paths)?;
        self.main_index.persist(&self.paths)?;
        info!(dir = %self.paths.index_dir().display(), "persisted index");
        Ok(())
    }

    pub fn get_storage_info(&self) -> Result<IndexStorageInfo> {
        Ok(IndexStorageInfo {
            index_size: directory_size(&self.paths.index_dir()),
            lite_lexicon_size: self.lite_index.lexicon_size()?,
            num_lite_terms: self.lite_index.lexicon().len() as u64,
            lite_hit_buffer_size: self.lite_index.hit_buffer_size(),
            num_lite_hits: self.lite_index.size() as u64,
            main_lexicon_size: self.main_index.lexicon_size()?,
            num_main_terms: self.main_index.lexicon().len() as u64,
            main_postings_size: self.main_index.postings_size()?,
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn term_id_codec(&self) -> &TermIdCodec {
        &self.term_id_codec
    }

    pub fn lite_index(&self) -> &LiteIndex {
        &self.lite_index
    }

    pub fn main_index(&self) -> &MainIndex {
        &self.main_index
    }
}

/// Buffers the terms of one document section and flushes them as hits.
///
/// Each distinct term yields exactly one hit whose frequency counts its
/// occurrences, saturating at `MAX_TERM_FREQUENCY`. Dropping an editor
/// without flushing discards the buffered terms.
pub struct Editor<'a> {
    lite_index: &'a mut LiteIndex,
    term_id_codec: &'a TermIdCodec,
    document_id: DocumentId,
    section_id: SectionId,
    term_match_type: TermMatchType,
    namespace_id: NamespaceId,
    seen_tokens: HashMap<u32, TermFrequency>,
}

impl Editor<'_> {
    pub fn buffer_term(&mut self, term: &str) -> Result<()> {
        let is_prefix = self.term_match_type == TermMatchType::Prefix;
        let tvi = match self.lite_index.get_term_id(term) {
            Ok(tvi) => {
                if let Some(frequency) = self.seen_tokens.get_mut(&tvi) {
                    if *frequency != MAX_TERM_FREQUENCY {
                        *frequency += 1;
                    }
                    return Ok(());
                }
                self.lite_index
                    .update_term_properties(tvi, is_prefix, self.namespace_id)?;
                tvi
            }
            Err(e) if e.is_not_found() => {
                self.lite_index
                    .insert_term(term, self.term_match_type, self.namespace_id)?
            }
            Err(e) => return Err(e),
        };
        self.seen_tokens.insert(tvi, 1);
        Ok(())
    }

    /// Adds one hit per buffered term. The first failing hit stops the
    /// flush; hits added before it stay in the index.
    pub fn index_all_buffered_terms(self) -> Result<()> {
        let Editor {
            lite_index,
            term_id_codec,
            document_id,
            section_id,
            term_match_type,
            seen_tokens,
            ..
        } = self;
        let is_prefix = term_match_type == TermMatchType::Prefix;
        for (tvi, frequency) in seen_tokens {
            let hit = Hit::new(section_id, document_id, frequency, is_prefix);
            let term_id = term_id_codec.encode_tvi(tvi, TviType::Lite)?;
            lite_index.add_hit(term_id, hit)?;
        }
        Ok(())
    }

    pub fn num_buffered_terms(&self) -> usize {
        self.seen_tokens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::SECTION_ID_MASK_ALL;
    use crate::iterator::collect_doc_hit_infos;
    use tempfile::tempdir;

    fn index_with(dir: &std::path::Path, merge_size: u32) -> Index {
        Index::create(Options::new(dir, merge_size)).unwrap()
    }

    fn add(index: &mut Index, document_id: DocumentId, section_id: SectionId, terms: &[&str]) {
        let mut editor = index.edit(document_id, section_id, TermMatchType::Prefix, 0).unwrap();
        for term in terms {
            editor.buffer_term(term).unwrap();
        }
        editor.index_all_buffered_terms().unwrap();
    }

    #[test]
    fn create_validates_merge_size() {
        let dir = tempdir().unwrap();
        let err = Index::create(Options::new(dir.path(), 0)).err().unwrap();
        assert!(err.is_invalid_argument());
        let too_big = LiteIndex::max_hit_buffer_size() + 1;
        assert!(Index::create(Options::new(dir.path(), too_big)).is_err());
        assert!(Index::create(Options::new(dir.path(), LiteIndex::max_hit_buffer_size())).is_ok());
    }

    #[test]
    fn editor_saturates_term_frequency() {
        let dir = tempdir().unwrap();
        let mut index = index_with(dir.path(), 100);
        let mut editor = index.edit(0, 0, TermMatchType::ExactOnly, 0).unwrap();
        for _ in 0..(MAX_TERM_FREQUENCY as usize + 10) {
            editor.buffer_term("foo").unwrap();
        }
        assert_eq!(editor.num_buffered_terms(), 1);
        editor.index_all_buffered_terms().unwrap();

        let mut iter = index.get_iterator("foo", SECTION_ID_MASK_ALL, TermMatchType::ExactOnly).unwrap();
        let infos = collect_doc_hit_infos(iter.as_mut()).unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].hit_term_frequency(0), MAX_TERM_FREQUENCY);
        assert_eq!(index.lite_index().size(), 1);
    }

    #[test]
    fn dropped_editor_commits_nothing() {
        let dir = tempdir().unwrap();
        let mut index = index_with(dir.path(), 100);
        {
            let mut editor = index.edit(0, 0, TermMatchType::ExactOnly, 0).unwrap();
            editor.buffer_term("foo").unwrap();
        }
        assert_eq!(index.lite_index().size(), 0);
        assert_eq!(index.last_added_document_id(), None);
    }

    #[test]
    fn edit_rejects_bad_arguments() {
        let dir = tempdir().unwrap();
        let mut index = index_with(dir.path(), 100);
        assert!(index.edit(0, 64, TermMatchType::Prefix, 0).err().unwrap().is_invalid_argument());
        assert!(index.edit(0, 0, TermMatchType::Unknown, 0).err().unwrap().is_invalid_argument());
        assert!(index
            .edit(MAX_DOCUMENT_ID + 1, 0, TermMatchType::Prefix, 0)
            .err()
            .unwrap()
            .is_invalid_argument());
    }

    #[test]
    fn get_iterator_rejects_unknown_match_type() {
        let dir = tempdir().unwrap();
        let index = index_with(dir.path(), 100);
        let err = index.get_iterator("foo", SECTION_ID_MASK_ALL, TermMatchType::Unknown).err().unwrap();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn iterator_unions_lite_and_main() {
        let dir = tempdir().unwrap();
        let mut index = index_with(dir.path(), 100);
        add(&mut index, 0, 0, &["foo"]);
        add(&mut index, 1, 1, &["fool"]);
        index.merge().unwrap();
        add(&mut index, 2, 0, &["foo"]);
        add(&mut index, 2, 2, &["food"]);

        let mut exact = index.get_iterator("foo", SECTION_ID_MASK_ALL, TermMatchType::ExactOnly).unwrap();
        let docs: Vec<DocumentId> = collect_doc_hit_infos(exact.as_mut())
            .unwrap()
            .iter()
            .map(|i| i.document_id())
            .collect();
        assert_eq!(docs, vec![2, 0]);

        let mut prefix = index.get_iterator("foo", SECTION_ID_MASK_ALL, TermMatchType::Prefix).unwrap();
        let infos = collect_doc_hit_infos(prefix.as_mut()).unwrap();
        let docs: Vec<DocumentId> = infos.iter().map(|i| i.document_id()).collect();
        assert_eq!(docs, vec![2, 1, 0]);
        assert_eq!(infos[0].hit_section_ids_mask(), 0b101);
    }

    #[test]
    fn prefix_iterator_ignores_longer_terms_from_exact_sections() {
        let dir = tempdir().unwrap();
        let mut index = index_with(dir.path(), 100);
        let mut editor = index.edit(0, 0, TermMatchType::ExactOnly, 0).unwrap();
        editor.buffer_term("food").unwrap();
        editor.index_all_buffered_terms().unwrap();

        let mut prefix = index.get_iterator("foo", SECTION_ID_MASK_ALL, TermMatchType::Prefix).unwrap();
        assert!(collect_doc_hit_infos(prefix.as_mut()).unwrap().is_empty());
        let mut prefix = index.get_iterator("food", SECTION_ID_MASK_ALL, TermMatchType::Prefix).unwrap();
        assert_eq!(collect_doc_hit_infos(prefix.as_mut()).unwrap().len(), 1);
    }

    #[test]
    fn find_terms_by_prefix_merges_both_structures() {
        let dir = tempdir().unwrap();
        let mut index = index_with(dir.path(), 100);
        add(&mut index, 0, 0, &["foo", "fool"]);
        add(&mut index, 1, 0, &["foo"]);
        index.merge().unwrap();
        add(&mut index, 2, 0, &["foo", "form"]);

        let terms = index.find_terms_by_prefix("fo", 10, TermMatchType::Prefix, None).unwrap();
        assert_eq!(terms[0], TermMetadata::new("foo", 3));
        assert_eq!(terms.len(), 3);
        assert!(index.find_terms_by_prefix("fo", 0, TermMatchType::Prefix, None).unwrap().is_empty());
        assert!(index.find_terms_by_prefix("fo", -3, TermMatchType::Prefix, None).unwrap().is_empty());
        assert_eq!(index.find_terms_by_prefix("fo", 1, TermMatchType::ExactOnly, None).unwrap().len(), 1);
    }

    #[test]
    fn truncate_resets_only_structures_past_the_document() {
        let dir = tempdir().unwrap();
        let mut index = index_with(dir.path(), 100);
        add(&mut index, 1, 0, &["foo"]);
        index.merge().unwrap();
        add(&mut index, 5, 0, &["bar"]);

        index.truncate_to(7).unwrap();
        assert_eq!(index.lite_index().size(), 1);
        assert_eq!(index.main_index().lexicon().len(), 1);

        index.truncate_to(3).unwrap();
        assert_eq!(index.lite_index().size(), 0);
        assert_eq!(index.main_index().lexicon().len(), 1);

        add(&mut index, 5, 0, &["bar"]);
        index.truncate_to(0).unwrap();
        assert_eq!(index.lite_index().size(), 0);
        assert!(index.main_index().lexicon().is_empty());
        assert_eq!(index.last_added_document_id(), None);
    }

    #[test]
    fn wants_merge_after_threshold() {
        let dir = tempdir().unwrap();
        let mut index = index_with(dir.path(), 2);
        add(&mut index, 0, 0, &["a"]);
        assert!(!index.wants_merge());
        add(&mut index, 1, 0, &["b"]);
        assert!(index.wants_merge());
        index.merge().unwrap();
        assert!(!index.wants_merge());
        assert_eq!(index.last_added_document_id(), Some(1));
    }

    #[test]
    fn flush_stops_at_full_buffer_leaving_earlier_hits() {
        let dir = tempdir().unwrap();
        // want_merge 2 gives a capacity of 3 hits.
        let mut index = index_with(dir.path(), 2);
        let mut editor = index.edit(0, 0, TermMatchType::ExactOnly, 0).unwrap();
        for term in ["a", "b", "c", "d", "e"] {
            editor.buffer_term(term).unwrap();
        }
        let err = editor.index_all_buffered_terms().unwrap_err();
        assert!(err.is_resource_exhausted());
        assert_eq!(index.lite_index().size(), 3);
    }

    #[test]
    fn storage_info_reports_structures() {
        let dir = tempdir().unwrap();
        let mut index = index_with(dir.path(), 100);
        add(&mut index, 0, 0, &["foo", "bar"]);
        index.persist_to_disk().unwrap();
        let info = index.get_storage_info().unwrap();
        assert_eq!(info.num_lite_terms, 2);
        assert_eq!(info.num_lite_hits, 2);
        assert!(info.index_size > 0);
        assert_eq!(info.num_main_terms, 0);
    }
}
