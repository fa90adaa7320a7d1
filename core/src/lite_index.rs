//! Write-optimized staging structure: a lexicon plus an append-only
//! hit buffer, bucketed by term id so one term's hits are a map lookup.

use crate::error::{Error, Result};
use crate::hit::{
    group_hits_by_document, section_id_mask, DocHitInfo, DocumentId, Hit, NamespaceId,
    SectionIdMask, TermMatchType,
};
use crate::lexicon::{Lexicon, TermProperties};
use crate::namespace_checker::{passes, NamespaceChecker};
use crate::persist::{load_bincode_if_exists, save_bincode, IndexPaths};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_LITE_LEXICON_MAX_VALUE_INDEX: u32 = 1 << 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermIdHitPair {
    pub term_id: u32,
    pub hit: Hit,
}

#[derive(Debug, Clone)]
pub struct LiteIndexOptions {
    /// Number of buffered hits after which the owner should merge.
    pub hit_buffer_want_merge: u32,
    pub lexicon_max_value_index: u32,
}

#[derive(Serialize, Deserialize)]
struct HitBufferFile {
    last_added_document_id: Option<DocumentId>,
    hits: Vec<TermIdHitPair>,
}

pub struct LiteIndex {
    lexicon: Lexicon,
    hits: HashMap<u32, Vec<Hit>>,
    num_hits: usize,
    hit_buffer_capacity: usize,
    hit_buffer_want_merge: usize,
    last_added_document_id: Option<DocumentId>,
}

impl LiteIndex {
    /// Upper bound on the number of buffered hits any lite index may hold.
    pub fn max_hit_buffer_size() -> u32 {
        u32::MAX / std::mem::size_of::<TermIdHitPair>() as u32
    }

    pub fn new(options: &LiteIndexOptions) -> Self {
        let want_merge = options.hit_buffer_want_merge as u64;
        let capacity = (want_merge + want_merge / 2).min(Self::max_hit_buffer_size() as u64);
        LiteIndex {
            lexicon: Lexicon::new(options.lexicon_max_value_index),
            hits: HashMap::new(),
            num_hits: 0,
            hit_buffer_capacity: capacity as usize,
            hit_buffer_want_merge: options.hit_buffer_want_merge as usize,
            last_added_document_id: None,
        }
    }

    /// Restores the snapshot under `paths` if there is one.
    pub fn open(options: &LiteIndexOptions, paths: &IndexPaths) -> Result<Self> {
        let mut lite = Self::new(options);
        if let Some(lexicon) = load_bincode_if_exists::<Lexicon>(&paths.lite_lexicon())? {
            lite.lexicon = lexicon;
        }
        if let Some(file) = load_bincode_if_exists::<HitBufferFile>(&paths.lite_hit_buffer())? {
            if file.hits.len() > lite.hit_buffer_capacity {
                return Err(Error::Internal(format!(
                    "persisted hit buffer holds {} hits, more than capacity {}",
                    file.hits.len(),
                    lite.hit_buffer_capacity
                )));
            }
            lite.num_hits = file.hits.len();
            for pair in file.hits {
                lite.hits.entry(pair.term_id).or_default().push(pair.hit);
            }
            lite.last_added_document_id = file.last_added_document_id;
        }
        Ok(lite)
    }

    pub fn persist(&self, paths: &IndexPaths) -> Result<()> {
        save_bincode(&paths.lite_lexicon(), &self.lexicon)?;
        let file = HitBufferFile {
            last_added_document_id: self.last_added_document_id,
            hits: self.term_id_hit_pairs(),
        };
        save_bincode(&paths.lite_hit_buffer(), &file)
    }

    /// Looks up `term`, adding it if new, and widens its properties.
    pub fn insert_term(
        &mut self,
        term: &str,
        term_match_type: TermMatchType,
        namespace_id: NamespaceId,
    ) -> Result<u32> {
        let (tvi, _) = self.lexicon.insert(term)?;
        self.update_term_properties(tvi, term_match_type == TermMatchType::Prefix, namespace_id)?;
        Ok(tvi)
    }

    pub fn get_term_id(&self, term: &str) -> Result<u32> {
        self.lexicon
            .find(term)
            .ok_or_else(|| Error::NotFound(format!("term '{term}' is not in the lite lexicon")))
    }

    pub fn update_term_properties(
        &mut self,
        tvi: u32,
        has_hits_in_prefix_section: bool,
        namespace_id: NamespaceId,
    ) -> Result<()> {
        self.lexicon
            .properties_mut(tvi)?
            .widen(has_hits_in_prefix_section, namespace_id);
        Ok(())
    }

    pub fn term_properties(&self, tvi: u32) -> Result<&TermProperties> {
        self.lexicon.properties(tvi)
    }

    pub fn add_hit(&mut self, term_id: u32, hit: Hit) -> Result<()> {
        if !hit.is_valid() {
            return Err(Error::InvalidArgument(format!("invalid hit {hit:?}")));
        }
        if self.is_full() {
            return Err(Error::ResourceExhausted("hit buffer is full".to_string()));
        }
        self.hits.entry(term_id).or_default().push(hit);
        self.num_hits += 1;
        self.last_added_document_id = Some(
            self.last_added_document_id
                .map_or(hit.document_id(), |last| last.max(hit.document_id())),
        );
        Ok(())
    }

    /// Appends one `DocHitInfo` per matching document to `out`, newest
    /// first, and returns how many were appended.
    pub fn append_hits(
        &self,
        term_id: u32,
        section_id_mask_filter: SectionIdMask,
        only_from_prefix_sections: bool,
        namespace_checker: Option<&dyn NamespaceChecker>,
        out: &mut Vec<DocHitInfo>,
    ) -> usize {
        let matching = self
            .hits_for(term_id, namespace_checker)
            .filter(|hit| section_id_mask_filter & section_id_mask(hit.section_id()) != 0)
            .filter(|hit| !only_from_prefix_sections || hit.is_in_prefix_section());
        let infos = group_hits_by_document(matching);
        let appended = infos.len();
        out.extend(infos);
        appended
    }

    pub fn count_hits(&self, term_id: u32, namespace_checker: Option<&dyn NamespaceChecker>) -> u32 {
        self.hits_for(term_id, namespace_checker).count() as u32
    }

    fn hits_for<'a>(
        &'a self,
        term_id: u32,
        namespace_checker: Option<&'a dyn NamespaceChecker>,
    ) -> impl Iterator<Item = Hit> + 'a {
        self.hits_for_term(term_id)
            .iter()
            .copied()
            .filter(move |hit| passes(namespace_checker, hit.document_id()))
    }

    /// Buffered hits of one term, in insertion order.
    pub(crate) fn hits_for_term(&self, term_id: u32) -> &[Hit] {
        self.hits.get(&term_id).map(Vec::as_slice).unwrap_or(&[])
    }

    // Sorted by term id so snapshots are deterministic.
    fn term_id_hit_pairs(&self) -> Vec<TermIdHitPair> {
        let mut term_ids: Vec<u32> = self.hits.keys().copied().collect();
        term_ids.sort_unstable();
        term_ids
            .into_iter()
            .flat_map(|term_id| {
                self.hits_for_term(term_id)
                    .iter()
                    .map(move |&hit| TermIdHitPair { term_id, hit })
            })
            .collect()
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn last_added_document_id(&self) -> Option<DocumentId> {
        self.last_added_document_id
    }

    pub fn size(&self) -> usize {
        self.num_hits
    }

    pub fn is_full(&self) -> bool {
        self.num_hits >= self.hit_buffer_capacity
    }

    pub fn wants_merge(&self) -> bool {
        self.num_hits >= self.hit_buffer_want_merge
    }

    pub fn hit_buffer_capacity(&self) -> usize {
        self.hit_buffer_capacity
    }

    pub fn reset(&mut self) {
        self.lexicon.clear();
        self.hits.clear();
        self.num_hits = 0;
        self.last_added_document_id = None;
    }

    pub fn lexicon_size(&self) -> Result<u64> {
        self.lexicon.serialized_size()
    }

    pub fn hit_buffer_size(&self) -> u64 {
        (self.num_hits * std::mem::size_of::<TermIdHitPair>()) as u64
    }
}
