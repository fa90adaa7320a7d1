//! Read-optimized structure holding everything merged out of the lite
//! index. Posting lists are kept sorted newest document first.

use crate::error::{Error, Result};
use crate::hit::{
    group_hits_by_document, section_id_mask, DocHitInfo, DocumentId, Hit, SectionIdMask,
    TermMetadata,
};
use crate::lexicon::{Lexicon, TermProperties};
use crate::namespace_checker::{passes, NamespaceChecker};
use crate::persist::{load_bincode_if_exists, save_bincode, IndexPaths};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_MAIN_LEXICON_MAX_VALUE_INDEX: u32 = 1 << 24;

#[derive(Default, Serialize, Deserialize)]
struct PostingsFile {
    last_added_document_id: Option<DocumentId>,
    posting_lists: Vec<Vec<Hit>>,
}

pub struct MainIndex {
    lexicon: Lexicon,
    posting_lists: Vec<Vec<Hit>>,
    last_added_document_id: Option<DocumentId>,
}

impl MainIndex {
    pub fn new(lexicon_max_value_index: u32) -> Self {
        MainIndex {
            lexicon: Lexicon::new(lexicon_max_value_index),
            posting_lists: Vec::new(),
            last_added_document_id: None,
        }
    }

    pub fn open(lexicon_max_value_index: u32, paths: &IndexPaths) -> Result<Self> {
        let mut main = Self::new(lexicon_max_value_index);
        if let Some(lexicon) = load_bincode_if_exists::<Lexicon>(&paths.main_lexicon())? {
            main.lexicon = lexicon;
        }
        let postings: PostingsFile = load_bincode_if_exists(&paths.main_postings())?.unwrap_or_default();
        if postings.posting_lists.len() != main.lexicon.len() {
            return Err(Error::Internal(format!(
                "main lexicon has {} terms but {} posting lists were persisted",
                main.lexicon.len(),
                postings.posting_lists.len()
            )));
        }
        main.posting_lists = postings.posting_lists;
        main.last_added_document_id = postings.last_added_document_id;
        Ok(main)
    }

    pub fn persist(&self, paths: &IndexPaths) -> Result<()> {
        save_bincode(&paths.main_lexicon(), &self.lexicon)?;
        let file = PostingsFile {
            last_added_document_id: self.last_added_document_id,
            posting_lists: self.posting_lists.clone(),
        };
        save_bincode(&paths.main_postings(), &file)
    }

    pub fn get_term_id(&self, term: &str) -> Result<u32> {
        self.lexicon
            .find(term)
            .ok_or_else(|| Error::NotFound(format!("term '{term}' is not in the main lexicon")))
    }

    pub fn term_properties(&self, tvi: u32) -> Result<&TermProperties> {
        self.lexicon.properties(tvi)
    }

    pub fn posting_list(&self, tvi: u32) -> Result<&[Hit]> {
        self.posting_lists
            .get(tvi as usize)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::NotFound(format!("no posting list for main tvi {tvi}")))
    }

    /// Same contract as `LiteIndex::append_hits`, keyed by main tvi.
    pub fn append_hits(
        &self,
        tvi: u32,
        section_id_mask_filter: SectionIdMask,
        only_from_prefix_sections: bool,
        out: &mut Vec<DocHitInfo>,
    ) -> Result<usize> {
        let hits = self
            .posting_list(tvi)?
            .iter()
            .copied()
            .filter(|hit| section_id_mask_filter & section_id_mask(hit.section_id()) != 0)
            .filter(|hit| !only_from_prefix_sections || hit.is_in_prefix_section());
        let infos = group_hits_by_document(hits);
        let appended = infos.len();
        out.extend(infos);
        Ok(appended)
    }

    /// Terms starting with `prefix` that still have hits after namespace
    /// filtering, sorted by content.
    pub fn find_terms_by_prefix(
        &self,
        prefix: &str,
        namespace_checker: Option<&dyn NamespaceChecker>,
    ) -> Result<Vec<TermMetadata>> {
        let mut terms = Vec::new();
        for (term, tvi) in self.lexicon.prefix_iter(prefix) {
            let count = self
                .posting_list(tvi)?
                .iter()
                .filter(|hit| passes(namespace_checker, hit.document_id()))
                .count() as u32;
            if count > 0 {
                terms.push(TermMetadata::new(term, count));
            }
        }
        Ok(terms)
    }

    /// Folds one lite term and its hits into this index.
    pub(crate) fn add_term_hits(
        &mut self,
        term: &str,
        properties: &TermProperties,
        hits: Vec<Hit>,
    ) -> Result<u32> {
        let (tvi, inserted) = self.lexicon.insert(term)?;
        if inserted {
            self.posting_lists.push(Vec::new());
        }
        self.lexicon.properties_mut(tvi)?.widen_from(properties);
        let list = self
            .posting_lists
            .get_mut(tvi as usize)
            .ok_or_else(|| Error::Internal(format!("missing posting list for main tvi {tvi}")))?;
        list.extend(hits);
        list.sort_by(Hit::posting_order);
        Ok(tvi)
    }

    pub(crate) fn set_last_added_document_id(&mut self, document_id: Option<DocumentId>) {
        self.last_added_document_id = match (self.last_added_document_id, document_id) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn last_added_document_id(&self) -> Option<DocumentId> {
        self.last_added_document_id
    }

    pub fn reset(&mut self) {
        debug!(terms = self.lexicon.len(), "resetting main index");
        self.lexicon.clear();
        self.posting_lists.clear();
        self.last_added_document_id = None;
    }

    pub fn lexicon_size(&self) -> Result<u64> {
        self.lexicon.serialized_size()
    }

    pub fn postings_size(&self) -> Result<u64> {
        Ok(bincode::serialized_size(&self.posting_lists)?)
    }
}
