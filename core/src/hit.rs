use serde::{Deserialize, Serialize};
use std::fmt;

pub type DocumentId = u32;
pub type SectionId = u8;
pub type SectionIdMask = u64;
pub type NamespaceId = u16;
pub type SchemaTypeId = u16;
pub type TermFrequency = u8;

pub const MAX_DOCUMENT_ID: DocumentId = (1 << 22) - 1;
pub const MAX_SECTION_ID: SectionId = 63;
pub const TOTAL_NUM_SECTIONS: usize = MAX_SECTION_ID as usize + 1;
pub const SECTION_ID_MASK_ALL: SectionIdMask = !0;
pub const SECTION_ID_MASK_NONE: SectionIdMask = 0;
pub const MAX_TERM_FREQUENCY: TermFrequency = TermFrequency::MAX;

#[inline]
pub fn section_id_mask(section_id: SectionId) -> SectionIdMask {
    1u64 << section_id
}

/// How a query term is matched against the lexicon.
///
/// `Unknown` stands for an unset or unsupported value arriving from a
/// caller; operations that need a match type reject it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TermMatchType {
    #[default]
    Unknown,
    ExactOnly,
    Prefix,
}

impl fmt::Display for TermMatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TermMatchType::Unknown => "UNKNOWN",
            TermMatchType::ExactOnly => "EXACT_ONLY",
            TermMatchType::Prefix => "PREFIX",
        };
        f.write_str(name)
    }
}

/// One occurrence of a term in one section of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hit {
    document_id: DocumentId,
    section_id: SectionId,
    term_frequency: TermFrequency,
    is_in_prefix_section: bool,
}

impl Hit {
    pub fn new(
        section_id: SectionId,
        document_id: DocumentId,
        term_frequency: TermFrequency,
        is_in_prefix_section: bool,
    ) -> Self {
        Hit {
            document_id,
            section_id,
            term_frequency,
            is_in_prefix_section,
        }
    }

    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn section_id(&self) -> SectionId {
        self.section_id
    }

    pub fn term_frequency(&self) -> TermFrequency {
        self.term_frequency
    }

    pub fn is_in_prefix_section(&self) -> bool {
        self.is_in_prefix_section
    }

    pub fn is_valid(&self) -> bool {
        self.document_id <= MAX_DOCUMENT_ID && self.section_id <= MAX_SECTION_ID
    }

    /// Posting order: newest document first, then by section.
    pub fn posting_order(a: &Hit, b: &Hit) -> std::cmp::Ordering {
        b.document_id
            .cmp(&a.document_id)
            .then(a.section_id.cmp(&b.section_id))
    }
}

/// All sections of one document that matched a term.
#[derive(Clone, PartialEq, Eq)]
pub struct DocHitInfo {
    document_id: DocumentId,
    hit_section_ids_mask: SectionIdMask,
    hit_term_frequency: [TermFrequency; TOTAL_NUM_SECTIONS],
}

impl DocHitInfo {
    pub fn new(document_id: DocumentId) -> Self {
        DocHitInfo {
            document_id,
            hit_section_ids_mask: SECTION_ID_MASK_NONE,
            hit_term_frequency: [0; TOTAL_NUM_SECTIONS],
        }
    }

    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn hit_section_ids_mask(&self) -> SectionIdMask {
        self.hit_section_ids_mask
    }

    pub fn hit_term_frequency(&self, section_id: SectionId) -> TermFrequency {
        self.hit_term_frequency[section_id as usize]
    }

    /// Marks `section_id` as matched. Frequencies from repeated updates of
    /// the same section add up and saturate.
    pub fn update_section(&mut self, section_id: SectionId, term_frequency: TermFrequency) {
        let slot = &mut self.hit_term_frequency[section_id as usize];
        *slot = slot.saturating_add(term_frequency);
        self.hit_section_ids_mask |= section_id_mask(section_id);
    }

    pub fn merge_sections_from(&mut self, other: &DocHitInfo) {
        let mut mask = other.hit_section_ids_mask;
        while mask != 0 {
            let section_id = mask.trailing_zeros() as SectionId;
            self.update_section(section_id, other.hit_term_frequency(section_id));
            mask &= mask - 1;
        }
    }

    pub fn section_ids(&self) -> impl Iterator<Item = SectionId> + '_ {
        (0..=MAX_SECTION_ID).filter(move |id| self.hit_section_ids_mask & section_id_mask(*id) != 0)
    }
}

impl fmt::Debug for DocHitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocHitInfo")
            .field("document_id", &self.document_id)
            .field("hit_section_ids_mask", &format_args!("{:#x}", self.hit_section_ids_mask))
            .finish()
    }
}

/// Collapses hits into one `DocHitInfo` per document, newest first.
///
/// `hits` does not need to be sorted.
pub fn group_hits_by_document(hits: impl IntoIterator<Item = Hit>) -> Vec<DocHitInfo> {
    let mut hits: Vec<Hit> = hits.into_iter().collect();
    hits.sort_by(Hit::posting_order);
    let mut out: Vec<DocHitInfo> = Vec::new();
    for hit in hits {
        match out.last_mut() {
            Some(last) if last.document_id() == hit.document_id() => {
                last.update_section(hit.section_id(), hit.term_frequency());
            }
            _ => {
                let mut info = DocHitInfo::new(hit.document_id());
                info.update_section(hit.section_id(), hit.term_frequency());
                out.push(info);
            }
        }
    }
    out
}

/// Sorts newest-first and folds entries for the same document together.
pub fn sort_and_dedupe_doc_hit_infos(infos: &mut Vec<DocHitInfo>) {
    infos.sort_by(|a, b| b.document_id().cmp(&a.document_id()));
    let mut deduped: Vec<DocHitInfo> = Vec::with_capacity(infos.len());
    for info in infos.drain(..) {
        match deduped.last_mut() {
            Some(last) if last.document_id() == info.document_id() => last.merge_sections_from(&info),
            _ => deduped.push(info),
        }
    }
    *infos = deduped;
}

/// A lexicon entry reported by prefix lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermMetadata {
    pub content: String,
    pub hit_count: u32,
}

impl TermMetadata {
    pub fn new(content: impl Into<String>, hit_count: u32) -> Self {
        TermMetadata {
            content: content.into(),
            hit_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping_combines_sections_of_one_document() {
        let hits = vec![
            Hit::new(0, 3, 1, false),
            Hit::new(2, 7, 4, true),
            Hit::new(5, 3, 2, false),
        ];
        let infos = group_hits_by_document(hits);
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].document_id(), 7);
        assert_eq!(infos[1].document_id(), 3);
        assert_eq!(infos[1].hit_section_ids_mask(), 0b100001);
        assert_eq!(infos[1].hit_term_frequency(5), 2);
    }

    #[test]
    fn update_section_saturates() {
        let mut info = DocHitInfo::new(1);
        info.update_section(4, 200);
        info.update_section(4, 200);
        assert_eq!(info.hit_term_frequency(4), MAX_TERM_FREQUENCY);
    }

    #[test]
    fn dedupe_merges_masks() {
        let mut a = DocHitInfo::new(9);
        a.update_section(1, 1);
        let mut b = DocHitInfo::new(9);
        b.update_section(3, 2);
        let mut c = DocHitInfo::new(2);
        c.update_section(0, 1);
        let mut infos = vec![c, a, b];
        sort_and_dedupe_doc_hit_infos(&mut infos);
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].document_id(), 9);
        assert_eq!(infos[0].hit_section_ids_mask(), 0b1010);
        assert_eq!(infos[0].section_ids().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn hit_validity() {
        assert!(Hit::new(MAX_SECTION_ID, MAX_DOCUMENT_ID, 1, false).is_valid());
        assert!(!Hit::new(64, 0, 1, false).is_valid());
    }
}
