//! Iterators over `DocHitInfo`s, newest document first.
//!
//! Term iterators fetch all of their hits lazily on the first `advance`.

use crate::error::Result;
use crate::hit::{sort_and_dedupe_doc_hit_infos, DocHitInfo, SectionIdMask};
use crate::lite_index::LiteIndex;
use crate::main_index::MainIndex;
use crate::term_id_codec::{TermIdCodec, TviType};

pub trait DocHitInfoIterator {
    /// Moves to the next document. Returns false once exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// The document the iterator is positioned on, if any.
    fn doc_hit_info(&self) -> Option<&DocHitInfo>;
}

/// Drains `iter` into a vector.
pub fn collect_doc_hit_infos(iter: &mut dyn DocHitInfoIterator) -> Result<Vec<DocHitInfo>> {
    let mut out = Vec::new();
    while iter.advance()? {
        if let Some(info) = iter.doc_hit_info() {
            out.push(info.clone());
        }
    }
    Ok(out)
}

#[derive(Default)]
struct CachedDocHitInfos {
    infos: Vec<DocHitInfo>,
    next: usize,
    current: Option<usize>,
    retrieved: bool,
}

impl CachedDocHitInfos {
    fn advance(&mut self, retrieve: impl FnOnce(&mut Vec<DocHitInfo>) -> Result<()>) -> Result<bool> {
        if !self.retrieved {
            retrieve(&mut self.infos)?;
            self.retrieved = true;
        }
        if self.next < self.infos.len() {
            self.current = Some(self.next);
            self.next += 1;
            Ok(true)
        } else {
            self.current = None;
            Ok(false)
        }
    }

    fn current(&self) -> Option<&DocHitInfo> {
        self.current.map(|i| &self.infos[i])
    }
}

pub struct TermLiteExactIterator<'a> {
    codec: &'a TermIdCodec,
    lite_index: &'a LiteIndex,
    term: String,
    section_id_mask: SectionIdMask,
    cache: CachedDocHitInfos,
}

impl<'a> TermLiteExactIterator<'a> {
    pub fn new(codec: &'a TermIdCodec, lite_index: &'a LiteIndex, term: &str, section_id_mask: SectionIdMask) -> Self {
        TermLiteExactIterator {
            codec,
            lite_index,
            term: term.to_string(),
            section_id_mask,
            cache: CachedDocHitInfos::default(),
        }
    }
}

impl DocHitInfoIterator for TermLiteExactIterator<'_> {
    fn advance(&mut self) -> Result<bool> {
        let (codec, lite, term, mask) = (self.codec, self.lite_index, &self.term, self.section_id_mask);
        self.cache.advance(|out| {
            let tvi = match lite.get_term_id(term) {
                Ok(tvi) => tvi,
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e),
            };
            let term_id = codec.encode_tvi(tvi, TviType::Lite)?;
            lite.append_hits(term_id, mask, false, None, out);
            Ok(())
        })
    }

    fn doc_hit_info(&self) -> Option<&DocHitInfo> {
        self.cache.current()
    }
}

pub struct TermLitePrefixIterator<'a> {
    codec: &'a TermIdCodec,
    lite_index: &'a LiteIndex,
    prefix: String,
    section_id_mask: SectionIdMask,
    cache: CachedDocHitInfos,
}

impl<'a> TermLitePrefixIterator<'a> {
    pub fn new(codec: &'a TermIdCodec, lite_index: &'a LiteIndex, prefix: &str, section_id_mask: SectionIdMask) -> Self {
        TermLitePrefixIterator {
            codec,
            lite_index,
            prefix: prefix.to_string(),
            section_id_mask,
            cache: CachedDocHitInfos::default(),
        }
    }
}

impl DocHitInfoIterator for TermLitePrefixIterator<'_> {
    fn advance(&mut self) -> Result<bool> {
        let (codec, lite, prefix, mask) = (self.codec, self.lite_index, &self.prefix, self.section_id_mask);
        self.cache.advance(|out| {
            for (term, tvi) in lite.lexicon().prefix_iter(prefix) {
                // A longer term only matches through its prefix-section hits.
                let exact = term.len() == prefix.len();
                let term_id = codec.encode_tvi(tvi, TviType::Lite)?;
                lite.append_hits(term_id, mask, !exact, None, out);
            }
            sort_and_dedupe_doc_hit_infos(out);
            Ok(())
        })
    }

    fn doc_hit_info(&self) -> Option<&DocHitInfo> {
        self.cache.current()
    }
}

pub struct TermMainExactIterator<'a> {
    main_index: &'a MainIndex,
    term: String,
    section_id_mask: SectionIdMask,
    cache: CachedDocHitInfos,
}

impl<'a> TermMainExactIterator<'a> {
    pub fn new(main_index: &'a MainIndex, term: &str, section_id_mask: SectionIdMask) -> Self {
        TermMainExactIterator {
            main_index,
            term: term.to_string(),
            section_id_mask,
            cache: CachedDocHitInfos::default(),
        }
    }
}

impl DocHitInfoIterator for TermMainExactIterator<'_> {
    fn advance(&mut self) -> Result<bool> {
        let (main, term, mask) = (self.main_index, &self.term, self.section_id_mask);
        self.cache.advance(|out| {
            let tvi = match main.get_term_id(term) {
                Ok(tvi) => tvi,
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e),
            };
            main.append_hits(tvi, mask, false, out)?;
            Ok(())
        })
    }

    fn doc_hit_info(&self) -> Option<&DocHitInfo> {
        self.cache.current()
    }
}

pub struct TermMainPrefixIterator<'a> {
    main_index: &'a MainIndex,
    prefix: String,
    section_id_mask: SectionIdMask,
    cache: CachedDocHitInfos,
}

impl<'a> TermMainPrefixIterator<'a> {
    pub fn new(main_index: &'a MainIndex, prefix: &str, section_id_mask: SectionIdMask) -> Self {
        TermMainPrefixIterator {
            main_index,
            prefix: prefix.to_string(),
            section_id_mask,
            cache: CachedDocHitInfos::default(),
        }
    }
}

impl DocHitInfoIterator for TermMainPrefixIterator<'_> {
    fn advance(&mut self) -> Result<bool> {
        let (main, prefix, mask) = (self.main_index, &self.prefix, self.section_id_mask);
        self.cache.advance(|out| {
            for (term, tvi) in main.lexicon().prefix_iter(prefix) {
                let exact = term.len() == prefix.len();
                main.append_hits(tvi, mask, !exact, out)?;
            }
            sort_and_dedupe_doc_hit_infos(out);
            Ok(())
        })
    }

    fn doc_hit_info(&self) -> Option<&DocHitInfo> {
        self.cache.current()
    }
}

/// Union of two iterators. A document reported by both children comes
/// out once, with the section masks of both.
pub struct OrIterator<'a> {
    left: Box<dyn DocHitInfoIterator + 'a>,
    right: Box<dyn DocHitInfoIterator + 'a>,
    left_head: Option<DocHitInfo>,
    right_head: Option<DocHitInfo>,
    current: Option<DocHitInfo>,
    started: bool,
}

impl<'a> OrIterator<'a> {
    pub fn new(left: Box<dyn DocHitInfoIterator + 'a>, right: Box<dyn DocHitInfoIterator + 'a>) -> Self {
        OrIterator {
            left,
            right,
            left_head: None,
            right_head: None,
            current: None,
            started: false,
        }
    }
}

fn next_head(iter: &mut dyn DocHitInfoIterator) -> Result<Option<DocHitInfo>> {
    if iter.advance()? {
        Ok(iter.doc_hit_info().cloned())
    } else {
        Ok(None)
    }
}

impl DocHitInfoIterator for OrIterator<'_> {
    fn advance(&mut self) -> Result<bool> {
        if !self.started {
            self.left_head = next_head(self.left.as_mut())?;
            self.right_head = next_head(self.right.as_mut())?;
            self.started = true;
        }
        self.current = match (self.left_head.take(), self.right_head.take()) {
            (None, None) => None,
            (Some(l), None) => {
                self.left_head = next_head(self.left.as_mut())?;
                Some(l)
            }
            (None, Some(r)) => {
                self.right_head = next_head(self.right.as_mut())?;
                Some(r)
            }
            (Some(mut l), Some(r)) => {
                if l.document_id() > r.document_id() {
                    self.right_head = Some(r);
                    self.left_head = next_head(self.left.as_mut())?;
                    Some(l)
                } else if r.document_id() > l.document_id() {
                    self.left_head = Some(l);
                    self.right_head = next_head(self.right.as_mut())?;
                    Some(r)
                } else {
                    l.merge_sections_from(&r);
                    self.left_head = next_head(self.left.as_mut())?;
                    self.right_head = next_head(self.right.as_mut())?;
                    Some(l)
                }
            }
        };
        Ok(self.current.is_some())
    }

    fn doc_hit_info(&self) -> Option<&DocHitInfo> {
        self.current.as_ref()
    }
}
