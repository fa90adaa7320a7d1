use crate::error::{Error, Result};
use crate::hit::{DocumentId, NamespaceId};
use crate::index::Index;
use crate::schema::Section;
use crate::tokenizer::{LanguageSegmenter, Normalizer, PlainTokenizer};
use tracing::{debug, info, warn};

/// Feeds every section of a document through tokenizer, normalizer and
/// an `Editor`, merging afterwards if the lite index asks for it.
pub struct IndexProcessor<'a> {
    index: &'a mut Index,
    language_segmenter: &'a dyn LanguageSegmenter,
    normalizer: &'a dyn Normalizer,
}

impl<'a> IndexProcessor<'a> {
    pub fn new(
        index: &'a mut Index,
        language_segmenter: &'a dyn LanguageSegmenter,
        normalizer: &'a dyn Normalizer,
    ) -> Self {
        IndexProcessor {
            index,
            language_segmenter,
            normalizer,
        }
    }

    pub fn index_document(
        &mut self,
        sections: &[Section<'_>],
        document_id: DocumentId,
        namespace_id: NamespaceId,
    ) -> Result<()> {
        if let Some(last) = self.index.last_added_document_id() {
            if document_id <= last {
                return Err(Error::InvalidArgument(format!(
                    "document id {document_id} must be greater than last added document id {last}"
                )));
            }
        }

        // A failing section ends the document, but the merge check still
        // runs so a full hit buffer is drained for the next document.
        let mut status = Ok(());
        for section in sections {
            if let Err(e) = self.index_section(section, document_id, namespace_id) {
                warn!(document_id, section_id = section.id, error = %e, "failed to index section");
                status = Err(e);
                break;
            }
        }

        if self.index.wants_merge() {
            info!(document_id, "lite index is full enough, merging");
            self.index.merge()?;
        }
        status
    }

    fn index_section(
        &mut self,
        section: &Section<'_>,
        document_id: DocumentId,
        namespace_id: NamespaceId,
    ) -> Result<()> {
        let tokenizer = PlainTokenizer::new(self.language_segmenter);
        let mut editor = self
            .index
            .edit(document_id, section.id, section.term_match_type, namespace_id)?;
        for token in tokenizer.tokenize(section.content) {
            let term = self.normalizer.normalize_term(token.text);
            if term.is_empty() {
                continue;
            }
            editor.buffer_term(&term)?;
        }
        debug!(document_id, section_id = section.id, terms = editor.num_buffered_terms(), "indexing section");
        editor.index_all_buffered_terms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::{TermMatchType, SECTION_ID_MASK_ALL};
    use crate::index::Options;
    use crate::iterator::collect_doc_hit_infos;
    use crate::tokenizer::{RegexSegmenter, UnicodeNormalizer};
    use tempfile::tempdir;

    fn section(id: u8, term_match_type: TermMatchType, content: &str) -> Section<'_> {
        Section {
            id,
            term_match_type,
            content,
        }
    }

    #[test]
    fn indexes_normalized_tokens_per_section() {
        let dir = tempdir().unwrap();
        let mut index = Index::create(Options::new(dir.path(), 100)).unwrap();
        let (segmenter, normalizer) = (RegexSegmenter, UnicodeNormalizer::default());
        IndexProcessor::new(&mut index, &segmenter, &normalizer)
            .index_document(
                &[
                    section(0, TermMatchType::ExactOnly, "Hello, World! hello"),
                    section(1, TermMatchType::Prefix, "Café"),
                ],
                0,
                0,
            )
            .unwrap();

        let mut iter = index.get_iterator("hello", SECTION_ID_MASK_ALL, TermMatchType::ExactOnly).unwrap();
        let infos = collect_doc_hit_infos(iter.as_mut()).unwrap();
        assert_eq!(infos[0].hit_term_frequency(0), 2);
        let mut iter = index.get_iterator("caf", SECTION_ID_MASK_ALL, TermMatchType::Prefix).unwrap();
        assert_eq!(collect_doc_hit_infos(iter.as_mut()).unwrap().len(), 1);
    }

    #[test]
    fn rejects_non_increasing_document_ids() {
        let dir = tempdir().unwrap();
        let mut index = Index::create(Options::new(dir.path(), 100)).unwrap();
        let (segmenter, normalizer) = (RegexSegmenter, UnicodeNormalizer::default());
        let mut processor = IndexProcessor::new(&mut index, &segmenter, &normalizer);
        processor
            .index_document(&[section(0, TermMatchType::Prefix, "a")], 3, 0)
            .unwrap();
        let err = processor
            .index_document(&[section(0, TermMatchType::Prefix, "b")], 3, 0)
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn merges_when_threshold_reached() {
        let dir = tempdir().unwrap();
        let mut index = Index::create(Options::new(dir.path(), 2)).unwrap();
        let (segmenter, normalizer) = (RegexSegmenter, UnicodeNormalizer::default());
        IndexProcessor::new(&mut index, &segmenter, &normalizer)
            .index_document(&[section(0, TermMatchType::Prefix, "one two")], 0, 0)
            .unwrap();
        assert_eq!(index.lite_index().size(), 0);
        assert_eq!(index.main_index().lexicon().len(), 2);
    }

    #[test]
    fn overflowing_document_still_triggers_merge() {
        let dir = tempdir().unwrap();
        let mut index = Index::create(Options::new(dir.path(), 2)).unwrap();
        let (segmenter, normalizer) = (RegexSegmenter, UnicodeNormalizer::default());
        let mut processor = IndexProcessor::new(&mut index, &segmenter, &normalizer);

        let err = processor
            .index_document(&[section(0, TermMatchType::Prefix, "a b c d e")], 0, 0)
            .unwrap_err();
        assert!(err.is_resource_exhausted());
        processor
            .index_document(&[section(0, TermMatchType::Prefix, "z")], 1, 0)
            .unwrap();
        processor
            .index_document(&[section(0, TermMatchType::Prefix, "y")], 2, 0)
            .unwrap();

        let mut iter = index.get_iterator("z", SECTION_ID_MASK_ALL, TermMatchType::ExactOnly).unwrap();
        assert_eq!(collect_doc_hit_infos(iter.as_mut()).unwrap()[0].document_id(), 1);
        // Three terms flushed before the overflow, then z and y.
        assert_eq!(index.main_index().lexicon().len(), 5);
    }
}
