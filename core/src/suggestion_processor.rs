//! Completes the last, possibly partial, word of a query.

use crate::error::{Error, Result};
use crate::hit::TermMetadata;
use crate::index::Index;
use crate::namespace_checker::NamespaceChecker;
use crate::search_spec::SuggestionSpec;
use crate::tokenizer::{LanguageSegmenter, Normalizer, PlainTokenizer};

pub struct SuggestionProcessor<'a> {
    index: &'a Index,
    language_segmenter: &'a dyn LanguageSegmenter,
    normalizer: &'a dyn Normalizer,
}

impl<'a> SuggestionProcessor<'a> {
    pub fn create(
        index: Option<&'a Index>,
        language_segmenter: Option<&'a dyn LanguageSegmenter>,
        normalizer: &'a dyn Normalizer,
    ) -> Result<Self> {
        let index = index.ok_or_else(|| Error::FailedPrecondition("index must not be null".to_string()))?;
        let language_segmenter = language_segmenter
            .ok_or_else(|| Error::FailedPrecondition("language segmenter must not be null".to_string()))?;
        Ok(SuggestionProcessor {
            index,
            language_segmenter,
            normalizer,
        })
    }

    /// Suggestions for `spec.prefix`. Everything before the last token is
    /// kept verbatim and prepended to each completion. If anything but a
    /// word ends the prefix there is nothing to complete.
    pub fn query_suggestions(
        &self,
        spec: &SuggestionSpec,
        namespace_checker: Option<&dyn NamespaceChecker>,
    ) -> Result<Vec<TermMetadata>> {
        let prefix = spec.prefix.as_str();
        let tokens = PlainTokenizer::new(self.language_segmenter).tokenize(prefix);
        let last_token = match tokens.last() {
            Some(token) if !token.text.is_empty() && token.end() >= prefix.len() => *token,
            _ => return Ok(Vec::new()),
        };

        let query_prefix = &prefix[..last_token.start];
        let mut terms = self.index.find_terms_by_prefix(
            &self.normalizer.normalize_term(last_token.text),
            spec.num_to_return,
            spec.scoring_spec.scoring_match_type,
            namespace_checker,
        )?;
        for term in &mut terms {
            term.content = format!("{query_prefix}{}", term.content);
        }
        Ok(terms)
    }
}
