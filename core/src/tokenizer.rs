use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref SEGMENT_RE: Regex =
        Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{M}\p{N}_']*|\s+|[^\p{L}\p{N}\s]").expect("valid regex");
}

pub const DEFAULT_MAX_TERM_BYTE_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Word,
    Whitespace,
    Punctuation,
}

/// A span of the input; `start` is a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'t> {
    pub text: &'t str,
    pub start: usize,
    pub kind: SegmentKind,
}

/// Splits text into contiguous words, runs of whitespace and single
/// punctuation characters.
pub trait LanguageSegmenter {
    fn segment<'t>(&self, text: &'t str) -> Vec<Segment<'t>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RegexSegmenter;

impl LanguageSegmenter for RegexSegmenter {
    fn segment<'t>(&self, text: &'t str) -> Vec<Segment<'t>> {
        SEGMENT_RE
            .find_iter(text)
            .map(|m| {
                let kind = match m.as_str().chars().next() {
                    Some(c) if c.is_alphanumeric() => SegmentKind::Word,
                    Some(c) if c.is_whitespace() => SegmentKind::Whitespace,
                    _ => SegmentKind::Punctuation,
                };
                Segment {
                    text: m.as_str(),
                    start: m.start(),
                    kind,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'t> {
    pub text: &'t str,
    pub start: usize,
}

impl Token<'_> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Keeps the word segments and drops everything else.
pub struct PlainTokenizer<'s> {
    segmenter: &'s dyn LanguageSegmenter,
}

impl<'s> PlainTokenizer<'s> {
    pub fn new(segmenter: &'s dyn LanguageSegmenter) -> Self {
        PlainTokenizer { segmenter }
    }

    pub fn tokenize<'t>(&self, text: &'t str) -> Vec<Token<'t>> {
        self.segmenter
            .segment(text)
            .into_iter()
            .filter(|s| s.kind == SegmentKind::Word)
            .map(|s| Token {
                text: s.text,
                start: s.start,
            })
            .collect()
    }
}

pub trait Normalizer {
    fn normalize_term(&self, term: &str) -> String;
}

/// NFKD, combining marks dropped, lowercased, then cut to at most
/// `max_term_byte_size` bytes on a char boundary.
#[derive(Debug, Clone, Copy)]
pub struct UnicodeNormalizer {
    max_term_byte_size: usize,
}

impl UnicodeNormalizer {
    pub fn new(max_term_byte_size: usize) -> Self {
        UnicodeNormalizer { max_term_byte_size }
    }
}

impl Default for UnicodeNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TERM_BYTE_SIZE)
    }
}

impl Normalizer for UnicodeNormalizer {
    fn normalize_term(&self, term: &str) -> String {
        let mut normalized: String = term
            .nfkd()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
            .collect();
        if normalized.len() > self.max_term_byte_size {
            let mut cut = self.max_term_byte_size;
            while !normalized.is_char_boundary(cut) {
                cut -= 1;
            }
            normalized.truncate(cut);
        }
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_carry_byte_offsets() {
        let segmenter = RegexSegmenter;
        let tokens = PlainTokenizer::new(&segmenter).tokenize("Héllo, wörld  f");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["Héllo", "wörld", "f"]);
        assert_eq!(tokens[2].end(), "Héllo, wörld  f".len());
    }

    #[test]
    fn segments_cover_punctuation_and_space() {
        let kinds: Vec<SegmentKind> = RegexSegmenter.segment("a:b ").iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SegmentKind::Word, SegmentKind::Punctuation, SegmentKind::Word, SegmentKind::Whitespace]
        );
    }

    #[test]
    fn normalizer_lowercases_and_strips_accents() {
        let normalizer = UnicodeNormalizer::default();
        assert_eq!(normalizer.normalize_term("Café"), "cafe");
        assert_eq!(normalizer.normalize_term("FOO"), "foo");
    }

    #[test]
    fn normalizer_truncates_on_char_boundary() {
        let normalizer = UnicodeNormalizer::new(3);
        assert_eq!(normalizer.normalize_term("abcdef"), "abc");
        assert_eq!(normalizer.normalize_term("aжb"), "aж");
        assert_eq!(UnicodeNormalizer::new(2).normalize_term("aж"), "a");
    }
}
