use index_core::tokenizer::{Normalizer, PlainTokenizer, RegexSegmenter, UnicodeNormalizer};

fn terms(text: &str) -> Vec<String> {
    let segmenter = RegexSegmenter;
    let normalizer = UnicodeNormalizer::default();
    PlainTokenizer::new(&segmenter)
        .tokenize(text)
        .into_iter()
        .map(|t| normalizer.normalize_term(t.text))
        .collect()
}

#[test]
fn it_normalizes_without_stemming() {
    let words = terms("Running Runners RUN! The café's menu.");
    assert_eq!(words, vec!["running", "runners", "run", "the", "cafe's", "menu"]);
}

#[test]
fn it_keeps_offsets_into_the_input_text() {
    let segmenter = RegexSegmenter;
    let text = "  Ünïcode, größe";
    let tokens = PlainTokenizer::new(&segmenter).tokenize(text);
    assert_eq!(tokens.len(), 2);
    assert_eq!(&text[tokens[1].start..tokens[1].end()], "größe");
}

#[test]
fn it_truncates_long_terms_on_char_boundaries() {
    let normalizer = UnicodeNormalizer::new(5);
    assert_eq!(normalizer.normalize_term("abcdéf"), "abcde");
    assert_eq!(normalizer.normalize_term("ab日本"), "ab日");
}
