pub mod document;
pub mod engine;
pub mod error;
pub mod hit;
pub mod index;
pub mod index_processor;
pub mod iterator;
pub mod lexicon;
pub mod lite_index;
pub mod main_index;
pub mod namespace_checker;
pub mod persist;
pub mod ranker;
pub mod schema;
pub mod scoring;
pub mod search_spec;
pub mod section_weights;
pub mod suggestion_processor;
pub mod term_id_codec;
pub mod tokenizer;

pub use document::{Document, DocumentStore};
pub use engine::{SearchEngine, SearchResult};
pub use error::{Error, Result};
pub use hit::{
    DocHitInfo, DocumentId, Hit, NamespaceId, SchemaTypeId, SectionId, SectionIdMask, TermMatchType, TermMetadata,
};
pub use index::{Editor, Index, IndexStorageInfo, Options};
pub use schema::{SchemaConfig, SchemaRegistry, SchemaStore};
pub use search_spec::{ScoringSpec, SuggestionSpec};
