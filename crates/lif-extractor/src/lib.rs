//! LIF Extractor - Annotation producers
//!
//! Named entity recognition and constituency parsing stages that read the
//! layers already present in a LIF container and append one new view each.
//! Models plug in through the capability traits in [`model`].

pub mod category;
pub mod gazetteer;
pub mod model;
pub mod ner;
pub mod offsets;
pub mod parse;
pub mod tree;
pub mod treebank;

pub use category::EntityCategory;
pub use gazetteer::{GazetteerEntry, GazetteerNameFinder};
pub use model::{
    ConstituencyParser, Exclusive, ModelRegistry, ModelRegistryBuilder, StatefulNameFinder,
    StatefulParser, TokenNameFinder, TokenSpan,
};
pub use ner::NamedEntityRecognizer;
pub use offsets::TokenOffsets;
pub use parse::{flatten, FlatConstituent, SyntacticParser};
pub use tree::ParseTree;
pub use treebank::TreebankParser;
