//! Vocabulary identifiers shared across pipeline stages
//!
//! Annotation types are plain string tags so that views written by other
//! stages (with types this crate does not know about) still deserialize.
//! The constants below are the ones the producers read and write.

/// Annotation type identifiers
pub mod types {
    pub const TOKEN: &str = "Token";
    pub const SENTENCE: &str = "Sentence";
    pub const NAMED_ENTITY: &str = "NamedEntity";
    pub const PHRASE_STRUCTURE: &str = "PhraseStructure";
    pub const CONSTITUENT: &str = "Constituent";
}

/// Feature names
pub mod features {
    /// Surface text of a named entity
    pub const WORD: &str = "word";
    /// Mapped entity category
    pub const CATEGORY: &str = "category";
    /// Sentence text on a phrase-structure node
    pub const SENTENCE: &str = "sentence";
    /// Bracketed tree rendering on a phrase-structure node
    pub const PENNTREE: &str = "penntree";
    /// Constituent ids belonging to a phrase-structure node
    pub const CONSTITUENTS: &str = "constituents";
    /// Immediate child ids of a constituent
    pub const CHILDREN: &str = "children";
}

/// Features whose values are lists of annotation ids in the same view
pub const ID_LIST_FEATURES: &[&str] = &[features::CHILDREN, features::CONSTITUENTS];
