//! Modèle des index secondaires (design documents et vues), suivi des modifications.

pub mod document;
pub mod view;

pub use document::DesignDocument;
pub use view::View;
