//! Domain layer: the document tree, node selection and export requests.

pub mod error;
pub mod export;
pub mod naming;
pub mod selector;
pub mod tree;
