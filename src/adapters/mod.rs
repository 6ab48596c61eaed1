//! Concrete implementations of the `crate::ports` trait boundaries.

pub mod embedding;
pub mod parsers;
pub mod vector_store;
