//! Shared utilities.
//!
//! Identifier validation, list splitting and joining, lexical path
//! normalization and unit-file metadata parsing, plus test helpers.

pub mod ident;
pub mod metadata;
pub mod path;
pub mod text;

#[cfg(test)]
pub mod testutil;
