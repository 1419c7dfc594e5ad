//! Helper tables exposed to unit scripts.

pub mod path;
