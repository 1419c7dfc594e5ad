//! creator-lib: the core of the creator meta-build system.
//!
//! Unit scripts declare variables and targets against a [`unit::Unit`]. Macro
//! text is parsed into [`macros::Expr`] trees and resolved through the
//! [`context`] hierarchy. Targets are set up once into command entries which
//! [`ninja`] writes out as a `build.ninja` file.
//!
//! - [`workspace`] - session state, unit discovery and loading
//! - [`unit`] - the declaration API seen by scripts
//! - [`target`] - targets, tasks and their dependency graph
//! - [`lua`] - the Lua script host

pub mod consts;
pub mod context;
pub mod host;
pub mod lua;
pub mod macros;
pub mod ninja;
pub mod platform;
pub mod target;
pub mod unit;
pub mod util;
pub mod workspace;
