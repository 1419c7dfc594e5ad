//! Lua script host.
//!
//! Unit scripts are Lua 5.4 files. [`LuaHost`] implements
//! [`crate::host::ScriptHost`] by running each script in its own environment
//! that exposes the unit API.
//!
//! # Submodules
//!
//! - [`api`] - Unit operations callable from Lua
//! - [`convert`] - Lua argument conversions
//! - [`globals`] - Global helpers and per-unit environments
//! - [`helpers`] - Helper tables exposed to scripts
//! - [`runtime`] - The [`LuaHost`] itself
//! - [`userdata`] - Unit, target and event handles

pub mod api;
pub mod convert;
pub mod globals;
pub mod helpers;
pub mod runtime;
pub mod userdata;

pub use runtime::LuaHost;
