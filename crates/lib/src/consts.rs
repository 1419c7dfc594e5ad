//! File names, metadata keys and environment variables shared across the crate.

pub const APP_NAME: &str = "creator";

/// Suffix of unit script files.
pub const UNIT_FILE_SUFFIX: &str = ".creator";

/// Exact file name of a unit script that carries its identifier in metadata only.
pub const UNIT_FILE_NAME: &str = "Creator";

/// Metadata key naming the unit declared by a script.
pub const UNIT_NAME_KEY: &str = "creator.unit.name";

/// Profile script executed once per session before units in the same directory.
pub const PROFILE_FILE_NAME: &str = ".creator_profile";

/// Colon (unix) or semicolon (windows) separated list of extra unit directories.
pub const SEARCH_PATH_ENV: &str = "CREATORPATH";

/// Overrides the directory holding the built-in unit scripts.
pub const BUILTINS_DIR_ENV: &str = "CREATOR_BUILTINS";

/// Identifier prefix of units created for static (profile) scripts.
pub const STATIC_UNIT_PREFIX: &str = "static|";

/// Variable bound to the unit identifier in every unit context.
pub const SELF_VAR: &str = "self";

/// Variable bound to the unit's project directory in every unit context.
pub const PROJECT_PATH_VAR: &str = "ProjectPath";

/// Variable naming the ninja file a main unit wants to be exported to.
pub const NINJA_OUT_VAR: &str = "NinjaOut";
