//! The boundary between the workspace and whatever executes unit scripts.

use std::path::Path;
use std::rc::Rc;

use crate::unit::Unit;

/// Error returned by a script host. Kept opaque so hosts can surface their
/// own error types unchanged.
pub type HostError = Box<dyn std::error::Error + Send + Sync>;

/// Executes the script at `path` on behalf of `unit`.
///
/// The unit is already registered in its workspace when this is called, so
/// scripts may load other units that refer back to it.
pub trait ScriptHost {
  fn execute(&self, unit: &Rc<Unit>, path: &Path) -> Result<(), HostError>;
}
