pub mod arch;
pub mod os;
pub mod paths;

use arch::Arch;
use os::Os;
use std::fmt;

/// Host platform as seen by unit scripts through the built-in variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// Detect the current platform at runtime
  ///
  /// Returns `None` if the OS or architecture is not one creator knows by name
  pub fn current() -> Option<Self> {
    Some(Self {
      arch: Arch::current()?,
      os: Os::current()?,
    })
  }

  /// Returns the platform triple string (e.g., "x86_64-linux")
  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch, self.os)
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}

/// Value of the `Platform` built-in variable.
pub fn platform_name() -> &'static str {
  Os::current().map(|os| os.as_str()).unwrap_or(std::env::consts::OS)
}

/// Value of the `PlatformStandard` built-in variable: `unix` or `windows`.
pub fn platform_standard() -> &'static str {
  std::env::consts::FAMILY
}

/// Value of the `Architecture` built-in variable.
pub fn architecture() -> &'static str {
  Arch::current().map(|arch| arch.as_str()).unwrap_or(std::env::consts::ARCH)
}
