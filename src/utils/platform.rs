//! Platform-specific lookups.

use anyhow::Result;
use std::path::PathBuf;

const fn is_windows() -> bool {
    cfg!(windows)
}

/// Returns the user's home directory.
///
/// # Errors
///
/// Fails when neither `HOME` (Unix) nor `USERPROFILE` (Windows) can be resolved.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

/// Returns the platform-specific git executable name.
///
/// The executable still has to be reachable through `PATH`.
#[must_use]
pub const fn get_git_command() -> &'static str {
    if is_windows() {
        "git.exe"
    } else {
        "git"
    }
}
