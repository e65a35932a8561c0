//! File system helpers used by the config loader, the generated cache and
//! source acquisition.

mod atomic;
mod paths;

pub use atomic::atomic_write;
pub use paths::{absolutize, ensure_dir, normalize_path};
