//! Cross-platform utilities: path normalization, atomic writes, hashing and
//! platform lookups.

pub mod fs;
pub mod hash;
pub mod platform;

pub use fs::{absolutize, atomic_write, ensure_dir, normalize_path};
pub use hash::{config_hash, sha256_hex};
pub use platform::{get_git_command, get_home_dir};
