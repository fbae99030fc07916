//! Auth service adapters.

mod directory;

pub use directory::{AuthDirectoryConfig, HttpUserDirectory};
