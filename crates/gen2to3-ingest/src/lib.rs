#![deny(unsafe_code)]

//! Discovery of legacy datasets in a Gen2 repository.

pub mod error;
pub mod template;
pub mod walker;

pub use error::{Result, WalkError};
pub use template::{PathTemplate, compile_templates};
pub use walker::{RepoWalker, WalkStats, WalkedRecord};
