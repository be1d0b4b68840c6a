//! Shared test utilities for the modctl workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`]: git repositories with tagged releases and branches
//! - [`mods`]: writers for mod directories and mirror layouts

pub mod git;
pub mod mods;
