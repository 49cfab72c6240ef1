//! Git operations for fetching stack artifacts.
//!
//! This module provides:
//! - Remote locators (repository URL, optional reference, optional subpath)
//! - A fetcher that produces one shallow snapshot of a repository per call

mod fetcher;
mod spec;

pub use fetcher::GitFetcher;
pub use spec::GitSpec;
