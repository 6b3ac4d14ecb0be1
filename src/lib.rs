//! # prefetcher-rs
//!
//! An async course content prefetch library for Rust.
//!
//! Features:
//! - Prefetch handlers per module type with overridable defaults
//! - Download deduplication per (site, component, id)
//! - Handler dispatch by module type name
//! - Shared file pool keyed by url hash (xxHash)
//! - Cached module contents with invalidation

pub mod html_files;
pub mod error;
pub mod module;
pub mod module_status;
pub mod site;
pub mod course_cache;
pub mod download_tracker;
pub mod pool_configuration;
pub mod file_pool;
pub mod prefetch_handler;
pub mod prefetch_delegate;
pub mod handlers;
