//! notion-publish: renders ready Notion database entries into Markdown posts,
//! commits them to a site repository and marks them published.
//!
//! Data flows one way: [`synchronise`] drives [`assemble`], which uses
//! [`render`], which uses [`format`]. The collaborators the synchroniser talks
//! to are traits in [`contract`], with concrete adapters in [`notion`], [`git`]
//! and [`storage`].

pub mod assemble;
pub mod cli;
pub mod config;
pub mod contract;
pub mod error;
pub mod format;
pub mod git;
pub mod load_config;
pub mod notion;
pub mod render;
pub mod storage;
pub mod synchronise;

pub use cli::{run, Cli, Commands};
pub use error::SyncError;
pub use synchronise::{SyncReport, Synchroniser};
