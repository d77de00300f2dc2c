//! Category hierarchy engine for procedure knowledge bases.
//!
//! Builds an ordered forest from flat category records, collects the
//! procedures of a whole branch and resolves ancestor paths, while
//! tolerating cycles, dangling parents and duplicate ids in the data.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
