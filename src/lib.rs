//! pack-release: tag, diff and publish multi-track content packs
//!
//! The git tag set of the pack repository is the release record. Phase 1
//! builds every track, compares the installation against the snapshot stored
//! at the track's latest tag and tags the next release. Phase 2 publishes the
//! latest tag of every track whose content differs from its predecessor.

pub mod build;
pub mod catalog;
pub mod commands;
pub mod core;
pub mod publish;
pub mod release;
pub mod report;
pub mod ui;
pub mod utils;
