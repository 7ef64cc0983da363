//! Release ledger and orchestration
//!
//! Every release is an annotated git tag `<track>_<major>.<minor>.<patch>`.
//! The tag set is the only source of truth: the latest release of a track,
//! the first release of a new track and whether a tag still needs publishing
//! are all derived from it. Each tagged commit carries the installation
//! snapshot the release was built from, which is what change detection
//! compares against.

pub mod detector;
pub mod ledger;
pub mod orchestrator;
pub mod snapshot;
pub mod tag;
pub mod track;
pub mod version;
