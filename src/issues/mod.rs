//! Result pipeline: turn a finalized task list into tracker issues.
//!
//! - `slug`: local repository-slug guard applied before any create call.
//! - `pipeline`: preview (dry-run) and create flows with summary counting.

pub mod pipeline;
pub mod slug;
