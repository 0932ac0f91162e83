//! Domain model module declarations.

pub mod event;
pub mod issue;
pub mod state;
pub mod task;
