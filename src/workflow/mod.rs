//! Workflow Definition Module
//!
//! Provides the data structures a run operates on.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (Workflow, Stage)
//! - [`action`]: The Action trait and ready-made implementations
//! - [`tags`]: Tag sets and tag-based queries

pub mod action;
pub mod model;
pub mod tags;

pub use action::{Action, BaseAction, FnAction};
pub use model::{Stage, Workflow};
pub use tags::{TagSet, Tagged};
