//! Database operations for the identity resolution engine
//!
//! The description store owns captures; the group registry owns groups.
//! The resolution orchestrator is the only writer that sets a capture's
//! `group_id` or creates a group, and does so inside one transaction.

pub mod allocator;
pub mod captures;
pub mod groups;
pub mod settings;
