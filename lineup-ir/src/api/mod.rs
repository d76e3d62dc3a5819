//! HTTP API handlers for lineup-ir
//!
//! **[IRE-API-010]** REST surface for capture ingest, resolution, and
//! group inspection

pub mod captures;
pub mod groups;
pub mod health;

pub use captures::capture_routes;
pub use groups::group_routes;
pub use health::health_routes;
