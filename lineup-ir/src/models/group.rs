//! Person-group record — the canonical identity bucket
//!
//! **[IRE-DB-020]** Group registry persistence

use lineup_common::group_code::group_id_to_code;
use serde::{Deserialize, Serialize};

/// A canonical person-group
///
/// Created only by the resolution engine when no existing group is
/// accepted. Never merged or deleted by this subsystem — once two groups
/// exist independently, nothing reconciles them even if later evidence
/// shows they are the same person (known limitation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonGroup {
    /// Allocator-assigned id, unique, never reused
    pub id: i64,

    /// Human display code derived from `id` (base-26, "AA", "AB", ...)
    pub display_code: String,

    /// The capture whose schema/image is the group's canonical comparison target
    pub representative_capture_id: i64,

    /// Cached count of captures referencing this group
    pub member_count: i64,

    pub created_at: String,
    pub updated_at: String,
}

impl PersonGroup {
    /// Build a group record from raw row values, deriving the display code
    pub fn from_row(
        id: i64,
        representative_capture_id: i64,
        member_count: i64,
        created_at: String,
        updated_at: String,
    ) -> Self {
        Self {
            id,
            display_code: group_id_to_code(id),
            representative_capture_id,
            member_count,
            created_at,
            updated_at,
        }
    }
}
