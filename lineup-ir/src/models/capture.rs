//! Capture record — one per analyzed photo
//!
//! **[IRE-DB-010]** Capture persistence (description store)

use serde::{Deserialize, Serialize};

/// A single analyzed photo with its appearance description
///
/// `description_schema` is the structured attribute object produced by the
/// external Describer (clothing, hair, build, accessories, distinctive
/// marks, per-field confidences). This subsystem never interprets the
/// fields — it forwards the schema verbatim as comparison input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capture {
    /// Store-assigned id, monotonically increasing
    pub id: i64,

    /// Opaque reference/URI to the rendered crop
    pub image_ref: String,

    /// Structured appearance profile (opaque comparison input)
    pub description_schema: Option<serde_json::Value>,

    /// Short textual description derived from the schema; fallback
    /// comparison artifact when a candidate lacks a schema
    pub natural_summary: Option<String>,

    /// When the photo was taken (caller-supplied, RFC 3339)
    pub captured_at: Option<String>,

    /// When the row was created
    pub created_at: String,

    /// Resolved person-group; NULL until resolution commits
    pub group_id: Option<i64>,
}

impl Capture {
    /// Whether the capture has a usable description for grouping
    ///
    /// An absent schema and an empty object (`{}`) are both unusable; the
    /// resolution engine must ask the Describer first.
    pub fn has_usable_description(&self) -> bool {
        match &self.description_schema {
            Some(serde_json::Value::Object(map)) => !map.is_empty(),
            Some(serde_json::Value::Null) => false,
            Some(_) => true,
            None => false,
        }
    }
}
