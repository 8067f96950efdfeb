//! Core types shared by the page tree, the document store and persistence.

use uuid::Uuid;

/// PageId: generated identifier of a page in the sidebar tree
pub type PageId = String;

/// BlockId: generated identifier of a content block within a page
pub type BlockId = String;

/// Timestamp: milliseconds since the Unix epoch
pub type Timestamp = i64;

/// Generate a fresh record id.
///
/// Ids are UUIDv7 in simple (dash-free) form, so they embed their creation time.
pub fn generate_id() -> String {
    Uuid::now_v7().simple().to_string()
}

/// Current wall-clock time in milliseconds.
pub fn now_ms() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}
