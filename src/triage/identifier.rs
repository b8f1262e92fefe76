//! Complaint identifier generation.

use tracing::info;
use uuid::Uuid;

use super::types::ComplaintId;

/// Generate a fresh random (v4) complaint identifier.
pub fn generate() -> ComplaintId {
    let id = ComplaintId::new(Uuid::new_v4().to_string());
    info!(complaint_id = %id, "Generated complaint ID");
    id
}
