use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A durable reference to an uploaded file, staged before any send attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedAttachment {
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    pub path: PathBuf,
}
