use serde::{Deserialize, Serialize};

use super::position::DocumentId;

/// Write commands applied from the replicated log. The log machinery
/// serialises these across the cluster; the engine only implements the apply
/// side.
///
/// Wire shape is `{"op": "index", "data": {...}}` with camelCase fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", content = "data", rename_all = "camelCase")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    Index {
        doc_id: DocumentId,
        document: String,
    },

    #[serde(rename_all = "camelCase")]
    BulkIndex {
        doc_ids: Vec<DocumentId>,
        documents: Vec<String>,
    },
}

impl Command {
    /// Get a human-readable name for this command (for logging)
    pub fn name(&self) -> &'static str {
        match self {
            Command::Index { .. } => "index",
            Command::BulkIndex { .. } => "bulkIndex",
        }
    }
}
