//! Workflow document schema
//!
//! A workflow is a purchasable automation artifact (a JSON export) listed
//! in the store catalog.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped};
use crate::db::schemas::Audit;

/// Collection name for workflows
pub const WORKFLOW_COLLECTION: &str = "workflows";

/// Workflow document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct WorkflowDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common audit metadata
    #[serde(default)]
    pub audit: Audit,

    /// Stable slug used in URLs and purchase rows
    pub workflow_id: String,

    /// Display name
    pub name: String,

    /// Catalog description
    #[serde(default)]
    pub description: String,

    /// Price in cents
    #[serde(default)]
    pub price_cents: i64,

    /// Whether the workflow is purchasable and downloadable
    #[serde(default)]
    pub active: bool,

    /// The downloadable artifact (workflow JSON export)
    #[serde(default)]
    pub artifact: Document,
}

impl WorkflowDoc {
    /// Suggested download filename for the artifact
    pub fn artifact_filename(&self) -> String {
        format!("{}.json", self.workflow_id)
    }
}

impl IntoIndexes for WorkflowDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "workflow_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("workflow_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "active": 1 },
                Some(
                    IndexOptions::builder()
                        .name("active_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl Stamped for WorkflowDoc {
    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}
