use airiss_core::Table;
use chrono::{DateTime, Utc};

use super::ids::DatasetId;

/// What an upload hands to the registry.
#[derive(Debug, Clone)]
pub struct NewDataset {
    pub source_name: String,
    pub table: Table,
}

/// An uploaded dataset. Never mutated once stored.
#[derive(Debug, Clone)]
pub struct DatasetRecord {
    pub id: DatasetId,
    pub source_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub record_count: usize,
    pub field_names: Vec<String>,
    pub comment_fields: Vec<String>,
    pub table: Table,
}

impl DatasetRecord {
    pub fn new(id: DatasetId, upload: NewDataset) -> Self {
        let NewDataset { source_name, table } = upload;
        Self {
            id,
            source_name,
            uploaded_at: Utc::now(),
            record_count: table.record_count(),
            field_names: table.headers.clone(),
            comment_fields: table.comment_fields(),
            table,
        }
    }
}
