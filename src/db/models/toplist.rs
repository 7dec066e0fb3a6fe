// Toplist Model
// Registrable domains ranked by how often they were requested

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TopListEntry {
    pub domain: String,
    pub count: i64,
}
