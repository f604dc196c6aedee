use serde::{Deserialize, Serialize};

/// Dictionary row for a raw activity token (e.g. `IN_TRAM`, `WALKING`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityType {
    pub id: i64,
    pub token: String,
}
