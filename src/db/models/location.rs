use serde::{Deserialize, Serialize};

/// Dictionary row for a resolved place, unique by name. The name is either a
/// "City, Country" string or the unidentified sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
}
