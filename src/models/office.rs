use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Office {
    pub office_id: i64,
    #[serde(default)]
    pub room_number: Option<String>,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOffice {
    #[serde(default)]
    pub room_number: Option<String>,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}
