use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Per-user, per-calendar-day request counter. The (user_id, usage_date)
/// pair is unique; `usage_date` is a `YYYY-MM-DD` string so the key stays
/// comparable across timezones and storage drivers.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiUsage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub usage_date: String,
    pub request_count: i32,
}
