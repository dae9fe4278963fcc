use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::types::Role;

pub type UserId = u64;

/// A registered account together with the profile fields the cores need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub last_active_at: OffsetDateTime,
}
