//! DTOs for the internal statistics endpoint.

use serde::{Deserialize, Serialize};

use crate::domain::repositories::StorageStats;

/// Live URL and user counts.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsResponse {
    pub urls: usize,
    pub users: usize,
}

impl From<StorageStats> for StatsResponse {
    fn from(stats: StorageStats) -> Self {
        Self {
            urls: stats.urls,
            users: stats.users,
        }
    }
}
