use serde::Deserialize;

use crate::config;

pub mod auth;
pub mod farm_notes;
pub mod farms;
pub mod gardens;
pub mod probe;
pub mod seeds;

/// Offset/limit paging accepted by every list endpoint
#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    30
}

impl Pagination {
    /// Clamp to sane bounds: offset never negative, limit capped by config
    pub fn clamp(&self) -> (i64, i64) {
        let max = config::config().api.max_page_size;
        (self.offset.max(0), self.limit.clamp(0, max))
    }
}
