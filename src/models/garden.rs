use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::ApiError;
use crate::models::check_len;

/// A garden plot. Storage and wire shape coincide, so one struct serves
/// both sides.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Garden {
    pub id: i32,
    pub code: String,
    pub size: i32,
}

/// Writable fields for create
#[derive(Debug, Deserialize)]
pub struct GardenBody {
    pub code: String,
    pub size: i32,
}

impl GardenBody {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_len("code", &self.code, 10)
    }
}

/// Sparse writable fields for partial update and upsert
#[derive(Debug, Default, Deserialize)]
pub struct GardenPatch {
    pub code: Option<String>,
    pub size: Option<i32>,
}

impl GardenPatch {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(code) = &self.code {
            check_len("code", code, 10)?;
        }
        Ok(())
    }
}
