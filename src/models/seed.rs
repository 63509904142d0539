use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::ApiError;
use crate::models::check_len;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Seed {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedBody {
    pub name: String,
}

impl SeedBody {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_len("name", &self.name, 100)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SeedPatch {
    pub name: Option<String>,
}

impl SeedPatch {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = &self.name {
            check_len("name", name, 100)?;
        }
        Ok(())
    }
}
