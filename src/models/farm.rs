use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::ApiError;
use crate::models::check_len;

/// Growth cycle state label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FarmState {
    Germinating,
    Vegetating,
    Fruiting,
    Ripening,
    Dying,
}

impl FarmState {
    pub fn as_str(self) -> &'static str {
        match self {
            FarmState::Germinating => "germinating",
            FarmState::Vegetating => "vegetating",
            FarmState::Fruiting => "fruiting",
            FarmState::Ripening => "ripening",
            FarmState::Dying => "dying",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "germinating" => Some(FarmState::Germinating),
            "vegetating" => Some(FarmState::Vegetating),
            "fruiting" => Some(FarmState::Fruiting),
            "ripening" => Some(FarmState::Ripening),
            "dying" => Some(FarmState::Dying),
            _ => None,
        }
    }
}

/// Storage shape; `state` is kept as text in the store
#[derive(Debug, Clone, FromRow)]
pub struct FarmRow {
    pub id: i32,
    pub code: String,
    pub born_date: NaiveDate,
    pub state: String,
    pub gardem_id: i32,
    pub seed_id: i32,
}

impl FarmRow {
    pub fn into_view(self) -> Result<Farm, ApiError> {
        let state = FarmState::parse(&self.state).ok_or_else(|| {
            tracing::error!(farm = self.id, state = %self.state, "invalid state in store");
            ApiError::internal_server_error("an error occurred while processing your request")
        })?;

        Ok(Farm {
            id: self.id,
            code: self.code,
            born_date: self.born_date,
            state,
            gardem_id: self.gardem_id,
            seed_id: self.seed_id,
        })
    }
}

/// Wire shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farm {
    pub id: i32,
    pub code: String,
    pub born_date: NaiveDate,
    pub state: FarmState,
    pub gardem_id: i32,
    pub seed_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct FarmBody {
    pub code: String,
    pub born_date: NaiveDate,
    pub state: FarmState,
    pub gardem_id: i32,
    pub seed_id: i32,
}

impl FarmBody {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_len("code", &self.code, 10)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FarmPatch {
    pub code: Option<String>,
    pub born_date: Option<NaiveDate>,
    pub state: Option<FarmState>,
    pub gardem_id: Option<i32>,
    pub seed_id: Option<i32>,
}

impl FarmPatch {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(code) = &self.code {
            check_len("code", code, 10)?;
        }
        Ok(())
    }
}
