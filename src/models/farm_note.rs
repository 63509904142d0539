use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    #[default]
    Note,
    Investment,
}

impl NoteType {
    pub fn as_str(self) -> &'static str {
        match self {
            NoteType::Note => "note",
            NoteType::Investment => "investment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "note" => Some(NoteType::Note),
            "investment" => Some(NoteType::Investment),
            _ => None,
        }
    }
}

/// Storage shape; `note_type` is kept as text, `created_at` is assigned by
/// the store at insert
#[derive(Debug, Clone, FromRow)]
pub struct FarmNoteRow {
    pub id: i32,
    pub farm_id: i32,
    pub created_at: DateTime<Utc>,
    pub note: String,
    pub note_type: String,
    pub value: Decimal,
}

impl FarmNoteRow {
    pub fn into_view(self) -> Result<FarmNote, ApiError> {
        let note_type = NoteType::parse(&self.note_type).ok_or_else(|| {
            tracing::error!(note = self.id, note_type = %self.note_type, "invalid note type in store");
            ApiError::internal_server_error("an error occurred while processing your request")
        })?;

        Ok(FarmNote {
            id: self.id,
            farm_id: self.farm_id,
            created_at: self.created_at,
            note: self.note,
            note_type,
            value: self.value,
        })
    }
}

/// Wire shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmNote {
    pub id: i32,
    pub farm_id: i32,
    pub created_at: DateTime<Utc>,
    pub note: String,
    pub note_type: NoteType,
    pub value: Decimal,
}

/// Writable fields for create; `note_type` and `value` carry entity
/// defaults, `farm_id` always comes from the path
#[derive(Debug, Deserialize)]
pub struct FarmNoteBody {
    pub note: String,
    #[serde(default)]
    pub note_type: NoteType,
    #[serde(default)]
    pub value: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct FarmNotePatch {
    pub note: Option<String>,
    pub note_type: Option<NoteType>,
    pub value: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_defaults_match_entity_defaults() {
        let body: FarmNoteBody = serde_json::from_str(r#"{"note": "watered"}"#).unwrap();
        assert_eq!(body.note_type, NoteType::Note);
        assert_eq!(body.value, Decimal::ZERO);
    }

    #[test]
    fn value_accepts_plain_numbers() {
        let body: FarmNoteBody =
            serde_json::from_str(r#"{"note": "fertilizer", "note_type": "investment", "value": 12.5}"#)
                .unwrap();
        assert_eq!(body.note_type, NoteType::Investment);
        assert_eq!(body.value, Decimal::new(125, 1));
    }

    #[test]
    fn unknown_note_type_is_rejected_at_the_boundary() {
        let parsed: Result<FarmNoteBody, _> =
            serde_json::from_str(r#"{"note": "x", "note_type": "memo"}"#);
        assert!(parsed.is_err());
    }
}
