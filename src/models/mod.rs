use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub mod farm;
pub mod farm_note;
pub mod garden;
pub mod seed;

/// List envelope returned by every collection endpoint. `next` and
/// `previous` are reserved pagination cursors and currently always null.
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(count: i64, items: Vec<T>) -> Self {
        Self {
            count,
            next: None,
            previous: None,
            items,
        }
    }
}

pub(crate) fn check_len(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.len() > max {
        return Err(ApiError::bad_request(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_serializes_reserved_cursors_as_null() {
        let page = Page::new(2, vec![1, 2]);
        let body = serde_json::to_value(&page).unwrap();
        assert_eq!(body["count"], 2);
        assert!(body["next"].is_null());
        assert!(body["previous"].is_null());
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn check_len_flags_overlong_values() {
        assert!(check_len("code", "G123456789", 10).is_ok());
        assert!(check_len("code", "G1234567890", 10).is_err());
    }
}
