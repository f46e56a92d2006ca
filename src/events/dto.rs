use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo::{Event, EventFields};
use crate::error::AppError;

/// Body for create and update. Unknown fields, an owner id included, are
/// ignored. A missing start means "now".
#[derive(Debug, Deserialize)]
pub struct SaveEventRequest {
    pub title: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_datetime: Option<OffsetDateTime>,
    #[serde(default)]
    pub timezone_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SaveEventRequest {
    pub fn into_fields(self) -> Result<EventFields, AppError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::BadRequest("Title is required".into()));
        }
        Ok(EventFields {
            title,
            start_datetime: self
                .start_datetime
                .unwrap_or_else(OffsetDateTime::now_utc),
            timezone_id: self.timezone_id.filter(|tz| !tz.trim().is_empty()),
            description: self.description,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub data: Vec<Event>,
}

#[derive(Debug, Serialize)]
pub struct CreatedEventResponse {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 { 50 }

const MAX_LIMIT: i64 = 100;

impl Pagination {
    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_LIMIT), self.offset.max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_field_in_body_is_ignored() {
        let req: SaveEventRequest = serde_json::from_str(
            r#"{"title":"standup","start_datetime":"2024-05-01T09:30:00Z","organizer_id":999}"#,
        )
        .unwrap();
        let fields = req.into_fields().unwrap();
        assert_eq!(fields.title, "standup");
        assert_eq!(fields.timezone_id, None);
    }

    #[test]
    fn missing_start_defaults_to_now() {
        let before = OffsetDateTime::now_utc();
        let req: SaveEventRequest = serde_json::from_str(r#"{"title":"standup"}"#).unwrap();
        let fields = req.into_fields().unwrap();
        assert!(fields.start_datetime >= before);
        assert!(fields.start_datetime <= OffsetDateTime::now_utc());
    }

    #[test]
    fn bad_start_is_rejected() {
        let parsed =
            serde_json::from_str::<SaveEventRequest>(r#"{"title":"standup","start_datetime":"tomorrow"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn blank_title_is_rejected() {
        let req: SaveEventRequest =
            serde_json::from_str(r#"{"title":"  ","start_datetime":"2024-05-01T09:30:00Z"}"#)
                .unwrap();
        assert!(matches!(req.into_fields(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn pagination_is_clamped() {
        let p: Pagination = serde_json::from_str(r#"{"limit":10000,"offset":-5}"#).unwrap();
        assert_eq!(p.clamped(), (100, 0));
        let default: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(default.clamped(), (50, 0));
    }
}
