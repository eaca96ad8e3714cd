//! Wire shapes exchanged with the backend. Timestamps are RFC 3339 in UTC.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
}

impl Activity {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// A single tracking session. A missing `stop` means the timer is still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub activity_id: Uuid,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub stop: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub distractions: Option<u32>,
}

impl TimeEntry {
    pub fn is_running(&self) -> bool {
        self.stop.is_none()
    }

    /// End of the session, running sessions end at `now`.
    pub fn end_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.stop.unwrap_or(now)
    }

    /// Tracked duration. Sessions whose stop precedes start count as empty.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        (self.end_or(now) - self.start).max(Duration::zero())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewActivity {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartTimer {
    pub activity_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTimeEntry {
    pub activity_id: Uuid,
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distractions: Option<u32>,
}

/// Session annotations. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distractions: Option<u32>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        *self == EntryPatch::default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTag {
    pub name: String,
}

/// Filter for listing time entries. `from` is inclusive, `to` exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EntryRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub activity_id: Option<Uuid>,
}

impl EntryRange {
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            activity_id: None,
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![];
        if let Some(from) = self.from {
            query.push(("from", from.to_rfc3339()));
        }
        if let Some(to) = self.to {
            query.push(("to", to.to_rfc3339()));
        }
        if let Some(activity_id) = self.activity_id {
            query.push(("activity_id", activity_id.to_string()));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    fn entry(stop: Option<i64>) -> TimeEntry {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        TimeEntry {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            activity_id: Uuid::new_v4(),
            start,
            stop: stop.map(|m| start + Duration::minutes(m)),
            rating: None,
            comment: None,
            tags: vec![],
            distractions: None,
        }
    }

    #[test]
    fn running_entry_lasts_until_now() {
        let running = entry(None);
        let now = running.start + Duration::minutes(7);
        assert!(running.is_running());
        assert_eq!(running.duration(now), Duration::minutes(7));
    }

    #[test]
    fn inverted_entry_has_no_duration() {
        let inverted = entry(Some(-10));
        assert_eq!(inverted.duration(Utc::now()), Duration::zero());
    }

    #[test]
    fn entry_parses_with_missing_optionals() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000001",
            "owner_id": "00000000-0000-0000-0000-000000000002",
            "activity_id": "00000000-0000-0000-0000-000000000003",
            "start": "2025-01-01T10:00:00Z"
        }"#;
        let parsed: TimeEntry = serde_json::from_str(json).unwrap();
        assert!(parsed.is_running());
        assert!(parsed.tags.is_empty());
    }

    #[test]
    fn patch_only_serializes_set_fields() {
        let patch = EntryPatch {
            rating: Some(4),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"rating":4}"#);
        assert!(EntryPatch::default().is_empty());
    }

    #[test]
    fn range_query_skips_unset_bounds() {
        let range = EntryRange {
            from: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        assert_eq!(
            range.query(),
            vec![("from", "2025-01-01T00:00:00+00:00".to_string())]
        );
    }
}
