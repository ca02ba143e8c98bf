//! Notification record model

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::is_blank;

/// Backend-assigned identifier; 0 until the record has been created.
pub type NotificationId = i64;

const OCCURS_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const OCCURS_AT_WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const OCCURS_AT_LEN: usize = 19;

/// A remote-origin reminder item as exchanged with the agenda backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(default)]
    pub id: NotificationId,
    #[serde(rename = "firma", default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(rename = "adSoyad", default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(rename = "tel", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "cep", default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(rename = "aciklama", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// ISO-8601 wall-clock time; a trailing `Z` is not a UTC marker.
    #[serde(rename = "tarih", default, skip_serializing_if = "Option::is_none")]
    pub occurs_at: Option<String>,
    #[serde(rename = "okundu", default, skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<i64>,
    #[serde(rename = "user", default, skip_serializing_if = "Option::is_none")]
    pub entered_by: Option<String>,
}

impl NotificationRecord {
    /// Occurrence time as naive local wall-clock time.
    #[must_use]
    pub fn occurs_at_local(&self) -> Option<NaiveDateTime> {
        self.occurs_at.as_deref().and_then(parse_occurs_at)
    }

    /// Calendar date of the occurrence time.
    #[must_use]
    pub fn occurs_on(&self) -> Option<NaiveDate> {
        self.occurs_at_local().map(|value| value.date())
    }

    /// Whether the backend marks this record as completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_read == Some(true)
    }

    /// Check the fields the backend requires for add and update.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("company", self.company.as_deref()),
            ("full name", self.full_name.as_deref()),
            ("phone", self.phone.as_deref()),
            ("mobile", self.mobile.as_deref()),
            ("description", self.description.as_deref()),
            ("entered by", self.entered_by.as_deref()),
        ];
        let missing = required
            .iter()
            .filter(|(_, value)| is_blank(*value))
            .map(|(name, _)| *name)
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(Error::validation(format!(
                "required fields are blank: {}",
                missing.join(", ")
            )));
        }
        if is_blank(self.occurs_at.as_deref()) {
            return Err(Error::validation("an occurrence time is required"));
        }
        Ok(())
    }
}

/// User input for a new record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationDraft {
    pub company: String,
    pub full_name: String,
    pub phone: String,
    pub mobile: String,
    pub description: String,
    pub occurs_at: Option<NaiveDateTime>,
    pub entered_by: String,
    pub completed: bool,
}

impl NotificationDraft {
    /// Convert into the wire record with `id = 0`, trimming every text field.
    #[must_use]
    pub fn into_record(self) -> NotificationRecord {
        NotificationRecord {
            id: 0,
            company: Some(self.company.trim().to_string()),
            full_name: Some(self.full_name.trim().to_string()),
            phone: Some(self.phone.trim().to_string()),
            mobile: Some(self.mobile.trim().to_string()),
            description: Some(self.description.trim().to_string()),
            occurs_at: self.occurs_at.map(format_occurs_at),
            is_read: Some(self.completed),
            owner_user_id: None,
            entered_by: Some(self.entered_by.trim().to_string()),
        }
    }
}

/// Parse a backend occurrence time into naive wall-clock time.
///
/// Every `Z` is removed and only the first 19 characters
/// (`YYYY-MM-DDTHH:MM:SS`) are read, so fractional seconds and offsets are
/// ignored. The result must be read as local time, not UTC.
pub fn parse_occurs_at(raw: &str) -> Option<NaiveDateTime> {
    let cleaned = raw.trim().replace('Z', "");
    let head = cleaned.get(..OCCURS_AT_LEN)?;
    NaiveDateTime::parse_from_str(head, OCCURS_AT_FORMAT).ok()
}

/// Format a wall-clock time the way the backend expects it.
pub fn format_occurs_at(value: NaiveDateTime) -> String {
    value.format(OCCURS_AT_WIRE_FORMAT).to_string()
}

/// Resolve naive wall-clock time in the local zone.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times that do
/// not exist locally (DST spring-forward gap) resolve to `None`.
pub fn to_local_instant(value: NaiveDateTime) -> Option<DateTime<Local>> {
    Local.from_local_datetime(&value).earliest()
}
