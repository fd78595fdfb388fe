use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DocumentId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    File,
    Url,
}

/// Document row as the backend returns it from the files, confirm and url
/// endpoints. Every field past `id` is optional on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: DocumentId,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub processing_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A document or URL attached to a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub id: DocumentId,
    pub display_name: String,
    pub kind: SourceKind,
    /// Free-form and owned by the backend; interpret it through the
    /// pipeline resolver rather than comparing strings.
    pub processing_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Source {
    /// Source as listed by `GET /api/projects/{id}/files`.
    pub fn from_listing(record: DocumentRecord) -> Self {
        let display_name = non_empty(record.filename.as_deref())
            .or_else(|| non_empty(record.source_url.as_deref()))
            .unwrap_or("Untitled")
            .to_string();
        Self::with_name(record, display_name)
    }

    /// Source created by registering a website URL; the URL itself is the
    /// preferred display name.
    pub fn from_registered_url(record: DocumentRecord) -> Self {
        let display_name = non_empty(record.source_url.as_deref())
            .or_else(|| non_empty(record.filename.as_deref()))
            .unwrap_or("Untitled")
            .to_string();
        let mut source = Self::with_name(record, display_name);
        if source.kind == SourceKind::File && source.display_name.contains("://") {
            source.kind = SourceKind::Url;
        }
        source
    }

    /// Source created by a confirmed upload, named after the local file.
    pub fn from_confirmed_upload(record: DocumentRecord, file_name: &str) -> Self {
        let mut source = Self::with_name(record, file_name.to_string());
        source.kind = SourceKind::File;
        source
    }

    pub fn is_queued(&self) -> bool {
        self.processing_status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("queued"))
    }

    fn with_name(record: DocumentRecord, display_name: String) -> Self {
        let created_at = record
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);
        Self {
            id: record.id,
            display_name,
            kind: record.source_type.unwrap_or_default(),
            processing_status: record.processing_status,
            created_at,
        }
    }
}

/// Parses backend timestamps, which arrive either as RFC 3339 or as naive
/// ISO-8601 values assumed to be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
