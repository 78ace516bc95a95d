use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Signed,
}

/// The text signature last stamped onto a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub text: String,
    /// Logical font name as requested, not the font it resolved to.
    pub font: Option<String>,
    pub x: f64,
    pub y: f64,
    pub page: i64,
    pub signed_at: DateTime<Utc>,
}

/// Metadata record of an uploaded document.
/// Identified by `(user_id, filename)`, where `filename` is the storage key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub filename: String,
    pub original_name: String,
    pub user_id: String,
    pub date_uploaded: DateTime<Utc>,
    pub size: u64,
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

impl Document {
    pub fn new_pending(
        user_id: impl Into<String>,
        filename: impl Into<String>,
        original_name: impl Into<String>,
        size: u64,
        date_uploaded: DateTime<Utc>,
    ) -> Self {
        Document {
            filename: filename.into(),
            original_name: original_name.into(),
            user_id: user_id.into(),
            date_uploaded,
            size,
            status: DocumentStatus::Pending,
            signature: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serializes_with_camel_case_and_lowercase_status() {
        let uploaded = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let doc = Document::new_pending("u1", "1700000000000-a.pdf", "a.pdf", 10, uploaded);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["originalName"], "a.pdf");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["status"], "pending");
        assert!(json.get("signature").is_none());

        let back: Document = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn signature_sub_record_shape() {
        let signature = Signature {
            text: "Alice".to_owned(),
            font: Some("Serif".to_owned()),
            x: 100.0,
            y: 720.0,
            page: 0,
            signed_at: Utc.timestamp_opt(1_700_000_100, 0).unwrap(),
        };
        let json = serde_json::to_value(&signature).unwrap();
        assert_eq!(json["text"], "Alice");
        assert_eq!(json["font"], "Serif");
        assert_eq!(json["x"], 100.0);
        assert!(json.get("signedAt").is_some());
    }
}
