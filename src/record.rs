//! Wire and storage types.

use serde::{Deserialize, Serialize};

/// Timestamp format used for records and report headers.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One processed upload, as persisted in the history log and returned to the
/// client.
///
/// Fields are private-by-convention once built: the orchestrator creates a
/// record, appends it, and only then hands a clone back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub success: bool,
    /// Sanitised client file name.
    pub filename: String,
    pub damage_type: String,
    pub image_caption: String,
    pub loss_description: String,
    /// Base64 of the canonical JPEG re-encode.
    pub image_data: String,
    /// Local creation time, [`TIMESTAMP_FORMAT`].
    pub timestamp: String,
}

impl ResultRecord {
    /// Build the report input for this record.
    pub fn to_report_spec(&self) -> ReportSpec {
        ReportSpec {
            damage_type: self.damage_type.clone(),
            description: self.loss_description.clone(),
            image_data: Some(self.image_data.clone()),
        }
    }
}

/// Input to [`crate::report::ReportRenderer::render`].
///
/// Accepted standalone so a client can regenerate a report after editing the
/// description text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSpec {
    #[serde(default)]
    pub damage_type: String,
    #[serde(default)]
    pub description: String,
    /// Base64 image, optionally with a `data:image/...;base64,` prefix.
    /// An empty string is treated like `None`.
    #[serde(default)]
    pub image_data: Option<String>,
}

impl ReportSpec {
    /// The embedded image payload, if any non-empty one was supplied.
    pub fn image_payload(&self) -> Option<&str> {
        self.image_data
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uses_snake_case_wire_names() {
        let r = ResultRecord {
            success: true,
            filename: "roof.jpg".into(),
            damage_type: "Water Damage".into(),
            image_caption: "a wet ceiling".into(),
            loss_description: "Water staining across the ceiling.".into(),
            image_data: "AAAA".into(),
            timestamp: "2024-01-02 03:04:05".into(),
        };
        let v = serde_json::to_value(&r).unwrap();
        for key in [
            "success",
            "filename",
            "damage_type",
            "image_caption",
            "loss_description",
            "image_data",
            "timestamp",
        ] {
            assert!(v.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn report_spec_fields_default_when_missing() {
        let spec: ReportSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec, ReportSpec::default());
        assert!(spec.image_payload().is_none());
    }

    #[test]
    fn empty_image_data_is_absent() {
        let spec: ReportSpec =
            serde_json::from_str(r#"{"description":"x","image_data":"  "}"#).unwrap();
        assert!(spec.image_payload().is_none());
    }

    #[test]
    fn record_converts_to_report_spec() {
        let r = ResultRecord {
            success: true,
            filename: "a.png".into(),
            damage_type: "Fire".into(),
            image_caption: "c".into(),
            loss_description: "d".into(),
            image_data: "QUJD".into(),
            timestamp: "t".into(),
        };
        let spec = r.to_report_spec();
        assert_eq!(spec.damage_type, "Fire");
        assert_eq!(spec.description, "d");
        assert_eq!(spec.image_payload(), Some("QUJD"));
    }
}
