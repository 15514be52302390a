//! Text and JSON rendering of metadata records.

use crate::dublincore::{Field, MetadataRecord};
use crate::error::{Error, Result};

/// JSON output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonFormat {
    /// Compact single-line JSON
    Compact,
    /// Pretty-printed with 2-space indentation
    #[default]
    Pretty,
}

/// Fields shown by [`to_text`], in display order.
pub const SUMMARY_FIELDS: [Field; 5] = [
    Field::Title,
    Field::Creator,
    Field::Keywords,
    Field::Description,
    Field::Category,
];

/// Convert a record to JSON. Empty fields are omitted.
pub fn to_json(record: &MetadataRecord, format: JsonFormat) -> Result<String> {
    let json = match format {
        JsonFormat::Compact => serde_json::to_string(record),
        JsonFormat::Pretty => serde_json::to_string_pretty(record),
    };
    json.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

/// Values of a field joined for display, or `(none)` when it has none.
pub fn display_values(values: &[String]) -> String {
    match values {
        [] => "(none)".to_string(),
        [only] if only.is_empty() => "(none)".to_string(),
        _ => values.join(", "),
    }
}

/// One `Label: values` line per summary field.
pub fn to_text(record: &MetadataRecord) -> String {
    SUMMARY_FIELDS
        .iter()
        .map(|field| {
            let label = format!("{}:", field.label());
            format!("{:<12} {}", label, display_values(record.values(*field)))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_json_pretty() {
        let mut record = MetadataRecord::default();
        record.set_title("Test");
        let json = to_json(&record, JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"title\""));
        assert!(json.contains('\n'));
        assert!(!json.contains("creator"));
    }

    #[test]
    fn test_to_json_compact() {
        let mut record = MetadataRecord::default();
        record.add_keyword("rust");
        let json = to_json(&record, JsonFormat::Compact).unwrap();
        assert_eq!(json, r#"{"keywords":["rust"]}"#);
    }

    #[test]
    fn test_display_values() {
        assert_eq!(display_values(&[]), "(none)");
        assert_eq!(display_values(&[String::new()]), "(none)");
        assert_eq!(
            display_values(&["a".to_string(), "b".to_string()]),
            "a, b"
        );
    }

    #[test]
    fn test_to_text() {
        let mut record = MetadataRecord::default();
        record.set_title("Role");
        record.enforce_category();
        let text = to_text(&record);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Title:       Role");
        assert_eq!(lines[1], "Creator:     (none)");
        assert_eq!(lines[4], "Category:    curriculo");
    }
}
