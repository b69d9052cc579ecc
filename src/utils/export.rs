use crate::domain::model::Contact;
use crate::utils::error::{Result, SelectionError};
use serde_json::Value;
use std::collections::BTreeSet;

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders contacts as CSV: `id`, `tags` (`;`-joined), then every other column
/// seen across the batch in sorted order.
pub fn contacts_to_csv(contacts: &[Contact]) -> Result<String> {
    let columns: BTreeSet<&str> = contacts
        .iter()
        .flat_map(|c| c.attributes.keys().map(String::as_str))
        .filter(|col| *col != "tags")
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_error = |e: csv::Error| SelectionError::Unknown {
        message: format!("CSV export failed: {}", e),
    };

    let mut header = vec!["id", "tags"];
    header.extend(columns.iter().copied());
    writer.write_record(&header).map_err(csv_error)?;

    for contact in contacts {
        let mut row = vec![
            contact.id.to_string(),
            contact.tags().collect::<Vec<_>>().join(";"),
        ];
        row.extend(
            columns
                .iter()
                .map(|col| contact.attributes.get(*col).map(cell).unwrap_or_default()),
        );
        writer.write_record(&row).map_err(csv_error)?;
    }

    let bytes = writer.into_inner().map_err(|e| SelectionError::Unknown {
        message: format!("CSV export failed: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| SelectionError::Unknown {
        message: format!("CSV export failed: {}", e),
    })
}
