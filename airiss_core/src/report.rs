use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::Writer;
use tracing::info;

use crate::{CoreError, ResultItem};

/// Renders result items as CSV: `row_index`, `subject`, the analyzed fields,
/// then `ai_feedback`. Field columns come from `field_names`; an item missing
/// one of them leaves the cell empty.
pub fn render_csv(field_names: &[String], items: &[ResultItem]) -> Result<Vec<u8>, CoreError> {
    let mut writer = Writer::from_writer(Vec::new());

    let mut header = vec!["row_index".to_string(), "subject".to_string()];
    header.extend(field_names.iter().cloned());
    header.push("ai_feedback".to_string());
    writer.write_record(&header)?;

    for item in items {
        let mut record = vec![item.row_index.to_string(), item.subject.clone()];
        for name in field_names {
            let value = item
                .fields
                .iter()
                .find(|f| &f.name == name)
                .map(|f| f.value.clone())
                .unwrap_or_default();
            record.push(value);
        }
        record.push(item.ai_feedback.clone().unwrap_or_default());
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| CoreError::Io(std::io::Error::other(e.to_string())))
}

pub fn save_json(data: &serde_json::Value, path: &Path) -> Result<(), CoreError> {
    let mut file = File::create(path)?;
    file.write_all(serde_json::to_string_pretty(data)?.as_bytes())?;
    info!(path = %path.display(), "wrote summary");
    Ok(())
}

pub fn save_bytes(content: &[u8], path: &Path) -> Result<(), CoreError> {
    let mut file = File::create(path)?;
    file.write_all(content)?;
    info!(path = %path.display(), bytes = content.len(), "wrote results");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldValue;

    #[test]
    fn renders_header_and_rows_in_order() {
        let items = vec![
            ResultItem {
                row_index: 0,
                subject: "Kim".into(),
                fields: vec![FieldValue {
                    name: "opinion".into(),
                    value: "Calm, thorough".into(),
                }],
                ai_feedback: Some("Strengths: focus".into()),
            },
            ResultItem {
                row_index: 2,
                subject: "Park".into(),
                fields: Vec::new(),
                ai_feedback: None,
            },
        ];
        let bytes = render_csv(&["opinion".to_string()], &items).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "row_index,subject,opinion,ai_feedback\n\
             0,Kim,\"Calm, thorough\",Strengths: focus\n\
             2,Park,,\n"
        );
    }

    #[test]
    fn empty_result_still_has_header() {
        let bytes = render_csv(&[], &[]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "row_index,subject,ai_feedback\n");
    }
}
