use std::io;

use serde::{Deserialize, Serialize};

use crate::batch::DocumentOutcome;
use crate::document::page_type::{PageType, LAYOUT_VERSION};
use crate::document::record::DocumentRecord;
use crate::text::normalizer::NONE;

/// A document that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub document: String,
    pub diagnostic: String,
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub api_version: String,
    pub layout_version: u32,
    pub documents: Vec<DocumentRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureRecord>,
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Column keys of the results table: `page_id.field` for every field of
/// every page type, in page then slot order.
pub fn field_columns() -> Vec<String> {
    PageType::ALL
        .iter()
        .flat_map(|page_type| {
            let page_id = page_type.page_id();
            page_type
                .descriptor()
                .output_fields()
                .into_iter()
                .map(move |field| format!("{page_id}.{field}"))
        })
        .collect()
}

impl AnalysisResult {
    pub fn new() -> Self {
        Self {
            api_version: env!("CARGO_PKG_VERSION").to_string(),
            layout_version: LAYOUT_VERSION,
            documents: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn add_outcome(&mut self, outcome: DocumentOutcome) {
        match outcome {
            DocumentOutcome::Success(record) => self.documents.push(record),
            DocumentOutcome::Failure {
                document,
                diagnostic,
            } => self.failures.push(FailureRecord {
                document,
                diagnostic,
            }),
        }
    }

    /// Orders documents and failures by name; batch completion order is
    /// arbitrary.
    pub fn sort(&mut self) {
        self.documents.sort_by(|a, b| a.document.cmp(&b.document));
        self.failures.sort_by(|a, b| a.document.cmp(&b.document));
    }

    /// Writes one row per document. Fields a document lacks are `None`.
    pub fn write_results_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let columns = field_columns();
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut header = Vec::with_capacity(columns.len() + 1);
        header.push("document");
        header.extend(columns.iter().map(String::as_str));
        csv_writer.write_record(&header)?;

        for record in &self.documents {
            let values = record.flatten();
            let mut row = Vec::with_capacity(columns.len() + 1);
            row.push(record.document.as_str());
            row.extend(
                columns
                    .iter()
                    .map(|key| values.get(key).map_or(NONE, String::as_str)),
            );
            csv_writer.write_record(&row)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_failures_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["document", "diagnostic"])?;
        for failure in &self.failures {
            csv_writer.write_record([&failure.document, &failure.diagnostic])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_json<W: io::Write>(&self, writer: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer_pretty(writer, self)
    }
}

impl Extend<DocumentOutcome> for AnalysisResult {
    fn extend<I: IntoIterator<Item = DocumentOutcome>>(&mut self, outcomes: I) {
        for outcome in outcomes {
            self.add_outcome(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::record::{FieldType, FieldValue, PageRecord};

    #[test]
    fn test_field_columns_cover_every_page() {
        let columns = field_columns();
        assert!(columns.contains(&"page_1.presentors_email".to_string()));
        assert!(columns.contains(&"page_2.total_paid_up".to_string()));
        assert!(columns.contains(&"page_3.secretarys_hkid".to_string()));
        assert!(columns.contains(&"page_8.shareholders_stake".to_string()));
        assert!(!columns.iter().any(|c| c.ends_with(".presentor")));
    }

    #[test]
    fn test_results_csv_fills_missing_fields() {
        let mut page = PageRecord::new("page_1");
        page.insert(
            "company_number",
            FieldValue::from_raw(FieldType::Number, "12345678"),
        );

        let mut result = AnalysisResult::new();
        result.add_outcome(DocumentOutcome::Success(DocumentRecord::new(
            "doc_a",
            vec![page],
        )));

        let mut buffer = Vec::new();
        result.write_results_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        let header: Vec<&str> = lines.next().unwrap().split(',').collect();
        let row: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(header[0], "document");
        assert_eq!(row[0], "doc_a");

        let number = header
            .iter()
            .position(|h| *h == "page_1.company_number")
            .unwrap();
        assert_eq!(row[number], "12345678");
        let email = header
            .iter()
            .position(|h| *h == "page_2.company_email")
            .unwrap();
        assert_eq!(row[email], NONE);
    }
}
