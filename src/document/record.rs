use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::text::normalizer::{self, NONE};

/// Declared kind of a form field; selects its text cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Name,
    Address,
    Phone,
    Fax,
    Email,
    Number,
    Identity,
    FreeText,
}

/// A recognized field: what OCR produced and what survived cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub raw_text: String,
    pub cleaned_text: String,
    pub field_type: FieldType,
}

impl FieldValue {
    /// Builds a value by running the cleanup for `field_type` over `raw_text`.
    pub fn from_raw(field_type: FieldType, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let cleaned_text = normalizer::normalize(field_type, &raw_text);
        Self {
            raw_text,
            cleaned_text,
            field_type,
        }
    }

    /// Builds a value whose cleanup was done by the caller.
    pub fn with_cleaned(
        field_type: FieldType,
        raw_text: impl Into<String>,
        cleaned_text: impl Into<String>,
    ) -> Self {
        Self {
            raw_text: raw_text.into(),
            cleaned_text: cleaned_text.into(),
            field_type,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.cleaned_text != NONE
    }
}

/// Field values of one page, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub page_id: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl PageRecord {
    pub fn new(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.fields.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Cleaned text of a field, if the page has it.
    pub fn cleaned(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|v| v.cleaned_text.as_str())
    }
}

/// Everything extracted from one document, keyed by page identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document: String,
    pub pages: BTreeMap<String, PageRecord>,
}

impl DocumentRecord {
    pub fn new(document: impl Into<String>, pages: Vec<PageRecord>) -> Self {
        Self {
            document: document.into(),
            pages: pages
                .into_iter()
                .map(|page| (page.page_id.clone(), page))
                .collect(),
        }
    }

    pub fn page(&self, page_id: &str) -> Option<&PageRecord> {
        self.pages.get(page_id)
    }

    /// Flattens the record into `page_id.field` → cleaned text.
    pub fn flatten(&self) -> BTreeMap<String, String> {
        self.pages
            .iter()
            .flat_map(|(page_id, page)| {
                page.fields.iter().map(move |(field, value)| {
                    (format!("{page_id}.{field}"), value.cleaned_text.clone())
                })
            })
            .collect()
    }
}
