//! Cleanup of raw OCR output into field values.
//!
//! Every function here is pure and idempotent on its own output. Rejected
//! input is reported as [`NONE`], never as an empty string.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::record::FieldType;

/// Sentinel for a field that could not be resolved.
pub const NONE: &str = "None";

/// Marker printed on the form for an intentionally blank field.
pub const NIL_MARKER: &str = "(Nil)";

static NON_ALPHABET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z \n]").expect("invalid cleanup regex"));
static FOREIGN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z,\-0-9\s.]").expect("invalid cleanup regex"));
static NON_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9]").expect("invalid cleanup regex"));
static NON_UPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Z]").expect("invalid cleanup regex"));
static NON_IDENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Z0-9]").expect("invalid cleanup regex"));
static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("invalid cleanup regex"));

/// Shortest token that is not treated as OCR noise.
const MIN_TOKEN_LEN: usize = 3;

/// Minimum cleaned length of an identity number, check digit included.
const MIN_IDENTITY_LEN: usize = 7;

/// Number of digits kept for a local phone or fax number.
const CONTACT_DIGITS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberKind {
    #[default]
    Plain,
    /// Phone or fax: country code stripped, exactly eight digits kept
    Contact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CharKind {
    Letter,
    Digit,
}

/// Per-entry cleanup applied by [`separate_entries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryKind {
    #[default]
    Raw,
    Letters,
    Numbers,
}

#[inline]
fn is_none(value: &str) -> bool {
    value == NONE
}

/// Replaces characters OCR commonly confuses with digits.
fn correct_confusables(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'I' | 'i' | 'l' | '!' | '|' | '[' | ']' => '1',
            'O' | 'o' => '0',
            'S' | 's' => '5',
            other => other,
        })
        .collect()
}

/// Keeps Latin letters only and rejects text made of short fragments.
pub fn clean_alphabet(text: &str) -> String {
    let letters = NON_ALPHABET.replace_all(text, "");
    let tokens: Vec<&str> = letters.split_whitespace().collect();

    if tokens.iter().all(|t| t.len() < MIN_TOKEN_LEN) {
        return NONE.to_string();
    }

    tokens.join(" ")
}

/// Rejects text whose space-separated parts are all shorter than three
/// characters; otherwise returns it unchanged.
pub fn check_empty(text: &str) -> String {
    if text.split(' ').all(|part| part.chars().count() < MIN_TOKEN_LEN) {
        NONE.to_string()
    } else {
        text.to_string()
    }
}

/// Drops everything outside Latin letters, digits, whitespace and `,-.`.
pub fn strip_foreign(text: &str) -> String {
    FOREIGN.replace_all(text, "").into_owned()
}

/// Extracts the digits of a number, correcting confusable glyphs first.
///
/// Anything after the first `.` is discarded.
pub fn clean_number(text: &str, kind: NumberKind) -> String {
    if is_none(text.trim()) {
        return NONE.to_string();
    }

    let integral = text.split('.').next().unwrap_or_default();
    let corrected = correct_confusables(integral);
    let mut digits = NON_DIGIT.replace_all(&corrected, "").into_owned();

    if kind == NumberKind::Contact {
        if let Some(rest) = digits.strip_prefix("852") {
            digits = rest.to_string();
        } else if let Some(rest) = digits.strip_prefix("0852") {
            digits = rest.to_string();
        }

        if digits.len() < CONTACT_DIGITS {
            return NONE.to_string();
        }
        digits.truncate(CONTACT_DIGITS);
    }

    if digits.is_empty() {
        NONE.to_string()
    } else {
        digits
    }
}

/// Reduces a single-glyph reading to at most one letter or digit.
pub fn clean_single_character(text: &str, kind: CharKind) -> String {
    let cleaned = match kind {
        CharKind::Letter => NON_UPPER.replace_all(text.trim(), "").into_owned(),
        CharKind::Digit => NON_DIGIT
            .replace_all(&correct_confusables(text), "")
            .into_owned(),
    };
    cleaned.chars().take(1).collect()
}

/// Reduces a single-glyph reading to ASCII letters and digits.
pub fn clean_alphanumeric(text: &str) -> String {
    NON_ALPHANUMERIC.replace_all(text, "").into_owned()
}

/// Formats an identity number as `A123456(7)`.
///
/// Input with fewer than seven letters and digits is rejected. Already
/// formatted input is returned unchanged.
pub fn clean_identity(text: &str) -> String {
    let cleaned = NON_IDENTITY.replace_all(text, "");
    if cleaned.len() < MIN_IDENTITY_LEN {
        return NONE.to_string();
    }

    let (body, check) = cleaned.split_at(cleaned.len() - 1);
    format!("{body}({check})")
}

/// Email and other free text: the nil marker and blank text are rejected.
pub fn clean_free_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == NIL_MARKER || is_none(trimmed) {
        NONE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Result of recognizing one region: blank or `N/A` output is unresolved.
pub fn clean_region_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "N/A" {
        NONE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Splits a table column into entries separated by runs of at least
/// `min_spaces` whitespace characters and joins them with `;`.
pub fn separate_entries(text: &str, min_spaces: usize, kind: EntryKind) -> String {
    let flattened = strip_foreign(text.replace('\n', " ").trim());
    let separator = match Regex::new(&format!(r"\s{{{},}}", min_spaces.max(1))) {
        Ok(separator) => separator,
        Err(_) => return NONE.to_string(),
    };
    let delimited = separator.replace_all(&flattened, ";");

    let entries: Vec<String> = delimited
        .split(';')
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            if kind != EntryKind::Raw && entry.to_lowercase().contains("nil") {
                return NONE.to_string();
            }
            match kind {
                EntryKind::Raw => entry.to_string(),
                EntryKind::Letters => clean_alphabet(entry),
                EntryKind::Numbers => clean_number(entry, NumberKind::Plain),
            }
        })
        .collect();

    if entries.is_empty() {
        NONE.to_string()
    } else {
        entries.join(";")
    }
}

/// Applies the cleanup that belongs to `field_type`.
pub fn normalize(field_type: FieldType, raw: &str) -> String {
    if is_none(raw.trim()) {
        return NONE.to_string();
    }

    match field_type {
        FieldType::Name => {
            let checked = check_empty(&strip_foreign(raw));
            if is_none(&checked) {
                checked
            } else {
                clean_alphabet(&checked)
            }
        }
        FieldType::Address => {
            let flattened = strip_foreign(raw).replace('\n', " ");
            check_empty(flattened.trim())
        }
        FieldType::Phone | FieldType::Fax => clean_number(raw, NumberKind::Contact),
        FieldType::Number => clean_number(raw, NumberKind::Plain),
        FieldType::Identity => clean_identity(raw),
        FieldType::Email => {
            let cleaned = clean_free_text(raw);
            if is_none(&cleaned) {
                cleaned
            } else {
                check_empty(&cleaned)
            }
        }
        FieldType::FreeText => clean_free_text(raw),
    }
}
