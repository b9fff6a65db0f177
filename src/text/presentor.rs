//! Parsing of the presentor reference block printed on the first page.
//!
//! The block is recognized as one piece of text with labelled parts in a
//! fixed order: Name, Address, Tel, Fax, Email.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text::normalizer::{self, NumberKind, NONE};

static NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Name[;:\s!]([\s\S]*)Address").expect("invalid presentor name regex")
});
static ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Address[;:\s!]([\s\S]*)Tel[;:\s]").expect("invalid presentor address regex")
});
static TELEPHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Tel[;:\s!]([\s\S]*)Fax[;:\s]").expect("invalid presentor telephone regex")
});
static FAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Fax[:\s;!]([\s\S]*)E(?:m|-m)ail").expect("invalid presentor fax regex")
});
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Email[:;\s!]([\s\S]*@[\s\S]*\.\w+)").expect("invalid presentor email regex")
});

/// Raw matches of each labelled part; `"None"` where a label is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentorBlock {
    pub name: String,
    pub address: String,
    pub telephone: String,
    pub fax: String,
    pub email: String,
}

fn capture(regex: &Regex, text: &str) -> String {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| NONE.to_string())
}

impl PresentorBlock {
    /// Splits recognized block text into its labelled parts.
    pub fn parse(text: &str) -> Self {
        Self {
            name: capture(&NAME, text),
            address: capture(&ADDRESS, text),
            telephone: capture(&TELEPHONE, text),
            fax: capture(&FAX, text),
            email: capture(&EMAIL, text),
        }
    }

    /// Applies each part's cleanup.
    pub fn cleaned(&self) -> Self {
        Self {
            name: normalizer::clean_alphabet(&self.name),
            address: normalizer::check_empty(&self.address.replace('\n', " ")),
            telephone: normalizer::clean_number(&self.telephone, NumberKind::Contact),
            fax: normalizer::clean_number(&self.fax, NumberKind::Contact),
            email: normalizer::check_empty(&self.email),
        }
    }
}
