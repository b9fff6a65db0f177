//! The pages of an annual return that carry extractable fields, with the
//! layout of each.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::detection::line_detector::{DetectionParams, MaskFinish, ThinLines};
use crate::document::form_box::BoxOrder;
use crate::document::layout::{Extraction, FieldSlot, LayoutDescriptor, Partition, TableColumn};
use crate::document::record::FieldType;
use crate::document::table::RowAnchor;
use crate::ocr::{CropOptions, Halve, OcrConfig, OcrLanguage, OcrSettings};
use crate::text::normalizer::EntryKind;
use crate::utils::box_utils::RetrievalMode;

/// Current revision of the built-in layouts.
pub const LAYOUT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PageType {
    /// Company name, address, number, return date and presentor
    CompanyParticulars,
    /// Company email and the share capital table
    ShareCapital,
    /// Company secretary, natural person or corporate
    CompanySecretary,
    Directors,
    /// Shareholder table
    Shareholders,
}

const UPSCALED: CropOptions = CropOptions {
    halve: Halve::None,
    concentrate: false,
    resize: true,
    erode: false,
    blur: true,
    sharpen: false,
    dilate: false,
};

const PRESENTOR_BLOCK: CropOptions = CropOptions {
    halve: Halve::Left,
    concentrate: true,
    resize: true,
    erode: true,
    blur: true,
    sharpen: false,
    dilate: false,
};

const PLAIN: CropOptions = CropOptions {
    halve: Halve::None,
    concentrate: false,
    resize: false,
    erode: false,
    blur: true,
    sharpen: false,
    dilate: false,
};

fn text(
    field_type: FieldType,
    crop: CropOptions,
    language: OcrLanguage,
    psm: Option<u8>,
) -> Extraction {
    Extraction::Text {
        field_type,
        settings: OcrSettings::new(crop, language, OcrConfig { psm }),
        max_chars: None,
    }
}

fn registration_number(crop: CropOptions, psm: Option<u8>) -> Extraction {
    Extraction::Text {
        field_type: FieldType::Number,
        settings: OcrSettings::new(crop, OcrLanguage::English, OcrConfig { psm }),
        max_chars: Some(8),
    }
}

fn column(
    field: &'static str,
    left: usize,
    language: OcrLanguage,
    blur: Option<u32>,
    min_spaces: usize,
    entries: EntryKind,
) -> TableColumn {
    TableColumn {
        field,
        left,
        right: left + 1,
        language,
        blur,
        min_spaces,
        entries,
    }
}

impl PageType {
    pub const ALL: [PageType; 5] = [
        PageType::CompanyParticulars,
        PageType::ShareCapital,
        PageType::CompanySecretary,
        PageType::Directors,
        PageType::Shareholders,
    ];

    /// Zero-based position of the page within the document.
    pub fn page_index(&self) -> usize {
        match self {
            PageType::CompanyParticulars => 0,
            PageType::ShareCapital => 1,
            PageType::CompanySecretary => 2,
            PageType::Directors => 3,
            PageType::Shareholders => 7,
        }
    }

    /// Key of the page in a [`DocumentRecord`](crate::document::DocumentRecord).
    pub fn page_id(&self) -> &'static str {
        match self {
            PageType::CompanyParticulars => "page_1",
            PageType::ShareCapital => "page_2",
            PageType::CompanySecretary => "page_3",
            PageType::Directors => "page_4",
            PageType::Shareholders => "page_8",
        }
    }

    pub fn from_page_id(page_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.page_id() == page_id)
    }

    /// The layout table of this page type.
    pub fn descriptor(&self) -> LayoutDescriptor {
        match self {
            PageType::CompanyParticulars => LayoutDescriptor {
                page_id: self.page_id(),
                version: LAYOUT_VERSION,
                detection: DetectionParams {
                    retrieval: RetrievalMode::External,
                    thin_lines: ThinLines::Vertical,
                    ..Default::default()
                },
                top_k: 8,
                partitions: vec![
                    Partition::new(0..1, BoxOrder::Area),
                    Partition::new(1..4, BoxOrder::Top),
                    Partition::new(4..8, BoxOrder::Top),
                ],
                slots: vec![
                    FieldSlot::new(
                        "presentor",
                        0,
                        0..1,
                        Extraction::PresentorBlock {
                            settings: OcrSettings::new(
                                PRESENTOR_BLOCK,
                                OcrLanguage::ChineseEnglish,
                                OcrConfig::psm(11),
                            ),
                        },
                    ),
                    FieldSlot::new(
                        "company_name",
                        1,
                        0..1,
                        text(FieldType::Name, PLAIN, OcrLanguage::ChineseEnglish, None),
                    ),
                    FieldSlot::new(
                        "company_address",
                        1,
                        2..3,
                        text(FieldType::Address, PLAIN, OcrLanguage::ChineseEnglish, Some(4)),
                    ),
                    FieldSlot::new("company_number", 2, 0..1, registration_number(PLAIN, None)),
                    FieldSlot::new("date_of_return", 2, 1..2, Extraction::SegmentedDate),
                ],
            },
            PageType::ShareCapital => LayoutDescriptor {
                page_id: self.page_id(),
                version: LAYOUT_VERSION,
                detection: DetectionParams {
                    retrieval: RetrievalMode::External,
                    finish: MaskFinish::Canny,
                    ..Default::default()
                },
                top_k: 5,
                partitions: vec![
                    Partition::new(0..1, BoxOrder::Area),
                    Partition::new(1..5, BoxOrder::Top),
                ],
                slots: vec![
                    FieldSlot::new(
                        "share_capital",
                        0,
                        0..1,
                        Extraction::Table {
                            vertical_lines: 9,
                            horizontal_lines: 6,
                            anchor: RowAnchor::LastLine,
                            columns: vec![
                                column(
                                    "total_shares",
                                    2,
                                    OcrLanguage::English,
                                    Some(5),
                                    2,
                                    EntryKind::Numbers,
                                ),
                                column(
                                    "total_amount",
                                    3,
                                    OcrLanguage::English,
                                    Some(5),
                                    2,
                                    EntryKind::Numbers,
                                ),
                                column(
                                    "total_paid_up",
                                    4,
                                    OcrLanguage::English,
                                    Some(5),
                                    2,
                                    EntryKind::Numbers,
                                ),
                            ],
                        },
                    ),
                    FieldSlot::new(
                        "company_email",
                        1,
                        1..2,
                        text(FieldType::Email, PLAIN, OcrLanguage::English, None),
                    ),
                ],
            },
            PageType::CompanySecretary => LayoutDescriptor {
                page_id: self.page_id(),
                version: LAYOUT_VERSION,
                detection: DetectionParams {
                    retrieval: RetrievalMode::External,
                    thin_lines: ThinLines::Horizontal,
                    ..Default::default()
                },
                top_k: 25,
                partitions: vec![Partition::new(0..25, BoxOrder::Top)],
                slots: vec![
                    FieldSlot::new(
                        "company_secretary",
                        0,
                        2..4,
                        text(FieldType::Name, UPSCALED, OcrLanguage::English, Some(12)),
                    ),
                    FieldSlot::new(
                        "correspondence_address",
                        0,
                        8..11,
                        text(FieldType::Address, UPSCALED, OcrLanguage::ChineseEnglish, Some(12)),
                    ),
                    FieldSlot::new("secretarys_hkid", 0, 13..15, Extraction::Identity)
                        .ordered(BoxOrder::Left),
                    FieldSlot::new(
                        "corporate_company_secretary",
                        0,
                        18..19,
                        text(FieldType::Name, UPSCALED, OcrLanguage::English, Some(4)),
                    ),
                    FieldSlot::new(
                        "corporate_company_secretary_address",
                        0,
                        19..22,
                        text(FieldType::Address, UPSCALED, OcrLanguage::ChineseEnglish, Some(4)),
                    ),
                    FieldSlot::new(
                        "corporate_company_secretary_email",
                        0,
                        23..24,
                        text(FieldType::Email, PLAIN, OcrLanguage::English, None),
                    ),
                    FieldSlot::new(
                        "corporate_company_secretary_cr_no",
                        0,
                        24..25,
                        registration_number(UPSCALED, Some(7)),
                    ),
                ],
            },
            PageType::Directors => LayoutDescriptor {
                page_id: self.page_id(),
                version: LAYOUT_VERSION,
                detection: DetectionParams {
                    retrieval: RetrievalMode::External,
                    thin_lines: ThinLines::Horizontal,
                    vertical_iterations: 2,
                    ..Default::default()
                },
                top_k: 18,
                partitions: vec![Partition::new(0..18, BoxOrder::Top)],
                slots: vec![
                    FieldSlot::new(
                        "directors_name",
                        0,
                        3..5,
                        text(FieldType::Name, UPSCALED, OcrLanguage::English, Some(12)),
                    ),
                    FieldSlot::new(
                        "directors_address",
                        0,
                        9..13,
                        text(FieldType::Address, UPSCALED, OcrLanguage::ChineseEnglish, Some(12)),
                    ),
                    FieldSlot::new(
                        "directors_email",
                        0,
                        13..14,
                        text(FieldType::Email, PLAIN, OcrLanguage::English, None),
                    ),
                    FieldSlot::new("directors_hkid", 0, 14..16, Extraction::Identity)
                        .ordered(BoxOrder::Left),
                ],
            },
            PageType::Shareholders => LayoutDescriptor {
                page_id: self.page_id(),
                version: LAYOUT_VERSION,
                detection: DetectionParams {
                    retrieval: RetrievalMode::External,
                    finish: MaskFinish::Canny,
                    vertical_iterations: 3,
                    ..Default::default()
                },
                top_k: 1,
                partitions: vec![Partition::new(0..1, BoxOrder::Area)],
                slots: vec![FieldSlot::new(
                    "shareholders",
                    0,
                    0..1,
                    Extraction::Table {
                        vertical_lines: 7,
                        horizontal_lines: 5,
                        anchor: RowAnchor::SecondToLastLine,
                        columns: vec![
                            column(
                                "shareholders_names",
                                0,
                                OcrLanguage::ChineseEnglish,
                                None,
                                2,
                                EntryKind::Letters,
                            ),
                            column(
                                "shareholders_addresses",
                                1,
                                OcrLanguage::ChineseEnglish,
                                None,
                                3,
                                EntryKind::Raw,
                            ),
                            column(
                                "shareholders_stake",
                                2,
                                OcrLanguage::English,
                                None,
                                1,
                                EntryKind::Numbers,
                            ),
                        ],
                    },
                )],
            },
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.page_id())
    }
}
