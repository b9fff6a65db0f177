use std::sync::atomic::{AtomicUsize, Ordering};

use formsight::document::analysis::PagePipeline;
use formsight::document::form_box::FormBox;
use formsight::document::layout::{Extraction, FieldSlot};
use formsight::document::page_type::PageType;
use formsight::document::{DocumentError, FieldType, LayoutError};
use formsight::ocr::{OcrConfig, OcrEngine, OcrError, OcrLanguage};
use formsight::text::NONE;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

/// Returns `table` for table columns (page segmentation mode 12 on
/// English) and `text` for everything else.
struct MockEngine {
    table: &'static str,
    text: &'static str,
    calls: AtomicUsize,
}

impl MockEngine {
    fn new(table: &'static str, text: &'static str) -> Self {
        Self {
            table,
            text,
            calls: AtomicUsize::new(0),
        }
    }

    fn uniform(text: &'static str) -> Self {
        Self::new(text, text)
    }
}

impl OcrEngine for MockEngine {
    fn recognize(
        &self,
        _region: &GrayImage,
        language: OcrLanguage,
        config: &OcrConfig,
    ) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if config.psm == Some(12) && language == OcrLanguage::English {
            Ok(self.table.to_string())
        } else {
            Ok(self.text.to_string())
        }
    }
}

struct FailingEngine;

impl OcrEngine for FailingEngine {
    fn recognize(
        &self,
        _region: &GrayImage,
        _language: OcrLanguage,
        _config: &OcrConfig,
    ) -> Result<String, OcrError> {
        Err(OcrError::Rejected {
            message: "engine offline".to_string(),
        })
    }
}

fn white_page(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
}

/// `count` equally sized boxes stacked top to bottom.
fn stacked_boxes(count: i32) -> Vec<FormBox> {
    (0..count)
        .map(|i| FormBox::new(20, 20 + i * 40, 300, 30))
        .collect()
}

// ============================================================================
// Descriptors
// ============================================================================

#[test]
fn test_every_descriptor_is_valid() {
    for page_type in PageType::ALL {
        let descriptor = page_type.descriptor();
        assert_eq!(descriptor.validate(), Ok(()), "{page_type}");
        assert_eq!(descriptor.page_id, page_type.page_id());
    }
}

#[test]
fn test_page_ids_round_trip() {
    for page_type in PageType::ALL {
        assert_eq!(PageType::from_page_id(page_type.page_id()), Some(page_type));
    }
    assert_eq!(PageType::from_page_id("page_5"), None);
    assert_eq!(PageType::Shareholders.page_index(), 7);
}

#[test]
fn test_invalid_binding_is_rejected() {
    let mut descriptor = PageType::CompanySecretary.descriptor();
    descriptor.slots.push(FieldSlot::new(
        "overflow",
        0,
        24..26,
        Extraction::SegmentedDate,
    ));

    assert!(matches!(
        descriptor.validate(),
        Err(LayoutError::InvalidDescriptor { page: "page_3", .. })
    ));
}

#[test]
fn test_identity_needs_two_boxes() {
    let mut descriptor = PageType::Directors.descriptor();
    descriptor
        .slots
        .push(FieldSlot::new("broken_id", 0, 0..1, Extraction::Identity));

    assert!(descriptor.validate().is_err());
}

#[test]
fn test_too_few_boxes_is_structural_failure() {
    let descriptor = PageType::CompanyParticulars.descriptor();

    let result = descriptor.partition(&stacked_boxes(3));

    assert_eq!(
        result,
        Err(LayoutError::InsufficientBoxes {
            page: "page_1",
            required: 8,
            found: 3,
        })
    );
}

#[test]
fn test_partitions_rank_then_sort() {
    let descriptor = PageType::CompanyParticulars.descriptor();
    let mut boxes = vec![FormBox::new(0, 900, 1000, 600)];
    // Three medium boxes listed bottom first, four small ones top first.
    boxes.extend((0..3).map(|i| FormBox::new(0, 800 - i * 100, 500, 80)));
    boxes.extend((0..4).map(|i| FormBox::new(600, 100 + i * 50, 200, 40)));
    boxes.push(FormBox::new(0, 0, 5, 5));

    let partitions = descriptor.partition(&boxes).unwrap();

    assert_eq!(partitions.len(), 3);
    assert_eq!(partitions[0], vec![FormBox::new(0, 900, 1000, 600)]);
    let tops: Vec<i32> = partitions[1].iter().map(|b| b.y).collect();
    assert_eq!(tops, vec![600, 700, 800]);
    assert_eq!(partitions[2].len(), 4);
    assert!(partitions[2].iter().all(|b| b.width == 200));
}

#[test]
fn test_output_fields_expand_blocks_and_tables() {
    let fields = PageType::CompanyParticulars.descriptor().output_fields();
    assert!(fields.contains(&"presentors_fax"));
    assert!(!fields.contains(&"presentor"));

    let fields = PageType::Shareholders.descriptor().output_fields();
    assert_eq!(
        fields,
        vec!["shareholders_names", "shareholders_addresses", "shareholders_stake"]
    );
}

// ============================================================================
// Page Resolution
// ============================================================================

#[test]
fn test_resolve_secretary_page() {
    let engine = MockEngine::uniform("JOHN SMITH CHAN");
    let descriptor = PageType::CompanySecretary.descriptor();
    let page = white_page(400, 1100);

    let record = PagePipeline::new(&engine)
        .resolve(&descriptor, &page, &stacked_boxes(25))
        .unwrap();

    assert_eq!(record.page_id, "page_3");
    // The name spans two boxes, read separately and joined.
    assert_eq!(
        record.cleaned("company_secretary"),
        Some("JOHN SMITH CHAN JOHN SMITH CHAN")
    );
    assert_eq!(
        record.get("correspondence_address").map(|v| v.field_type),
        Some(FieldType::Address)
    );
    // Blank identity boxes have no cell structure.
    assert_eq!(record.cleaned("secretarys_hkid"), Some(NONE));
    assert_eq!(record.fields.len(), descriptor.output_fields().len());
    assert!(engine.calls.load(Ordering::SeqCst) > 0);
}

#[test]
fn test_registration_number_is_truncated() {
    let engine = MockEngine::uniform("1234567890");
    let descriptor = PageType::CompanySecretary.descriptor();
    let page = white_page(400, 1100);

    let record = PagePipeline::new(&engine)
        .resolve(&descriptor, &page, &stacked_boxes(25))
        .unwrap();

    let value = record.get("corporate_company_secretary_cr_no").unwrap();
    assert_eq!(value.raw_text, "1234567890");
    assert_eq!(value.cleaned_text, "12345678");
}

#[test]
fn test_missing_boxes_fail_the_page() {
    let engine = MockEngine::uniform("text");
    let descriptor = PageType::Directors.descriptor();
    let page = white_page(400, 1100);

    let err = PagePipeline::new(&engine)
        .resolve(&descriptor, &page, &stacked_boxes(10))
        .unwrap_err();

    assert!(matches!(
        err,
        DocumentError::Layout {
            source: LayoutError::InsufficientBoxes {
                required: 18,
                found: 10,
                ..
            }
        }
    ));
}

#[test]
fn test_engine_failure_fails_the_page() {
    let descriptor = PageType::Directors.descriptor();
    let page = white_page(400, 1100);

    let err = PagePipeline::new(&FailingEngine)
        .resolve(&descriptor, &page, &stacked_boxes(18))
        .unwrap_err();

    assert!(matches!(err, DocumentError::Ocr { .. }));
}

#[test]
fn test_table_without_rulings_fails() {
    let engine = MockEngine::new("1", "text");
    let descriptor = PageType::Shareholders.descriptor();
    let page = white_page(600, 400);

    let err = PagePipeline::new(&engine)
        .resolve(&descriptor, &page, &[FormBox::new(10, 10, 500, 300)])
        .unwrap_err();

    assert!(matches!(
        err,
        DocumentError::Layout {
            source: LayoutError::InsufficientGridLines {
                page: "page_8",
                field: "shareholders",
                ..
            }
        }
    ));
}

/// The share capital table: nine vertical and six horizontal rulings inside
/// an 800x400 box at (50, 50), plus four small boxes below it.
fn share_capital_page() -> (RgbImage, Vec<FormBox>) {
    let mut page = white_page(900, 800);
    let black = Rgb([0, 0, 0]);
    for i in 0..9 {
        let rect = Rect::at(50 + 5 + 98 * i, 55).of_size(3, 390);
        draw_filled_rect_mut(&mut page, rect, black);
    }
    for i in 0..6 {
        let rect = Rect::at(55, 50 + 5 + 60 * i).of_size(790, 3);
        draw_filled_rect_mut(&mut page, rect, black);
    }

    let mut boxes = vec![FormBox::new(50, 50, 800, 400)];
    boxes.extend((0..4).map(|i| FormBox::new(50, 500 + i * 60, 300, 40)));
    (page, boxes)
}

#[test]
fn test_resolve_share_capital_table() {
    let engine = MockEngine::new("1,000  2,500", "info@acme.com.hk");
    let descriptor = PageType::ShareCapital.descriptor();
    let (page, boxes) = share_capital_page();

    let record = PagePipeline::new(&engine)
        .resolve(&descriptor, &page, &boxes)
        .unwrap();

    for field in ["total_shares", "total_amount", "total_paid_up"] {
        let value = record.get(field).unwrap();
        assert_eq!(value.raw_text, "1,000  2,500", "{field}");
        assert_eq!(value.cleaned_text, "1000;2500", "{field}");
        assert_eq!(value.field_type, FieldType::Number);
    }
    assert_eq!(record.cleaned("company_email"), Some("info@acme.com.hk"));
}
