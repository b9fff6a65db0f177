use image::RgbImage;
use tracing::{debug, info, instrument, warn};

use crate::detection::{probe_grid, read_segmented, CellKind, LineDetector, SegmentedOptions};
use crate::document::error::{DocumentError, LayoutError};
use crate::document::form_box::FormBox;
use crate::document::layout::{
    Extraction, FieldSlot, LayoutDescriptor, TableColumn, PRESENTOR_FIELDS,
};
use crate::document::page_type::PageType;
use crate::document::record::{FieldType, FieldValue, PageRecord};
use crate::document::table::RowAnchor;
use crate::ocr::{self, OcrConfig, OcrEngine, OcrSettings};
use crate::text::normalizer::{self, CharKind, EntryKind, NONE};
use crate::text::PresentorBlock;
use crate::utils::image_utils;

/// Table columns hold several sparse lines of text.
const TABLE_COLUMN: OcrConfig = OcrConfig::psm(12);

/// Runs the layout of a page type over a page image.
pub struct PagePipeline<'e> {
    engine: &'e dyn OcrEngine,
}

impl<'e> PagePipeline<'e> {
    pub fn new(engine: &'e dyn OcrEngine) -> Self {
        Self { engine }
    }

    /// Detects, straightens and reads one page.
    #[instrument(skip(self, image), fields(page = page_type.page_id()))]
    pub fn process_page(
        &self,
        page_type: PageType,
        image: &RgbImage,
    ) -> Result<PageRecord, DocumentError> {
        let descriptor = page_type.descriptor();
        descriptor.validate()?;

        let detector = LineDetector::new(descriptor.detection);
        let aligned = detector.detect_aligned(image)?;
        if aligned.skew != 0.0 {
            info!("Corrected skew of {:.3} degrees", aligned.skew);
        }
        debug!("Found {} boxes", aligned.boxes.len());

        self.resolve(&descriptor, &aligned.image, &aligned.boxes)
    }

    /// Reads every field slot of `descriptor` from already detected boxes.
    pub fn resolve(
        &self,
        descriptor: &LayoutDescriptor,
        page: &RgbImage,
        boxes: &[FormBox],
    ) -> Result<PageRecord, DocumentError> {
        let partitions = descriptor.partition(boxes)?;
        let mut record = PageRecord::new(descriptor.page_id);

        for slot in &descriptor.slots {
            let slot_boxes = descriptor.slot_boxes(&partitions, slot)?;
            debug!("Reading {} from {} boxes", slot.field, slot_boxes.len());
            self.extract(descriptor.page_id, slot, &slot_boxes, page, &mut record)?;
        }

        let unresolved = record.fields.values().filter(|v| !v.is_resolved()).count();
        if unresolved > 0 {
            debug!("{} of {} fields unresolved", unresolved, record.fields.len());
        }

        Ok(record)
    }

    fn extract(
        &self,
        page_id: &'static str,
        slot: &FieldSlot,
        boxes: &[FormBox],
        page: &RgbImage,
        record: &mut PageRecord,
    ) -> Result<(), DocumentError> {
        match &slot.extraction {
            Extraction::Text {
                field_type,
                settings,
                max_chars,
            } => {
                let raw = ocr::ocr_boxes(self.engine, page, boxes, settings)?;
                let mut value = FieldValue::from_raw(*field_type, raw);
                if let Some(limit) = max_chars {
                    if value.is_resolved() {
                        value.cleaned_text = value.cleaned_text.chars().take(*limit).collect();
                    }
                }
                record.insert(slot.field, value);
            }
            Extraction::PresentorBlock { settings } => {
                self.read_presentor(nth(page_id, slot, boxes, 0)?, settings, page, record)?;
            }
            Extraction::SegmentedDate => {
                let options = SegmentedOptions::new(CellKind::Digits);
                let date_box = nth(page_id, slot, boxes, 0)?;
                let raw = read_segmented(self.engine, page, date_box, &options)?;
                let cleaned = date_from_cells(&raw);
                record.insert(
                    slot.field,
                    FieldValue::with_cleaned(FieldType::Number, raw, cleaned),
                );
            }
            Extraction::Identity => {
                let prefix_box = nth(page_id, slot, boxes, 0)?;
                let digits_box = nth(page_id, slot, boxes, 1)?;
                let value = self.read_identity(prefix_box, digits_box, page)?;
                record.insert(slot.field, value);
            }
            Extraction::Table {
                vertical_lines,
                horizontal_lines,
                anchor,
                columns,
            } => {
                let table = TableShape {
                    page_id,
                    field: slot.field,
                    vertical_lines: *vertical_lines,
                    horizontal_lines: *horizontal_lines,
                    anchor: *anchor,
                };
                self.read_table(&table, columns, nth(page_id, slot, boxes, 0)?, page, record)?;
            }
        }
        Ok(())
    }

    fn read_presentor(
        &self,
        form_box: &FormBox,
        settings: &OcrSettings,
        page: &RgbImage,
        record: &mut PageRecord,
    ) -> Result<(), DocumentError> {
        let text = ocr::ocr_box(self.engine, page, form_box, settings)?;
        let raw = PresentorBlock::parse(&text);
        let cleaned = raw.cleaned();

        let parts = [
            (FieldType::Name, raw.name, cleaned.name),
            (FieldType::Address, raw.address, cleaned.address),
            (FieldType::Phone, raw.telephone, cleaned.telephone),
            (FieldType::Fax, raw.fax, cleaned.fax),
            (FieldType::Email, raw.email, cleaned.email),
        ];
        for (field, (field_type, raw, cleaned)) in PRESENTOR_FIELDS.into_iter().zip(parts) {
            record.insert(field, FieldValue::with_cleaned(field_type, raw, cleaned));
        }
        Ok(())
    }

    /// The prefix box holds letters, the second box the digits and the
    /// bracketed check character.
    fn read_identity(
        &self,
        prefix_box: &FormBox,
        digits_box: &FormBox,
        page: &RgbImage,
    ) -> Result<FieldValue, DocumentError> {
        let prefix = read_segmented(
            self.engine,
            page,
            prefix_box,
            &SegmentedOptions::new(CellKind::Single(CharKind::Letter)),
        )?;
        let digits = read_segmented(
            self.engine,
            page,
            digits_box,
            &SegmentedOptions::new(CellKind::Single(CharKind::Digit)),
        )?;

        let raw = format!("{prefix} {digits}");
        let cleaned = identity_from_parts(&prefix, &digits);
        Ok(FieldValue::with_cleaned(FieldType::Identity, raw, cleaned))
    }

    #[instrument(skip(self, table, columns, page, record), fields(field = table.field))]
    fn read_table(
        &self,
        table: &TableShape,
        columns: &[TableColumn],
        table_box: &FormBox,
        page: &RgbImage,
        record: &mut PageRecord,
    ) -> Result<(), DocumentError> {
        let cropped = image_utils::crop(
            page,
            i64::from(table_box.x),
            i64::from(table_box.y),
            i64::from(table_box.width),
            i64::from(table_box.height),
        )?;
        let gray = image_utils::to_grayscale(&cropped);

        let grid = probe_grid(&gray, table.vertical_lines, table.horizontal_lines);
        table.check(&grid.columns, table.vertical_lines, "vertical")?;
        table.check(&grid.rows, table.horizontal_lines, "horizontal")?;

        // Cells are cut from the cropped table, so its origin is zero.
        let local = FormBox::new(0, 0, table_box.width, table_box.height);

        for column in columns {
            let Some(cell) = grid.column_below(&local, column.left, column.right, table.anchor)
            else {
                warn!("Column {} has no rows below the header", column.field);
                record.insert(
                    column.field,
                    FieldValue::with_cleaned(column_field_type(column.entries), NONE, NONE),
                );
                continue;
            };

            let region = image_utils::crop(
                &gray,
                i64::from(cell.x),
                i64::from(cell.y),
                i64::from(cell.width),
                i64::from(cell.height),
            )?;
            let region = match column.blur {
                Some(ksize) => image_utils::gaussian_blur(&region, ksize),
                None => region,
            };

            let raw = self
                .engine
                .recognize(&region, column.language, &TABLE_COLUMN)?;
            let cleaned = normalizer::separate_entries(&raw, column.min_spaces, column.entries);
            record.insert(
                column.field,
                FieldValue::with_cleaned(column_field_type(column.entries), raw, cleaned),
            );
        }

        Ok(())
    }
}

/// Line requirements of the table being read, for error reporting.
struct TableShape {
    page_id: &'static str,
    field: &'static str,
    vertical_lines: usize,
    horizontal_lines: usize,
    anchor: RowAnchor,
}

impl TableShape {
    fn check(&self, found: &[i32], required: usize, axis: &'static str) -> Result<(), LayoutError> {
        if found.len() < required {
            return Err(LayoutError::InsufficientGridLines {
                page: self.page_id,
                field: self.field,
                axis,
                required,
                found: found.len(),
            });
        }
        Ok(())
    }
}

fn nth<'b>(
    page_id: &'static str,
    slot: &FieldSlot,
    boxes: &'b [FormBox],
    index: usize,
) -> Result<&'b FormBox, LayoutError> {
    boxes.get(index).ok_or_else(|| LayoutError::InvalidDescriptor {
        page: page_id,
        message: format!("field {} has no box {}", slot.field, index),
    })
}

fn column_field_type(entries: EntryKind) -> FieldType {
    match entries {
        EntryKind::Numbers => FieldType::Number,
        EntryKind::Letters => FieldType::Name,
        EntryKind::Raw => FieldType::Address,
    }
}

/// Joins digit cells with `/`; anything non-numeric resolves to `"None"`.
pub fn date_from_cells(cells: &str) -> String {
    let digits: String = cells.chars().filter(|c| *c != ' ').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return NONE.to_string();
    }
    cells.replace(' ', "/")
}

/// Combines the letter prefix and the digit cells of an identity number.
pub fn identity_from_parts(prefix: &str, digits: &str) -> String {
    let number = normalizer::clean_identity(digits);
    if number == NONE {
        return NONE.to_string();
    }
    format!("{} {}", prefix.replace(' ', ""), number)
}
