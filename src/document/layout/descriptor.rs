//! Declarative description of where each field of a page type lives.
//!
//! Detected boxes are ranked by area and the top `top_k` are kept. Those are
//! cut into partitions (rank ranges), each re-sorted spatially, and every
//! field slot names a range of positions inside one partition together with
//! the way its text is extracted.

use std::ops::Range;

use crate::detection::line_detector::DetectionParams;
use crate::document::error::LayoutError;
use crate::document::form_box::{BoxOrder, FormBox};
use crate::document::record::FieldType;
use crate::document::table::RowAnchor;
use crate::ocr::{OcrLanguage, OcrSettings};
use crate::text::normalizer::EntryKind;
use crate::utils::box_utils;

/// Fields a presentor block expands into, in printed order.
pub const PRESENTOR_FIELDS: [&str; 5] = [
    "presentors_name",
    "presentors_address",
    "presentors_telephone",
    "presentors_fax",
    "presentors_email",
];

/// A range of area ranks re-sorted by `order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub ranks: Range<usize>,
    pub order: BoxOrder,
}

impl Partition {
    pub fn new(ranks: Range<usize>, order: BoxOrder) -> Self {
        Self { ranks, order }
    }
}

/// One value column of a ruled table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub field: &'static str,
    /// Index of the vertical line on the left of the column
    pub left: usize,
    /// Index of the vertical line on the right of the column
    pub right: usize,
    pub language: OcrLanguage,
    /// Gaussian kernel applied before recognition
    pub blur: Option<u32>,
    /// Whitespace run length that separates two entries
    pub min_spaces: usize,
    pub entries: EntryKind,
}

/// How the text of a slot is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Recognize each box and join the readable parts
    Text {
        field_type: FieldType,
        settings: OcrSettings,
        /// Keep at most this many characters of the cleaned value
        max_chars: Option<usize>,
    },
    /// The presentor reference block, which expands into five fields
    PresentorBlock { settings: OcrSettings },
    /// A row of digit cells read as a date, joined with `/`
    SegmentedDate,
    /// Two segmented boxes: letter prefix and digits with check character
    Identity,
    /// Value columns of a ruled table below its header lines
    Table {
        vertical_lines: usize,
        horizontal_lines: usize,
        anchor: RowAnchor,
        columns: Vec<TableColumn>,
    },
}

impl Extraction {
    /// How many boxes the extraction reads, if fixed.
    fn box_count(&self) -> Option<usize> {
        match self {
            Extraction::Text { .. } => None,
            Extraction::PresentorBlock { .. } | Extraction::SegmentedDate => Some(1),
            Extraction::Identity => Some(2),
            Extraction::Table { .. } => Some(1),
        }
    }
}

/// A named field bound to positions within a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSlot {
    pub field: &'static str,
    pub partition: usize,
    pub positions: Range<usize>,
    /// Extra ordering applied to the slot's own boxes
    pub order: Option<BoxOrder>,
    pub extraction: Extraction,
}

impl FieldSlot {
    pub fn new(
        field: &'static str,
        partition: usize,
        positions: Range<usize>,
        extraction: Extraction,
    ) -> Self {
        Self {
            field,
            partition,
            positions,
            order: None,
            extraction,
        }
    }

    pub fn ordered(mut self, order: BoxOrder) -> Self {
        self.order = Some(order);
        self
    }

    /// Names of the record fields this slot produces.
    pub fn output_fields(&self) -> Vec<&'static str> {
        match &self.extraction {
            Extraction::PresentorBlock { .. } => PRESENTOR_FIELDS.to_vec(),
            Extraction::Table { columns, .. } => columns.iter().map(|c| c.field).collect(),
            _ => vec![self.field],
        }
    }
}

/// Layout of one page type. Bump `version` whenever a binding changes.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDescriptor {
    pub page_id: &'static str,
    pub version: u32,
    pub detection: DetectionParams,
    pub top_k: usize,
    pub partitions: Vec<Partition>,
    pub slots: Vec<FieldSlot>,
}

impl LayoutDescriptor {
    fn invalid(&self, message: String) -> LayoutError {
        LayoutError::InvalidDescriptor {
            page: self.page_id,
            message,
        }
    }

    /// Checks that every partition lies within `top_k` and every slot within
    /// its partition.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.top_k == 0 {
            return Err(self.invalid("top_k must be positive".to_string()));
        }

        for (index, partition) in self.partitions.iter().enumerate() {
            if partition.ranks.is_empty() || partition.ranks.end > self.top_k {
                return Err(self.invalid(format!(
                    "partition {index} ({:?}) is empty or exceeds top_k {}",
                    partition.ranks, self.top_k
                )));
            }
        }

        for slot in &self.slots {
            let partition = self.partitions.get(slot.partition).ok_or_else(|| {
                self.invalid(format!(
                    "field {} refers to missing partition {}",
                    slot.field, slot.partition
                ))
            })?;

            if slot.positions.is_empty() || slot.positions.end > partition.ranks.len() {
                return Err(self.invalid(format!(
                    "field {} positions {:?} exceed partition of {} boxes",
                    slot.field,
                    slot.positions,
                    partition.ranks.len()
                )));
            }

            if let Some(count) = slot.extraction.box_count() {
                if slot.positions.len() != count {
                    return Err(self.invalid(format!(
                        "field {} reads {} boxes but is bound to {}",
                        slot.field,
                        count,
                        slot.positions.len()
                    )));
                }
            }

            if let Extraction::Table {
                vertical_lines,
                columns,
                ..
            } = &slot.extraction
            {
                if let Some(column) = columns
                    .iter()
                    .find(|c| c.left >= c.right || c.right >= *vertical_lines)
                {
                    return Err(self.invalid(format!(
                        "table column {} uses lines {}..{} of {}",
                        column.field, column.left, column.right, vertical_lines
                    )));
                }
            }
        }

        Ok(())
    }

    /// Ranks the detected boxes and splits them into partitions.
    ///
    /// Fails when fewer than `top_k` boxes were detected.
    pub fn partition(&self, boxes: &[FormBox]) -> Result<Vec<Vec<FormBox>>, LayoutError> {
        if boxes.len() < self.top_k {
            return Err(LayoutError::InsufficientBoxes {
                page: self.page_id,
                required: self.top_k,
                found: boxes.len(),
            });
        }

        let ranked = box_utils::top_by_area(boxes, self.top_k);
        Ok(self
            .partitions
            .iter()
            .map(|partition| box_utils::sorted(&ranked[partition.ranks.clone()], partition.order))
            .collect())
    }

    /// Every field name the page produces, in slot order.
    pub fn output_fields(&self) -> Vec<&'static str> {
        self.slots.iter().flat_map(FieldSlot::output_fields).collect()
    }

    /// The boxes bound to `slot`, in the slot's order.
    pub fn slot_boxes(
        &self,
        partitions: &[Vec<FormBox>],
        slot: &FieldSlot,
    ) -> Result<Vec<FormBox>, LayoutError> {
        let boxes = partitions
            .get(slot.partition)
            .and_then(|p| p.get(slot.positions.clone()))
            .ok_or_else(|| self.invalid(format!("field {} is out of range", slot.field)))?;

        Ok(match slot.order {
            Some(order) => box_utils::sorted(boxes, order),
            None => boxes.to_vec(),
        })
    }
}
