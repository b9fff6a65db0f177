//! Reading boxes that are printed as a row of single-character cells, such
//! as dates and identity numbers.
//!
//! The cell count is estimated from the box itself: ink is smeared
//! horizontally and then eroded with a tall element, which leaves one blob
//! per cell separator. The box is then cut into equal-width cells which are
//! recognized one by one.

use image::{GrayImage, RgbImage};
use imageproc::contours::find_contours;
use tracing::debug;

use crate::document::form_box::FormBox;
use crate::ocr::{OcrConfig, OcrEngine, OcrError, OcrLanguage};
use crate::text::normalizer::{self, CharKind, NumberKind, NONE};
use crate::utils::box_utils;
use crate::utils::image_utils::{self, Kernel};

const CELL_THRESHOLD: u8 = 120;

/// Leftmost contours starting closer than this to the box edge are scanning
/// artifacts rather than cell separators.
const ARTIFACT_MARGIN: i32 = 50;

/// Cell of an identity number whose check character may be a letter.
pub const TYPE_SWITCH_INDEX: usize = 6;

const SINGLE_CHARACTER: OcrConfig = OcrConfig::psm(10);

/// Cleanup applied to each cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Digits, several per cell allowed
    Digits,
    /// Exactly one character of the given kind
    Single(CharKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentedOptions {
    pub kind: CellKind,
    pub language: OcrLanguage,
    /// Cell that may hold either a letter or a digit
    pub type_switch: Option<usize>,
}

impl SegmentedOptions {
    pub fn new(kind: CellKind) -> Self {
        Self {
            kind,
            language: OcrLanguage::English,
            type_switch: Some(TYPE_SWITCH_INDEX),
        }
    }
}

/// `(start, width)` of `count` cells across `width` pixels. The last cell
/// takes whatever the integer division leaves over.
pub fn cell_spans(width: u32, count: usize) -> Vec<(u32, u32)> {
    if count == 0 || width == 0 {
        return Vec::new();
    }

    let count = count as u32;
    let step = width / count;
    (0..count)
        .map(|i| {
            let start = i * step;
            let end = if i + 1 == count { width } else { start + step };
            (start, end - start)
        })
        .filter(|&(_, w)| w > 0)
        .collect()
}

/// Estimates how many cells a binarized box holds, `None` when the cell
/// structure cannot be resolved.
pub fn count_cells(binary: &GrayImage) -> Option<usize> {
    let inverted = image_utils::invert(binary);
    let thinning = Kernel::vertical(((binary.height() as f32 * 0.4) as u32).max(1));

    let smeared = image_utils::dilate(&inverted, Kernel::horizontal(7), 3);
    let smeared = image_utils::dilate(&smeared, Kernel::vertical(3), 7);
    let separators = image_utils::erode(&smeared, thinning, 10);
    let skeleton = image_utils::skeletonize(&separators);

    let mut lefts: Vec<i32> = find_contours::<i32>(&skeleton)
        .iter()
        .filter_map(|contour| box_utils::bounding_box(&contour.points))
        .map(|b| b.x)
        .collect();
    lefts.sort_unstable();

    if lefts.len() < 2 {
        return None;
    }

    if lefts[0] < ARTIFACT_MARGIN {
        Some(lefts.len() - 1)
    } else {
        Some(lefts.len())
    }
}

fn clean_cell(text: &str, index: usize, options: &SegmentedOptions) -> String {
    if options.type_switch == Some(index) {
        let cleaned = normalizer::clean_alphanumeric(text);
        if cleaned.chars().any(|c| c.is_ascii_uppercase()) {
            return cleaned;
        }
        return normalizer::clean_single_character(&cleaned, CharKind::Digit);
    }

    match options.kind {
        CellKind::Digits => normalizer::clean_number(text, NumberKind::Plain),
        CellKind::Single(kind) => normalizer::clean_single_character(text, kind),
    }
}

/// Recognizes each cell of a segmented box and joins the cells with a space.
///
/// Returns `"None"` when fewer than two separators are found.
pub fn read_segmented(
    engine: &dyn OcrEngine,
    page: &RgbImage,
    form_box: &FormBox,
    options: &SegmentedOptions,
) -> Result<String, OcrError> {
    let cropped = match image_utils::crop(
        page,
        i64::from(form_box.x),
        i64::from(form_box.y),
        i64::from(form_box.width),
        i64::from(form_box.height),
    ) {
        Ok(cropped) => cropped,
        Err(e) => {
            debug!("Segmented box outside page: {}", e);
            return Ok(NONE.to_string());
        }
    };

    let binary = image_utils::threshold(&image_utils::to_grayscale(&cropped), CELL_THRESHOLD);
    let Some(count) = count_cells(&binary) else {
        return Ok(NONE.to_string());
    };
    debug!("Segmented box split into {} cells", count);

    let height = binary.height();
    let mut cells = Vec::with_capacity(count);

    for (index, (start, width)) in cell_spans(binary.width(), count).into_iter().enumerate() {
        let (trim_x, trim_y) = (width / 7, height / 7);
        let inner_width = width.saturating_sub(2 * trim_x).max(1);
        let inner_height = height.saturating_sub(2 * trim_y).max(1);
        let cell = image::imageops::crop_imm(
            &binary,
            start + trim_x,
            trim_y,
            inner_width,
            inner_height,
        )
        .to_image();
        let cell = image_utils::gaussian_blur_sigma(&cell, 1.0);

        let text = engine.recognize(&cell, options.language, &SINGLE_CHARACTER)?;
        cells.push(clean_cell(&text, index, options));
    }

    Ok(cells.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_spans_even() {
        let spans = cell_spans(140, 7);
        assert_eq!(spans.len(), 7);
        assert!(spans.iter().all(|&(_, w)| w == 20));
        assert_eq!(spans[6].0, 120);
    }

    #[test]
    fn test_cell_spans_remainder_goes_last() {
        let spans = cell_spans(141, 7);
        let widths: Vec<u32> = spans.iter().map(|&(_, w)| w).collect();
        assert_eq!(widths, vec![20, 20, 20, 20, 20, 20, 21]);
    }

    #[test]
    fn test_cell_spans_degenerate() {
        assert!(cell_spans(100, 0).is_empty());
        assert!(cell_spans(0, 3).is_empty());
    }

    #[test]
    fn test_type_switch_cell() {
        let options = SegmentedOptions::new(CellKind::Single(CharKind::Digit));
        assert_eq!(clean_cell("A", TYPE_SWITCH_INDEX, &options), "A");
        assert_eq!(clean_cell("o.", TYPE_SWITCH_INDEX, &options), "0");
        assert_eq!(clean_cell("l", 2, &options), "1");
    }

    #[test]
    fn test_blank_box_is_unresolved() {
        let binary = GrayImage::from_pixel(140, 40, image::Luma([255]));
        assert_eq!(count_cells(&binary), None);
    }
}
