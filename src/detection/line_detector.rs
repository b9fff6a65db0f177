//! Ruled-box detection on form pages.
//!
//! The page is binarized, long vertical and horizontal strokes are isolated
//! with directional opening, and the union of both is traced into contours
//! whose bounding rectangles are the candidate boxes.

use std::borrow::Cow;

use image::{GrayImage, RgbImage};
use imageproc::contours::find_contours;
use imageproc::edges::canny;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::detection::skew;
use crate::document::form_box::FormBox;
use crate::utils::box_utils::{self, RetrievalMode};
use crate::utils::error::ImageError;
use crate::utils::image_utils::{self, Kernel};

const PAGE_THRESHOLD: u8 = 120;
const MASK_THRESHOLD: u8 = 80;
const CANNY_HIGH: f32 = 240.0;

/// Length of the opening element that keeps vertical rulings.
const VERTICAL_LINE_LENGTH: u32 = 20;
/// Length of the opening element that keeps horizontal rulings.
const HORIZONTAL_LINE_LENGTH: u32 = 30;

/// Which ruling direction is drawn thin on a page and should be thickened
/// less aggressively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThinLines {
    #[default]
    None,
    Vertical,
    Horizontal,
}

/// Final treatment of the line mask before contours are traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaskFinish {
    /// Threshold then thin to one-pixel lines
    #[default]
    Skeleton,
    /// Threshold then keep Canny edges
    Canny,
    /// Use the mask as is
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionParams {
    pub retrieval: RetrievalMode,
    pub thin_lines: ThinLines,
    pub finish: MaskFinish,
    pub vertical_iterations: u32,
    pub horizontal_iterations: u32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            retrieval: RetrievalMode::External,
            thin_lines: ThinLines::None,
            finish: MaskFinish::Skeleton,
            vertical_iterations: 4,
            horizontal_iterations: 3,
        }
    }
}

impl DetectionParams {
    /// `(vertical, horizontal)` kernels used to thicken the isolated lines.
    fn thickening_kernels(&self) -> (Kernel, Kernel) {
        match self.thin_lines {
            ThinLines::None => (Kernel::vertical(10), Kernel::horizontal(10)),
            ThinLines::Vertical => (Kernel::vertical(10), Kernel::horizontal(2)),
            ThinLines::Horizontal => (Kernel::vertical(2), Kernel::horizontal(10)),
        }
    }
}

/// Boxes found on a page together with the line mask they were traced from.
#[derive(Debug, Clone)]
pub struct Detection {
    pub boxes: Vec<FormBox>,
    pub line_mask: GrayImage,
}

/// A page after skew correction.
#[derive(Debug, Clone)]
pub struct AlignedPage<'a> {
    /// The page boxes refer to; rotated when a correction was applied
    pub image: Cow<'a, RgbImage>,
    pub boxes: Vec<FormBox>,
    /// Rotation applied to the page in degrees, 0 when none
    pub skew: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LineDetector {
    params: DetectionParams,
}

impl LineDetector {
    pub fn new(params: DetectionParams) -> Self {
        Self { params }
    }

    /// Binarizes the page with ink as foreground and closes small breaks.
    pub fn prepare(image: &RgbImage) -> GrayImage {
        let gray = image_utils::to_grayscale(image);
        let inverted = image_utils::invert(&image_utils::threshold(&gray, PAGE_THRESHOLD));
        let dilated = image_utils::dilate(&inverted, Kernel::vertical(3), 1);
        let dilated = image_utils::dilate(&dilated, Kernel::horizontal(3), 1);
        let eroded = image_utils::erode(&dilated, Kernel::square(3), 1);
        image_utils::gaussian_blur(&eroded, 3)
    }

    /// Union of the vertical and horizontal ruling lines of a page.
    pub fn line_mask(&self, image: &RgbImage) -> Result<GrayImage, ImageError> {
        let prepared = Self::prepare(image);
        let (vertical_thick, horizontal_thick) = self.params.thickening_kernels();

        let vertical_element = Kernel::vertical(VERTICAL_LINE_LENGTH);
        let vertical =
            image_utils::erode(&prepared, vertical_element, self.params.vertical_iterations);
        let vertical =
            image_utils::dilate(&vertical, vertical_element, self.params.vertical_iterations);
        let vertical = image_utils::dilate(&vertical, horizontal_thick, 2);

        let horizontal_element = Kernel::horizontal(HORIZONTAL_LINE_LENGTH);
        let horizontal =
            image_utils::erode(&prepared, horizontal_element, self.params.horizontal_iterations);
        let horizontal =
            image_utils::dilate(&horizontal, horizontal_element, self.params.horizontal_iterations);
        let horizontal = image_utils::dilate(&horizontal, vertical_thick, 2);

        image_utils::union(&vertical, &horizontal)
    }

    fn finish(&self, mask: &GrayImage) -> GrayImage {
        match self.params.finish {
            MaskFinish::Skeleton => {
                image_utils::skeletonize(&image_utils::threshold(mask, MASK_THRESHOLD))
            }
            MaskFinish::Canny => canny(
                &image_utils::threshold(mask, MASK_THRESHOLD),
                f32::from(MASK_THRESHOLD),
                CANNY_HIGH,
            ),
            MaskFinish::Raw => mask.clone(),
        }
    }

    /// Detects boxes on a page without any skew handling.
    pub fn detect(&self, image: &RgbImage) -> Result<Detection, ImageError> {
        let line_mask = self.line_mask(image)?;
        let traced = self.finish(&line_mask);
        let boxes = boxes_from_mask(&traced, self.params.retrieval);
        debug!("Detected {} candidate boxes", boxes.len());
        Ok(Detection { boxes, line_mask })
    }

    /// Detects boxes, straightening the page first when it is skewed.
    ///
    /// At most two detection passes run: the first measures the skew; when
    /// it exceeds the tolerance the page is rotated and detected once more.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn detect_aligned<'a>(&self, image: &'a RgbImage) -> Result<AlignedPage<'a>, ImageError> {
        let first = self.detect(image)?;
        let angle = skew::estimate_skew(&first.line_mask);
        if !skew::needs_correction(angle) {
            return Ok(AlignedPage {
                image: Cow::Borrowed(image),
                boxes: first.boxes,
                skew: 0.0,
            });
        }

        debug!("Rotating page by {:.3} degrees", angle);
        let rotated = image_utils::rotate_by_angle(image, angle)?;
        let second = self.detect(&rotated)?;

        Ok(AlignedPage {
            image: Cow::Owned(rotated),
            boxes: second.boxes,
            skew: angle,
        })
    }
}

/// Bounding boxes of the contours selected by `mode`.
pub fn boxes_from_mask(mask: &GrayImage, mode: RetrievalMode) -> Vec<FormBox> {
    box_utils::select_contours(find_contours::<i32>(mask), mode)
        .iter()
        .filter_map(|contour| box_utils::bounding_box(&contour.points))
        .collect()
}
