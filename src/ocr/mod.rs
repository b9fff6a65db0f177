//! Region recognition: cropping and enhancing a box, then handing it to an
//! [`OcrEngine`].

pub mod error;
pub mod tesseract;

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use error::OcrError;
pub use tesseract::TesseractEngine;

use crate::document::form_box::FormBox;
use crate::text::normalizer::{self, NONE};
use crate::utils::error::ImageError;
use crate::utils::image_utils::{self, Kernel};

/// Anything that turns a grayscale region into text.
///
/// Implementations must be shareable across batch workers.
pub trait OcrEngine: Send + Sync {
    fn recognize(
        &self,
        region: &GrayImage,
        language: OcrLanguage,
        config: &OcrConfig,
    ) -> Result<String, OcrError>;
}

impl<T: OcrEngine + ?Sized> OcrEngine for std::sync::Arc<T> {
    fn recognize(
        &self,
        region: &GrayImage,
        language: OcrLanguage,
        config: &OcrConfig,
    ) -> Result<String, OcrError> {
        (**self).recognize(region, language, config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OcrLanguage {
    #[default]
    English,
    /// Simplified Chinese with English, for boxes with mixed script
    ChineseEnglish,
}

impl OcrLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrLanguage::English => "eng",
            OcrLanguage::ChineseEnglish => "chi_sim+eng",
        }
    }
}

/// Engine options. Only the page segmentation mode is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OcrConfig {
    pub psm: Option<u8>,
}

impl OcrConfig {
    pub const fn psm(mode: u8) -> Self {
        Self { psm: Some(mode) }
    }

    pub fn to_args(&self) -> Vec<String> {
        match self.psm {
            Some(mode) => vec!["--psm".to_string(), mode.to_string()],
            None => Vec::new(),
        }
    }
}

impl std::fmt::Display for OcrConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_args().join(" "))
    }
}

/// Which half of a box to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Halve {
    #[default]
    None,
    Left,
    Right,
}

/// How a box is cut out and enhanced before recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropOptions {
    pub halve: Halve,
    /// Skip the printed label margin at the top left of a reference block
    pub concentrate: bool,
    /// Upscale three times
    pub resize: bool,
    pub erode: bool,
    pub blur: bool,
    pub sharpen: bool,
    pub dilate: bool,
}

impl Default for CropOptions {
    fn default() -> Self {
        Self {
            halve: Halve::None,
            concentrate: false,
            resize: false,
            erode: false,
            blur: true,
            sharpen: false,
            dilate: false,
        }
    }
}

impl CropOptions {
    /// The region of the page to read, before clamping to the image.
    pub fn region(&self, form_box: &FormBox) -> FormBox {
        let half = form_box.width / 2;
        let mut region = match self.halve {
            Halve::None => *form_box,
            Halve::Left => FormBox::new(form_box.x, form_box.y, half, form_box.height),
            Halve::Right => FormBox::new(form_box.x + half, form_box.y, half, form_box.height),
        };
        if self.concentrate {
            // The value area runs 10 px past the right edge of the halved box.
            region = region.inset(90, 65, -10, 5);
        }
        region
    }
}

/// Everything needed to read one box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OcrSettings {
    pub crop: CropOptions,
    pub language: OcrLanguage,
    pub config: OcrConfig,
}

impl OcrSettings {
    pub const fn new(crop: CropOptions, language: OcrLanguage, config: OcrConfig) -> Self {
        Self {
            crop,
            language,
            config,
        }
    }
}

/// Cuts a box out of the page and applies the requested enhancements.
pub fn prepare_region(
    page: &RgbImage,
    form_box: &FormBox,
    crop: &CropOptions,
) -> Result<GrayImage, ImageError> {
    let region = crop.region(form_box);
    let cropped = image_utils::crop(
        page,
        i64::from(region.x),
        i64::from(region.y),
        i64::from(region.width),
        i64::from(region.height),
    )?;

    let mut gray = image_utils::to_grayscale(&cropped);
    if crop.resize {
        gray = image_utils::upscale(&gray, 3);
    }
    if crop.erode {
        gray = image_utils::erode(&gray, Kernel::square(3), 2);
    }
    if crop.blur {
        gray = image_utils::gaussian_blur(&gray, 7);
    }
    if crop.sharpen {
        gray = image_utils::sharpen(&gray);
    }
    if crop.dilate {
        gray = image_utils::dilate(&gray, Kernel::square(3), 2);
    }

    Ok(gray)
}

/// Reads one box. Blank output, `N/A` and boxes that fall outside the page
/// resolve to `"None"`.
pub fn ocr_box(
    engine: &dyn OcrEngine,
    page: &RgbImage,
    form_box: &FormBox,
    settings: &OcrSettings,
) -> Result<String, OcrError> {
    let region = match prepare_region(page, form_box, &settings.crop) {
        Ok(region) => region,
        Err(e) => {
            warn!("Skipping unreadable region {:?}: {}", form_box, e);
            return Ok(NONE.to_string());
        }
    };

    let text = engine.recognize(&region, settings.language, &settings.config)?;
    Ok(normalizer::clean_region_text(&text))
}

/// Reads several boxes that together hold one field and joins the readable
/// parts with a space.
pub fn ocr_boxes(
    engine: &dyn OcrEngine,
    page: &RgbImage,
    boxes: &[FormBox],
    settings: &OcrSettings,
) -> Result<String, OcrError> {
    let mut parts = Vec::with_capacity(boxes.len());
    for form_box in boxes {
        let text = ocr_box(engine, page, form_box, settings)?;
        if text != NONE {
            parts.push(text);
        }
    }

    if parts.is_empty() {
        Ok(NONE.to_string())
    } else {
        Ok(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_halve_and_concentrate() {
        let form_box = FormBox::new(100, 200, 1000, 400);

        let left = CropOptions {
            halve: Halve::Left,
            ..Default::default()
        };
        assert_eq!(left.region(&form_box), FormBox::new(100, 200, 500, 400));

        let right = CropOptions {
            halve: Halve::Right,
            ..Default::default()
        };
        assert_eq!(right.region(&form_box), FormBox::new(600, 200, 500, 400));

        let concentrated = CropOptions {
            halve: Halve::Left,
            concentrate: true,
            ..Default::default()
        };
        assert_eq!(
            concentrated.region(&form_box),
            FormBox::new(190, 265, 420, 330)
        );

        let tiny = FormBox::new(0, 0, 60, 40);
        let region = concentrated.region(&tiny);
        assert_eq!((region.x, region.y), (90, 65));
        assert_eq!((region.width, region.height), (1, 1));
    }

    #[test]
    fn test_config_args() {
        assert_eq!(OcrConfig::psm(12).to_string(), "--psm 12");
        assert!(OcrConfig::default().to_args().is_empty());
    }
}
