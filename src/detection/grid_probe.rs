//! Locating the interior ruling lines of a table box.

use image::GrayImage;
use imageproc::contours::{find_contours, Contour};

use crate::document::table::TableGrid;
use crate::utils::box_utils;
use crate::utils::image_utils::{self, Kernel};

const GRID_THRESHOLD: u8 = 150;

/// Erosion length that only full table rulings survive.
const RULING_LENGTH: u32 = 21;

/// Finds the `vertical` longest vertical and `horizontal` longest horizontal
/// lines in a grayscale table crop.
///
/// Fewer lines than requested are returned when the table has fewer; the
/// caller decides whether that is fatal.
pub fn probe_grid(table: &GrayImage, vertical: usize, horizontal: usize) -> TableGrid {
    let inverted = image_utils::invert(&image_utils::threshold(table, GRID_THRESHOLD));
    let thickened = image_utils::dilate(&inverted, Kernel::vertical(5), 3);
    let thickened = image_utils::dilate(&thickened, Kernel::horizontal(5), 2);

    let horizontal_lines = image_utils::erode(&thickened, Kernel::horizontal(RULING_LENGTH), 10);
    let vertical_lines = image_utils::erode(&thickened, Kernel::vertical(RULING_LENGTH), 10);

    let rows = largest_lines(find_contours::<i32>(&horizontal_lines), horizontal, |b| b.y);
    let columns = largest_lines(find_contours::<i32>(&vertical_lines), vertical, |b| b.x);

    TableGrid::new(columns, rows)
}

fn largest_lines(
    contours: Vec<Contour<i32>>,
    count: usize,
    coordinate: impl Fn(&crate::document::form_box::FormBox) -> i32,
) -> Vec<i32> {
    let mut ranked: Vec<(f64, i32)> = contours
        .iter()
        .filter_map(|contour| {
            let bbox = box_utils::bounding_box(&contour.points)?;
            Some((box_utils::contour_area(&contour.points), coordinate(&bbox)))
        })
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.truncate(count);

    let mut coordinates: Vec<i32> = ranked.into_iter().map(|(_, c)| c).collect();
    coordinates.sort_unstable();
    coordinates
}
