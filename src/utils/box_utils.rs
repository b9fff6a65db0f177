//! Utility functions for box and contour operations.

use geo::{Area, Coord, LineString, Polygon};
use imageproc::contours::{BorderType, Contour};
use imageproc::point::Point;

use crate::document::form_box::{BoxOrder, FormBox};

/// Which contours of a mask become boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrievalMode {
    /// Only outermost borders
    #[default]
    External,
    /// Every border, including holes and nested shapes
    List,
}

/// Calculates the enclosed area of a contour polygon.
///
/// Uses the shoelace formula, so a straight open polyline has zero area.
///
/// # Arguments
///
/// * `points` - Contour vertices in tracing order
///
/// # Returns
///
/// The unsigned area, or 0.0 for fewer than three points.
#[must_use]
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let polygon = Polygon::new(
        LineString::from_iter(points.iter().map(|p| Coord {
            x: f64::from(p.x),
            y: f64::from(p.y),
        })),
        vec![],
    );

    polygon.unsigned_area()
}

/// Smallest upright box containing every point, with inclusive pixel extents.
///
/// Returns `None` for an empty point set.
#[must_use]
pub fn bounding_box(points: &[Point<i32>]) -> Option<FormBox> {
    let first = points.first()?;
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);

    for point in points.iter().skip(1) {
        min_x = min_x.min(point.x);
        max_x = max_x.max(point.x);
        min_y = min_y.min(point.y);
        max_y = max_y.max(point.y);
    }

    Some(FormBox::new(
        min_x,
        min_y,
        max_x - min_x + 1,
        max_y - min_y + 1,
    ))
}

/// Keeps the contours selected by `mode`.
pub fn select_contours(contours: Vec<Contour<i32>>, mode: RetrievalMode) -> Vec<Contour<i32>> {
    match mode {
        RetrievalMode::List => contours,
        RetrievalMode::External => contours
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .collect(),
    }
}

/// Sorts boxes in place by the given order. The sort is stable.
pub fn sort_boxes(boxes: &mut [FormBox], order: BoxOrder) {
    match order {
        BoxOrder::Area => boxes.sort_by(|a, b| b.area().cmp(&a.area()).then(a.y.cmp(&b.y))),
        BoxOrder::Top => boxes.sort_by_key(|b| b.y),
        BoxOrder::Left => boxes.sort_by_key(|b| b.x),
    }
}

/// The `k` largest boxes in canonical order (descending area, ties by `y`).
#[must_use]
pub fn top_by_area(boxes: &[FormBox], k: usize) -> Vec<FormBox> {
    let mut ranked = boxes.to_vec();
    sort_boxes(&mut ranked, BoxOrder::Area);
    ranked.truncate(k);
    ranked
}

/// Returns a copy of `boxes` sorted by `order`.
#[must_use]
pub fn sorted(boxes: &[FormBox], order: BoxOrder) -> Vec<FormBox> {
    let mut result = boxes.to_vec();
    sort_boxes(&mut result, order);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: i32, y: i32, size: i32) -> Vec<Point<i32>> {
        vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ]
    }

    // contour_area Tests

    #[test]
    fn test_contour_area_square() {
        assert!((contour_area(&square(0, 0, 10)) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_contour_area_degenerate() {
        let line = vec![Point::new(0, 0), Point::new(10, 0)];
        assert_eq!(contour_area(&line), 0.0);
        assert_eq!(contour_area(&[]), 0.0);
    }

    // bounding_box Tests

    #[test]
    fn test_bounding_box_inclusive_extent() {
        let bbox = bounding_box(&square(5, 7, 10)).unwrap();
        assert_eq!((bbox.x, bbox.y, bbox.width, bbox.height), (5, 7, 11, 11));
        assert_eq!(bbox.area(), 121);
    }

    #[test]
    fn test_bounding_box_empty() {
        assert!(bounding_box(&[]).is_none());
    }

    // Ordering Tests

    #[test]
    fn test_top_by_area_ties_by_y() {
        let boxes = vec![
            FormBox::new(0, 50, 10, 10),
            FormBox::new(0, 10, 10, 10),
            FormBox::new(0, 90, 20, 20),
        ];

        let ranked = top_by_area(&boxes, 3);
        assert_eq!(ranked[0].y, 90);
        assert_eq!(ranked[1].y, 10);
        assert_eq!(ranked[2].y, 50);
    }

    #[test]
    fn test_top_by_area_truncates() {
        let boxes: Vec<FormBox> = (0..5).map(|i| FormBox::new(0, i * 10, 10 + i, 5)).collect();
        let ranked = top_by_area(&boxes, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].width, 14);
    }
}
