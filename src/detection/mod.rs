pub mod grid_probe;
pub mod hough;
pub mod line_detector;
pub mod segmented;
pub mod skew;

pub use grid_probe::probe_grid;
pub use line_detector::{
    AlignedPage, Detection, DetectionParams, LineDetector, MaskFinish, ThinLines,
};
pub use segmented::{read_segmented, CellKind, SegmentedOptions};
pub use skew::estimate_skew;
