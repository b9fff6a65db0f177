pub mod normalizer;
pub mod presentor;

pub use normalizer::{normalize, CharKind, EntryKind, NumberKind, NONE};
pub use presentor::PresentorBlock;
