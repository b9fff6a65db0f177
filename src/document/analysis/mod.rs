pub mod pipeline;
pub mod result;

pub use pipeline::PagePipeline;
pub use result::{field_columns, AnalysisResult, FailureRecord};
