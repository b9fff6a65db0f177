pub mod descriptor;

pub use descriptor::{
    Extraction, FieldSlot, LayoutDescriptor, Partition, TableColumn, PRESENTOR_FIELDS,
};
