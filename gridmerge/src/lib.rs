mod attributes;
mod dataset;
mod errors;
mod memory;
mod merge;
mod odometer;
mod registry;
mod storage;
mod translate;
mod value;

#[cfg(test)]
mod testing;

pub use errors::Error;
pub use errors::Result;

pub use value::Scalar;
pub use value::TypeCode;
pub use value::Value;

pub use odometer::Odometer;

pub use storage::Attribute;
pub use storage::AttributeInfo;
pub use storage::AttributeTarget;
pub use storage::CreateMode;
pub use storage::DimId;
pub use storage::DimensionInfo;
pub use storage::Handle;
pub use storage::Inquiry;
pub use storage::Length;
pub use storage::OpenMode;
pub use storage::Storage;
pub use storage::VarId;
pub use storage::VariableMetadata;

pub use memory::Container;
pub use memory::MemoryStore;
pub use memory::StoredAttribute;
pub use memory::StoredDimension;
pub use memory::StoredVariable;

pub use dataset::Dataset;
pub use dataset::Dimension;
pub use dataset::Variable;

pub use registry::Axis;
pub use registry::CoordinateRegistry;
pub use registry::Lookup;

pub use translate::translate;
pub use translate::Translator;

pub use attributes::copy_attributes;
pub use attributes::FILES_LIST;
pub use attributes::FILE_DESCRIPTION;

pub use merge::merge;
pub use merge::merge_with;
pub use merge::InputSummary;
pub use merge::MergeOptions;
pub use merge::Summary;
