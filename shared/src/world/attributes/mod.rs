pub mod attribute;
pub mod attribute_store;
pub mod error;
pub mod options;
