pub mod error;
pub mod scope_record;
pub mod scope_ref;
pub mod scope_store;
