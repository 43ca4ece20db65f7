pub mod json_store;
pub mod sqlite_store;
