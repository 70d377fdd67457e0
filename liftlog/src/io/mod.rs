//! I/O for liftlog: files under `.liftlog/` and the document store.

pub mod config;
pub mod document_store;
pub mod init;
pub mod json_file;
pub mod routine_import;
pub mod session_cache;
