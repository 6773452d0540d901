//! Session log persistence

pub mod file_store;

pub use file_store::FileSessionStore;
