//! Core data model types: files selected for dispatch and rendered messages.

pub mod file;
pub mod message;
