//! `throw` — send files to people by e-mail from the command line.
//!
//! Small payloads go out as attachments. Larger ones are uploaded to a
//! remote gallery and the recipients get links instead. This crate
//! provides the library behind the `throw` binary: path expansion,
//! message rendering, the gallery client, SMTP submission, and the
//! terminal prompts used to fill in missing information.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod gallery;
pub mod identity;
pub mod model;
pub mod render;
pub mod transport;
pub mod ui;
pub mod wizard;
