//! Local bridge between the kitforge service and the desktop design tool.
//!
//! The bridge polls for claimed production instructions, drives the design
//! tool through an automation script, and uploads the exported documents.
//! The binary entrypoint lives in `main.rs`.

pub mod client;
pub mod config;
pub mod error;
pub mod exports;
pub mod processor;
pub mod scheduler;
pub mod source;
