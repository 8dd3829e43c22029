//! HTTP service for design variants and production instructions.

pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod production;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod storage;
pub mod variants;
