//! Row structs and DTOs.
//!
//! Each submodule holds a `FromRow` + `Serialize` entity matching the
//! table, plus the request/response DTOs built around it.

pub mod catalog;
pub mod design_instruction;
pub mod design_variant;
pub mod status;
