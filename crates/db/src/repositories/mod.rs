//! Repository layer.
//!
//! Each repository is a zero-sized struct with async methods taking
//! `&PgPool`, or `&mut Transaction` for steps that must share one.

pub mod catalog_repo;
pub mod design_instruction_repo;
pub mod design_variant_repo;

pub use catalog_repo::CatalogRepo;
pub use design_instruction_repo::DesignInstructionRepo;
pub use design_variant_repo::DesignVariantRepo;
