//! Design variant lifecycle: generation, selection and deletion.

pub mod manager;
pub mod template_cache;

pub use manager::VariantManager;
pub use template_cache::{CachedTemplate, TemplateCache};
