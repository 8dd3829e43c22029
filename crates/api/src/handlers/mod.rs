//! Request handlers.
//!
//! Handlers parse the request, delegate to [`crate::variants`] or
//! [`crate::production`], and wrap results in [`crate::response::DataResponse`].

pub mod production;
pub mod variants;
