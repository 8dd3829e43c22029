//! Layer model for vector garment templates.
//!
//! [`parser::parse`] turns SVG text into an owned [`markup::Document`]
//! plus a typed [`node::LayerNode`] tree and a [`parser::LayerIndex`]
//! built in the same walk. [`classify`] derives the editable role of each
//! layer; [`bbox`] computes placement boxes for logos and overlays.

pub mod bbox;
pub mod classify;
pub mod error;
pub mod markup;
pub mod node;
pub mod parser;

pub use classify::{classify, editable_layers, EditableLayer, LayerRole};
pub use error::ParseError;
pub use node::{LayerBody, LayerKind, LayerNode, ShapeKind};
pub use parser::{parse, LayerIndex, ParsedDocument};
