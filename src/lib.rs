pub mod cli;
pub mod codegen;
pub mod decode;
pub mod fields;
pub mod render;
pub mod schema;

pub use codegen::{Document, GenConfig, GenError, Generator, Geometry, StageArtifact};
pub use decode::{DecodeConfig, DecodeError, Decoder};
pub use fields::{FieldLookupError, FieldSourceMap};
pub use render::{RenderError, Template};
pub use schema::{FormatError, OpKind, Schema, Stage};
