//! Schema flattening and codelist extraction.

pub mod codelist;
pub mod flatten;
pub mod node;

pub use codelist::extract_codes;
pub use flatten::{
    DEFAULT_MAX_DEPTH, MAX_SCHEMA_DEPTH, child_path, flatten, flatten_with_limit,
    normalize_type,
};
pub use node::{Scalar, SchemaNode};
