//! mkvsource-ebml: wire-level EBML and Matroska block decoding
//!
//! This crate knows how Matroska bytes are laid out and nothing about I/O.
//! Every reader works on a byte slice and reports
//! [`EbmlError::Incomplete`] when the slice ends too early, so callers can
//! feed it from any buffering scheme.
//!
//! # Modules
//!
//! - `vint` - variable-length integers (IDs, sizes, signed lace deltas)
//! - `catalog` - static table of known element IDs, kinds and names
//! - `element` - element headers, subtrees and typed leaf values
//! - `block` - SimpleBlock/Block headers and the three supported lacings

pub mod block;
pub mod catalog;
pub mod element;
pub mod error;
pub mod vint;

pub use block::{parse_block_header, BlockFlags, BlockHeader, Lacing};
pub use catalog::{ElementId, ElementInfo, ElementKind};
pub use element::{read_element, read_element_header, read_element_tree, Element, ElementHeader, ElementValue};
pub use error::{EbmlError, Result};
pub use vint::{read_var_int, VarInt};
