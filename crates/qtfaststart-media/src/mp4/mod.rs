//! MP4 atom model and header parsing.
//!
//! Only the box structure is understood here: size, type and the 64-bit
//! extended size form. Atom bodies are never interpreted except for the
//! chunk offset tables handled by [`crate::patch`].

mod atoms;
mod reader;

pub use atoms::{Atom, AtomType};
pub use reader::{read_children, AtomReader, TopLevelAtoms, EXTENDED_HEADER_SIZE, HEADER_SIZE};
