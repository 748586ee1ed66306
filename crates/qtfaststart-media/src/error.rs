//! Error types for qtfaststart-media.

use crate::mp4::AtomType;
use std::io;
use thiserror::Error;

/// Result type for qtfaststart-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for qtfaststart-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Fewer bytes were available than an atom header needs.
    #[error("Unexpected end of data at offset {offset}")]
    EndOfData { offset: u64 },

    /// Missing required top-level atom.
    #[error("{0} atom not found, is this a valid MOV/MP4 file?")]
    MissingAtom(&'static str),

    /// The moov atom holds a compressed `cmov` child.
    #[error("Movies with compressed headers are not supported")]
    Compressed,

    /// Atom size is smaller than its header or overruns its parent.
    #[error("Invalid size {size} for {atom_type} atom at offset {position}")]
    InvalidAtomSize {
        atom_type: AtomType,
        position: u64,
        size: u64,
    },

    /// Chunk offset table declares more entries than it holds.
    #[error("{atom_type} table at offset {position} declares {entries} entries but holds {available}")]
    TruncatedTable {
        atom_type: AtomType,
        position: u64,
        entries: u32,
        available: u64,
    },

    /// Shifting a chunk offset left the range of its table's entry width.
    #[error("Chunk offset {entry} in {atom_type} cannot be shifted by {offset}")]
    OffsetOverflow {
        atom_type: AtomType,
        entry: u64,
        offset: i64,
    },

    /// moov sits between two mdat atoms, so no single shift fits every chunk.
    #[error("moov at offset {position} lies between mdat atoms and cannot be moved")]
    InterleavedMoov { position: u64 },

    /// moov is too large to be patched in memory.
    #[error("moov atom size {size} exceeds maximum {max}")]
    MoovTooLarge { size: u64, max: u64 },

    /// Processing was cancelled between atom copies.
    #[error("Processing cancelled")]
    Cancelled,
}

impl Error {
    /// Whether this error rejects the input's format rather than failing I/O.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::MissingAtom(_) | Self::Compressed)
    }
}
