//! Qtfaststart-Media: moov relocation for MP4/QuickTime files
//!
//! This crate rewrites an MP4/QuickTime container so that its `moov` atom
//! sits in front of `mdat`, letting players start before the whole file has
//! been downloaded ("fast start").
//!
//! # Modules
//!
//! - `mp4` - Atom model, header reader and box-tree walkers
//! - `index` - Top-level atom index and validation
//! - `plan` - Offset planning for filler removal and moov relocation
//! - `patch` - In-memory `stco`/`co64` patching
//! - `assemble` - Output assembly in the planned order
//! - `processor` - The `process` entry point and result vocabulary
//!
//! # Features
//!
//! - `tracing` - Emit `tracing` events while indexing, patching and writing
//!
//! # Example
//!
//! ```no_run
//! use qtfaststart_media::{process, Options, ProcessingStatus};
//! use std::fs::File;
//!
//! let mut input = File::open("movie.mp4").unwrap();
//! let mut output = File::create("movie-faststart.mp4").unwrap();
//!
//! match process(&mut input, &mut output, &Options::default()) {
//!     ProcessingStatus::Success => println!("moov moved"),
//!     status => println!("not converted: {}", status),
//! }
//! ```

pub mod assemble;
pub mod error;
pub mod index;
pub mod mp4;
pub mod patch;
pub mod plan;
pub mod processor;

#[cfg(test)]
mod test_fixtures;

pub use assemble::StreamAssembler;
pub use error::{Error, Result};
pub use index::AtomIndex;
pub use mp4::{Atom, AtomType};
pub use patch::{patch, MoovPatcher, PatchStats};
pub use plan::{MoovPlacement, OffsetPlan};
pub use processor::{process, FastStart, Options, Outcome, ProcessingStatus};
