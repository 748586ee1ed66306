//! File-level processing: opens the input, writes the output atomically and
//! carries permissions over.

use anyhow::{Context, Result};
use qtfaststart_media::mp4::AtomReader;
use qtfaststart_media::{Atom, Error, FastStart, Options, Outcome, ProcessingStatus};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tempfile::NamedTempFile;

/// Options for processing a file on disk.
#[derive(Debug, Clone)]
pub struct FileOptions {
    pub options: Options,
    pub copy_permissions: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            options: Options::default(),
            copy_permissions: true,
        }
    }
}

/// Rewrite `input` into `output`.
///
/// The output is staged in a temporary file next to `output` and only moved
/// into place on success, so rejected inputs never leave a partial file.
/// `input` and `output` may be the same path.
pub fn process_file(input: &Path, output: &Path, opts: &FileOptions) -> Result<ProcessingStatus> {
    let mut source =
        File::open(input).with_context(|| format!("Failed to open input file: {:?}", input))?;

    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;

    let mut sink = BufWriter::new(staged);
    let result = FastStart::new(opts.options.clone()).run(&mut source, &mut sink);

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e @ (Error::MissingAtom(_) | Error::Compressed)) => {
            tracing::warn!("{}: {}", input.display(), e);
            return Ok(ProcessingStatus::from(&e));
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to process {:?}", input));
        }
    };

    if let Outcome::Converted {
        bytes_written,
        offset,
        ..
    } = outcome
    {
        let staged = sink
            .into_inner()
            .map_err(|e| e.into_error())
            .context("Failed to flush output")?;
        staged
            .persist(output)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write output file: {:?}", output))?;

        tracing::info!(
            "Wrote {} bytes to {} (chunk offsets shifted by {})",
            bytes_written,
            output.display(),
            offset
        );

        if opts.copy_permissions {
            copy_permissions(input, output);
        }
    }

    Ok(ProcessingStatus::from(&outcome))
}

/// Best-effort copy of filesystem permissions. Failures are only logged.
fn copy_permissions(input: &Path, output: &Path) {
    let result = fs::metadata(input).and_then(|meta| fs::set_permissions(output, meta.permissions()));
    if let Err(e) = result {
        tracing::warn!("Could not copy file permissions: {}", e);
    }
}

/// One row of a top-level atom listing.
#[derive(Debug, Clone, Serialize)]
pub struct AtomListing {
    pub atom_type: String,
    pub position: u64,
    pub size: u64,
}

impl From<&Atom> for AtomListing {
    fn from(atom: &Atom) -> Self {
        Self {
            atom_type: atom.atom_type.to_string(),
            position: atom.position,
            size: atom.size,
        }
    }
}

/// Walk the top-level atoms of `path` without validating them.
pub fn list_atoms(path: &Path) -> Result<Vec<AtomListing>> {
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let mut reader = AtomReader::new(file);
    Ok(reader.top_level().map(|a| AtomListing::from(&a)).collect())
}
