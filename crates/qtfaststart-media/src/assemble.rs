//! Output assembly.
//!
//! Writes `ftyp`, the patched `moov` and the remaining atoms in the order the
//! offset plan was computed for.

use crate::index::AtomIndex;
use crate::mp4::{Atom, AtomType};
use crate::plan::{MoovPlacement, OffsetPlan};
use crate::{Error, Result};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicBool, Ordering};

/// Default number of bytes moved per read/write when copying atoms.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Copies atoms from a source file into the rewritten output.
pub struct StreamAssembler<'a, R, W> {
    source: &'a mut R,
    sink: &'a mut W,
    chunk_size: usize,
    limit: Option<u64>,
    cancel: Option<&'a AtomicBool>,
    written: u64,
}

impl<'a, R: Read + Seek, W: Write> StreamAssembler<'a, R, W> {
    /// Create a new assembler.
    pub fn new(source: &'a mut R, sink: &'a mut W) -> Self {
        Self {
            source,
            sink,
            chunk_size: DEFAULT_CHUNK_SIZE,
            limit: None,
            cancel: None,
            written: 0,
        }
    }

    /// Set the copy chunk size. Zero falls back to the default.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        self
    }

    /// Cap the number of body bytes copied per atom. Zero means no cap.
    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit.filter(|l| *l > 0);
        self
    }

    /// Check `flag` between atom copies and stop once it is set.
    pub fn cancel_flag(mut self, flag: Option<&'a AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Write the complete output. Returns the number of bytes written.
    pub fn assemble(mut self, index: &AtomIndex, plan: &OffsetPlan, moov: &[u8]) -> Result<u64> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Writing output...");

        for atom in index.iter().filter(|a| a.atom_type == AtomType::FTYP) {
            #[cfg(feature = "tracing")]
            tracing::debug!("Writing ftyp... ({} bytes)", atom.size);
            self.copy_range(atom.position, Some(atom.size))?;
        }

        if plan.placement == MoovPlacement::Front {
            self.write_moov(moov)?;
        }

        for atom in index.iter().filter(|a| !skipped(a, plan)) {
            self.check_cancelled()?;

            #[cfg(feature = "tracing")]
            tracing::debug!("Writing {}... ({} bytes)", atom.atom_type, atom.size);

            self.copy_range(atom.position, self.copy_len(atom))?;
        }

        if plan.placement == MoovPlacement::End {
            self.write_moov(moov)?;
        }

        self.sink.flush()?;
        Ok(self.written)
    }

    fn copy_len(&self, atom: &Atom) -> Option<u64> {
        let len = if atom.size == 0 && atom.atom_type == AtomType::MDAT {
            None
        } else {
            Some(atom.size)
        };

        match (len, self.limit) {
            (Some(len), Some(limit)) => Some(len.min(limit)),
            (None, limit) => limit,
            (len, None) => len,
        }
    }

    fn write_moov(&mut self, moov: &[u8]) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Writing moov... ({} bytes)", moov.len());

        for chunk in moov.chunks(self.chunk_size) {
            self.sink.write_all(chunk)?;
        }
        self.written += moov.len() as u64;
        Ok(())
    }

    /// Copy `len` bytes starting at `position`, or everything up to end of
    /// file when `len` is `None`.
    fn copy_range(&mut self, position: u64, len: Option<u64>) -> Result<()> {
        self.source.seek(SeekFrom::Start(position))?;

        let mut buf = vec![0u8; self.chunk_size];
        let mut remaining = len.unwrap_or(u64::MAX);

        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            let read = match self.source.read(&mut buf[..want]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            self.sink.write_all(&buf[..read])?;
            self.written += read as u64;
            remaining -= read as u64;
        }

        if len.is_some() && remaining > 0 {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "Source ended {} bytes short of atom at offset {}",
                remaining,
                position
            );
        }

        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        match self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }
}

fn skipped(atom: &Atom, plan: &OffsetPlan) -> bool {
    matches!(atom.atom_type, AtomType::FTYP | AtomType::MOOV) || plan.removes(atom)
}
