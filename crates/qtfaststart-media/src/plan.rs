//! Offset planning.
//!
//! Works out how far the start of `mdat` moves once filler atoms are dropped
//! and `moov` is placed at its requested position. Every chunk offset inside
//! `moov` moves by the same amount.

use crate::index::AtomIndex;
use crate::mp4::{Atom, AtomType, HEADER_SIZE};
use crate::{Error, Options, Result};

/// Where the patched moov is written in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoovPlacement {
    /// Directly after `ftyp`, before the media data (fast start).
    Front,
    /// After every other atom.
    End,
}

impl MoovPlacement {
    pub fn from_relocate_to_end(relocate_to_end: bool) -> Self {
        if relocate_to_end {
            Self::End
        } else {
            Self::Front
        }
    }
}

/// Result of offset planning for one input.
#[derive(Debug, Clone)]
pub struct OffsetPlan {
    /// Signed shift applied to every chunk offset.
    pub offset: i64,
    /// Bytes of filler removed before `mdat`.
    pub filler_bytes: u64,
    /// The moov atom being relocated.
    pub moov: Atom,
    /// The first mdat atom. Filler is only counted before it.
    pub mdat: Atom,
    /// The last mdat atom. moov is "before the media" when it precedes it.
    pub last_mdat: Atom,
    /// Where moov ends up.
    pub placement: MoovPlacement,
    cleanup: bool,
}

impl OffsetPlan {
    /// Compute the plan for `index` under `options`.
    pub fn compute(index: &AtomIndex, options: &Options) -> Result<Self> {
        let moov = *index
            .find(AtomType::MOOV)
            .ok_or(Error::MissingAtom("moov"))?;
        let mdat = *index
            .find(AtomType::MDAT)
            .ok_or(Error::MissingAtom("mdat"))?;
        let last_mdat = *index
            .find_last(AtomType::MDAT)
            .ok_or(Error::MissingAtom("mdat"))?;
        let placement = MoovPlacement::from_relocate_to_end(options.relocate_to_end);

        let mut filler_bytes: u64 = 0;
        for atom in index.iter().filter(|a| a.position < mdat.position) {
            if atom.atom_type == AtomType::FREE && options.cleanup {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    "Removing free atom at {} ({} bytes)",
                    atom.position,
                    atom.size
                );
                filler_bytes = checked_sum(filler_bytes, atom.size, atom)?;
            } else if atom.atom_type == AtomType::ZERO {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    "Removing strange zero atom at {} ({} bytes)",
                    atom.position,
                    HEADER_SIZE
                );
                filler_bytes = checked_sum(filler_bytes, HEADER_SIZE as u64, atom)?;
            }
        }

        let mut offset = -to_signed(filler_bytes, &mdat)?;
        let moov_size = to_signed(moov.size, &moov)?;

        if moov.position < last_mdat.position {
            if placement == MoovPlacement::End {
                offset = offset.checked_sub(moov_size).ok_or_else(|| invalid(&moov))?;
            }
        } else if placement == MoovPlacement::Front {
            offset = offset.checked_add(moov_size).ok_or_else(|| invalid(&moov))?;
        }

        // Media on either side of moov would move by different amounts.
        let interleaved = mdat.position < moov.position && moov.position < last_mdat.position;
        if interleaved && offset != 0 {
            return Err(Error::InterleavedMoov {
                position: moov.position,
            });
        }

        Ok(Self {
            offset,
            filler_bytes,
            moov,
            mdat,
            last_mdat,
            placement,
            cleanup: options.cleanup,
        })
    }

    /// Nothing moves: the file is already laid out as requested.
    pub fn is_noop(&self) -> bool {
        self.offset == 0
    }

    /// Whether `atom` is filler that the output drops.
    ///
    /// `free` atoms are dropped anywhere when cleanup is on. All-zero tags
    /// before `mdat` are dropped regardless of cleanup.
    ///
    /// A zero-tag atom is dropped whole, where other rewriters copy it
    /// through unchanged. The offset only accounts for its 8-byte header, so
    /// the two agree for declared sizes 0 and 8. A zero-tag atom declaring
    /// more than 8 bytes leaves every chunk offset short by `size - 8`.
    pub fn removes(&self, atom: &Atom) -> bool {
        match atom.atom_type {
            AtomType::FREE => self.cleanup,
            AtomType::ZERO => atom.position < self.mdat.position,
            _ => false,
        }
    }
}

fn checked_sum(total: u64, size: u64, atom: &Atom) -> Result<u64> {
    total.checked_add(size).ok_or_else(|| invalid(atom))
}

fn to_signed(value: u64, atom: &Atom) -> Result<i64> {
    i64::try_from(value).map_err(|_| invalid(atom))
}

fn invalid(atom: &Atom) -> Error {
    Error::InvalidAtomSize {
        atom_type: atom.atom_type,
        position: atom.position,
        size: atom.size,
    }
}
