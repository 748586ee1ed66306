//! Fast-start processing entry point.

use crate::assemble::{StreamAssembler, DEFAULT_CHUNK_SIZE};
use crate::index::AtomIndex;
use crate::patch::{MoovPatcher, PatchStats};
use crate::plan::OffsetPlan;
use crate::{Error, Result};
use std::io::{Read, Seek, Write};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Processing options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Maximum bytes copied per atom. `None` or `Some(0)` copies everything.
    pub limit: Option<u64>,
    /// Place moov after the media data instead of before it.
    pub relocate_to_end: bool,
    /// Drop `free` atoms.
    pub cleanup: bool,
    /// Bytes moved per read/write while copying atoms.
    pub chunk_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            limit: None,
            relocate_to_end: false,
            cleanup: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Successful result of a processing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Output written.
    Converted {
        bytes_written: u64,
        offset: i64,
        patched: PatchStats,
    },
    /// Layout already matches the request; nothing was written.
    AlreadyConverted,
}

/// Result vocabulary reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingStatus {
    Success,
    AlreadyConverted,
    Error,
    FileIsCompressed,
    InvalidFormat,
}

impl ProcessingStatus {
    /// Stable numeric code for the status.
    pub fn code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::AlreadyConverted => 1,
            Self::Error => -1,
            Self::FileIsCompressed => -2,
            Self::InvalidFormat => -3,
        }
    }

    /// Whether the call finished without a failure.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success | Self::AlreadyConverted)
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::AlreadyConverted => "already converted",
            Self::Error => "error",
            Self::FileIsCompressed => "file is compressed",
            Self::InvalidFormat => "invalid format",
        };
        write!(f, "{}", s)
    }
}

impl From<&Outcome> for ProcessingStatus {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Converted { .. } => Self::Success,
            Outcome::AlreadyConverted => Self::AlreadyConverted,
        }
    }
}

impl From<&Error> for ProcessingStatus {
    fn from(err: &Error) -> Self {
        match err {
            Error::MissingAtom(_) => Self::InvalidFormat,
            Error::Compressed => Self::FileIsCompressed,
            _ => Self::Error,
        }
    }
}

/// Rewrites a file so that moov sits in front of (or behind) the media data.
#[derive(Debug, Clone, Default)]
pub struct FastStart {
    options: Options,
    cancel: Option<Arc<AtomicBool>>,
}

impl FastStart {
    /// Create a processor with the given options.
    pub fn new(options: Options) -> Self {
        Self {
            options,
            cancel: None,
        }
    }

    /// Stop between atom copies once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Process `input` into `output`.
    ///
    /// Every format check runs before the first byte is written, so a
    /// rejected input leaves `output` untouched.
    pub fn run<R, W>(&self, input: &mut R, output: &mut W) -> Result<Outcome>
    where
        R: Read + Seek,
        W: Write,
    {
        let index = AtomIndex::build(input)?;
        let plan = OffsetPlan::compute(&index, &self.options)?;

        // Layout comes first: a compressed moov already in place is left alone.
        if plan.is_noop() {
            #[cfg(feature = "tracing")]
            tracing::info!("This file appears to already be setup!");
            return Ok(Outcome::AlreadyConverted);
        }

        let mut patcher = MoovPatcher::read(input, &plan.moov)?;
        if patcher.is_compressed()? {
            #[cfg(feature = "tracing")]
            tracing::warn!("Movies with compressed headers are not supported");
            return Err(Error::Compressed);
        }

        let patched = patcher.apply(plan.offset)?;
        let moov = patcher.into_bytes();

        let bytes_written = StreamAssembler::new(input, output)
            .chunk_size(self.options.chunk_size)
            .limit(self.options.limit)
            .cancel_flag(self.cancel.as_deref())
            .assemble(&index, &plan, &moov)?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Wrote {} bytes, shifted {} chunk offsets by {}",
            bytes_written,
            patched.entries,
            plan.offset
        );

        Ok(Outcome::Converted {
            bytes_written,
            offset: plan.offset,
            patched,
        })
    }
}

/// Process `input` into `output`, reporting the result as a status.
///
/// Errors are folded into [`ProcessingStatus`]; use [`FastStart::run`] to
/// keep the error detail.
pub fn process<R, W>(input: &mut R, output: &mut W, options: &Options) -> ProcessingStatus
where
    R: Read + Seek,
    W: Write,
{
    match FastStart::new(options.clone()).run(input, output) {
        Ok(outcome) => ProcessingStatus::from(&outcome),
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::debug!("Processing failed: {}", e);
            ProcessingStatus::from(&e)
        }
    }
}
