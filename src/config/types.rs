use qtfaststart_media::Options;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub faststart: FastStartConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FastStartConfig {
    /// Drop `free` atoms from the output
    #[serde(default = "default_true")]
    pub cleanup: bool,

    /// Write moov after the media data instead of before it
    #[serde(default)]
    pub to_end: bool,

    /// Maximum bytes copied per atom (0 or unset = unlimited)
    #[serde(default)]
    pub limit: Option<u64>,

    /// Bytes moved per read/write while copying atoms
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Copy the input file's permissions onto the output
    #[serde(default = "default_true")]
    pub copy_permissions: bool,
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    qtfaststart_media::assemble::DEFAULT_CHUNK_SIZE
}

impl Default for FastStartConfig {
    fn default() -> Self {
        Self {
            cleanup: default_true(),
            to_end: false,
            limit: None,
            chunk_size: default_chunk_size(),
            copy_permissions: default_true(),
        }
    }
}

impl FastStartConfig {
    /// Processing options described by this config.
    pub fn options(&self) -> Options {
        Options {
            limit: self.limit,
            relocate_to_end: self.to_end,
            cleanup: self.cleanup,
            chunk_size: self.chunk_size,
        }
    }
}
