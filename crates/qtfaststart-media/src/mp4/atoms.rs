//! MP4 atom definitions.

/// Four-character atom type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomType(pub [u8; 4]);

impl AtomType {
    pub const FTYP: Self = Self(*b"ftyp");
    pub const MOOV: Self = Self(*b"moov");
    pub const MDAT: Self = Self(*b"mdat");
    pub const FREE: Self = Self(*b"free");
    pub const TRAK: Self = Self(*b"trak");
    pub const MDIA: Self = Self(*b"mdia");
    pub const MINF: Self = Self(*b"minf");
    pub const STBL: Self = Self(*b"stbl");
    pub const STCO: Self = Self(*b"stco");
    pub const CO64: Self = Self(*b"co64");
    pub const CMOV: Self = Self(*b"cmov");
    /// All-zero tag written by some broken encoders in place of a real atom.
    pub const ZERO: Self = Self([0; 4]);

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Get the raw 4-byte code.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl std::fmt::Display for AtomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

/// Parsed atom header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Atom {
    /// Atom type code.
    pub atom_type: AtomType,
    /// Absolute offset of the atom header.
    pub position: u64,
    /// Atom size including header. Zero may mean "to end of file".
    pub size: u64,
    /// Size of the header (8 or 16 bytes).
    pub header_size: u8,
}

impl Atom {
    /// Offset where the atom body starts (after header).
    pub fn data_offset(&self) -> u64 {
        self.position + self.header_size as u64
    }

    /// Offset one past the last byte of the atom.
    pub fn end(&self) -> u64 {
        self.position.saturating_add(self.size)
    }

    /// Get the data size (size - header).
    pub fn data_size(&self) -> u64 {
        self.size.saturating_sub(self.header_size as u64)
    }

    /// Check if this atom is walked into when looking for chunk offset tables.
    pub fn is_ancestor(&self) -> bool {
        matches!(
            self.atom_type,
            AtomType::TRAK | AtomType::MDIA | AtomType::MINF | AtomType::STBL
        )
    }

    /// Check if this atom is an `stco` or `co64` table.
    pub fn is_chunk_offset_table(&self) -> bool {
        matches!(self.atom_type, AtomType::STCO | AtomType::CO64)
    }
}
