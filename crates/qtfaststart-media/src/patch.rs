//! In-memory moov patching.
//!
//! `stco` and `co64` tables hold absolute file offsets into `mdat`. They are
//! the only values inside `moov` that change when atoms move, so patching
//! means finding every table under `trak/mdia/minf/stbl` and shifting its
//! entries in place.

use crate::mp4::{read_children, Atom, AtomReader, AtomType};
use crate::{Error, Result};
use bytes::{Buf, BufMut};
use std::io::{Cursor, Read, Seek, SeekFrom};

/// Largest moov that is loaded into memory (1 GiB).
pub const MAX_MOOV_SIZE: u64 = 1024 * 1024 * 1024;

/// Size of the version/flags and entry count fields of a chunk offset table.
const TABLE_HEADER_SIZE: u64 = 8;

/// Counts from one patch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    /// Number of `stco`/`co64` tables rewritten.
    pub tables: usize,
    /// Number of entries shifted across all tables.
    pub entries: u64,
}

/// A moov atom held in memory for patching.
pub struct MoovPatcher {
    data: Vec<u8>,
    root: Atom,
}

impl MoovPatcher {
    /// Load the moov described by `moov` from `source`.
    pub fn read<R: Read + Seek>(source: &mut R, moov: &Atom) -> Result<Self> {
        if moov.size < moov.header_size as u64 {
            return Err(Error::InvalidAtomSize {
                atom_type: moov.atom_type,
                position: moov.position,
                size: moov.size,
            });
        }
        if moov.size > MAX_MOOV_SIZE {
            return Err(Error::MoovTooLarge {
                size: moov.size,
                max: MAX_MOOV_SIZE,
            });
        }

        source.seek(SeekFrom::Start(moov.position))?;
        let mut data = vec![0u8; moov.size as usize];
        source.read_exact(&mut data)?;

        Self::from_bytes(data)
    }

    /// Wrap an already loaded moov, header included.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let root = AtomReader::new(Cursor::new(&data)).read_atom()?;

        if root.size < root.header_size as u64 || root.size > data.len() as u64 {
            return Err(Error::InvalidAtomSize {
                atom_type: root.atom_type,
                position: root.position,
                size: root.size,
            });
        }

        Ok(Self { data, root })
    }

    /// Check for a compressed `cmov` among moov's immediate children.
    pub fn is_compressed(&self) -> Result<bool> {
        Ok(read_children(&self.data, &self.root)?
            .iter()
            .any(|child| child.atom_type == AtomType::CMOV))
    }

    /// Find every chunk offset table, depth first, in file order.
    ///
    /// Positions are relative to the start of the moov buffer.
    pub fn chunk_offset_tables(&self) -> Result<Vec<Atom>> {
        let mut tables = Vec::new();
        collect_tables(&self.data, &self.root, &mut tables)?;
        Ok(tables)
    }

    /// Shift every chunk offset entry by `offset`.
    pub fn apply(&mut self, offset: i64) -> Result<PatchStats> {
        let mut stats = PatchStats::default();

        for table in self.chunk_offset_tables()? {
            let count = self.patch_table(&table, offset)?;

            #[cfg(feature = "tracing")]
            tracing::debug!("Patching {} with {} entries", table.atom_type, count);

            stats.tables += 1;
            stats.entries += count as u64;
        }

        Ok(stats)
    }

    fn patch_table(&mut self, table: &Atom, offset: i64) -> Result<u32> {
        if table.data_size() < TABLE_HEADER_SIZE {
            return Err(Error::InvalidAtomSize {
                atom_type: table.atom_type,
                position: table.position,
                size: table.size,
            });
        }

        // Skip version/flags
        let count_at = table.data_offset() as usize + 4;
        let count = (&self.data[count_at..count_at + 4]).get_u32();

        let width: u64 = if table.atom_type == AtomType::CO64 { 8 } else { 4 };
        let available = (table.data_size() - TABLE_HEADER_SIZE) / width;
        if count as u64 > available {
            return Err(Error::TruncatedTable {
                atom_type: table.atom_type,
                position: table.position,
                entries: count,
                available,
            });
        }

        let entries_at = table.data_offset() as usize + TABLE_HEADER_SIZE as usize;
        let width = width as usize;

        for i in 0..count as usize {
            let at = entries_at + i * width;
            let slot = &mut self.data[at..at + width];

            if width == 8 {
                let entry = (&slot[..]).get_u64();
                let shifted = shift(table, entry, offset, u64::MAX)?;
                (&mut slot[..]).put_u64(shifted);
            } else {
                let entry = (&slot[..]).get_u32() as u64;
                let shifted = shift(table, entry, offset, u32::MAX as u64)?;
                (&mut slot[..]).put_u32(shifted as u32);
            }
        }

        Ok(count)
    }

    /// The moov atom as parsed from the buffer.
    pub fn atom(&self) -> &Atom {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Patched moov bytes, ready to be written out.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Patch a complete moov buffer by `offset`.
///
/// Fails with [`Error::Compressed`] before touching the buffer if moov holds
/// a `cmov` child.
pub fn patch(moov: Vec<u8>, offset: i64) -> Result<Vec<u8>> {
    let mut patcher = MoovPatcher::from_bytes(moov)?;
    if patcher.is_compressed()? {
        return Err(Error::Compressed);
    }
    patcher.apply(offset)?;
    Ok(patcher.into_bytes())
}

fn collect_tables(data: &[u8], parent: &Atom, tables: &mut Vec<Atom>) -> Result<()> {
    for child in read_children(data, parent)? {
        if child.is_ancestor() {
            collect_tables(data, &child, tables)?;
        } else if child.is_chunk_offset_table() {
            tables.push(child);
        }
    }
    Ok(())
}

fn shift(table: &Atom, entry: u64, offset: i64, max: u64) -> Result<u64> {
    entry
        .checked_add_signed(offset)
        .filter(|shifted| *shifted <= max)
        .ok_or(Error::OffsetOverflow {
            atom_type: table.atom_type,
            entry,
            offset,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{atom, co64, find_stco_entries, moov, stco, trak};

    #[test]
    fn test_patch_stco_entries() {
        let data = moov(&[trak(&stco(&[1000, 2000, 3000]))]);

        let patched = patch(data, 500).unwrap();
        assert_eq!(find_stco_entries(&patched), vec![1500, 2500, 3500]);
    }

    #[test]
    fn test_patch_negative_offset() {
        let data = moov(&[trak(&stco(&[1000, 2000]))]);

        let patched = patch(data, -100).unwrap();
        assert_eq!(find_stco_entries(&patched), vec![900, 1900]);
    }

    #[test]
    fn test_patch_co64_entries() {
        let big = u32::MAX as u64 + 10;
        let data = moov(&[trak(&co64(&[big, big + 4096]))]);

        let mut patcher = MoovPatcher::from_bytes(data).unwrap();
        let stats = patcher.apply(-20).unwrap();
        assert_eq!(stats, PatchStats { tables: 1, entries: 2 });

        let bytes = patcher.into_bytes();
        let pos = bytes.windows(4).position(|w| w == b"co64").unwrap();
        let first = u64::from_be_bytes(bytes[pos + 12..pos + 20].try_into().unwrap());
        let second = u64::from_be_bytes(bytes[pos + 20..pos + 28].try_into().unwrap());
        assert_eq!(first, big - 20);
        assert_eq!(second, big + 4096 - 20);
    }

    #[test]
    fn test_tables_found_in_every_track() {
        let data = moov(&[
            trak(&stco(&[10])),
            trak(&co64(&[20])),
            trak(&stco(&[30, 40])),
        ]);

        let patcher = MoovPatcher::from_bytes(data).unwrap();
        let tables = patcher.chunk_offset_tables().unwrap();
        let tags: Vec<_> = tables.iter().map(|t| t.atom_type).collect();
        assert_eq!(tags, vec![AtomType::STCO, AtomType::CO64, AtomType::STCO]);
        assert!(tables.windows(2).all(|w| w[0].position < w[1].position));
    }

    #[test]
    fn test_tables_outside_ancestors_are_ignored() {
        // An stco directly under udta is not a chunk offset table
        let udta = atom(b"udta", &stco(&[77]));
        let data = moov(&[udta]);

        let patched = patch(data.clone(), 1000).unwrap();
        assert_eq!(patched, data);
    }

    #[test]
    fn test_other_bytes_untouched() {
        let data = moov(&[trak(&stco(&[100]))]);

        let patched = patch(data.clone(), 5).unwrap();
        assert_eq!(patched.len(), data.len());
        let diffs = data.iter().zip(&patched).filter(|(a, b)| a != b).count();
        assert_eq!(diffs, 1);
    }

    #[test]
    fn test_compressed_moov_detected() {
        let cmov = atom(b"cmov", &atom(b"dcom", b"zlib"));
        let data = moov(&[cmov]);

        let patcher = MoovPatcher::from_bytes(data.clone()).unwrap();
        assert!(patcher.is_compressed().unwrap());
        assert!(matches!(patch(data, 10), Err(Error::Compressed)));
    }

    #[test]
    fn test_nested_cmov_is_not_compressed() {
        let data = moov(&[atom(b"udta", &atom(b"cmov", &[]))]);

        let patcher = MoovPatcher::from_bytes(data).unwrap();
        assert!(!patcher.is_compressed().unwrap());
    }

    #[test]
    fn test_stco_underflow_is_error() {
        let data = moov(&[trak(&stco(&[50]))]);

        let err = patch(data, -100).unwrap_err();
        assert!(matches!(
            err,
            Error::OffsetOverflow {
                entry: 50,
                offset: -100,
                ..
            }
        ));
    }

    #[test]
    fn test_stco_overflow_is_error() {
        let data = moov(&[trak(&stco(&[u32::MAX - 1]))]);

        assert!(matches!(
            patch(data, 2),
            Err(Error::OffsetOverflow { .. })
        ));
    }

    #[test]
    fn test_truncated_table_is_error() {
        // Declares 3 entries, holds 1
        let mut body = vec![0u8; 4];
        body.extend(3u32.to_be_bytes());
        body.extend(100u32.to_be_bytes());
        let data = moov(&[trak(&atom(b"stco", &body))]);

        assert!(matches!(
            patch(data, 1),
            Err(Error::TruncatedTable {
                entries: 3,
                available: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_read_from_source() {
        let mut file = vec![0u8; 12];
        let data = moov(&[trak(&stco(&[64]))]);
        file.extend(&data);
        let moov_atom = Atom {
            atom_type: AtomType::MOOV,
            position: 12,
            size: data.len() as u64,
            header_size: 8,
        };

        let patcher = MoovPatcher::read(&mut Cursor::new(file), &moov_atom).unwrap();
        assert_eq!(patcher.len(), data.len());
        assert_eq!(patcher.atom().position, 0);
    }

    #[test]
    fn test_read_rejects_headerless_moov() {
        let moov_atom = Atom {
            atom_type: AtomType::MOOV,
            position: 0,
            size: 0,
            header_size: 8,
        };

        let result = MoovPatcher::read(&mut Cursor::new(vec![0u8; 8]), &moov_atom);
        assert!(matches!(result, Err(Error::InvalidAtomSize { .. })));
    }
}
