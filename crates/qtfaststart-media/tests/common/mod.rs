//! Builders for synthetic MP4 files used by the integration tests.

#![allow(dead_code)]

/// Build a compact-header atom around `body`.
pub fn atom(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(&((8 + body.len()) as u32).to_be_bytes());
    out.extend_from_slice(tag);
    out.extend_from_slice(body);
    out
}

/// Build an atom using the 64-bit extended size header.
pub fn extended_atom(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + body.len());
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(tag);
    out.extend_from_slice(&((16 + body.len()) as u64).to_be_bytes());
    out.extend_from_slice(body);
    out
}

/// An `ftyp` atom of exactly `size` bytes.
pub fn ftyp(size: usize) -> Vec<u8> {
    let mut body = b"isom\x00\x00\x02\x00isomiso2mp41".to_vec();
    body.resize(size - 8, 0);
    atom(b"ftyp", &body)
}

/// A `free` atom of exactly `size` bytes.
pub fn free(size: usize) -> Vec<u8> {
    atom(b"free", &vec![0u8; size - 8])
}

/// An mdat whose body is a recognisable byte pattern.
pub fn mdat(body_len: usize) -> Vec<u8> {
    atom(b"mdat", &pattern(body_len))
}

/// An mdat with size 0, running to end of file.
pub fn open_mdat(body_len: usize) -> Vec<u8> {
    let mut out = vec![0, 0, 0, 0];
    out.extend_from_slice(b"mdat");
    out.extend(pattern(body_len));
    out
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub enum Table {
    Stco(Vec<u32>),
    Co64(Vec<u64>),
}

fn table(table: &Table) -> Vec<u8> {
    let mut body = vec![0u8; 4];
    match table {
        Table::Stco(entries) => {
            body.extend_from_slice(&(entries.len() as u32).to_be_bytes());
            for e in entries {
                body.extend_from_slice(&e.to_be_bytes());
            }
            atom(b"stco", &body)
        }
        Table::Co64(entries) => {
            body.extend_from_slice(&(entries.len() as u32).to_be_bytes());
            for e in entries {
                body.extend_from_slice(&e.to_be_bytes());
            }
            atom(b"co64", &body)
        }
    }
}

/// A `trak` with a full trak/mdia/minf/stbl chain ending in `t`.
pub fn trak(t: &Table) -> Vec<u8> {
    let mut stbl = atom(b"stsd", &[0u8; 8]);
    stbl.extend(atom(b"stts", &[0u8; 8]));
    stbl.extend(atom(b"stsc", &[0u8; 8]));
    stbl.extend(atom(b"stsz", &[0u8; 12]));
    stbl.extend(table(t));

    let mut minf = atom(b"smhd", &[0u8; 8]);
    minf.extend(atom(b"dinf", &atom(b"dref", &[0u8; 8])));
    minf.extend(atom(b"stbl", &stbl));

    let mut mdia = atom(b"mdhd", &[0u8; 24]);
    mdia.extend(atom(b"hdlr", &[0u8; 25]));
    mdia.extend(atom(b"minf", &minf));

    let mut trak = atom(b"tkhd", &[0u8; 84]);
    trak.extend(atom(b"mdia", &mdia));
    atom(b"trak", &trak)
}

/// A moov holding `tracks`, padded with an inner `skip` atom to `size` bytes.
pub fn moov(tracks: &[Vec<u8>], size: Option<usize>) -> Vec<u8> {
    let mut body = atom(b"mvhd", &[0u8; 100]);
    for t in tracks {
        body.extend_from_slice(t);
    }
    if let Some(size) = size {
        let pad = size - 8 - body.len();
        assert!(pad >= 8, "moov too small for requested size");
        body.extend(atom(b"skip", &vec![0u8; pad - 8]));
    }
    atom(b"moov", &body)
}

/// Read every `stco` entry in file order.
pub fn stco_entries(data: &[u8]) -> Vec<u32> {
    table_positions(data, b"stco")
        .into_iter()
        .flat_map(|pos| {
            let count = u32::from_be_bytes(data[pos + 8..pos + 12].try_into().unwrap()) as usize;
            (0..count).map(move |i| {
                let at = pos + 12 + i * 4;
                u32::from_be_bytes(data[at..at + 4].try_into().unwrap())
            })
        })
        .collect()
}

/// Read every `co64` entry in file order.
pub fn co64_entries(data: &[u8]) -> Vec<u64> {
    table_positions(data, b"co64")
        .into_iter()
        .flat_map(|pos| {
            let count = u32::from_be_bytes(data[pos + 8..pos + 12].try_into().unwrap()) as usize;
            (0..count).map(move |i| {
                let at = pos + 12 + i * 8;
                u64::from_be_bytes(data[at..at + 8].try_into().unwrap())
            })
        })
        .collect()
}

fn table_positions(data: &[u8], tag: &[u8; 4]) -> Vec<usize> {
    data.windows(4)
        .enumerate()
        .filter(|(_, w)| *w == &tag[..])
        .map(|(i, _)| i)
        .collect()
}

/// Top-level atom tags of `data`, in order.
pub fn top_level_tags(data: &[u8]) -> Vec<String> {
    let mut tags = Vec::new();
    let mut pos = 0usize;
    while pos + 8 <= data.len() {
        let size = u32::from_be_bytes(data[pos..pos + 4].try_into().unwrap()) as usize;
        tags.push(String::from_utf8_lossy(&data[pos + 4..pos + 8]).into_owned());
        if size == 0 {
            break;
        }
        pos += size;
    }
    tags
}
