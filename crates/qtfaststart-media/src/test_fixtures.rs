//! Synthetic MP4 layouts for unit tests.

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

/// A 20-byte `ftyp` atom.
pub fn ftyp() -> Vec<u8> {
    atom(b"ftyp", b"isom\x00\x00\x02\x00isom")
}

/// An `stco` table holding `entries`.
pub fn stco(entries: &[u32]) -> Vec<u8> {
    let mut body = vec![0u8; 4];
    body.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for entry in entries {
        body.extend_from_slice(&entry.to_be_bytes());
    }
    atom(b"stco", &body)
}

/// A `co64` table holding `entries`.
pub fn co64(entries: &[u64]) -> Vec<u8> {
    let mut body = vec![0u8; 4];
    body.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for entry in entries {
        body.extend_from_slice(&entry.to_be_bytes());
    }
    atom(b"co64", &body)
}

/// A `trak` whose sample table ends with `table`.
pub fn trak(table: &[u8]) -> Vec<u8> {
    let mut stbl = atom(b"stsd", &[0u8; 8]);
    stbl.extend(atom(b"stts", &[0u8; 8]));
    stbl.extend(atom(b"stsz", &[0u8; 12]));
    stbl.extend_from_slice(table);

    let mut minf = atom(b"vmhd", &[0u8; 12]);
    minf.extend(atom(b"stbl", &stbl));

    let mut mdia = atom(b"mdhd", &[0u8; 24]);
    mdia.extend(atom(b"hdlr", &[0u8; 25]));
    mdia.extend(atom(b"minf", &minf));

    let mut trak = atom(b"tkhd", &[0u8; 84]);
    trak.extend(atom(b"mdia", &mdia));
    atom(b"trak", &trak)
}

/// A `moov` holding an `mvhd` followed by `tracks`.
pub fn moov(tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut body = atom(b"mvhd", &[0u8; 100]);
    for track in tracks {
        body.extend_from_slice(track);
    }
    atom(b"moov", &body)
}

/// Read the `stco` entries of the first table found in `data`.
pub fn find_stco_entries(data: &[u8]) -> Vec<u32> {
    let pos = data
        .windows(4)
        .position(|w| w == b"stco")
        .expect("no stco table");
    let count = u32::from_be_bytes(data[pos + 8..pos + 12].try_into().unwrap()) as usize;
    (0..count)
        .map(|i| {
            let at = pos + 12 + i * 4;
            u32::from_be_bytes(data[at..at + 4].try_into().unwrap())
        })
        .collect()
}
