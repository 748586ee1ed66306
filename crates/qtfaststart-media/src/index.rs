//! Top-level atom index.

use crate::mp4::{Atom, AtomReader, AtomType};
use crate::{Error, Result};
use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};

/// Atoms that must be present at the top level of every input.
const REQUIRED_ATOMS: [(AtomType, &str); 2] = [(AtomType::MOOV, "moov"), (AtomType::MDAT, "mdat")];

/// Ordered list of the top-level atoms of a file.
///
/// Order is file order and dictates output order. Built once per call and
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct AtomIndex {
    atoms: Vec<Atom>,
}

impl AtomIndex {
    /// Index the top-level atoms of `source` and validate the result.
    pub fn build<R: Read + Seek>(source: &mut R) -> Result<Self> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Getting index of top level atoms...");

        source.seek(SeekFrom::Start(0))?;
        let mut reader = AtomReader::new(source);
        let atoms: Vec<Atom> = reader.top_level().collect();

        #[cfg(feature = "tracing")]
        for atom in &atoms {
            tracing::debug!("{}: {}", atom.atom_type, atom.size);
        }

        let index = Self { atoms };
        index.ensure_valid()?;
        Ok(index)
    }

    /// Build an index from atoms that were already walked.
    pub fn from_atoms(atoms: Vec<Atom>) -> Result<Self> {
        let index = Self { atoms };
        index.ensure_valid()?;
        Ok(index)
    }

    fn ensure_valid(&self) -> Result<()> {
        let present: HashSet<AtomType> = self.atoms.iter().map(|a| a.atom_type).collect();

        for (atom_type, name) in REQUIRED_ATOMS {
            if !present.contains(&atom_type) {
                #[cfg(feature = "tracing")]
                tracing::debug!("{} atom not found, is this a valid MOV/MP4 file?", name);
                return Err(Error::MissingAtom(name));
            }
        }

        Ok(())
    }

    /// All top-level atoms in file order.
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// First atom with the given type.
    pub fn find(&self, atom_type: AtomType) -> Option<&Atom> {
        self.atoms.iter().find(|a| a.atom_type == atom_type)
    }

    /// Last atom with the given type.
    pub fn find_last(&self, atom_type: AtomType) -> Option<&Atom> {
        self.atoms.iter().rev().find(|a| a.atom_type == atom_type)
    }

    /// Iterate over atoms in file order.
    pub fn iter(&self) -> std::slice::Iter<'_, Atom> {
        self.atoms.iter()
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

impl<'a> IntoIterator for &'a AtomIndex {
    type Item = &'a Atom;
    type IntoIter = std::slice::Iter<'a, Atom>;

    fn into_iter(self) -> Self::IntoIter {
        self.atoms.iter()
    }
}
