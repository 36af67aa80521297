//! An explicit assignment of atom counts to every species in the element table
use std::fmt::Display;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use thiserror::Error;

use crate::element::{ElementKind, ELEMENT_COUNT};

/// Atom counts for every species, indexed by [`ElementKind`].
///
/// A search owns one of these for its whole run, so nothing needs to be
/// reset between runs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Composition {
    counts: [u32; ELEMENT_COUNT],
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_counts(counts: [u32; ELEMENT_COUNT]) -> Self {
        Self { counts }
    }

    #[inline]
    pub fn get(&self, element: ElementKind) -> u32 {
        self.counts[element.index()]
    }

    #[inline]
    pub fn set(&mut self, element: ElementKind, count: u32) {
        self.counts[element.index()] = count;
    }

    /// Builder-style [`Composition::set`]
    pub fn with(mut self, element: ElementKind, count: u32) -> Self {
        self.set(element, count);
        self
    }

    pub fn counts(&self) -> &[u32; ELEMENT_COUNT] {
        &self.counts
    }

    /// Every species and its count in table order, including zeros
    pub fn iter(&self) -> impl Iterator<Item = (ElementKind, u32)> + '_ {
        ElementKind::ALL.into_iter().zip(self.counts.iter().copied())
    }

    /// The species present in the composition, in table order
    pub fn iter_present(&self) -> impl Iterator<Item = (ElementKind, u32)> + '_ {
        self.iter().filter(|(_, c)| *c > 0)
    }

    /// The count of a species plus the counts of its heavy isotope siblings
    pub fn total_of(&self, base: ElementKind) -> u32 {
        self.iter()
            .filter(|(e, _)| e.base() == base)
            .map(|(_, c)| c)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|c| *c == 0)
    }
}

impl Index<ElementKind> for Composition {
    type Output = u32;

    fn index(&self, index: ElementKind) -> &Self::Output {
        &self.counts[index.index()]
    }
}

impl IndexMut<ElementKind> for Composition {
    fn index_mut(&mut self, index: ElementKind) -> &mut Self::Output {
        &mut self.counts[index.index()]
    }
}

impl FromIterator<(ElementKind, u32)> for Composition {
    fn from_iter<T: IntoIterator<Item = (ElementKind, u32)>>(iter: T) -> Self {
        let mut this = Self::default();
        for (e, c) in iter {
            this[e] += c;
        }
        this
    }
}

impl Display for Composition {
    /// Writes every present species as its symbol followed by its count, in table
    /// order, e.g. `C6H12O6` or `C1H4`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (e, c) in self.iter_present() {
            write!(f, "{}{}", e.symbol(), c)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionParseError {
    #[error("Unknown element symbol {0:?} at position {1}")]
    UnknownElement(String, usize),
    #[error("Expected an element symbol at position {0}")]
    ExpectedElement(usize),
    #[error("Element count at position {0} is too large")]
    CountOverflow(usize),
}

impl FromStr for Composition {
    type Err = CompositionParseError;

    /// Parse a bracket-free formula like `C6H12O6`, `CH3Cl` or `X1C5H12`. A missing
    /// count means one atom and repeated symbols accumulate.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.trim().as_bytes();
        let mut composition = Composition::default();
        let mut i = 0;
        while i < bytes.len() {
            if !bytes[i].is_ascii_uppercase() {
                return Err(CompositionParseError::ExpectedElement(i));
            }
            let start = i;
            let mut end = i + 1;
            if end < bytes.len() && bytes[end].is_ascii_lowercase() {
                end += 1;
            }
            // Symbols are ASCII so these slices are always on char boundaries
            let symbol = std::str::from_utf8(&bytes[start..end]).unwrap_or_default();
            let element = ElementKind::from_symbol(symbol).ok_or_else(|| {
                CompositionParseError::UnknownElement(symbol.to_string(), start)
            })?;
            i = end;
            let digits_start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let count = if digits_start == i {
                1
            } else {
                std::str::from_utf8(&bytes[digits_start..i])
                    .unwrap_or_default()
                    .parse::<u32>()
                    .map_err(|_| CompositionParseError::CountOverflow(digits_start))?
            };
            composition[element] = composition[element]
                .checked_add(count)
                .ok_or(CompositionParseError::CountOverflow(digits_start))?;
        }
        Ok(composition)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Composition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let present: Vec<_> = self.iter_present().collect();
        let mut map = serializer.serialize_map(Some(present.len()))?;
        for (e, c) in present {
            map.serialize_entry(e.symbol(), &c)?;
        }
        map.end()
    }
}
