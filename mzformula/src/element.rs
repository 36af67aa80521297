//! The fixed table of countable species and the per-run bounds placed on them.
//!
//! Heavy isotopes (¹³C, ²H, ¹⁵N) are separate species with their own symbols
//! (`X`, `D`, `M`). They are counted independently of their light siblings;
//! see [`ElementKind::base`].
use std::fmt::Display;
use std::num::ParseIntError;
use std::ops::{Index, IndexMut, RangeInclusive};
use std::str::FromStr;

use thiserror::Error;

/// The number of species in the element table
pub const ELEMENT_COUNT: usize = 14;

/// Static properties of one countable species
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementSpec {
    /// The label used when writing a formula
    pub symbol: &'static str,
    /// The monoisotopic mass of one atom
    pub exact_mass: f64,
    /// The signed contribution of one atom to `2 × RDB - 2`
    pub unsaturation: f64,
    /// The single-letter key used to set bounds from the command line
    pub key: char,
}

impl ElementSpec {
    const fn new(symbol: &'static str, exact_mass: f64, unsaturation: f64, key: char) -> Self {
        Self {
            symbol,
            exact_mass,
            unsaturation,
            key,
        }
    }
}

/// Exact masses follow NIST (2013). Nitrogen keeps the trivalent weight while phosphorus
/// and sulfur use the pentavalent and hexavalent weights.
static ELEMENT_TABLE: [ElementSpec; ELEMENT_COUNT] = [
    ElementSpec::new("C", 12.000000000, 2.0, 'C'),
    ElementSpec::new("X", 13.0033548378, 2.0, 'X'),
    ElementSpec::new("H", 1.0078250321, -1.0, 'H'),
    ElementSpec::new("D", 2.0141017778, -1.0, 'D'),
    ElementSpec::new("N", 14.0030740048, 1.0, 'N'),
    ElementSpec::new("M", 15.0001088982, 1.0, 'M'),
    ElementSpec::new("O", 15.9949146196, 0.0, 'O'),
    ElementSpec::new("F", 18.99840322, -1.0, 'F'),
    ElementSpec::new("Na", 22.9897692809, -1.0, 'A'),
    ElementSpec::new("Si", 27.9769265325, 2.0, 'I'),
    ElementSpec::new("P", 30.97376163, 3.0, 'P'),
    ElementSpec::new("S", 31.972071, 4.0, 'S'),
    ElementSpec::new("Cl", 34.96885268, -1.0, 'L'),
    ElementSpec::new("Br", 78.9183371, -1.0, 'B'),
];

/// One of the species in the element table, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementKind {
    C,
    /// Carbon-13
    #[cfg_attr(feature = "serde", serde(rename = "X"))]
    C13,
    H,
    /// Hydrogen-2
    #[cfg_attr(feature = "serde", serde(rename = "D"))]
    H2,
    N,
    /// Nitrogen-15
    #[cfg_attr(feature = "serde", serde(rename = "M"))]
    N15,
    O,
    F,
    Na,
    Si,
    P,
    S,
    Cl,
    Br,
}

impl ElementKind {
    /// Every species in table order, the order formulas are written in
    pub const ALL: [ElementKind; ELEMENT_COUNT] = [
        ElementKind::C,
        ElementKind::C13,
        ElementKind::H,
        ElementKind::H2,
        ElementKind::N,
        ElementKind::N15,
        ElementKind::O,
        ElementKind::F,
        ElementKind::Na,
        ElementKind::Si,
        ElementKind::P,
        ElementKind::S,
        ElementKind::Cl,
        ElementKind::Br,
    ];

    /// Every species in the order the search nests them, outermost first.
    ///
    /// Heavy, rarely abundant species vary slowest so that once their contribution
    /// alone overshoots the mass window whole subtrees can be abandoned.
    pub const SEARCH_ORDER: [ElementKind; ELEMENT_COUNT] = [
        ElementKind::Br,
        ElementKind::Cl,
        ElementKind::S,
        ElementKind::P,
        ElementKind::Si,
        ElementKind::Na,
        ElementKind::F,
        ElementKind::O,
        ElementKind::N15,
        ElementKind::N,
        ElementKind::C13,
        ElementKind::C,
        ElementKind::H2,
        ElementKind::H,
    ];

    #[inline]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    #[inline]
    pub fn spec(&self) -> &'static ElementSpec {
        &ELEMENT_TABLE[self.index()]
    }

    #[inline]
    pub fn symbol(&self) -> &'static str {
        self.spec().symbol
    }

    #[inline]
    pub fn exact_mass(&self) -> f64 {
        self.spec().exact_mass
    }

    #[inline]
    pub fn unsaturation(&self) -> f64 {
        self.spec().unsaturation
    }

    #[inline]
    pub fn key(&self) -> char {
        self.spec().key
    }

    /// The light species a heavy isotope is counted with when computing element
    /// ratios. Every other species is its own base.
    pub const fn base(&self) -> ElementKind {
        match self {
            ElementKind::C13 => ElementKind::C,
            ElementKind::H2 => ElementKind::H,
            ElementKind::N15 => ElementKind::N,
            _ => *self,
        }
    }

    pub const fn is_heavy_isotope(&self) -> bool {
        matches!(self, ElementKind::C13 | ElementKind::H2 | ElementKind::N15)
    }

    pub fn from_symbol(symbol: &str) -> Option<ElementKind> {
        Self::ALL.into_iter().find(|e| e.symbol() == symbol)
    }

    pub fn from_key(key: char) -> Option<ElementKind> {
        Self::ALL.into_iter().find(|e| e.key() == key)
    }
}

impl Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An inclusive range of atom counts. `min <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "BoundsRepr", into = "BoundsRepr")
)]
pub struct ElementBounds {
    min: u32,
    max: u32,
}

/// The serialized form of [`ElementBounds`], which may arrive inverted
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct BoundsRepr {
    min: u32,
    max: u32,
}

#[cfg(feature = "serde")]
impl From<BoundsRepr> for ElementBounds {
    fn from(value: BoundsRepr) -> Self {
        Self::new(value.min, value.max)
    }
}

#[cfg(feature = "serde")]
impl From<ElementBounds> for BoundsRepr {
    fn from(value: ElementBounds) -> Self {
        Self {
            min: value.min,
            max: value.max,
        }
    }
}

impl ElementBounds {
    /// Create a new range, swapping the ends if they are given in the wrong order
    pub fn new(min: u32, max: u32) -> Self {
        if min > max {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    /// A range holding exactly one count
    pub const fn fixed(count: u32) -> Self {
        Self {
            min: count,
            max: count,
        }
    }

    #[inline]
    pub const fn min(&self) -> u32 {
        self.min
    }

    #[inline]
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// The number of distinct counts in the range
    pub fn span(&self) -> u64 {
        self.max.abs_diff(self.min) as u64 + 1
    }

    pub fn contains(&self, count: u32) -> bool {
        self.min <= count && count <= self.max
    }

    pub fn iter(&self) -> RangeInclusive<u32> {
        self.min..=self.max
    }
}

impl Display for ElementBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl From<(u32, u32)> for ElementBounds {
    fn from(value: (u32, u32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<RangeInclusive<u32>> for ElementBounds {
    fn from(value: RangeInclusive<u32>) -> Self {
        Self::new(*value.start(), *value.end())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElementBoundsParseError {
    #[error("Failed to parse element count lower bound: {0}")]
    MalformedMin(ParseIntError),
    #[error("Failed to parse element count upper bound: {0}")]
    MalformedMax(ParseIntError),
    #[error("Element bounds must not be empty")]
    Empty,
}

impl FromStr for ElementBounds {
    type Err = ElementBoundsParseError;

    /// Parse `MIN-MAX`, or `MAX` alone to mean `0-MAX`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ElementBoundsParseError::Empty);
        }
        match s.split_once('-') {
            Some((lo, hi)) => {
                let min = lo
                    .trim()
                    .parse()
                    .map_err(ElementBoundsParseError::MalformedMin)?;
                let max = hi
                    .trim()
                    .parse()
                    .map_err(ElementBoundsParseError::MalformedMax)?;
                Ok(Self::new(min, max))
            }
            None => {
                let max = s.parse().map_err(ElementBoundsParseError::MalformedMax)?;
                Ok(Self::new(0, max))
            }
        }
    }
}

/// The bounds placed on every species for a search run.
///
/// The table itself is configuration only; counts live in a
/// [`Composition`](crate::composition::Composition) owned by each search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementTable {
    bounds: [ElementBounds; ELEMENT_COUNT],
}

impl Default for ElementTable {
    /// The classic defaults: C 0-41, H 0-72, N 0-34, O 0-30, everything else fixed at zero
    fn default() -> Self {
        Self::new()
            .with_bounds(ElementKind::C, 0, 41)
            .with_bounds(ElementKind::H, 0, 72)
            .with_bounds(ElementKind::N, 0, 34)
            .with_bounds(ElementKind::O, 0, 30)
    }
}

impl ElementTable {
    /// A table where every species is fixed at zero
    pub fn new() -> Self {
        Self {
            bounds: [ElementBounds::fixed(0); ELEMENT_COUNT],
        }
    }

    #[inline]
    pub fn bounds(&self, element: ElementKind) -> ElementBounds {
        self.bounds[element.index()]
    }

    pub fn set_bounds(&mut self, element: ElementKind, bounds: ElementBounds) {
        self.bounds[element.index()] = bounds;
    }

    /// Builder-style [`ElementTable::set_bounds`]
    pub fn with_bounds(mut self, element: ElementKind, min: u32, max: u32) -> Self {
        self.set_bounds(element, ElementBounds::new(min, max));
        self
    }

    /// Iterate over the species and their bounds in table order
    pub fn iter(&self) -> impl Iterator<Item = (ElementKind, ElementBounds)> + '_ {
        ElementKind::ALL.into_iter().zip(self.bounds.iter().copied())
    }

    /// The species whose upper bound is not zero
    pub fn active(&self) -> impl Iterator<Item = (ElementKind, ElementBounds)> + '_ {
        self.iter().filter(|(_, b)| b.max > 0)
    }

    /// The size of the full Cartesian product of all ranges, saturating at `u64::MAX`
    pub fn search_space_size(&self) -> u64 {
        self.bounds
            .iter()
            .fold(1u64, |acc, b| acc.saturating_mul(b.span()))
    }
}

impl Index<ElementKind> for ElementTable {
    type Output = ElementBounds;

    fn index(&self, index: ElementKind) -> &Self::Output {
        &self.bounds[index.index()]
    }
}

impl IndexMut<ElementKind> for ElementTable {
    fn index_mut(&mut self, index: ElementKind) -> &mut Self::Output {
        &mut self.bounds[index.index()]
    }
}

impl Display for ElementTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (element, bounds) in self.active() {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{element}:{bounds}")?;
        }
        Ok(())
    }
}
