//! What a search hands back: accepted formulas and the result of a whole run.
use std::fmt::Display;

use crate::composition::Composition;
use crate::element::ElementKind;
use crate::mass::MassWindow;
use crate::rdb::Unsaturation;

/// A composition that matched the mass window and passed every filter
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AcceptedFormula {
    pub composition: Composition,
    /// The ion mass of the composition
    pub mass: f64,
    /// Rings plus double bonds
    pub rdb: f64,
    /// The fractional part of `rdb`
    pub lewis: f64,
    /// `target - mass` in milli-mass-units
    pub mass_error_milli: f64,
}

impl AcceptedFormula {
    pub fn new(composition: Composition, mass: f64, unsaturation: Unsaturation, window: &MassWindow) -> Self {
        Self {
            composition,
            mass,
            rdb: unsaturation.rdb,
            lewis: unsaturation.lewis,
            mass_error_milli: window.error_milli(mass),
        }
    }

    /// The present species and their counts, in table order
    pub fn elements(&self) -> impl Iterator<Item = (ElementKind, u32)> + '_ {
        self.composition.iter_present()
    }

    /// The formula written as symbol-count pairs, e.g. `C6H12O6`
    pub fn formula(&self) -> String {
        self.composition.to_string()
    }

    /// The signed error in parts-per-million relative to the computed mass
    pub fn mass_error_ppm(&self) -> f64 {
        self.mass_error_milli / self.mass * 1000.0
    }
}

impl Display for AcceptedFormula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{:.1}\t{:.4}\t{:+.1} mmu",
            self.composition, self.rdb, self.mass, self.mass_error_milli
        )
    }
}

/// The formulas accepted by a search, in emission order, and the search's bookkeeping
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SearchResult {
    pub formulas: Vec<AcceptedFormula>,
    pub statistics: crate::search::SearchStatistics,
}

impl SearchResult {
    pub fn new(formulas: Vec<AcceptedFormula>, statistics: crate::search::SearchStatistics) -> Self {
        Self {
            formulas,
            statistics,
        }
    }

    /// The total number of formulas accepted
    pub fn accepted_count(&self) -> u64 {
        self.statistics.accepted
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AcceptedFormula> {
        self.formulas.iter()
    }
}

impl IntoIterator for SearchResult {
    type Item = AcceptedFormula;

    type IntoIter = std::vec::IntoIter<AcceptedFormula>;

    fn into_iter(self) -> Self::IntoIter {
        self.formulas.into_iter()
    }
}
