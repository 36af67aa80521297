//! The pruned enumeration of compositions whose mass falls inside a window.
//!
//! Species are nested from heaviest (outermost) to lightest (innermost) following
//! [`ElementKind::SEARCH_ORDER`]. Every species has a positive mass, so the mass of a
//! partial assignment with all inner species at their minimum only grows as any count
//! grows. Once that bound passes the top of the window, the current level and every
//! larger count of it are abandoned and the search carries into the next outer level.
use std::ops::{Add, AddAssign};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument, trace};

use crate::composition::Composition;
use crate::element::{ElementBounds, ElementKind, ElementTable};
use crate::mass::{ion_mass, neutral_mass, IonMode, MassWindow};
use crate::plausibility::PlausibilityMode;
use crate::rdb::Unsaturation;
use crate::solution::{AcceptedFormula, SearchResult};

/// Added to the pruning ceiling so that summation order can never discard a
/// composition the mass evaluator would place inside the window
const PRUNE_SLACK: f64 = 1e-7;

/// The options a search is run with besides the element bounds and mass window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchParameters {
    pub ion_mode: IonMode,
    pub plausibility: PlausibilityMode,
}

impl SearchParameters {
    pub fn new(ion_mode: IonMode, plausibility: PlausibilityMode) -> Self {
        Self {
            ion_mode,
            plausibility,
        }
    }

    pub fn with_ion_mode(mut self, ion_mode: IonMode) -> Self {
        self.ion_mode = ion_mode;
        self
    }

    pub fn with_plausibility(mut self, plausibility: PlausibilityMode) -> Self {
        self.plausibility = plausibility;
        self
    }
}

/// Counts of the work a search did. Counters saturate instead of wrapping.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SearchStatistics {
    /// The number of complete compositions whose mass was evaluated
    pub evaluated: u64,
    /// The number of formulas accepted
    pub accepted: u64,
    /// Whether either counter hit `u64::MAX`
    pub saturated: bool,
    /// Whether the search stopped early because it was cancelled
    pub cancelled: bool,
}

impl SearchStatistics {
    #[inline]
    fn record_evaluated(&mut self) {
        match self.evaluated.checked_add(1) {
            Some(v) => self.evaluated = v,
            None => self.saturated = true,
        }
    }

    #[inline]
    fn record_accepted(&mut self) {
        match self.accepted.checked_add(1) {
            Some(v) => self.accepted = v,
            None => self.saturated = true,
        }
    }

    /// Convert a finished search's statistics into an error if it did not run to completion
    /// with exact counts
    pub fn into_result(self) -> Result<Self, SearchError> {
        if self.cancelled {
            Err(SearchError::Cancelled(self))
        } else if self.saturated {
            Err(SearchError::CounterOverflow(self))
        } else {
            Ok(self)
        }
    }
}

impl Add for SearchStatistics {
    type Output = SearchStatistics;

    fn add(self, rhs: Self) -> Self::Output {
        let mut dup = self;
        dup += rhs;
        dup
    }
}

impl AddAssign for SearchStatistics {
    fn add_assign(&mut self, rhs: Self) {
        let (evaluated, o1) = self.evaluated.overflowing_add(rhs.evaluated);
        let (accepted, o2) = self.accepted.overflowing_add(rhs.accepted);
        self.evaluated = if o1 { u64::MAX } else { evaluated };
        self.accepted = if o2 { u64::MAX } else { accepted };
        self.saturated |= rhs.saturated || o1 || o2;
        self.cancelled |= rhs.cancelled;
    }
}

/// Ways a search can fail to produce an exact result. Both carry the statistics
/// reached when the search stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("A candidate counter overflowed after evaluating {} compositions", .0.evaluated)]
    CounterOverflow(SearchStatistics),
    #[error("The search was cancelled after evaluating {} compositions", .0.evaluated)]
    Cancelled(SearchStatistics),
}

impl SearchError {
    pub fn statistics(&self) -> &SearchStatistics {
        match self {
            SearchError::CounterOverflow(s) => s,
            SearchError::Cancelled(s) => s,
        }
    }
}

/// One nesting level of the search, a species whose count varies
#[derive(Debug, Clone, Copy, PartialEq)]
struct SearchLevel {
    element: ElementKind,
    bounds: ElementBounds,
    mass: f64,
    /// The smallest mass all levels inside this one can add
    inner_minimum: f64,
}

/// A configured enumeration over an [`ElementTable`] for one [`MassWindow`].
///
/// Species with a single allowed count are folded into a fixed base composition, the
/// rest become nesting levels in [`ElementKind::SEARCH_ORDER`]. Each call to
/// [`FormulaSearch::iter`] starts an independent run with its own composition.
#[derive(Debug, Clone)]
pub struct FormulaSearch {
    table: ElementTable,
    window: MassWindow,
    parameters: SearchParameters,
    levels: Vec<SearchLevel>,
    base: Composition,
    base_mass: f64,
    /// The largest neutral mass that can still produce an ion inside the window
    mass_ceiling: f64,
    cancellation: Option<Arc<AtomicBool>>,
}

impl FormulaSearch {
    pub fn new(table: &ElementTable, window: MassWindow, parameters: SearchParameters) -> Self {
        let mut base = Composition::new();
        let mut levels = Vec::new();
        for element in ElementKind::SEARCH_ORDER {
            let bounds = table.bounds(element);
            base.set(element, bounds.min());
            if bounds.span() > 1 {
                levels.push(SearchLevel {
                    element,
                    bounds,
                    mass: element.exact_mass(),
                    inner_minimum: 0.0,
                });
            }
        }

        let mut inner = 0.0;
        for level in levels.iter_mut().rev() {
            level.inner_minimum = inner;
            inner += level.bounds.min() as f64 * level.mass;
        }

        let mut base_mass_composition = base;
        for level in levels.iter() {
            base_mass_composition.set(level.element, 0);
        }
        let base_mass = neutral_mass(&base_mass_composition);

        let mass_ceiling =
            window.upper - parameters.ion_mode.electron_correction() + PRUNE_SLACK;

        Self {
            table: *table,
            window,
            parameters,
            levels,
            base,
            base_mass,
            mass_ceiling,
            cancellation: None,
        }
    }

    /// Stop the search cooperatively once `flag` is set. The flag is checked each time the
    /// search advances its outermost level.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(flag);
        self
    }

    pub fn cancellation(&self) -> Option<&Arc<AtomicBool>> {
        self.cancellation.as_ref()
    }

    pub fn table(&self) -> &ElementTable {
        &self.table
    }

    pub fn window(&self) -> &MassWindow {
        &self.window
    }

    pub fn parameters(&self) -> &SearchParameters {
        &self.parameters
    }

    /// The species that vary, outermost first, with their bounds
    pub fn variable_elements(&self) -> impl Iterator<Item = (ElementKind, ElementBounds)> + '_ {
        self.levels.iter().map(|l| (l.element, l.bounds))
    }

    #[inline]
    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Start a new run, lazily yielding accepted formulas in emission order
    pub fn iter(&self) -> FormulaIter<'_> {
        FormulaIter::new(self)
    }

    /// Run the search to completion, passing every accepted formula to `sink`
    pub fn run_with<F: FnMut(AcceptedFormula)>(
        &self,
        sink: F,
    ) -> Result<SearchStatistics, SearchError> {
        self.drive(sink).into_result()
    }

    #[instrument(level = "debug", skip_all, fields(target = self.window.target))]
    fn drive<F: FnMut(AcceptedFormula)>(&self, mut sink: F) -> SearchStatistics {
        debug!(
            "Searching {} with {} ({} variable species)",
            self.window,
            self.table,
            self.levels.len()
        );
        let mut iter = self.iter();
        for formula in iter.by_ref() {
            sink(formula);
        }
        let statistics = iter.statistics();
        debug!(
            "Evaluated {} compositions, accepted {}",
            statistics.evaluated, statistics.accepted
        );
        statistics
    }

    /// Run the search and collect the accepted formulas, keeping whatever was found
    /// when the run was cancelled or its counters saturated.
    ///
    /// The result's statistics say whether it is complete.
    pub fn run_partial(&self) -> SearchResult {
        let mut formulas = Vec::new();
        let statistics = self.drive(|f| formulas.push(f));
        SearchResult::new(formulas, statistics)
    }

    /// Run the search to completion and collect the accepted formulas
    pub fn run(&self) -> Result<SearchResult, SearchError> {
        let result = self.run_partial();
        result.statistics.into_result()?;
        Ok(result)
    }
}

impl<'a> IntoIterator for &'a FormulaSearch {
    type Item = AcceptedFormula;

    type IntoIter = FormulaIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Drain the rest of a run, keeping its statistics
impl From<FormulaIter<'_>> for SearchResult {
    fn from(mut iter: FormulaIter<'_>) -> Self {
        let formulas: Vec<_> = iter.by_ref().collect();
        SearchResult::new(formulas, iter.statistics())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterState {
    Fresh,
    Running,
    Exhausted,
}

/// A single run of a [`FormulaSearch`].
///
/// The run owns its composition and per-level partial masses, so any number of
/// runs may proceed over the same search at once.
#[derive(Debug, Clone)]
pub struct FormulaIter<'a> {
    search: &'a FormulaSearch,
    composition: Composition,
    counts: Vec<u32>,
    /// Neutral mass of the base plus every level up to and including this one
    partial: Vec<f64>,
    statistics: SearchStatistics,
    state: IterState,
}

impl<'a> FormulaIter<'a> {
    fn new(search: &'a FormulaSearch) -> Self {
        let n = search.levels.len();
        let mut this = Self {
            search,
            composition: search.base,
            counts: search.levels.iter().map(|l| l.bounds.min()).collect(),
            partial: vec![0.0; n],
            statistics: SearchStatistics::default(),
            state: IterState::Fresh,
        };
        for level in 0..n {
            this.refresh_partial(level);
        }
        this
    }

    /// What the run has done so far
    pub fn statistics(&self) -> SearchStatistics {
        self.statistics
    }

    /// The composition most recently evaluated
    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    #[inline]
    fn refresh_partial(&mut self, level: usize) {
        let prev = if level == 0 {
            self.search.base_mass
        } else {
            self.partial[level - 1]
        };
        self.partial[level] = prev + self.counts[level] as f64 * self.search.levels[level].mass;
    }

    #[inline]
    fn exceeds(&self, level: usize) -> bool {
        self.partial[level] + self.search.levels[level].inner_minimum > self.search.mass_ceiling
    }

    #[inline]
    fn set_count(&mut self, level: usize, count: u32) {
        self.counts[level] = count;
        self.composition
            .set(self.search.levels[level].element, count);
        self.refresh_partial(level);
    }

    /// Move to the next composition that is not provably too heavy, carrying outward
    /// through exhausted levels. Returns `false` when the run is over.
    fn advance(&mut self) -> bool {
        let n = self.search.levels.len();
        if n == 0 {
            return false;
        }
        let mut level = n - 1;
        loop {
            if level == 0 && self.search.is_cancelled() {
                self.statistics.cancelled = true;
                return false;
            }
            let bounds = self.search.levels[level].bounds;
            if let Some(next) = self.counts[level].checked_add(1) {
                if next <= bounds.max() {
                    self.set_count(level, next);
                    if !self.exceeds(level) {
                        break;
                    }
                }
            }
            if level == 0 {
                return false;
            }
            level -= 1;
        }
        for inner in (level + 1)..n {
            let min = self.search.levels[inner].bounds.min();
            self.set_count(inner, min);
        }
        true
    }

    fn evaluate(&mut self) -> Option<AcceptedFormula> {
        self.statistics.record_evaluated();
        let search = self.search;
        let mass = ion_mass(&self.composition, search.parameters.ion_mode);
        if !search.window.contains(mass) {
            return None;
        }
        if !search.parameters.plausibility.check(&self.composition) {
            return None;
        }
        let unsaturation = Unsaturation::from_composition(&self.composition);
        if !unsaturation.is_acceptable() {
            return None;
        }
        self.statistics.record_accepted();
        let formula = AcceptedFormula::new(self.composition, mass, unsaturation, &search.window);
        trace!("Accepted {formula}");
        Some(formula)
    }
}

impl Iterator for FormulaIter<'_> {
    type Item = AcceptedFormula;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                IterState::Exhausted => return None,
                IterState::Fresh => {
                    self.state = IterState::Running;
                    if self.search.is_cancelled() {
                        self.statistics.cancelled = true;
                        self.state = IterState::Exhausted;
                        return None;
                    }
                    if !self.search.levels.is_empty() && self.exceeds(0) {
                        self.state = IterState::Exhausted;
                        return None;
                    }
                }
                IterState::Running => {
                    if !self.advance() {
                        self.state = IterState::Exhausted;
                        return None;
                    }
                }
            }
            if let Some(formula) = self.evaluate() {
                return Some(formula);
            }
        }
    }
}
