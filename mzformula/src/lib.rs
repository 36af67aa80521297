//! Enumerate the elemental compositions whose exact mass matches a measured mass.
//!
//! A search walks every count assignment allowed by an [`ElementTable`], pruning
//! branches that can only grow heavier than the [`MassWindow`], and keeps the
//! compositions that pass an element ratio screen and a rings-plus-double-bonds test.
//!
//! ```
//! use mzformula::prelude::*;
//!
//! let table = ElementTable::new()
//!     .with_bounds(ElementKind::C, 0, 2)
//!     .with_bounds(ElementKind::H, 0, 4);
//! let params = SearchParameters::default().with_plausibility(PlausibilityMode::Strict);
//! let result = search_formulas(&table, 16.0313, 5.0, params).unwrap();
//! assert_eq!(result.formulas[0].formula(), "C1H4");
//! ```
pub mod composition;
pub mod element;
pub mod mass;
pub mod plausibility;
pub mod rdb;
pub mod search;
pub mod solution;

#[cfg(feature = "parallel")]
pub mod parallel;

pub mod api;

pub use api::search_formulas;
#[cfg(feature = "parallel")]
pub use api::search_formulas_parallel;

pub mod prelude {
    pub use crate::api::search_formulas;
    #[cfg(feature = "parallel")]
    pub use crate::api::search_formulas_parallel;
    pub use crate::composition::Composition;
    pub use crate::element::{ElementBounds, ElementKind, ElementTable};
    pub use crate::mass::{IonMode, MassWindow};
    pub use crate::plausibility::PlausibilityMode;
    pub use crate::search::{FormulaSearch, SearchError, SearchParameters, SearchStatistics};
    pub use crate::solution::{AcceptedFormula, SearchResult};
}
