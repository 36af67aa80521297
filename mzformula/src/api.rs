use crate::element::ElementTable;
use crate::mass::MassWindow;
use crate::search::{FormulaSearch, SearchError, SearchParameters};
use crate::solution::SearchResult;

/// Find every plausible composition within `tolerance_milli` milli-mass-units of `target`.
///
/// # Arguments
/// - `table`: The count bounds for each species
/// - `target`: The measured mass
/// - `tolerance_milli`: The half-width of the mass window in milli-mass-units
/// - `parameters`: The ion mode and ratio screening mode to use
pub fn search_formulas(
    table: &ElementTable,
    target: f64,
    tolerance_milli: f64,
    parameters: SearchParameters,
) -> Result<SearchResult, SearchError> {
    FormulaSearch::new(
        table,
        MassWindow::from_milli(target, tolerance_milli),
        parameters,
    )
    .run()
}

/// As [`search_formulas`], but split across the current `rayon` thread pool.
/// The result is identical to the single-threaded search, including order.
#[cfg(feature = "parallel")]
pub fn search_formulas_parallel(
    table: &ElementTable,
    target: f64,
    tolerance_milli: f64,
    parameters: SearchParameters,
) -> Result<SearchResult, SearchError> {
    let search = FormulaSearch::new(
        table,
        MassWindow::from_milli(target, tolerance_milli),
        parameters,
    );
    crate::parallel::ShardedSearch::new(search).run()
}
