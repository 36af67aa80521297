use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Sender;
use rayon::prelude::*;
use tracing::{debug, info, instrument, trace, warn};

use mzpeaks::Tolerance;

use mzformula::element::ElementTable;
use mzformula::mass::MassWindow;
use mzformula::parallel::ShardedSearch;
use mzformula::search::{FormulaSearch, SearchError, SearchParameters, SearchStatistics};
use mzformula::solution::{AcceptedFormula, SearchResult};

use crate::progress::ProgressRecord;
use crate::query::MassQuery;

/// The outcome of one query, ready to be written
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub query: MassQuery,
    pub window: MassWindow,
    pub formulas: Vec<AcceptedFormula>,
    pub statistics: SearchStatistics,
}

/// Everything a worker needs to search a query, shared read-only between workers
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub table: ElementTable,
    pub tolerance: Tolerance,
    pub parameters: SearchParameters,
    pub cancellation: Arc<AtomicBool>,
}

#[instrument(level = "debug", skip_all, fields(query_index = query.index))]
pub fn search_query(config: &SearchConfig, query: MassQuery, sharded: bool) -> QueryResult {
    let window = MassWindow::new(query.mass, config.tolerance);
    let search = FormulaSearch::new(&config.table, window, config.parameters)
        .with_cancellation(config.cancellation.clone());

    let SearchResult {
        formulas,
        statistics,
    } = if sharded {
        ShardedSearch::new(search).run_partial()
    } else {
        search.run_partial()
    };

    match statistics.into_result() {
        Ok(_) => {
            trace!(
                "Query {} {:?} matched {} formulas",
                query.index,
                query.comment,
                formulas.len()
            );
        }
        Err(SearchError::CounterOverflow(s)) => {
            warn!(
                "Query {} {:?} evaluated more candidates than can be counted, totals are lower bounds ({} accepted)",
                query.index, query.comment, s.accepted
            );
        }
        Err(SearchError::Cancelled(s)) => {
            debug!(
                "Query {} was cancelled after {} candidates",
                query.index, s.evaluated
            );
        }
    }

    QueryResult {
        query,
        window,
        formulas,
        statistics,
    }
}

/// Search every query on the current thread pool, sending results to `sender`
/// tagged with the query's index.
///
/// A lone query is split across the pool instead.
pub fn prepare_processing(
    queries: Vec<MassQuery>,
    config: SearchConfig,
    sender: Sender<(usize, QueryResult)>,
) -> ProgressRecord {
    let init_counter = AtomicU32::new(0);
    let started = Instant::now();
    let sharded = queries.len() == 1;

    let prog = queries
        .into_par_iter()
        .map_init(
            || {
                init_counter.fetch_add(1, Ordering::AcqRel);
                config.clone()
            },
            |config, query| {
                let index = query.index;
                let result = search_query(config, query, sharded);
                let prog = ProgressRecord::from_statistics(&result.statistics, result.formulas.len());
                if let Err(e) = sender.send((index, result)) {
                    if !config.cancellation.load(Ordering::Relaxed) {
                        warn!("Failed to send query {index} for writing: {e}");
                    }
                    config.cancellation.store(true, Ordering::Relaxed);
                }
                prog
            },
        )
        .fold(ProgressRecord::default, ProgressRecord::sum)
        .reduce(ProgressRecord::default, ProgressRecord::sum);

    let elapsed = Instant::now() - started;
    debug!(
        "{} threads run for formula search",
        init_counter.load(Ordering::SeqCst)
    );
    info!("Elapsed Time: {:0.3?}", elapsed);
    prog
}
