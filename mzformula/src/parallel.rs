//! Split one search across a `rayon` thread pool.
//!
//! The outermost species whose range spans more than one count is fixed to each of
//! its counts in turn, giving one independent [`FormulaSearch`] per count. Shards
//! share nothing but the read-only configuration and cancellation flag, and their
//! results are concatenated in shard order, which is the order a single-threaded
//! search emits them in.
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::element::{ElementBounds, ElementKind};
use crate::search::{FormulaSearch, SearchError, SearchStatistics};
use crate::solution::SearchResult;

#[derive(Debug, Clone)]
pub struct ShardedSearch {
    search: FormulaSearch,
}

impl From<FormulaSearch> for ShardedSearch {
    fn from(value: FormulaSearch) -> Self {
        Self::new(value)
    }
}

impl ShardedSearch {
    pub fn new(search: FormulaSearch) -> Self {
        Self { search }
    }

    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.search = self.search.with_cancellation(flag);
        self
    }

    /// The species and range that shards are cut along, if any species varies
    pub fn shard_element(&self) -> Option<(ElementKind, ElementBounds)> {
        self.search.variable_elements().next()
    }

    /// One search per count of the outermost varying species, in ascending count order
    pub fn shards(&self) -> Vec<FormulaSearch> {
        let Some((element, bounds)) = self.shard_element() else {
            return vec![self.search.clone()];
        };
        bounds
            .iter()
            .map(|count| {
                let table = self.search.table().with_bounds(element, count, count);
                let shard = FormulaSearch::new(
                    &table,
                    *self.search.window(),
                    *self.search.parameters(),
                );
                match self.search.cancellation() {
                    Some(flag) => shard.with_cancellation(flag.clone()),
                    None => shard,
                }
            })
            .collect()
    }

    /// Run every shard on the current `rayon` pool and merge their results, keeping
    /// the formulas found even if the run was cancelled or a counter saturated
    pub fn run_partial(&self) -> SearchResult {
        let shards = self.shards();
        debug!(
            "Splitting search of {} into {} shards",
            self.search.window(),
            shards.len()
        );
        let results: Vec<SearchResult> = shards
            .par_iter()
            .map(|shard| SearchResult::from(shard.iter()))
            .collect();

        let mut statistics = SearchStatistics::default();
        let mut formulas = Vec::with_capacity(results.iter().map(|r| r.len()).sum());
        for shard_result in results {
            formulas.extend(shard_result.formulas);
            statistics += shard_result.statistics;
        }
        debug!(
            "Evaluated {} compositions, accepted {}",
            statistics.evaluated, statistics.accepted
        );
        SearchResult::new(formulas, statistics)
    }

    /// Run every shard on the current `rayon` pool and merge their results
    pub fn run(&self) -> Result<SearchResult, SearchError> {
        let result = self.run_partial();
        result.statistics.into_result()?;
        Ok(result)
    }
}
