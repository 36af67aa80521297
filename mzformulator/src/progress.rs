use std::ops::{Add, AddAssign};

use mzformula::search::SearchStatistics;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ProgressRecord {
    pub queries: usize,
    pub formulas: usize,
    pub evaluated: u64,
    pub saturated_queries: usize,
    pub cancelled_queries: usize,
}

impl ProgressRecord {
    pub fn from_statistics(statistics: &SearchStatistics, formulas: usize) -> Self {
        Self {
            queries: 1,
            formulas,
            evaluated: statistics.evaluated,
            saturated_queries: statistics.saturated as usize,
            cancelled_queries: statistics.cancelled as usize,
        }
    }

    pub fn sum(self, rhs: Self) -> Self {
        self + rhs
    }
}

impl Add for ProgressRecord {
    type Output = ProgressRecord;

    fn add(self, rhs: Self) -> Self::Output {
        let mut dup = self;
        dup += rhs;
        dup
    }
}

impl AddAssign for ProgressRecord {
    fn add_assign(&mut self, rhs: Self) {
        self.queries += rhs.queries;
        self.formulas += rhs.formulas;
        self.evaluated = self.evaluated.saturating_add(rhs.evaluated);
        self.saturated_queries += rhs.saturated_queries;
        self.cancelled_queries += rhs.cancelled_queries;
    }
}
