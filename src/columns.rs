//! Column-count planning for the multi-column formats.
//!
//! Every candidate column count is simulated in a single pass over the
//! entries: each entry widens the column it would land in for every candidate
//! that is still within the line budget.

use tracing::debug;

/// Narrowest possible column: one character of name plus two of spacing.
pub const MIN_COLUMN_WIDTH: usize = 3;

/// How entries are assigned to columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Top to bottom, then the next column (`-C`).
    ByColumns,
    /// Left to right, then the next row (`-x`).
    ByRows,
}

/// The chosen layout for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    /// Width of each column, including trailing spacing for all but the last.
    pub widths: Vec<usize>,
    pub order: Order,
}

impl ColumnPlan {
    pub fn columns(&self) -> usize {
        self.widths.len()
    }

    /// Sum of the column widths.
    pub fn line_len(&self) -> usize {
        self.widths.iter().sum()
    }
}

#[derive(Debug, Clone, Default)]
struct Candidate {
    valid: bool,
    line_len: usize,
    widths: Vec<usize>,
}

/// Reusable planner; keeps its candidate buffers between batches.
#[derive(Debug, Default)]
pub struct ColumnPlanner {
    candidates: Vec<Candidate>,
}

impl ColumnPlanner {
    pub fn new() -> Self {
        ColumnPlanner::default()
    }

    /// Choose the largest column count whose lines stay under `line_length`.
    ///
    /// `widths` holds each entry's full rendered width in display order. A
    /// `line_length` of zero means no limit. The result always has at least
    /// one column, even when a single entry is wider than the budget.
    pub fn plan(&mut self, widths: &[usize], line_length: usize, order: Order) -> ColumnPlan {
        let n = widths.len();
        let budget = if line_length == 0 { usize::MAX } else { line_length };
        let max_idx = if line_length == 0 {
            n
        } else {
            line_length.div_ceil(MIN_COLUMN_WIDTH)
        };
        let max_cols = max_idx.min(n);

        self.reset(max_cols, budget);

        for (filesno, &name_length) in widths.iter().enumerate() {
            for (i, cand) in self.candidates.iter_mut().enumerate().take(max_cols) {
                if !cand.valid {
                    continue;
                }
                let idx = match order {
                    Order::ByColumns => filesno / ((n + i) / (i + 1)),
                    Order::ByRows => filesno % (i + 1),
                };
                let real_length = name_length + if idx == i { 0 } else { 2 };
                if cand.widths[idx] < real_length {
                    cand.line_len += real_length - cand.widths[idx];
                    cand.widths[idx] = real_length;
                    cand.valid = cand.line_len < budget;
                }
            }
        }

        let cols = (2..=max_cols)
            .rev()
            .find(|&c| self.candidates[c - 1].valid)
            .unwrap_or(1);
        debug!(entries = n, line_length, columns = cols, "column count chosen");

        let widths = if n == 0 {
            vec![MIN_COLUMN_WIDTH]
        } else {
            self.candidates[cols - 1].widths.clone()
        };
        ColumnPlan { widths, order }
    }

    fn reset(&mut self, max_cols: usize, budget: usize) {
        if self.candidates.len() < max_cols {
            self.candidates.resize_with(max_cols, Candidate::default);
        }
        for (i, cand) in self.candidates.iter_mut().enumerate().take(max_cols) {
            let cols = i + 1;
            cand.line_len = cols * MIN_COLUMN_WIDTH;
            cand.valid = cand.line_len < budget;
            cand.widths.clear();
            cand.widths.resize(cols, MIN_COLUMN_WIDTH);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_fits_on_one_line() {
        let mut p = ColumnPlanner::new();
        let plan = p.plan(&[1, 1, 1], 80, Order::ByColumns);
        assert_eq!(plan.columns(), 3);
        assert_eq!(plan.widths, vec![3, 3, 3]);
    }

    #[test]
    fn wide_entry_falls_back_to_one_column() {
        let mut p = ColumnPlanner::new();
        let plan = p.plan(&[200], 80, Order::ByColumns);
        assert_eq!(plan.columns(), 1);
        let plan = p.plan(&[200, 3, 3], 80, Order::ByRows);
        assert_eq!(plan.columns(), 1);
    }

    #[test]
    fn by_columns_packs_rows_per_column() {
        // Five names of width 10: 3 columns of 2 rows need 12+12+10.
        let mut p = ColumnPlanner::new();
        let plan = p.plan(&[10; 5], 38, Order::ByColumns);
        assert_eq!(plan.columns(), 3);
        assert_eq!(plan.widths, vec![12, 12, 10]);
        assert!(plan.line_len() < 38);
    }

    #[test]
    fn by_rows_uses_modulo_assignment() {
        let mut p = ColumnPlanner::new();
        let plan = p.plan(&[4, 8, 4, 8], 16, Order::ByRows);
        assert_eq!(plan.columns(), 2);
        assert_eq!(plan.widths, vec![6, 8]);
    }

    #[test]
    fn zero_line_length_is_unlimited() {
        let mut p = ColumnPlanner::new();
        let plan = p.plan(&[50; 10], 0, Order::ByColumns);
        assert_eq!(plan.columns(), 10);
    }

    #[test]
    fn budget_growth_never_reduces_columns() {
        let widths = [7, 3, 12, 5, 9, 1, 14, 6, 2, 8, 11];
        let mut p = ColumnPlanner::new();
        let mut last = 0;
        for budget in 1..120 {
            let plan = p.plan(&widths, budget, Order::ByColumns);
            assert!(plan.columns() >= last, "budget {budget}");
            if plan.columns() > 1 {
                assert!(plan.line_len() < budget);
            }
            last = plan.columns();
        }
    }

    #[test]
    fn empty_input_plans_one_column() {
        let mut p = ColumnPlanner::new();
        assert_eq!(p.plan(&[], 80, Order::ByRows).columns(), 1);
    }
}
