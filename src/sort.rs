//! Sorting the entry table's view.

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::collate::Collator;
use crate::compare::{self, NameMode, SortKey};
use crate::config::ListingOptions;
use crate::diag::{Diagnostics, Severity};
use crate::table::EntryTable;

/// Slices up to this length are insertion-sorted.
const INSERTION_THRESHOLD: usize = 16;

/// Merge sort with a fallible comparator.
///
/// On error the slice is left in an unspecified permutation-or-duplicate state
/// and must be rebuilt by the caller before reuse.
pub fn try_sort_by<T, E, F>(v: &mut [T], mut cmp: F) -> Result<(), E>
where
    T: Copy,
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    if v.len() < 2 {
        return Ok(());
    }
    let mut scratch = v.to_vec();
    merge_sort(v, &mut scratch, &mut cmp)
}

fn merge_sort<T, E, F>(v: &mut [T], scratch: &mut [T], cmp: &mut F) -> Result<(), E>
where
    T: Copy,
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    let n = v.len();
    if n <= INSERTION_THRESHOLD {
        for i in 1..n {
            let mut j = i;
            while j > 0 && cmp(&v[j - 1], &v[j])? == Ordering::Greater {
                v.swap(j - 1, j);
                j -= 1;
            }
        }
        return Ok(());
    }

    let mid = n / 2;
    {
        let (lo, hi) = v.split_at_mut(mid);
        let (slo, shi) = scratch.split_at_mut(mid);
        merge_sort(lo, slo, cmp)?;
        merge_sort(hi, shi, cmp)?;
    }

    scratch[..n].copy_from_slice(v);
    let (mut i, mut j, mut k) = (0, mid, 0);
    while i < mid && j < n {
        if cmp(&scratch[j], &scratch[i])? == Ordering::Less {
            v[k] = scratch[j];
            j += 1;
        } else {
            v[k] = scratch[i];
            i += 1;
        }
        k += 1;
    }
    v[k..k + (mid - i)].copy_from_slice(&scratch[i..mid]);
    k += mid - i;
    v[k..].copy_from_slice(&scratch[j..n]);
    Ok(())
}

/// Order `table`'s view according to `opts.sort`.
///
/// Names are compared with `collator`; if it fails, the failure is reported
/// once and the whole sort is redone with raw byte comparison.
pub fn sort_table(
    table: &mut EntryTable,
    opts: &ListingOptions,
    collator: &dyn Collator,
    diag: &mut Diagnostics,
) {
    table.reset_view();

    if opts.is_multi_column() || opts.sort.key == SortKey::Width {
        table.cache_widths(opts);
    }

    if opts.sort.key == SortKey::None {
        return;
    }

    let collated = {
        let cmp = compare::build(&opts.sort, NameMode::Collate, collator);
        let (view, entries) = table.view_mut();
        try_sort_by(view, |&a, &b| cmp(&entries[a], &entries[b]))
    };

    if let Err(err) = collated {
        diag.report(Severity::Minor, format_args!("{}", err));
        debug!(%err, "collation failed; sorting by bytes");
        table.reset_view();
        let cmp = compare::build(&opts.sort, NameMode::Bytes, collator);
        let (view, entries) = table.view_mut();
        if let Err(err) = try_sort_by(view, |&a, &b| cmp(&entries[a], &entries[b])) {
            warn!(%err, "byte-order sort failed; listing in partial order");
        }
    }
}
