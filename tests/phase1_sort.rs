mod common;

use common::{dir_entry, file_entry, FlakyCollator};
use lsgrid::collate::{ByteCollator, LocaleCollator};
use lsgrid::compare::{build, NameMode, SortKey, SortSpec};
use lsgrid::config::ListingOptions;
use lsgrid::diag::{Diagnostics, ExitStatus, Severity};
use lsgrid::entry::{Entry, TimeField};
use lsgrid::sort::sort_table;
use lsgrid::table::EntryTable;
use std::cmp::Ordering;

const KEYS: [SortKey; 6] = [
    SortKey::Name,
    SortKey::Extension,
    SortKey::Width,
    SortKey::Size,
    SortKey::Version,
    SortKey::Time,
];

fn sample() -> Vec<Entry> {
    let mut entries = vec![
        file_entry("b.txt", 10, 300),
        file_entry("a.txt", 10, 300),
        file_entry("file10", 5, 100),
        file_entry("file2", 5, 200),
        file_entry(".hidden", 0, 50),
        file_entry("Zeta.rs", 99, 300),
        file_entry("archive.tar.gz", 42, 10),
        file_entry("noext", 42, 10),
        dir_entry("src"),
        dir_entry("docs.d"),
    ];
    for e in &mut entries {
        e.width = Some(e.name.len());
    }
    entries
}

fn table_of(entries: Vec<Entry>) -> EntryTable {
    let mut table = EntryTable::new();
    for e in entries {
        table.push(e);
    }
    table
}

fn names(table: &EntryTable) -> Vec<String> {
    table.sorted().map(|e| e.name.to_string_lossy().into_owned()).collect()
}

fn all_specs() -> Vec<SortSpec> {
    let mut specs = Vec::new();
    for key in KEYS {
        for reverse in [false, true] {
            for dirs_first in [false, true] {
                specs.push(SortSpec {
                    key,
                    time_field: TimeField::Modification,
                    reverse,
                    dirs_first,
                });
            }
        }
    }
    specs
}

#[test]
fn every_comparator_is_antisymmetric_and_only_ties_on_identity() {
    let entries = sample();
    let collator = LocaleCollator::for_locale(Some("en_US.UTF-8"));
    for spec in all_specs() {
        for mode in [NameMode::Collate, NameMode::Bytes] {
            let cmp = build(&spec, mode, &collator);
            for (i, a) in entries.iter().enumerate() {
                for (j, b) in entries.iter().enumerate() {
                    let ab = cmp(a, b).unwrap();
                    let ba = cmp(b, a).unwrap();
                    assert_eq!(ab, ba.reverse(), "{spec:?} {mode:?} {:?} {:?}", a.name, b.name);
                    let tied = ab == Ordering::Equal;
                    assert_eq!(tied, i == j, "{spec:?} {mode:?} {:?} {:?}", a.name, b.name);
                }
            }
        }
    }
}

#[test]
fn every_comparator_is_transitive() {
    let entries = sample();
    for spec in all_specs() {
        let cmp = build(&spec, NameMode::Bytes, &ByteCollator);
        for a in &entries {
            for b in &entries {
                for c in &entries {
                    let ab = cmp(a, b).unwrap();
                    let bc = cmp(b, c).unwrap();
                    if ab == Ordering::Less && bc == Ordering::Less {
                        assert_eq!(cmp(a, c).unwrap(), Ordering::Less, "{spec:?}");
                    }
                }
            }
        }
    }
}

#[test]
fn sorting_twice_gives_the_same_order() {
    let opts = ListingOptions {
        sort: SortSpec {
            key: SortKey::Size,
            ..SortSpec::default()
        },
        ..ListingOptions::default()
    };
    let mut table = table_of(sample());
    let mut diag = Diagnostics::capturing();
    sort_table(&mut table, &opts, &ByteCollator, &mut diag);
    let first = names(&table);
    sort_table(&mut table, &opts, &ByteCollator, &mut diag);
    assert_eq!(names(&table), first);
    assert_eq!(first[0], "Zeta.rs");
}

#[test]
fn unsorted_keeps_insertion_order_in_both_directions() {
    let entries = sample();
    let expected: Vec<String> = entries
        .iter()
        .map(|e| e.name.to_string_lossy().into_owned())
        .collect();
    for reverse in [false, true] {
        let opts = ListingOptions {
            sort: SortSpec {
                key: SortKey::None,
                reverse,
                ..SortSpec::default()
            },
            ..ListingOptions::default()
        };
        let mut table = table_of(sample());
        let mut diag = Diagnostics::capturing();
        sort_table(&mut table, &opts, &ByteCollator, &mut diag);
        assert_eq!(names(&table), expected);
    }
}

#[test]
fn dirs_first_hoists_directories_and_keeps_key_order_within_groups() {
    let opts = ListingOptions {
        sort: SortSpec {
            key: SortKey::Name,
            dirs_first: true,
            ..SortSpec::default()
        },
        ..ListingOptions::default()
    };
    let mut table = table_of(sample());
    let mut diag = Diagnostics::capturing();
    sort_table(&mut table, &opts, &ByteCollator, &mut diag);
    let got = names(&table);
    assert_eq!(&got[..2], ["docs.d", "src"]);
    let rest = &got[2..];
    let mut sorted = rest.to_vec();
    sorted.sort();
    assert_eq!(rest, sorted.as_slice());
}

#[test]
fn collation_failure_falls_back_to_byte_order_once() {
    let opts = ListingOptions::default();
    let collator = FlakyCollator::new(2);
    let mut table = table_of(vec![
        file_entry("c", 0, 0),
        file_entry("a", 0, 0),
        file_entry("b", 0, 0),
        file_entry("d", 0, 0),
    ]);
    let mut diag = Diagnostics::capturing();

    sort_table(&mut table, &opts, &collator, &mut diag);

    assert_eq!(names(&table), ["a", "b", "c", "d"]);
    assert_eq!(diag.recorded().len(), 1);
    assert_eq!(diag.recorded()[0].severity, Severity::Minor);
    assert!(diag.recorded()[0].message.contains("cannot compare file names"));
    assert_eq!(diag.status(), ExitStatus::Minor);
    // Collated comparisons stop at the failing call.
    assert_eq!(collator.calls.get(), 2);
}

#[test]
fn fallback_still_honours_reverse_and_key() {
    let opts = ListingOptions {
        sort: SortSpec {
            key: SortKey::Size,
            reverse: true,
            ..SortSpec::default()
        },
        ..ListingOptions::default()
    };
    let collator = FlakyCollator::new(1);
    let mut table = table_of(vec![
        file_entry("y", 1, 0),
        file_entry("x", 1, 0),
        file_entry("big", 100, 0),
    ]);
    let mut diag = Diagnostics::capturing();
    sort_table(&mut table, &opts, &collator, &mut diag);
    assert_eq!(names(&table), ["y", "x", "big"]);
    assert_eq!(diag.status(), ExitStatus::Minor);
}

#[test]
fn successful_collation_is_used_as_is() {
    // FlakyCollator orders names backwards until it fails.
    let collator = FlakyCollator::new(usize::MAX);
    let mut table = table_of(vec![
        file_entry("a", 0, 0),
        file_entry("c", 0, 0),
        file_entry("b", 0, 0),
    ]);
    let mut diag = Diagnostics::capturing();
    sort_table(&mut table, &ListingOptions::default(), &collator, &mut diag);
    assert_eq!(names(&table), ["c", "b", "a"]);
    assert!(diag.recorded().is_empty());
}

#[test]
fn entries_without_metadata_sort_as_zero() {
    let opts = ListingOptions {
        sort: SortSpec {
            key: SortKey::Time,
            ..SortSpec::default()
        },
        ..ListingOptions::default()
    };
    let mut missing = Entry::new("ghost", lsgrid::entry::FileType::Unknown);
    missing.metadata = None;
    let mut table = table_of(vec![missing, file_entry("old", 0, 1), file_entry("new", 0, 500)]);
    let mut diag = Diagnostics::capturing();
    sort_table(&mut table, &opts, &ByteCollator, &mut diag);
    assert_eq!(names(&table), ["new", "old", "ghost"]);
}

#[test]
fn version_and_extension_orders() {
    let mut diag = Diagnostics::capturing();
    let version = ListingOptions {
        sort: SortSpec {
            key: SortKey::Version,
            ..SortSpec::default()
        },
        ..ListingOptions::default()
    };
    let mut table = table_of(vec![
        file_entry("file10", 0, 0),
        file_entry("file2", 0, 0),
        file_entry("file1", 0, 0),
    ]);
    sort_table(&mut table, &version, &ByteCollator, &mut diag);
    assert_eq!(names(&table), ["file1", "file2", "file10"]);

    let by_ext = ListingOptions {
        sort: SortSpec {
            key: SortKey::Extension,
            ..SortSpec::default()
        },
        ..ListingOptions::default()
    };
    let mut table = table_of(vec![
        file_entry("b.rs", 0, 0),
        file_entry("a.toml", 0, 0),
        file_entry("README", 0, 0),
        file_entry("a.rs", 0, 0),
    ]);
    sort_table(&mut table, &by_ext, &ByteCollator, &mut diag);
    assert_eq!(names(&table), ["README", "a.rs", "b.rs", "a.toml"]);
}

#[test]
fn two_file_batch_under_each_key() {
    let batch = || table_of(vec![file_entry("b.txt", 100, 1_000), file_entry("a.txt", 50, 2_000)]);
    let sorted = |key: SortKey, reverse: bool| {
        let opts = ListingOptions {
            sort: SortSpec {
                key,
                reverse,
                ..SortSpec::default()
            },
            ..ListingOptions::default()
        };
        let mut table = batch();
        let mut diag = Diagnostics::capturing();
        sort_table(&mut table, &opts, &ByteCollator, &mut diag);
        names(&table)
    };
    assert_eq!(sorted(SortKey::Size, true), ["a.txt", "b.txt"]);
    assert_eq!(sorted(SortKey::Size, false), ["b.txt", "a.txt"]);
    assert_eq!(sorted(SortKey::Time, false), ["a.txt", "b.txt"]);
    assert_eq!(sorted(SortKey::Name, false), ["a.txt", "b.txt"]);
}

#[test]
fn five_entry_fallback_matches_plain_byte_sort() {
    let batch = || {
        let names = ["e", "B", "a", "d", "c"];
        table_of(names.iter().map(|n| file_entry(n, 0, 0)).collect())
    };
    let opts = ListingOptions::default();

    let mut expected = batch();
    let mut clean = Diagnostics::capturing();
    sort_table(&mut expected, &opts, &ByteCollator, &mut clean);

    let mut table = batch();
    let mut diag = Diagnostics::capturing();
    sort_table(&mut table, &opts, &FlakyCollator::new(2), &mut diag);

    assert_eq!(names(&table), names(&expected));
    assert_eq!(names(&table), ["B", "a", "c", "d", "e"]);
    assert_eq!(diag.recorded().len(), 1);
    assert_eq!(diag.recorded()[0].severity, Severity::Minor);
}
