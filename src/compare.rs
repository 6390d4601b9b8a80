//! Entry comparators.
//!
//! A comparator is composed from four independent choices: the primary sort
//! key, how names are compared for the tiebreak (locale collation or raw
//! bytes), the direction, and whether directories are hoisted to the front.
//! [`build`] assembles one boxed closure from those choices.

use std::cmp::Ordering;

use crate::collate::{ByteCollator, CollationError, Collator};
use crate::entry::{Entry, TimeField};
use crate::version::version_cmp;

/// Primary ordering key. Discriminants are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SortKey {
    #[default]
    Name = 0,
    Extension = 1,
    Width = 2,
    Size = 3,
    Version = 4,
    Time = 5,
    /// Directory order.
    None = 6,
}

/// How names are compared when the primary key ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameMode {
    #[default]
    Collate,
    Bytes,
}

/// The user's sort selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub key: SortKey,
    /// Timestamp read by [`SortKey::Time`].
    pub time_field: TimeField,
    pub reverse: bool,
    pub dirs_first: bool,
}

pub type CompareResult = Result<Ordering, CollationError>;

/// A composed comparator over two entries.
pub type Comparator<'a> = Box<dyn Fn(&Entry, &Entry) -> CompareResult + 'a>;

/// Build the comparator for `spec`, comparing names with `collator` or raw bytes.
pub fn build<'a>(spec: &SortSpec, mode: NameMode, collator: &'a dyn Collator) -> Comparator<'a> {
    let names: &'a dyn Collator = match mode {
        NameMode::Collate => collator,
        NameMode::Bytes => &ByteCollator,
    };
    let field = spec.time_field;

    let primary: Comparator<'a> = match spec.key {
        SortKey::Name => Box::new(move |a: &Entry, b: &Entry| by_name(a, b, names)),
        SortKey::Extension => Box::new(move |a: &Entry, b: &Entry| {
            let delta = names.compare(extension(a.name_bytes()), extension(b.name_bytes()))?;
            then_name(delta, a, b, names)
        }),
        SortKey::Width => Box::new(move |a: &Entry, b: &Entry| {
            let delta = a.width.unwrap_or(0).cmp(&b.width.unwrap_or(0));
            then_name(delta, a, b, names)
        }),
        SortKey::Size => Box::new(move |a: &Entry, b: &Entry| {
            then_name(b.size().cmp(&a.size()), a, b, names)
        }),
        SortKey::Time => Box::new(move |a: &Entry, b: &Entry| {
            then_name(b.time(field).cmp(&a.time(field)), a, b, names)
        }),
        SortKey::Version => {
            Box::new(|a: &Entry, b: &Entry| Ok(version_cmp(a.name_bytes(), b.name_bytes())))
        }
        SortKey::None => Box::new(|_: &Entry, _: &Entry| Ok(Ordering::Equal)),
    };

    let directed = if spec.reverse { reversed(primary) } else { primary };
    if spec.dirs_first {
        directories_first(directed)
    } else {
        directed
    }
}

fn by_name(a: &Entry, b: &Entry, names: &dyn Collator) -> CompareResult {
    names.compare(a.name_bytes(), b.name_bytes())
}

fn then_name(delta: Ordering, a: &Entry, b: &Entry, names: &dyn Collator) -> CompareResult {
    match delta {
        Ordering::Equal => by_name(a, b, names),
        decided => Ok(decided),
    }
}

/// Swap the arguments of `inner`.
pub fn reversed<'a>(inner: Comparator<'a>) -> Comparator<'a> {
    Box::new(move |a: &Entry, b: &Entry| inner(b, a))
}

/// Put directory-like entries ahead of everything else, then defer to `inner`.
pub fn directories_first<'a>(inner: Comparator<'a>) -> Comparator<'a> {
    Box::new(move |a: &Entry, b: &Entry| match (a.is_directory_like(), b.is_directory_like()) {
        (true, false) => Ok(Ordering::Less),
        (false, true) => Ok(Ordering::Greater),
        _ => inner(a, b),
    })
}

/// The extension of the final path component, including its dot.
///
/// A dot that starts the component does not begin an extension, so
/// `.bashrc` has none.
pub fn extension(name: &[u8]) -> &[u8] {
    let base = name.iter().rposition(|&c| c == b'/').map_or(0, |i| i + 1);
    match name[base..].iter().rposition(|&c| c == b'.') {
        Some(dot) if dot > 0 => &name[base + dot..],
        _ => b"",
    }
}
