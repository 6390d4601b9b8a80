//! Version-aware file name comparison (`ls -v`).
//!
//! Digit runs compare numerically, `~` sorts before everything (including the
//! end of the name), letters sort before other bytes, and trailing file
//! suffixes such as `.tar.gz` are only consulted when the stems tie.

use std::cmp::Ordering;

/// Compare two names in version order, falling back to byte order on ties.
pub fn version_cmp(a: &[u8], b: &[u8]) -> Ordering {
    filevercmp(a, b).then_with(|| a.cmp(b))
}

/// Version order without the final byte-order tiebreak.
pub fn filevercmp(a: &[u8], b: &[u8]) -> Ordering {
    if a.is_empty() || b.is_empty() {
        return b.is_empty().cmp(&a.is_empty());
    }

    // "." first, then "..", then other hidden names, then everything else.
    if a[0] == b'.' {
        if b[0] != b'.' {
            return Ordering::Less;
        }
        let (adot, bdot) = (a.len() == 1, b.len() == 1);
        if adot || bdot {
            return bdot.cmp(&adot);
        }
        let (adotdot, bdotdot) = (a == b"..", b == b"..");
        if adotdot || bdotdot {
            return bdotdot.cmp(&adotdot);
        }
    } else if b[0] == b'.' {
        return Ordering::Greater;
    }

    let a_prefix = prefix_len(a);
    let b_prefix = prefix_len(b);
    let one_pass_only = a_prefix == a.len() && b_prefix == b.len();
    let result = verrevcmp(&a[..a_prefix], &b[..b_prefix]);
    if result != Ordering::Equal || one_pass_only {
        result
    } else {
        verrevcmp(a, b)
    }
}

/// Length of `s` without its trailing `(\.[A-Za-z~][A-Za-z0-9~]*)*` suffix.
fn prefix_len(s: &[u8]) -> usize {
    let n = s.len();
    let mut prefix = 0;
    let mut i = 0;
    while i < n {
        i += 1;
        prefix = i;
        while i + 1 < n && s[i] == b'.' && (s[i + 1].is_ascii_alphabetic() || s[i + 1] == b'~') {
            i += 2;
            while i < n && (s[i].is_ascii_alphanumeric() || s[i] == b'~') {
                i += 1;
            }
        }
    }
    prefix
}

/// Sort weight of the byte at `pos`; the end of the string weighs -1.
fn order(s: &[u8], pos: usize) -> i32 {
    match s.get(pos).copied() {
        None => -1,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(b'~') => -2,
        Some(c) => i32::from(c) + 256,
    }
}

fn verrevcmp(s1: &[u8], s2: &[u8]) -> Ordering {
    let (mut p1, mut p2) = (0, 0);
    let digit_at = |s: &[u8], p: usize| s.get(p).is_some_and(u8::is_ascii_digit);

    while p1 < s1.len() || p2 < s2.len() {
        while (p1 < s1.len() && !digit_at(s1, p1)) || (p2 < s2.len() && !digit_at(s2, p2)) {
            let (c1, c2) = (order(s1, p1), order(s2, p2));
            if c1 != c2 {
                return c1.cmp(&c2);
            }
            p1 += 1;
            p2 += 1;
        }
        while s1.get(p1) == Some(&b'0') {
            p1 += 1;
        }
        while s2.get(p2) == Some(&b'0') {
            p2 += 1;
        }
        let mut first_diff = Ordering::Equal;
        while digit_at(s1, p1) && digit_at(s2, p2) {
            if first_diff == Ordering::Equal {
                first_diff = s1[p1].cmp(&s2[p2]);
            }
            p1 += 1;
            p2 += 1;
        }
        if digit_at(s1, p1) {
            return Ordering::Greater;
        }
        if digit_at(s2, p2) {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }
    Ordering::Equal
}
