//! Name collation: raw byte order and a locale-style dictionary order.

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fmt;
use std::os::unix::ffi::OsStrExt;

use crate::quote::{quote_name, QuotingOptions, QuotingStyle};

/// A comparison the locale collation could not perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollationError {
    pub left: Vec<u8>,
    pub right: Vec<u8>,
    pub reason: &'static str,
}

impl fmt::Display for CollationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot compare file names {} and {}: {}",
            quoted(&self.left),
            quoted(&self.right),
            self.reason
        )
    }
}

/// Names in messages keep undecodable bytes visible as `$'\NNN'` escapes.
fn quoted(name: &[u8]) -> String {
    let opts = QuotingOptions {
        style: QuotingStyle::ShellEscapeAlways,
        hide_control: false,
    };
    quote_name(OsStr::from_bytes(name), &opts).as_lossy()
}

impl std::error::Error for CollationError {}

/// Orders two byte strings, or fails the way a locale collation call can.
pub trait Collator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering, CollationError>;
}

/// `strcmp` order. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteCollator;

impl Collator for ByteCollator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering, CollationError> {
        Ok(a.cmp(b))
    }
}

/// Collation selected from `LC_ALL` / `LC_COLLATE` / `LANG`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleCollator {
    dictionary: bool,
}

impl LocaleCollator {
    /// Resolve the collation locale from the process environment.
    pub fn from_env() -> Self {
        let lookup = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        let locale = lookup("LC_ALL")
            .or_else(|| lookup("LC_COLLATE"))
            .or_else(|| lookup("LANG"));
        Self::for_locale(locale.as_deref())
    }

    /// `None`, `C`, `POSIX` and `C.*` collate bytewise; anything else uses dictionary order.
    pub fn for_locale(locale: Option<&str>) -> Self {
        let dictionary = match locale {
            None => false,
            Some(name) => !(name == "C" || name == "POSIX" || name.starts_with("C.")),
        };
        LocaleCollator { dictionary }
    }

    pub fn is_bytewise(&self) -> bool {
        !self.dictionary
    }
}

impl Collator for LocaleCollator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering, CollationError> {
        if !self.dictionary {
            return Ok(a.cmp(b));
        }
        let fail = || CollationError {
            left: a.to_vec(),
            right: b.to_vec(),
            reason: "Invalid or incomplete multibyte or wide character",
        };
        let sa = std::str::from_utf8(a).map_err(|_| fail())?;
        let sb = std::str::from_utf8(b).map_err(|_| fail())?;
        Ok(dictionary_order(sa, sb).then_with(|| a.cmp(b)))
    }
}

/// Alphanumerics case-folded with punctuation ignored, then case-folded full text.
fn dictionary_order(a: &str, b: &str) -> Ordering {
    let primary = |s: &'_ str| {
        s.chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect::<Vec<char>>()
    };
    let secondary = |s: &'_ str| s.chars().flat_map(char::to_lowercase).collect::<Vec<char>>();
    primary(a)
        .cmp(&primary(b))
        .then_with(|| secondary(a).cmp(&secondary(b)))
}
