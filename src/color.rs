//! `LS_COLORS` parsing and per-entry colour selection.

use std::collections::HashMap;

use tracing::debug;

use crate::entry::{
    Entry, FileType, MetadataSnapshot, S_IFMT, S_ISGID, S_ISUID, S_ISVTX, S_IWOTH, S_IXUGO,
};

/// Escape that ends a coloured run.
pub const RESET: &str = "\x1b[0m";

const DEFAULTS: &[(&str, &str)] = &[
    ("rs", "0"),
    ("di", "01;34"),
    ("ln", "01;36"),
    ("mh", "00"),
    ("pi", "33"),
    ("so", "01;35"),
    ("do", "01;35"),
    ("bd", "01;33"),
    ("cd", "01;33"),
    ("ex", "01;32"),
    ("su", "37;41"),
    ("sg", "30;43"),
    ("st", "37;44"),
    ("ow", "34;42"),
    ("tw", "30;42"),
];

const KNOWN_KEYS: &[&str] = &[
    "lc", "rc", "ec", "rs", "no", "fi", "di", "ln", "pi", "so", "bd", "cd", "mi", "or", "ex",
    "do", "su", "sg", "st", "ow", "tw", "ca", "mh", "cl",
];

/// Colour assignments for file types and name suffixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    codes: HashMap<String, String>,
    suffixes: Vec<(String, String)>,
    link_as_target: bool,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            codes: DEFAULTS
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            suffixes: Vec::new(),
            link_as_target: false,
        }
    }
}

impl Palette {
    /// Built-in colours overlaid with an `LS_COLORS` value. Unparsable items are skipped.
    pub fn parse(spec: &str) -> Self {
        let mut palette = Palette::default();
        for item in spec.split(':').filter(|s| !s.is_empty()) {
            let Some((key, value)) = item.split_once('=') else {
                debug!(item, "ignoring LS_COLORS item without '='");
                continue;
            };
            if let Some(suffix) = key.strip_prefix('*') {
                palette.suffixes.push((suffix.to_string(), value.to_string()));
            } else if key == "ln" && value == "target" {
                palette.link_as_target = true;
            } else if KNOWN_KEYS.contains(&key) {
                palette.codes.insert(key.to_string(), value.to_string());
            } else {
                debug!(key, "ignoring unknown LS_COLORS key");
            }
        }
        palette
    }

    /// Whether `key` has a non-trivial colour.
    pub fn is_colored(&self, key: &str) -> bool {
        self.codes
            .get(key)
            .is_some_and(|v| !v.is_empty() && v != "0" && v != "00")
    }

    fn code(&self, key: &str) -> Option<&str> {
        self.codes
            .get(key)
            .map(String::as_str)
            .filter(|_| self.is_colored(key))
    }

    /// Symlinks with a resolvable target must be followed to pick `or` or a target colour.
    pub fn needs_link_mode(&self) -> bool {
        self.link_as_target || self.is_colored("or") || self.is_colored("mi")
    }

    /// SGR parameters for the entry's name, if it is coloured at all.
    pub fn style_for(&self, entry: &Entry) -> Option<&str> {
        let (file_type, mode) = if entry.file_type == FileType::Symlink && self.link_as_target {
            match entry.link_mode {
                Some(m) => (FileType::from_mode(m), Some(m)),
                None => (FileType::Symlink, None),
            }
        } else {
            (entry.file_type, entry.metadata.as_ref().map(|md| md.mode))
        };

        if entry.metadata.is_none() && entry.file_type != FileType::Symlink {
            if let Some(code) = self.code("mi") {
                return Some(code);
            }
        }

        let key = match file_type {
            FileType::Regular => {
                let mode = mode.unwrap_or(0);
                let nlink = entry.metadata.as_ref().map_or(1, |md| md.nlink);
                if mode & S_ISUID != 0 && self.is_colored("su") {
                    "su"
                } else if mode & S_ISGID != 0 && self.is_colored("sg") {
                    "sg"
                } else if entry.has_capability && self.is_colored("ca") {
                    "ca"
                } else if mode & S_IXUGO != 0 && self.is_colored("ex") {
                    "ex"
                } else if nlink > 1 && self.is_colored("mh") {
                    "mh"
                } else {
                    return self.suffix_style(entry).or_else(|| self.code("fi"));
                }
            }
            FileType::Directory | FileType::ArgDirectory => {
                let mode = mode.unwrap_or(0);
                let sticky = mode & S_ISVTX != 0;
                let other_writable = mode & S_IWOTH != 0;
                if sticky && other_writable && self.is_colored("tw") {
                    "tw"
                } else if other_writable && self.is_colored("ow") {
                    "ow"
                } else if sticky && self.is_colored("st") {
                    "st"
                } else {
                    "di"
                }
            }
            FileType::Symlink => {
                if entry.link_target.is_some()
                    && entry.link_mode.is_none()
                    && self.is_colored("or")
                {
                    "or"
                } else {
                    "ln"
                }
            }
            FileType::Fifo => "pi",
            FileType::Socket => "so",
            FileType::BlockDevice => "bd",
            FileType::CharDevice => "cd",
            FileType::Whiteout | FileType::Unknown => "or",
        };
        self.code(key)
    }

    /// Colour for a symlink target shown after `->` in the long format.
    pub fn style_for_target(&self, entry: &Entry) -> Option<&str> {
        match entry.link_mode {
            Some(mode) if mode & S_IFMT != 0 => {
                let name = entry.link_target.clone().unwrap_or_default();
                let mut target = Entry::new(name, FileType::from_mode(mode));
                target.metadata = Some(MetadataSnapshot {
                    mode,
                    nlink: 1,
                    ..MetadataSnapshot::default()
                });
                self.style_for(&target)
            }
            Some(_) => None,
            None => self.code("mi").or_else(|| self.code("or")),
        }
    }

    fn suffix_style(&self, entry: &Entry) -> Option<&str> {
        let name = entry.name_bytes();
        let exact = self
            .suffixes
            .iter()
            .rev()
            .find(|(suffix, _)| name.ends_with(suffix.as_bytes()));
        let matched = exact.or_else(|| {
            self.suffixes.iter().rev().find(|(suffix, _)| {
                let s = suffix.as_bytes();
                name.len() >= s.len() && name[name.len() - s.len()..].eq_ignore_ascii_case(s)
            })
        });
        matched
            .map(|(_, code)| code.as_str())
            .filter(|code| !code.is_empty())
    }
}

/// Opening escape for a set of SGR parameters.
pub fn start(code: &str) -> String {
    format!("\x1b[{}m", code)
}
