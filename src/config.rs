//! Resolved listing configuration.
//!
//! [`ListingOptions`] is what the rest of the crate reads; it is built from the
//! parsed command line and an [`Environment`] snapshot by [`crate::cli::Args::options`].

use globset::GlobSet;

use crate::color::Palette;
use crate::compare::SortSpec;
use crate::entry::TimeField;
use crate::quote::QuotingOptions;

/// Output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Long,
    OnePerLine,
    /// Multi-column, filled top to bottom.
    Vertical,
    /// Multi-column, filled left to right.
    Horizontal,
    Commas,
}

/// Suffix appended to names to show their type. Ordered by how much they show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndicatorStyle {
    None,
    Slash,
    FileType,
    Classify,
}

/// When symlinks are followed to their targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dereference {
    Never,
    CommandLineArguments,
    CommandLineSymlinkToDir,
    Always,
}

/// Which dot-files are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hidden {
    /// Skip every name starting with `.`.
    Default,
    /// `-A`: skip only `.` and `..`.
    AlmostAll,
    /// `-a`: list everything.
    All,
}

/// How sizes and block counts are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnits {
    Plain,
    /// Powers of 1024 (`-h`).
    Binary,
    /// Powers of 1000 (`--si`).
    Decimal,
}

/// Timestamp layout for the long format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeStyle {
    Locale,
    Iso,
    LongIso,
    FullIso,
    /// strftime formats for old and recent files.
    Custom { old: String, recent: String },
}

/// Environment values consulted while resolving options.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub columns: Option<String>,
    pub tabsize: Option<String>,
    pub ls_colors: Option<String>,
    pub time_style: Option<String>,
    pub quoting_style: Option<String>,
    pub no_color: bool,
    /// Width reported by the terminal, when stdout is one.
    pub terminal_width: Option<u16>,
}

impl Environment {
    /// Snapshot the process environment. The terminal is queried only if `stdout_tty`.
    pub fn capture(stdout_tty: bool) -> Self {
        let var = |key: &str| std::env::var(key).ok();
        let terminal_width = if stdout_tty {
            crossterm::terminal::size().ok().map(|(cols, _)| cols)
        } else {
            None
        };
        Environment {
            columns: var("COLUMNS"),
            tabsize: var("TABSIZE"),
            ls_colors: var("LS_COLORS"),
            time_style: var("TIME_STYLE"),
            quoting_style: var("QUOTING_STYLE"),
            no_color: std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()),
            terminal_width,
        }
    }
}

/// Everything a listing session needs to know about the requested output.
#[derive(Debug, Clone)]
pub struct ListingOptions {
    pub format: Format,
    pub sort: SortSpec,
    /// Timestamp shown in the long format.
    pub time_field: TimeField,
    pub hidden: Hidden,
    pub ignore: GlobSet,
    pub hide: GlobSet,
    /// `-d`: list directories themselves, not their contents.
    pub immediate_dirs: bool,
    pub recursive: bool,
    pub dereference: Dereference,
    pub indicator: IndicatorStyle,
    pub print_inode: bool,
    pub print_block_size: bool,
    pub print_owner: bool,
    pub print_group: bool,
    pub print_author: bool,
    pub print_scontext: bool,
    pub numeric_ids: bool,
    pub size_units: SizeUnits,
    /// Zero means no limit.
    pub line_length: usize,
    /// Zero disables tabs.
    pub tab_size: usize,
    pub quoting: QuotingOptions,
    pub color: Option<Palette>,
    pub hyperlink: bool,
    pub time_style: TimeStyle,
}

impl Default for ListingOptions {
    fn default() -> Self {
        ListingOptions {
            format: Format::OnePerLine,
            sort: SortSpec::default(),
            time_field: TimeField::Modification,
            hidden: Hidden::Default,
            ignore: GlobSet::empty(),
            hide: GlobSet::empty(),
            immediate_dirs: false,
            recursive: false,
            dereference: Dereference::CommandLineSymlinkToDir,
            indicator: IndicatorStyle::None,
            print_inode: false,
            print_block_size: false,
            print_owner: true,
            print_group: true,
            print_author: false,
            print_scontext: false,
            numeric_ids: false,
            size_units: SizeUnits::Plain,
            line_length: 80,
            tab_size: 8,
            quoting: QuotingOptions::default(),
            color: None,
            hyperlink: false,
            time_style: TimeStyle::Locale,
        }
    }
}

impl ListingOptions {
    pub fn is_multi_column(&self) -> bool {
        matches!(self.format, Format::Vertical | Format::Horizontal)
    }

    /// Any field shown needs a full `stat`.
    pub fn format_needs_stat(&self) -> bool {
        use crate::compare::SortKey;

        self.format == Format::Long
            || matches!(self.sort.key, SortKey::Size | SortKey::Time)
            || self.print_block_size
            || self.print_scontext
    }

    /// Only the file type is needed; a `d_type` hint may be enough.
    pub fn format_needs_type(&self) -> bool {
        !self.format_needs_stat()
            && (self.recursive
                || self.color.is_some()
                || self.indicator != IndicatorStyle::None
                || self.sort.dirs_first)
    }

    /// Symlink targets must be followed to decide colour, indicator or
    /// directory grouping.
    pub fn check_symlink_mode(&self) -> bool {
        self.color.as_ref().is_some_and(Palette::needs_link_mode)
            || self.indicator >= IndicatorStyle::FileType
            || self.sort.dirs_first
    }

    /// Directory colours depend on the sticky and other-writable bits.
    pub fn color_needs_dir_mode(&self) -> bool {
        self.color
            .as_ref()
            .is_some_and(|p| p.is_colored("tw") || p.is_colored("ow") || p.is_colored("st"))
    }

    /// Regular-file colours or `-F` need the mode bits.
    pub fn needs_regular_mode(&self) -> bool {
        self.indicator == IndicatorStyle::Classify
            || self.color.as_ref().is_some_and(|p| {
                ["ex", "su", "sg", "ca", "mh"].iter().any(|key| p.is_colored(key))
            })
    }

    pub fn needs_capability(&self) -> bool {
        self.color.as_ref().is_some_and(|p| p.is_colored("ca"))
    }

    /// Names are padded so quoted and unquoted names line up.
    pub fn align_quotes(&self) -> bool {
        self.quoting.style.has_variable_outer_quotes()
            && (self.format == Format::Long || self.is_multi_column())
    }

    pub fn wants_birth_time(&self) -> bool {
        self.time_field == TimeField::Birth || self.sort.time_field == TimeField::Birth
    }
}
