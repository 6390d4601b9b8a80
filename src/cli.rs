use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;

use crate::color::Palette;
use crate::compare::{SortKey, SortSpec};
use crate::config::{
    Dereference, Environment, Format, Hidden, IndicatorStyle, ListingOptions, SizeUnits, TimeStyle,
};
use crate::diag::Diagnostics;
use crate::entry::TimeField;
use crate::long::is_valid_time_format;
use crate::quote::{QuotingOptions, QuotingStyle};

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("LSGRID_TARGET"), ")");

#[derive(Parser, Debug, Clone)]
#[command(
    name = "lsgrid",
    version,
    long_version = LONG_VERSION,
    about = "List directory contents in width-fitted columns",
    disable_help_flag = true,
    args_override_self = true
)]
pub struct Args {
    /// Files and directories to list (default: current directory)
    pub paths: Vec<PathBuf>,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Do not ignore entries starting with .
    #[arg(short = 'a', long = "all", overrides_with = "almost_all")]
    pub all: bool,

    /// Do not list implied . and ..
    #[arg(short = 'A', long = "almost-all", overrides_with = "all")]
    pub almost_all: bool,

    /// Do not list implied entries ending with ~
    #[arg(short = 'B', long = "ignore-backups")]
    pub ignore_backups: bool,

    /// Do not list implied entries matching shell PATTERN (repeatable)
    #[arg(short = 'I', long = "ignore", value_name = "PATTERN", action = ArgAction::Append)]
    pub ignore: Vec<String>,

    /// Do not list implied entries matching shell PATTERN (overridden by -a or -A)
    #[arg(long = "hide", value_name = "PATTERN", action = ArgAction::Append)]
    pub hide: Vec<String>,

    /// List directories themselves, not their contents
    #[arg(short = 'd', long = "directory")]
    pub directory: bool,

    /// List subdirectories recursively
    #[arg(short = 'R', long = "recursive")]
    pub recursive: bool,

    /// List all entries in directory order; disables -l, -s and colour
    #[arg(short = 'f')]
    pub unsorted_all: bool,

    /// Use a long listing format
    #[arg(
        short = 'l',
        overrides_with_all = ["one_per_line", "columns", "across", "commas", "format"]
    )]
    pub long: bool,

    /// List one file per line
    #[arg(short = '1', overrides_with_all = ["long", "columns", "across", "commas", "format"])]
    pub one_per_line: bool,

    /// List entries by columns
    #[arg(short = 'C', overrides_with_all = ["long", "one_per_line", "across", "commas", "format"])]
    pub columns: bool,

    /// List entries by lines instead of by columns
    #[arg(
        short = 'x',
        overrides_with_all = ["long", "one_per_line", "columns", "commas", "format"]
    )]
    pub across: bool,

    /// Fill width with a comma separated list of entries
    #[arg(
        short = 'm',
        overrides_with_all = ["long", "one_per_line", "columns", "across", "format"]
    )]
    pub commas: bool,

    /// Output layout
    #[arg(
        long = "format",
        value_enum,
        value_name = "WORD",
        overrides_with_all = ["long", "one_per_line", "columns", "across", "commas"]
    )]
    pub format: Option<FormatArg>,

    /// Like -l, but do not list owner
    #[arg(short = 'g')]
    pub no_owner: bool,

    /// Like -l, but do not list group information
    #[arg(short = 'o')]
    pub long_no_group: bool,

    /// In a long listing, don't print group names
    #[arg(short = 'G', long = "no-group")]
    pub no_group: bool,

    /// Like -l, but list numeric user and group IDs
    #[arg(short = 'n', long = "numeric-uid-gid")]
    pub numeric: bool,

    /// With -l, print the author of each file
    #[arg(long = "author")]
    pub author: bool,

    /// Print any security context of each file
    #[arg(short = 'Z', long = "context")]
    pub context: bool,

    /// Print the index number of each file
    #[arg(short = 'i', long = "inode")]
    pub inode: bool,

    /// Print the allocated size of each file, in blocks
    #[arg(short = 's', long = "size")]
    pub size: bool,

    /// With -l and -s, print sizes like 1K 234M 2G
    #[arg(short = 'h', long = "human-readable", overrides_with = "si")]
    pub human: bool,

    /// Like -h, but use powers of 1000 not 1024
    #[arg(long = "si", overrides_with = "human")]
    pub si: bool,

    /// Default to 1024-byte blocks for file system usage
    #[arg(short = 'k', long = "kibibytes")]
    pub kibibytes: bool,

    /// Like -l --time-style=full-iso
    #[arg(long = "full-time")]
    pub full_time: bool,

    /// Time/date format with -l: full-iso, long-iso, iso, locale, or +FORMAT
    #[arg(long = "time-style", value_name = "TIME_STYLE")]
    pub time_style: Option<String>,

    /// Set output width to COLS; 0 means no limit
    #[arg(short = 'w', long = "width", value_name = "COLS")]
    pub width: Option<usize>,

    /// Assume tab stops at each COLS instead of 8
    #[arg(short = 'T', long = "tabsize", value_name = "COLS")]
    pub tabsize: Option<usize>,

    /// Append indicator (one of */=>@|) to entries
    #[arg(
        short = 'F',
        long = "classify",
        overrides_with_all = ["slash", "file_type", "indicator_style"]
    )]
    pub classify: bool,

    /// Append / indicator to directories
    #[arg(short = 'p', overrides_with_all = ["classify", "file_type", "indicator_style"])]
    pub slash: bool,

    /// Likewise, except do not append '*'
    #[arg(long = "file-type", overrides_with_all = ["classify", "slash", "indicator_style"])]
    pub file_type: bool,

    /// Append indicator with style WORD to entry names
    #[arg(
        long = "indicator-style",
        value_enum,
        value_name = "WORD",
        overrides_with_all = ["classify", "slash", "file_type"]
    )]
    pub indicator_style: Option<IndicatorArg>,

    /// Print entry names without quoting
    #[arg(
        short = 'N',
        long = "literal",
        overrides_with_all = ["escape", "quote_name", "quoting_style"]
    )]
    pub literal: bool,

    /// Print C-style escapes for nongraphic characters
    #[arg(
        short = 'b',
        long = "escape",
        overrides_with_all = ["literal", "quote_name", "quoting_style"]
    )]
    pub escape: bool,

    /// Enclose entry names in double quotes
    #[arg(
        short = 'Q',
        long = "quote-name",
        overrides_with_all = ["literal", "escape", "quoting_style"]
    )]
    pub quote_name: bool,

    /// Use quoting style WORD for entry names
    #[arg(
        long = "quoting-style",
        value_enum,
        value_name = "WORD",
        overrides_with_all = ["literal", "escape", "quote_name"]
    )]
    pub quoting_style: Option<QuotingArg>,

    /// Print ? instead of nongraphic characters
    #[arg(short = 'q', long = "hide-control-chars", overrides_with = "show_control_chars")]
    pub hide_control_chars: bool,

    /// Show nongraphic characters as-is
    #[arg(long = "show-control-chars", overrides_with = "hide_control_chars")]
    pub show_control_chars: bool,

    /// Colorize the output: always, auto, or never
    #[arg(
        long = "color",
        value_enum,
        value_name = "WHEN",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "always"
    )]
    pub color: Option<When>,

    /// Hyperlink file names: always, auto, or never
    #[arg(
        long = "hyperlink",
        value_enum,
        value_name = "WHEN",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "always"
    )]
    pub hyperlink: Option<When>,

    /// Reverse order while sorting
    #[arg(short = 'r', long = "reverse")]
    pub reverse: bool,

    /// Sort by file size, largest first
    #[arg(
        short = 'S',
        overrides_with_all = ["sort_time", "unsorted", "sort_version", "sort_extension", "sort"]
    )]
    pub sort_size: bool,

    /// Sort by time, newest first
    #[arg(
        short = 't',
        overrides_with_all = ["sort_size", "unsorted", "sort_version", "sort_extension", "sort"]
    )]
    pub sort_time: bool,

    /// Do not sort; list entries in directory order
    #[arg(
        short = 'U',
        overrides_with_all = ["sort_size", "sort_time", "sort_version", "sort_extension", "sort"]
    )]
    pub unsorted: bool,

    /// Natural sort of (version) numbers within text
    #[arg(
        short = 'v',
        overrides_with_all = ["sort_size", "sort_time", "unsorted", "sort_extension", "sort"]
    )]
    pub sort_version: bool,

    /// Sort alphabetically by entry extension
    #[arg(
        short = 'X',
        overrides_with_all = ["sort_size", "sort_time", "unsorted", "sort_version", "sort"]
    )]
    pub sort_extension: bool,

    /// Sort by WORD instead of name
    #[arg(
        long = "sort",
        value_enum,
        value_name = "WORD",
        overrides_with_all = [
            "sort_size",
            "sort_time",
            "unsorted",
            "sort_version",
            "sort_extension",
        ]
    )]
    pub sort: Option<SortArg>,

    /// Select which timestamp is shown or sorted on
    #[arg(long = "time", value_enum, value_name = "WORD", overrides_with_all = ["ctime", "atime"])]
    pub time: Option<TimeArg>,

    /// Use time of last status change
    #[arg(short = 'c', overrides_with_all = ["time", "atime"])]
    pub ctime: bool,

    /// Use time of last access
    #[arg(short = 'u', overrides_with_all = ["time", "ctime"])]
    pub atime: bool,

    /// Group directories before files
    #[arg(long = "group-directories-first")]
    pub group_directories_first: bool,

    /// Show information for the file symbolic links reference
    #[arg(
        short = 'L',
        long = "dereference",
        overrides_with_all = ["dereference_command_line", "dereference_command_line_symlink_to_dir"]
    )]
    pub dereference: bool,

    /// Follow symbolic links listed on the command line
    #[arg(
        short = 'H',
        long = "dereference-command-line",
        overrides_with_all = ["dereference", "dereference_command_line_symlink_to_dir"]
    )]
    pub dereference_command_line: bool,

    /// Follow each command line symbolic link that points to a directory
    #[arg(
        long = "dereference-command-line-symlink-to-dir",
        overrides_with_all = ["dereference", "dereference_command_line"]
    )]
    pub dereference_command_line_symlink_to_dir: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    #[value(alias = "horizontal")]
    Across,
    Commas,
    #[value(alias = "verbose")]
    Long,
    SingleColumn,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    None,
    Name,
    Size,
    Time,
    Version,
    Extension,
    Width,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimeArg {
    #[value(aliases = ["access", "use"])]
    Atime,
    #[value(alias = "status")]
    Ctime,
    #[value(alias = "modification")]
    Mtime,
    #[value(alias = "creation")]
    Birth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndicatorArg {
    None,
    Slash,
    FileType,
    Classify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QuotingArg {
    Literal,
    Shell,
    ShellAlways,
    ShellEscape,
    ShellEscapeAlways,
    C,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum When {
    #[value(aliases = ["yes", "force"])]
    Always,
    #[value(aliases = ["no", "none"])]
    Never,
    #[value(aliases = ["tty", "if-tty"])]
    Auto,
}

impl When {
    fn resolve(self, tty: bool) -> bool {
        match self {
            When::Always => true,
            When::Never => false,
            When::Auto => tty,
        }
    }
}

impl From<QuotingArg> for QuotingStyle {
    fn from(arg: QuotingArg) -> Self {
        match arg {
            QuotingArg::Literal => QuotingStyle::Literal,
            QuotingArg::Shell => QuotingStyle::Shell,
            QuotingArg::ShellAlways => QuotingStyle::ShellAlways,
            QuotingArg::ShellEscape => QuotingStyle::ShellEscape,
            QuotingArg::ShellEscapeAlways => QuotingStyle::ShellEscapeAlways,
            QuotingArg::C => QuotingStyle::C,
            QuotingArg::Escape => QuotingStyle::Escape,
        }
    }
}

impl From<TimeArg> for TimeField {
    fn from(arg: TimeArg) -> Self {
        match arg {
            TimeArg::Atime => TimeField::Access,
            TimeArg::Ctime => TimeField::Change,
            TimeArg::Mtime => TimeField::Modification,
            TimeArg::Birth => TimeField::Birth,
        }
    }
}

impl Args {
    /// Enforce invariants after parsing.
    pub fn validated(mut self) -> Self {
        // -f implies -a and -U and switches off -l, -s and colour
        if self.unsorted_all {
            self.all = true;
            self.almost_all = false;
            self.unsorted = true;
            self.sort = None;
            self.size = false;
            self.color = Some(When::Never);
            self.hyperlink = Some(When::Never);
        }
        if self.full_time && self.time_style.is_none() {
            self.time_style = Some("full-iso".to_string());
        }
        self
    }

    fn explicit_format(&self) -> Option<Format> {
        if self.long {
            Some(Format::Long)
        } else if self.one_per_line {
            Some(Format::OnePerLine)
        } else if self.columns {
            Some(Format::Vertical)
        } else if self.across {
            Some(Format::Horizontal)
        } else if self.commas {
            Some(Format::Commas)
        } else {
            self.format.map(|f| match f {
                FormatArg::Across => Format::Horizontal,
                FormatArg::Commas => Format::Commas,
                FormatArg::Long => Format::Long,
                FormatArg::SingleColumn => Format::OnePerLine,
                FormatArg::Vertical => Format::Vertical,
            })
        }
    }

    fn explicit_sort(&self) -> Option<SortKey> {
        if self.unsorted {
            Some(SortKey::None)
        } else if self.sort_size {
            Some(SortKey::Size)
        } else if self.sort_time {
            Some(SortKey::Time)
        } else if self.sort_version {
            Some(SortKey::Version)
        } else if self.sort_extension {
            Some(SortKey::Extension)
        } else {
            self.sort.map(|s| match s {
                SortArg::None => SortKey::None,
                SortArg::Name => SortKey::Name,
                SortArg::Size => SortKey::Size,
                SortArg::Time => SortKey::Time,
                SortArg::Version => SortKey::Version,
                SortArg::Extension => SortKey::Extension,
                SortArg::Width => SortKey::Width,
            })
        }
    }

    fn explicit_time(&self) -> Option<TimeField> {
        if self.ctime {
            Some(TimeField::Change)
        } else if self.atime {
            Some(TimeField::Access)
        } else {
            self.time.map(TimeField::from)
        }
    }

    fn explicit_quoting(&self) -> Option<QuotingStyle> {
        if self.literal {
            Some(QuotingStyle::Literal)
        } else if self.escape {
            Some(QuotingStyle::Escape)
        } else if self.quote_name {
            Some(QuotingStyle::C)
        } else {
            self.quoting_style.map(QuotingStyle::from)
        }
    }

    fn indicator(&self) -> IndicatorStyle {
        if self.classify {
            IndicatorStyle::Classify
        } else if self.slash {
            IndicatorStyle::Slash
        } else if self.file_type {
            IndicatorStyle::FileType
        } else {
            match self.indicator_style {
                Some(IndicatorArg::Slash) => IndicatorStyle::Slash,
                Some(IndicatorArg::FileType) => IndicatorStyle::FileType,
                Some(IndicatorArg::Classify) => IndicatorStyle::Classify,
                Some(IndicatorArg::None) | None => IndicatorStyle::None,
            }
        }
    }

    /// Resolve flags and environment into the options a listing runs with.
    ///
    /// Unusable environment values are reported on `diag` and ignored.
    pub fn options(
        &self,
        env: &Environment,
        stdout_tty: bool,
        diag: &mut Diagnostics,
    ) -> Result<ListingOptions> {
        let implied_long = self.no_owner || self.long_no_group || self.numeric || self.full_time;
        let mut format = self
            .explicit_format()
            .or(implied_long.then_some(Format::Long))
            .unwrap_or(if stdout_tty { Format::Vertical } else { Format::OnePerLine });
        if self.unsorted_all && format == Format::Long {
            format = if stdout_tty { Format::Vertical } else { Format::OnePerLine };
        }

        let explicit_time = self.explicit_time();
        let time_field = explicit_time.unwrap_or_default();
        let key = match self.explicit_sort() {
            Some(key) => key,
            None if explicit_time.is_some() && format != Format::Long => SortKey::Time,
            None => SortKey::Name,
        };
        let sort = SortSpec {
            key,
            time_field,
            reverse: self.reverse,
            dirs_first: self.group_directories_first,
        };

        let hidden = if self.all {
            Hidden::All
        } else if self.almost_all {
            Hidden::AlmostAll
        } else {
            Hidden::Default
        };

        let mut ignore_patterns = self.ignore.clone();
        if self.ignore_backups {
            ignore_patterns.push("*~".to_string());
            ignore_patterns.push(".*~".to_string());
        }
        let ignore = build_glob_set(&ignore_patterns).context("invalid --ignore pattern")?;
        let hide = build_glob_set(&self.hide).context("invalid --hide pattern")?;

        let line_length = match self.width {
            Some(w) => w,
            None => match env.columns.as_deref().map(str::parse::<usize>) {
                Some(Ok(w)) => w,
                Some(Err(_)) => {
                    if let Some(raw) = &env.columns {
                        diag.note(format_args!(
                            "ignoring invalid width in environment variable COLUMNS: '{}'",
                            raw
                        ));
                    }
                    env.terminal_width.map_or(80, usize::from)
                }
                None => env.terminal_width.map_or(80, usize::from),
            },
        };

        let tab_size = match self.tabsize {
            Some(t) => t,
            None => match env.tabsize.as_deref().map(str::parse::<usize>) {
                Some(Ok(t)) => t,
                Some(Err(_)) => {
                    if let Some(raw) = &env.tabsize {
                        diag.note(format_args!(
                            "ignoring invalid tab size in environment variable TABSIZE: '{}'",
                            raw
                        ));
                    }
                    8
                }
                None => 8,
            },
        };

        let env_quoting = env.quoting_style.as_deref().and_then(|raw| {
            let parsed = QuotingArg::from_str(raw, false).ok().map(QuotingStyle::from);
            if parsed.is_none() {
                diag.note(format_args!(
                    "ignoring invalid value of environment variable QUOTING_STYLE: '{}'",
                    raw
                ));
            }
            parsed
        });
        let style = self
            .explicit_quoting()
            .or(env_quoting)
            .unwrap_or(if stdout_tty { QuotingStyle::ShellEscape } else { QuotingStyle::Literal });
        let hide_control = if self.hide_control_chars {
            true
        } else if self.show_control_chars {
            false
        } else {
            stdout_tty
        };

        let color_on = match self.color {
            Some(When::Auto) => stdout_tty && !env.no_color,
            Some(when) => when.resolve(stdout_tty),
            None => false,
        };
        let color = color_on.then(|| Palette::parse(env.ls_colors.as_deref().unwrap_or("")));
        let hyperlink = self.hyperlink.is_some_and(|w| w.resolve(stdout_tty));

        let indicator = self.indicator();
        let dereference = if self.dereference {
            Dereference::Always
        } else if self.dereference_command_line {
            Dereference::CommandLineArguments
        } else if self.dereference_command_line_symlink_to_dir {
            Dereference::CommandLineSymlinkToDir
        } else if self.directory
            || indicator == IndicatorStyle::Classify
            || format == Format::Long
        {
            Dereference::Never
        } else {
            Dereference::CommandLineSymlinkToDir
        };

        let size_units = if self.human {
            SizeUnits::Binary
        } else if self.si {
            SizeUnits::Decimal
        } else {
            SizeUnits::Plain
        };

        let raw_style = self.time_style.clone().or_else(|| env.time_style.clone());
        let time_style = match raw_style {
            Some(raw) => parse_time_style(&raw)?,
            None => TimeStyle::Locale,
        };

        Ok(ListingOptions {
            format,
            sort,
            time_field,
            hidden,
            ignore,
            hide,
            immediate_dirs: self.directory,
            recursive: self.recursive,
            dereference,
            indicator,
            print_inode: self.inode,
            print_block_size: self.size,
            print_owner: !self.no_owner,
            print_group: !(self.no_group || self.long_no_group),
            print_author: self.author,
            print_scontext: self.context,
            numeric_ids: self.numeric,
            size_units,
            line_length,
            tab_size,
            quoting: QuotingOptions { style, hide_control },
            color,
            hyperlink,
            time_style,
        })
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).with_context(|| format!("bad pattern '{}'", pattern))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Parse a `--time-style` / `TIME_STYLE` value.
pub fn parse_time_style(raw: &str) -> Result<TimeStyle> {
    let style = raw.strip_prefix("posix-").unwrap_or(raw);
    if let Some(formats) = style.strip_prefix('+') {
        let (old, recent) = match formats.split_once('\n') {
            Some((old, recent)) => (old.to_string(), recent.to_string()),
            None => (formats.to_string(), formats.to_string()),
        };
        if !is_valid_time_format(&old) || !is_valid_time_format(&recent) {
            bail!("invalid time style format '{}'", formats);
        }
        return Ok(TimeStyle::Custom { old, recent });
    }
    Ok(match style {
        "full-iso" => TimeStyle::FullIso,
        "long-iso" => TimeStyle::LongIso,
        "iso" => TimeStyle::Iso,
        "locale" => TimeStyle::Locale,
        other => bail!("invalid argument '{}' for 'time style'", other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(argv: &[&str], tty: bool) -> ListingOptions {
        let argv = std::iter::once("lsgrid").chain(argv.iter().copied());
        let args = Args::parse_from(argv).validated();
        let mut diag = Diagnostics::capturing();
        args.options(&Environment::default(), tty, &mut diag).unwrap()
    }

    #[test]
    fn default_format_depends_on_tty() {
        assert_eq!(opts(&[], true).format, Format::Vertical);
        assert_eq!(opts(&[], false).format, Format::OnePerLine);
    }

    #[test]
    fn last_format_flag_wins() {
        assert_eq!(opts(&["-l", "-1"], false).format, Format::OnePerLine);
        assert_eq!(opts(&["-1", "-l"], false).format, Format::Long);
        assert_eq!(opts(&["-C", "--format=commas"], false).format, Format::Commas);
    }

    #[test]
    fn time_flag_without_long_sorts_by_time() {
        let o = opts(&["-c"], false);
        assert_eq!(o.sort.key, SortKey::Time);
        assert_eq!(o.sort.time_field, TimeField::Change);
        let o = opts(&["-l", "-c"], false);
        assert_eq!(o.sort.key, SortKey::Name);
        assert_eq!(o.time_field, TimeField::Change);
    }

    #[test]
    fn unsorted_all_implies_all_and_no_sort() {
        let o = opts(&["-f", "-l"], false);
        assert_eq!(o.hidden, Hidden::All);
        assert_eq!(o.sort.key, SortKey::None);
        assert_eq!(o.format, Format::OnePerLine);
        assert!(o.color.is_none());
    }

    #[test]
    fn long_format_dereferences_nothing() {
        assert_eq!(opts(&["-l"], false).dereference, Dereference::Never);
        assert_eq!(opts(&[], false).dereference, Dereference::CommandLineSymlinkToDir);
        assert_eq!(opts(&["-lL"], false).dereference, Dereference::Always);
    }

    #[test]
    fn width_and_tabsize_from_environment() {
        let args = Args::parse_from(["lsgrid"]).validated();
        let env = Environment {
            columns: Some("132".into()),
            tabsize: Some("bogus".into()),
            ..Environment::default()
        };
        let mut diag = Diagnostics::capturing();
        let o = args.options(&env, false, &mut diag).unwrap();
        assert_eq!(o.line_length, 132);
        assert_eq!(o.tab_size, 8);
        assert_eq!(diag.status().code(), 0);
    }

    #[test]
    fn quoting_defaults() {
        assert_eq!(opts(&[], true).quoting.style, QuotingStyle::ShellEscape);
        assert_eq!(opts(&[], false).quoting.style, QuotingStyle::Literal);
        assert_eq!(opts(&["-Q"], false).quoting.style, QuotingStyle::C);
        assert!(opts(&[], true).quoting.hide_control);
    }

    #[test]
    fn time_styles_parse() {
        assert_eq!(parse_time_style("long-iso").unwrap(), TimeStyle::LongIso);
        assert_eq!(parse_time_style("posix-iso").unwrap(), TimeStyle::Iso);
        assert_eq!(
            parse_time_style("+%Y\n%H:%M").unwrap(),
            TimeStyle::Custom {
                old: "%Y".into(),
                recent: "%H:%M".into()
            }
        );
        assert!(parse_time_style("nonsense").is_err());
    }

    #[test]
    fn color_auto_respects_no_color() {
        let args = Args::parse_from(["lsgrid", "--color=auto"]).validated();
        let env = Environment {
            no_color: true,
            ..Environment::default()
        };
        let mut diag = Diagnostics::capturing();
        assert!(args.options(&env, true, &mut diag).unwrap().color.is_none());
        let forced = Args::parse_from(["lsgrid", "--color"]).validated();
        assert!(forced.options(&env, false, &mut diag).unwrap().color.is_some());
    }
}
