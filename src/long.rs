//! Long-format fields: mode strings, sizes, owners and timestamps.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{self, Write};

use chrono::format::{Item, StrftimeItems};
use chrono::{Local, TimeZone};
use unicode_width::UnicodeWidthStr;

use crate::config::{SizeUnits, TimeStyle};
use crate::entry::{AclStatus, Entry, FileType, Timestamp, S_ISGID, S_ISUID, S_ISVTX};
use crate::layout::Renderer;

/// Half of a Gregorian year; older timestamps use the "old" time format.
const SIX_MONTHS: i64 = 31_556_952 / 2;

/// Cached user and group name lookups.
#[derive(Debug, Default)]
pub struct IdNames {
    users: RefCell<HashMap<u32, Option<String>>>,
    groups: RefCell<HashMap<u32, Option<String>>>,
}

impl IdNames {
    pub fn new() -> Self {
        IdNames::default()
    }

    pub fn user_name(&self, uid: u32) -> Option<String> {
        self.users
            .borrow_mut()
            .entry(uid)
            .or_insert_with(|| {
                nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid))
                    .ok()
                    .flatten()
                    .map(|u| u.name)
            })
            .clone()
    }

    pub fn group_name(&self, gid: u32) -> Option<String> {
        self.groups
            .borrow_mut()
            .entry(gid)
            .or_insert_with(|| {
                nix::unistd::Group::from_gid(nix::unistd::Gid::from_raw(gid))
                    .ok()
                    .flatten()
                    .map(|g| g.name)
            })
            .clone()
    }

    /// Name of `uid`, or the number when unknown or `numeric`.
    pub fn owner(&self, uid: u32, numeric: bool) -> String {
        if numeric {
            return uid.to_string();
        }
        self.user_name(uid).unwrap_or_else(|| uid.to_string())
    }

    pub fn group(&self, gid: u32, numeric: bool) -> String {
        if numeric {
            return gid.to_string();
        }
        self.group_name(gid).unwrap_or_else(|| gid.to_string())
    }
}

/// Ten-character mode string, plus an eleventh ACL column when `any_acl`.
pub fn mode_string(entry: &Entry, any_acl: bool) -> String {
    let mut s = String::with_capacity(11);
    s.push(entry.file_type.mode_letter());
    match &entry.metadata {
        None => s.push_str("?????????"),
        Some(md) => {
            let m = md.mode;
            let bit = |mask: u32, c: char| if m & mask != 0 { c } else { '-' };
            let exec = |mask: u32, special: u32, set: char, unset: char| {
                match (m & mask != 0, m & special != 0) {
                    (true, true) => set,
                    (false, true) => unset,
                    (true, false) => 'x',
                    (false, false) => '-',
                }
            };
            s.push(bit(0o400, 'r'));
            s.push(bit(0o200, 'w'));
            s.push(exec(0o100, S_ISUID, 's', 'S'));
            s.push(bit(0o040, 'r'));
            s.push(bit(0o020, 'w'));
            s.push(exec(0o010, S_ISGID, 's', 'S'));
            s.push(bit(0o004, 'r'));
            s.push(bit(0o002, 'w'));
            s.push(exec(0o001, S_ISVTX, 't', 'T'));
        }
    }
    if any_acl {
        s.push(match entry.acl {
            AclStatus::Full => '+',
            AclStatus::ContextOnly => '.',
            AclStatus::Unknown => '?',
            AclStatus::None if entry.metadata.is_none() => '?',
            AclStatus::None => ' ',
        });
    }
    s
}

fn ceil_div(n: u128, d: u128) -> u128 {
    n.div_ceil(d)
}

/// Scale `bytes` to a unit suffix, rounding up; one decimal below ten.
pub fn human_size(bytes: u64, base: u64) -> String {
    let units: [&str; 6] = if base == 1000 {
        ["k", "M", "G", "T", "P", "E"]
    } else {
        ["K", "M", "G", "T", "P", "E"]
    };
    if bytes < base {
        return bytes.to_string();
    }
    let (n, base) = (u128::from(bytes), u128::from(base));
    let mut exp = 0;
    let mut div = base;
    while n >= div * base && exp + 1 < units.len() {
        div *= base;
        exp += 1;
    }
    loop {
        let tenths = ceil_div(n * 10, div);
        if tenths < 100 {
            return format!("{}.{}{}", tenths / 10, tenths % 10, units[exp]);
        }
        let whole = ceil_div(n, div);
        if whole < base || exp + 1 == units.len() {
            return format!("{}{}", whole, units[exp]);
        }
        div *= base;
        exp += 1;
    }
}

/// Allocated size from a count of 512-byte blocks: 1 KiB units unless scaled.
pub fn block_string(blocks: u64, units: SizeUnits) -> String {
    let bytes = blocks.saturating_mul(512);
    match units {
        SizeUnits::Plain => bytes.div_ceil(1024).to_string(),
        SizeUnits::Binary => human_size(bytes, 1024),
        SizeUnits::Decimal => human_size(bytes, 1000),
    }
}

pub fn size_string(bytes: u64, units: SizeUnits) -> String {
    match units {
        SizeUnits::Plain => bytes.to_string(),
        SizeUnits::Binary => human_size(bytes, 1024),
        SizeUnits::Decimal => human_size(bytes, 1000),
    }
}

/// Whether `format` contains only valid strftime directives.
pub fn is_valid_time_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

fn time_formats(style: &TimeStyle) -> (&str, &str) {
    match style {
        TimeStyle::Locale => ("%b %e  %Y", "%b %e %H:%M"),
        TimeStyle::Iso => ("%Y-%m-%d ", "%m-%d %H:%M"),
        TimeStyle::LongIso => ("%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M"),
        TimeStyle::FullIso => ("%Y-%m-%d %H:%M:%S%.9f %z", "%Y-%m-%d %H:%M:%S%.9f %z"),
        TimeStyle::Custom { old, recent } => (old.as_str(), recent.as_str()),
    }
}

/// Format `ts` in the local zone. Times outside chrono's range print as seconds.
pub fn format_time(ts: Timestamp, style: &TimeStyle, now: Timestamp) -> String {
    let recent = ts.secs > now.secs - SIX_MONTHS && ts <= now;
    let (old, fresh) = time_formats(style);
    let format = if recent { fresh } else { old };
    let Some(dt) = Local.timestamp_opt(ts.secs, ts.nanos).earliest() else {
        return ts.secs.to_string();
    };
    let mut out = String::new();
    match write!(out, "{}", dt.format(format)) {
        Ok(()) => out,
        Err(_) => ts.secs.to_string(),
    }
}

/// Width of the time column, used to pad `?` for entries without metadata.
pub fn time_width(style: &TimeStyle, now: Timestamp) -> usize {
    UnicodeWidthStr::width(format_time(now, style, now).as_str())
}

fn pad_right(out: &mut dyn Write, text: &str, width: usize) -> io::Result<()> {
    let w = UnicodeWidthStr::width(text);
    write!(out, "{}", text)?;
    for _ in w..width {
        out.write_all(b" ")?;
    }
    Ok(())
}

/// Print one long-format line for `entry`.
pub fn write_long_line(r: &Renderer<'_>, out: &mut dyn Write, entry: &Entry) -> io::Result<()> {
    let opts = r.opts();
    let table = r.table();
    let w = &table.widths;
    let md = entry.metadata.as_ref();

    if opts.print_inode {
        let inode = entry.inode().map_or_else(|| "?".to_string(), |i| i.to_string());
        write!(out, "{:>width$} ", inode, width = w.inode)?;
    }
    if opts.print_block_size {
        let blocks = md.map_or_else(
            || "?".to_string(),
            |m| block_string(m.blocks, opts.size_units),
        );
        write!(out, "{:>width$} ", blocks, width = w.block_size)?;
    }

    write!(out, "{} ", mode_string(entry, table.any_has_acl()))?;
    let nlink = md.map_or_else(|| "?".to_string(), |m| m.nlink.to_string());
    write!(out, "{:>width$} ", nlink, width = w.nlink)?;

    let names = table.names();
    if opts.print_owner {
        let owner = md.map_or_else(|| "?".to_string(), |m| names.owner(m.uid, opts.numeric_ids));
        pad_right(out, &owner, w.owner)?;
        out.write_all(b" ")?;
    }
    if opts.print_group {
        let group = md.map_or_else(|| "?".to_string(), |m| names.group(m.gid, opts.numeric_ids));
        pad_right(out, &group, w.group)?;
        out.write_all(b" ")?;
    }
    if opts.print_author {
        let author = md.map_or_else(|| "?".to_string(), |m| names.owner(m.uid, opts.numeric_ids));
        pad_right(out, &author, w.author)?;
        out.write_all(b" ")?;
    }
    if opts.print_scontext {
        let ctx = entry.security_context.as_deref().unwrap_or("?");
        pad_right(out, ctx, w.scontext)?;
        out.write_all(b" ")?;
    }

    match md {
        Some(m) if matches!(entry.file_type, FileType::CharDevice | FileType::BlockDevice) => {
            let major = nix::sys::stat::major(m.rdev).to_string();
            let minor = nix::sys::stat::minor(m.rdev).to_string();
            let major_width = w.file_size.saturating_sub(w.minor + 2).max(w.major);
            write!(out, "{:>mw$}, {:>nw$} ", major, minor, mw = major_width, nw = w.minor)?;
        }
        Some(m) => {
            let size = size_string(m.size, opts.size_units);
            write!(out, "{:>width$} ", size, width = w.file_size)?;
        }
        None => write!(out, "{:>width$} ", "?", width = w.file_size)?,
    }

    match md {
        Some(m) => {
            let text = format_time(m.time(opts.time_field), &opts.time_style, r.now());
            write!(out, "{} ", text)?;
        }
        None => write!(out, "{:>width$} ", "?", width = r.time_width())?,
    }

    r.print_name(out, entry, false)?;

    if entry.file_type == FileType::Symlink {
        if entry.link_target.is_some() {
            out.write_all(b" -> ")?;
            r.print_name(out, entry, true)?;
            if opts.indicator != crate::config::IndicatorStyle::None {
                if let Some(mode) = entry.link_mode {
                    let file_type = FileType::from_mode(mode);
                    let c = crate::layout::type_indicator(file_type, Some(mode), opts.indicator);
                    if let Some(c) = c {
                        write!(out, "{}", c)?;
                    }
                }
            }
        }
    } else {
        r.print_indicator(out, entry)?;
    }
    out.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{MetadataSnapshot, S_IFDIR, S_IFREG};

    fn with_mode(mode: u32) -> Entry {
        let mut e = Entry::new("f", FileType::from_mode(mode));
        e.metadata = Some(MetadataSnapshot {
            mode,
            ..MetadataSnapshot::default()
        });
        e
    }

    #[test]
    fn mode_strings() {
        assert_eq!(mode_string(&with_mode(S_IFREG | 0o644), false), "-rw-r--r--");
        assert_eq!(mode_string(&with_mode(S_IFDIR | 0o1777), false), "drwxrwxrwt");
        assert_eq!(mode_string(&with_mode(S_IFREG | 0o4644), false), "-rwSr--r--");
        assert_eq!(mode_string(&with_mode(S_IFREG | 0o2755), false), "-rwxr-sr-x");
    }

    #[test]
    fn acl_column_only_when_requested() {
        let mut e = with_mode(S_IFREG | 0o600);
        assert_eq!(mode_string(&e, true), "-rw------- ");
        e.acl = AclStatus::Full;
        assert_eq!(mode_string(&e, true), "-rw-------+");
        e.acl = AclStatus::ContextOnly;
        assert_eq!(mode_string(&e, true), "-rw-------.");
    }

    #[test]
    fn missing_metadata_mode_is_question_marks() {
        let e = Entry::new("ghost", FileType::Regular);
        assert_eq!(mode_string(&e, false), "-?????????");
        assert_eq!(mode_string(&e, true), "-??????????");
    }

    #[test]
    fn human_sizes_round_up() {
        assert_eq!(human_size(512, 1024), "512");
        assert_eq!(human_size(1024, 1024), "1.0K");
        assert_eq!(human_size(1025, 1024), "1.1K");
        assert_eq!(human_size(10 * 1024, 1024), "10K");
        assert_eq!(human_size(10239, 1024), "10K");
        assert_eq!(human_size(1024 * 1024 - 1, 1024), "1.0M");
        assert_eq!(human_size(1500, 1000), "1.5k");
    }

    #[test]
    fn block_counts_are_kibibytes() {
        assert_eq!(block_string(8, SizeUnits::Plain), "4");
        assert_eq!(block_string(1, SizeUnits::Plain), "1");
        assert_eq!(block_string(8, SizeUnits::Binary), "4.0K");
    }

    #[test]
    fn time_styles() {
        let now = Timestamp::new(1_700_000_000, 0);
        let long = format_time(now, &TimeStyle::LongIso, now);
        assert_eq!(long.len(), "2023-11-14 22:13".len());
        let custom = TimeStyle::Custom {
            old: "%Y".into(),
            recent: "recent".into(),
        };
        assert_eq!(format_time(now, &custom, now), "recent");
        assert_eq!(format_time(Timestamp::new(0, 0), &custom, now).len(), 4);
        assert!(!is_valid_time_format("%Q%"));
        assert!(is_valid_time_format("%Y-%m-%d"));
    }

    #[test]
    fn future_timestamps_use_old_format() {
        let now = Timestamp::new(1_700_000_000, 0);
        let custom = TimeStyle::Custom {
            old: "old".into(),
            recent: "new".into(),
        };
        assert_eq!(format_time(Timestamp::new(now.secs + 60, 0), &custom, now), "old");
        assert_eq!(format_time(Timestamp::new(now.secs - 60, 0), &custom, now), "new");
    }
}
