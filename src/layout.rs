//! Rendering a sorted batch in the selected format.

use std::cell::Cell;
use std::io::{self, Write};

use crate::color::{self, Palette};
use crate::columns::{ColumnPlanner, Order};
use crate::config::{Format, IndicatorStyle, ListingOptions};
use crate::entry::{
    Entry, FileType, Timestamp, S_IFDIR, S_IFIFO, S_IFLNK, S_IFMT, S_IFREG, S_IFSOCK, S_IXUGO,
};
use crate::long::{self, block_string};
use crate::quote::quote_name;
use crate::table::EntryTable;

/// Pad from column `from` to column `to`, using tabs where a tab stop fits.
///
/// A `tab_size` of zero pads with spaces only.
pub fn indent(out: &mut dyn Write, mut from: usize, to: usize, tab_size: usize) -> io::Result<()> {
    while from < to {
        if tab_size != 0 && to / tab_size > (from + 1) / tab_size {
            out.write_all(b"\t")?;
            from += tab_size - from % tab_size;
        } else {
            out.write_all(b" ")?;
            from += 1;
        }
    }
    Ok(())
}

/// Suffix character for an entry of `file_type` with `mode`, if `style` shows one.
///
/// `mode` is `None` when metadata is unavailable; the type tag decides then.
pub fn type_indicator(
    file_type: FileType,
    mode: Option<u32>,
    style: IndicatorStyle,
) -> Option<char> {
    if style == IndicatorStyle::None {
        return None;
    }
    let fmt = match mode {
        Some(m) => m & S_IFMT,
        None => match file_type {
            FileType::Regular => S_IFREG,
            FileType::Directory | FileType::ArgDirectory => S_IFDIR,
            FileType::Symlink => S_IFLNK,
            FileType::Fifo => S_IFIFO,
            FileType::Socket => S_IFSOCK,
            _ => 0,
        },
    };
    match fmt {
        S_IFREG => {
            let executable = mode.is_some_and(|m| m & S_IXUGO != 0);
            (style == IndicatorStyle::Classify && executable).then_some('*')
        }
        S_IFDIR => Some('/'),
        _ if style == IndicatorStyle::Slash => None,
        S_IFLNK => Some('@'),
        S_IFIFO => Some('|'),
        S_IFSOCK => Some('='),
        _ => None,
    }
}

/// Everything needed to print one batch.
pub struct Renderer<'a> {
    opts: &'a ListingOptions,
    table: &'a EntryTable,
    now: Timestamp,
    hostname: Option<&'a str>,
    time_width: usize,
    /// Set once any colour sequence has been written in this run.
    used_color: &'a Cell<bool>,
}

impl<'a> Renderer<'a> {
    pub fn new(
        opts: &'a ListingOptions,
        table: &'a EntryTable,
        now: Timestamp,
        hostname: Option<&'a str>,
        used_color: &'a Cell<bool>,
    ) -> Self {
        let time_width = if opts.format == Format::Long {
            long::time_width(&opts.time_style, now)
        } else {
            0
        };
        Renderer {
            opts,
            table,
            now,
            hostname,
            time_width,
            used_color,
        }
    }

    pub fn opts(&self) -> &ListingOptions {
        self.opts
    }

    pub fn table(&self) -> &EntryTable {
        self.table
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn time_width(&self) -> usize {
        self.time_width
    }

    fn palette(&self) -> Option<&Palette> {
        self.opts.color.as_ref()
    }

    /// Tabs and colour codes do not mix on some terminals.
    fn tab_size(&self) -> usize {
        if self.palette().is_some() {
            0
        } else {
            self.opts.tab_size
        }
    }

    /// Print the whole batch in view order.
    pub fn render(&self, out: &mut dyn Write, planner: &mut ColumnPlanner) -> io::Result<()> {
        if self.table.view().is_empty() {
            return Ok(());
        }
        match self.opts.format {
            Format::OnePerLine => {
                for entry in self.table.sorted() {
                    self.print_name_and_frills(out, entry)?;
                    out.write_all(b"\n")?;
                }
                Ok(())
            }
            Format::Long => {
                for entry in self.table.sorted() {
                    long::write_long_line(self, out, entry)?;
                }
                Ok(())
            }
            Format::Vertical => self.print_vertical(out, planner),
            Format::Horizontal => self.print_horizontal(out, planner),
            Format::Commas => self.print_with_commas(out),
        }
    }

    fn entries(&self) -> Vec<&Entry> {
        self.table.sorted().collect()
    }

    fn print_vertical(&self, out: &mut dyn Write, planner: &mut ColumnPlanner) -> io::Result<()> {
        let entries = self.entries();
        let widths: Vec<usize> = entries.iter().map(|e| self.frills_width(e)).collect();
        let plan = planner.plan(&widths, self.opts.line_length, Order::ByColumns);
        let n = entries.len();
        let cols = plan.columns();
        let rows = n.div_ceil(cols);

        for row in 0..rows {
            let mut col = 0;
            let mut filesno = row;
            let mut pos = 0;
            loop {
                let name_length = widths[filesno];
                let max_name_length = plan.widths[col];
                col += 1;
                self.print_name_and_frills(out, entries[filesno])?;
                filesno += rows;
                if filesno >= n {
                    break;
                }
                indent(out, pos + name_length, pos + max_name_length, self.tab_size())?;
                pos += max_name_length;
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn print_horizontal(&self, out: &mut dyn Write, planner: &mut ColumnPlanner) -> io::Result<()> {
        let entries = self.entries();
        let widths: Vec<usize> = entries.iter().map(|e| self.frills_width(e)).collect();
        let plan = planner.plan(&widths, self.opts.line_length, Order::ByRows);
        let cols = plan.columns();

        let mut pos = 0;
        let mut name_length = widths[0];
        let mut max_name_length = plan.widths[0];
        self.print_name_and_frills(out, entries[0])?;

        for filesno in 1..entries.len() {
            let col = filesno % cols;
            if col == 0 {
                out.write_all(b"\n")?;
                pos = 0;
            } else {
                indent(out, pos + name_length, pos + max_name_length, self.tab_size())?;
                pos += max_name_length;
            }
            self.print_name_and_frills(out, entries[filesno])?;
            name_length = widths[filesno];
            max_name_length = plan.widths[col];
        }
        out.write_all(b"\n")
    }

    fn print_with_commas(&self, out: &mut dyn Write) -> io::Result<()> {
        let line_length = self.opts.line_length;
        let mut pos = 0usize;
        for (filesno, entry) in self.table.sorted().enumerate() {
            let len = if line_length == 0 { 0 } else { self.frills_width(entry) };
            if filesno != 0 {
                let fits = pos.saturating_add(len).saturating_add(2) < line_length;
                let separator = if line_length == 0 || fits {
                    pos += 2;
                    b' '
                } else {
                    pos = 0;
                    b'\n'
                };
                out.write_all(&[b',', separator])?;
            }
            self.print_name_and_frills(out, entry)?;
            pos += len;
        }
        out.write_all(b"\n")
    }

    /// Display width of the name alone, padding included.
    pub fn name_width(&self, entry: &Entry) -> usize {
        entry.width.unwrap_or_else(|| {
            let pad = self.opts.align_quotes()
                && self.table.some_quoted()
                && entry.quoted == crate::entry::QuoteNeed::Unquoted;
            quote_name(&entry.name, &self.opts.quoting).width + usize::from(pad)
        })
    }

    /// Width of the name plus the inode, block and context prefixes and the indicator.
    pub fn frills_width(&self, entry: &Entry) -> usize {
        let commas = self.opts.format == Format::Commas;
        let w = &self.table.widths;
        let mut len = 0;
        if self.opts.print_inode {
            len += 1 + if commas { self.inode_text(entry).len() } else { w.inode };
        }
        if self.opts.print_block_size {
            len += 1 + if commas { self.blocks_text(entry).len() } else { w.block_size };
        }
        if self.opts.print_scontext {
            let ctx = entry.security_context.as_deref().unwrap_or("?");
            len += 1 + if commas { ctx.len() } else { w.scontext };
        }
        len += self.name_width(entry);
        if self.indicator_for(entry).is_some() {
            len += 1;
        }
        len
    }

    fn inode_text(&self, entry: &Entry) -> String {
        entry.inode().map_or_else(|| "?".to_string(), |i| i.to_string())
    }

    fn blocks_text(&self, entry: &Entry) -> String {
        entry
            .metadata
            .as_ref()
            .map_or_else(|| "?".to_string(), |md| block_string(md.blocks, self.opts.size_units))
    }

    fn indicator_for(&self, entry: &Entry) -> Option<char> {
        let mode = entry.metadata.as_ref().map(|md| md.mode);
        type_indicator(entry.file_type, mode, self.opts.indicator)
    }

    /// Print prefixes, name and indicator for the short formats.
    pub fn print_name_and_frills(&self, out: &mut dyn Write, entry: &Entry) -> io::Result<()> {
        let commas = self.opts.format == Format::Commas;
        let w = &self.table.widths;
        if self.opts.print_inode {
            let width = if commas { 0 } else { w.inode };
            write!(out, "{:>width$} ", self.inode_text(entry))?;
        }
        if self.opts.print_block_size {
            let width = if commas { 0 } else { w.block_size };
            write!(out, "{:>width$} ", self.blocks_text(entry))?;
        }
        if self.opts.print_scontext {
            let width = if commas { 0 } else { w.scontext };
            write!(out, "{:>width$} ", entry.security_context.as_deref().unwrap_or("?"))?;
        }
        self.print_name(out, entry, false)?;
        self.print_indicator(out, entry)
    }

    pub fn print_indicator(&self, out: &mut dyn Write, entry: &Entry) -> io::Result<()> {
        match self.indicator_for(entry) {
            Some(c) => write!(out, "{}", c),
            None => Ok(()),
        }
    }

    /// Print the quoted name, or the symlink target when `target` is set.
    pub fn print_name(&self, out: &mut dyn Write, entry: &Entry, target: bool) -> io::Result<()> {
        let name = if target {
            entry.link_target.as_deref().unwrap_or_default()
        } else {
            entry.name_os()
        };
        let quoted = quote_name(name, &self.opts.quoting);

        let pad = !target
            && self.opts.align_quotes()
            && self.table.some_quoted()
            && entry.quoted == crate::entry::QuoteNeed::Unquoted;
        if pad {
            out.write_all(b" ")?;
        }

        let style = self.palette().and_then(|p| {
            if target {
                p.style_for_target(entry)
            } else {
                p.style_for(entry)
            }
        });
        if let Some(code) = style {
            if !self.used_color.replace(true) {
                out.write_all(color::RESET.as_bytes())?;
            }
            out.write_all(color::start(code).as_bytes())?;
        }

        let link = if target { None } else { self.hyperlink(entry) };
        if let Some(url) = &link {
            write!(out, "\x1b]8;;{}\x07", url)?;
        }
        out.write_all(&quoted.bytes)?;
        if link.is_some() {
            out.write_all(b"\x1b]8;;\x07")?;
        }

        if style.is_some() {
            out.write_all(color::RESET.as_bytes())?;
        }
        Ok(())
    }

    fn hyperlink(&self, entry: &Entry) -> Option<String> {
        if !self.opts.hyperlink {
            return None;
        }
        let path = entry.absolute_path.as_ref()?;
        let encoded: Vec<String> = path
            .to_string_lossy()
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();
        Some(format!("file://{}{}", self.hostname.unwrap_or(""), encoded.join("/")))
    }
}
