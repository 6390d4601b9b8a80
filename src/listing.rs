//! The listing session: arguments, directory batches and recursion.

use std::cell::Cell;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info_span};

use crate::collate::Collator;
use crate::columns::ColumnPlanner;
use crate::config::{Format, Hidden, ListingOptions};
use crate::diag::{quote_for_message, Diagnostics, ExitStatus, Severity};
use crate::entry::{FileType, Timestamp};
use crate::layout::Renderer;
use crate::long::block_string;
use crate::quote::quote_name;
use crate::signals::SignalGuard;
use crate::sort::sort_table;
use crate::source::{DirItem, FileSystem, StatRequest};
use crate::table::{AddRequest, EntryTable};

/// Work queued for the directory loop.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Dir { path: PathBuf, command_line_arg: bool },
    /// Subtree of the directory with this (device, inode) is done.
    Leave { dev: u64, ino: u64 },
}

/// One run of the lister over a set of arguments.
pub struct Session<'a, W: Write> {
    opts: ListingOptions,
    fs: &'a dyn FileSystem,
    collator: &'a dyn Collator,
    diag: Diagnostics,
    out: W,
    table: EntryTable,
    planner: ColumnPlanner,
    pending: Vec<Pending>,
    active: HashSet<(u64, u64)>,
    signals: Option<SignalGuard>,
    hostname: Option<String>,
    used_color: Cell<bool>,
    now: Timestamp,
    print_dir_name: bool,
    first: bool,
}

impl<'a, W: Write> Session<'a, W> {
    pub fn new(
        opts: ListingOptions,
        fs: &'a dyn FileSystem,
        collator: &'a dyn Collator,
        diag: Diagnostics,
        out: W,
    ) -> Self {
        let hostname = if opts.hyperlink {
            nix::unistd::gethostname()
                .ok()
                .map(|h| h.to_string_lossy().into_owned())
        } else {
            None
        };
        Session {
            opts,
            fs,
            collator,
            diag,
            out,
            table: EntryTable::new(),
            planner: ColumnPlanner::new(),
            pending: Vec::new(),
            active: HashSet::new(),
            signals: None,
            hostname,
            used_color: Cell::new(false),
            now: now(),
            print_dir_name: true,
            first: true,
        }
    }

    /// Defer signal handling to the session's safe points.
    pub fn with_signals(mut self, signals: Option<SignalGuard>) -> Self {
        self.signals = signals;
        self
    }

    /// Fix the reference time used to tell recent files from old ones.
    pub fn with_now(mut self, now: Timestamp) -> Self {
        self.now = now;
        self
    }

    /// List `args` (or `.` when empty) and return the exit status.
    pub fn run(mut self, args: &[PathBuf]) -> io::Result<(ExitStatus, Diagnostics)> {
        let span = info_span!("listing", args = args.len());
        let _guard = span.enter();

        if args.is_empty() {
            if self.opts.immediate_dirs {
                let dot = OsStr::new(".");
                let req = AddRequest {
                    hint: FileType::Directory,
                    ..AddRequest::argument(dot)
                };
                self.table.add(self.fs, &self.opts, &mut self.diag, req);
                self.drain_signals()?;
            } else {
                self.pending.push(Pending::Dir {
                    path: PathBuf::from("."),
                    command_line_arg: true,
                });
            }
        } else {
            for arg in args {
                let req = AddRequest::argument(arg.as_os_str());
                self.table.add(self.fs, &self.opts, &mut self.diag, req);
                self.drain_signals()?;
            }
        }

        if !self.table.is_empty() {
            sort_table(&mut self.table, &self.opts, self.collator, &mut self.diag);
            if !self.opts.immediate_dirs {
                self.extract_dirs(None, None, true);
            }
        }

        if !self.table.is_empty() {
            self.print_current()?;
            if !self.pending.is_empty() {
                self.out.write_all(b"\n")?;
            }
        } else if args.len() <= 1 && self.pending.len() == 1 {
            self.print_dir_name = false;
        }

        while let Some(next) = self.pending.pop() {
            self.drain_signals()?;
            match next {
                Pending::Leave { dev, ino } => {
                    self.active.remove(&(dev, ino));
                }
                Pending::Dir {
                    path,
                    command_line_arg,
                } => {
                    self.print_dir(&path, command_line_arg)?;
                    self.print_dir_name = true;
                }
            }
        }

        self.out.flush()?;
        Ok((self.diag.status(), self.diag))
    }

    fn drain_signals(&mut self) -> io::Result<()> {
        match &self.signals {
            Some(guard) => guard.drain(&mut self.out),
            None => Ok(()),
        }
    }

    /// Move directories out of the current batch onto the pending stack.
    ///
    /// `dir` is the directory the batch was read from, `None` for arguments;
    /// `leave` is its identity when loop detection is active.
    fn extract_dirs(
        &mut self,
        dir: Option<&Path>,
        leave: Option<(u64, u64)>,
        command_line_arg: bool,
    ) {
        if let Some((dev, ino)) = leave {
            self.pending.push(Pending::Leave { dev, ino });
        }

        let queued: Vec<(PathBuf, bool)> = match dir {
            None => self
                .table
                .extract_sorted(|e| e.file_type == FileType::ArgDirectory)
                .into_iter()
                .map(|e| (PathBuf::from(e.name), command_line_arg))
                .collect(),
            Some(dir) => self
                .table
                .sorted()
                .filter(|e| e.file_type.is_directory() && !is_dot_or_dotdot(e.name_os()))
                .map(|e| (dir.join(&e.name), command_line_arg))
                .collect(),
        };

        // Stack order: the first directory in sorted order is listed first.
        for (path, command_line_arg) in queued.into_iter().rev() {
            self.pending.push(Pending::Dir {
                path,
                command_line_arg,
            });
        }
    }

    fn ignored(&self, name: &OsStr) -> bool {
        let bytes = name.as_bytes();
        let dotted = bytes.first() == Some(&b'.');
        let hidden = match self.opts.hidden {
            Hidden::All => false,
            Hidden::AlmostAll => dotted && is_dot_or_dotdot(name),
            Hidden::Default => dotted,
        };
        hidden
            || (self.opts.hidden == Hidden::Default && self.opts.hide.is_match(Path::new(name)))
            || self.opts.ignore.is_match(Path::new(name))
    }

    fn print_dir(&mut self, path: &Path, command_line_arg: bool) -> io::Result<()> {
        let shown = path.to_string_lossy().into_owned();
        debug!(dir = %shown, "listing directory");

        let stream = match self.fs.read_dir(path) {
            Ok(stream) => stream,
            Err(err) => {
                self.diag
                    .file_failure(command_line_arg, "cannot open directory", &shown, &err);
                return Ok(());
            }
        };

        let mut dir_id = None;
        if self.opts.recursive {
            match self.fs.stat(path, StatRequest::default()) {
                Ok(md) => {
                    dir_id = Some((md.dev, md.ino));
                    if !self.active.insert((md.dev, md.ino)) {
                        self.diag.report(
                            Severity::Serious,
                            format_args!(
                                "{}: not listing already-listed directory",
                                quote_for_message(&shown)
                            ),
                        );
                        return Ok(());
                    }
                }
                Err(err) => {
                    self.diag.file_failure(
                        command_line_arg,
                        "cannot determine device and inode of",
                        &shown,
                        &err,
                    );
                    return Ok(());
                }
            }
        }

        self.table.clear();

        if self.opts.recursive || self.print_dir_name {
            if !self.first {
                self.out.write_all(b"\n")?;
            }
            self.first = false;
            let header = quote_name(path.as_os_str(), &self.opts.quoting);
            self.out.write_all(&header.bytes)?;
            self.out.write_all(b":\n")?;
        }

        let streaming = self.opts.format == Format::OnePerLine
            && self.opts.sort.key == crate::compare::SortKey::None
            && !self.opts.print_block_size
            && !self.opts.recursive;

        let dots = if self.opts.hidden == Hidden::All {
            vec![
                Ok(DirItem::new(".", FileType::Directory, None)),
                Ok(DirItem::new("..", FileType::Directory, None)),
            ]
        } else {
            Vec::new()
        };

        let mut total_blocks = 0u64;
        for item in dots.into_iter().chain(stream) {
            match item {
                Ok(item) => {
                    if self.ignored(&item.name) {
                        continue;
                    }
                    let req = AddRequest::child(path, &item.name, item.hint, item.inode);
                    total_blocks += self.table.add(self.fs, &self.opts, &mut self.diag, req);
                    if streaming {
                        self.print_current()?;
                        self.table.clear();
                    }
                }
                Err(err) => {
                    self.diag
                        .file_failure(command_line_arg, "reading directory", &shown, &err);
                    break;
                }
            }
            self.drain_signals()?;
        }

        sort_table(&mut self.table, &self.opts, self.collator, &mut self.diag);

        if self.opts.recursive {
            self.extract_dirs(Some(path), dir_id, false);
        }

        if self.opts.format == Format::Long || self.opts.print_block_size {
            writeln!(self.out, "total {}", block_string(total_blocks, self.opts.size_units))?;
        }

        if !self.table.is_empty() {
            self.print_current()?;
        }
        self.out.flush()
    }

    fn print_current(&mut self) -> io::Result<()> {
        if self.table.view().len() != self.table.len() {
            sort_table(&mut self.table, &self.opts, self.collator, &mut self.diag);
        }
        let renderer = Renderer::new(
            &self.opts,
            &self.table,
            self.now,
            self.hostname.as_deref(),
            &self.used_color,
        );
        renderer.render(&mut self.out, &mut self.planner)
    }
}

fn is_dot_or_dotdot(name: &OsStr) -> bool {
    name == "." || name == ".."
}

fn now() -> Timestamp {
    let now = chrono::Utc::now();
    Timestamp::new(now.timestamp(), now.timestamp_subsec_nanos())
}
