//! The entry table for one listing batch.
//!
//! Entries are appended by [`EntryTable::add`], which decides how much to ask
//! the filesystem about each name, and are ordered through a separate index
//! view so sorting never moves the records themselves.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use unicode_width::UnicodeWidthStr;

use crate::config::{Dereference, Format, IndicatorStyle, ListingOptions};
use crate::diag::Diagnostics;
use crate::entry::{AclStatus, Entry, FileType, MetadataSnapshot, QuoteNeed};
use crate::long::{block_string, size_string, IdNames};
use crate::quote::{outer_quote_need, quote_name};
use crate::source::{is_unsupported, FileSystem, StatRequest};

/// Widest value seen so far in each long-format column of the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnWidths {
    pub inode: usize,
    pub block_size: usize,
    pub nlink: usize,
    pub owner: usize,
    pub group: usize,
    pub author: usize,
    pub scontext: usize,
    pub major: usize,
    pub minor: usize,
    pub file_size: usize,
}

/// One name to add, as produced by argument handling or a directory read.
#[derive(Debug, Clone, Copy)]
pub struct AddRequest<'a> {
    pub name: &'a OsStr,
    pub hint: FileType,
    pub inode: Option<u64>,
    pub command_line_arg: bool,
    /// Directory the name was read from; `None` for command-line arguments.
    pub dir: Option<&'a Path>,
}

impl<'a> AddRequest<'a> {
    pub fn argument(name: &'a OsStr) -> Self {
        AddRequest {
            name,
            hint: FileType::Unknown,
            inode: None,
            command_line_arg: true,
            dir: None,
        }
    }

    pub fn child(dir: &'a Path, name: &'a OsStr, hint: FileType, inode: Option<u64>) -> Self {
        AddRequest {
            name,
            hint,
            inode,
            command_line_arg: false,
            dir: Some(dir),
        }
    }

    pub fn path(&self) -> PathBuf {
        match self.dir {
            Some(dir) if !Path::new(self.name).is_absolute() => dir.join(self.name),
            _ => PathBuf::from(self.name),
        }
    }
}

/// Whether an entry needs a metadata query under `opts`.
pub fn metadata_needed(
    opts: &ListingOptions,
    hint: FileType,
    inode: Option<u64>,
    command_line_arg: bool,
) -> bool {
    if command_line_arg || opts.format_needs_stat() {
        return true;
    }
    if opts.print_inode && inode.is_none() {
        return true;
    }
    if !opts.format_needs_type() {
        return false;
    }
    match hint {
        FileType::Unknown => true,
        FileType::Symlink => opts.dereference == Dereference::Always || opts.check_symlink_mode(),
        FileType::Directory => opts.color_needs_dir_mode(),
        FileType::Regular => opts.needs_regular_mode(),
        _ => false,
    }
}

/// Entries of the current batch plus the batch-wide width trackers.
#[derive(Debug, Default)]
pub struct EntryTable {
    entries: Vec<Entry>,
    view: Vec<usize>,
    pub widths: ColumnWidths,
    some_quoted: bool,
    any_has_acl: bool,
    acl_unsupported_dev: Option<u64>,
    cap_unsupported_dev: Option<u64>,
    names: IdNames,
}

impl EntryTable {
    pub fn new() -> Self {
        EntryTable::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entries in sorted-view order.
    pub fn sorted(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.view.iter().map(move |&i| &self.entries[i])
    }

    pub fn view(&self) -> &[usize] {
        &self.view
    }

    /// Point the view at every entry in insertion order.
    pub fn reset_view(&mut self) {
        let n = self.entries.len();
        self.view.clear();
        if self.view.capacity() < n {
            self.view.reserve_exact(n * 3);
        }
        self.view.extend(0..n);
    }

    pub(crate) fn view_mut(&mut self) -> (&mut Vec<usize>, &[Entry]) {
        (&mut self.view, &self.entries)
    }

    pub fn some_quoted(&self) -> bool {
        self.some_quoted
    }

    pub fn any_has_acl(&self) -> bool {
        self.any_has_acl
    }

    pub fn names(&self) -> &IdNames {
        &self.names
    }

    /// Drop every entry and reset the width trackers.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.view.clear();
        self.widths = ColumnWidths::default();
        self.some_quoted = false;
        self.any_has_acl = false;
    }

    /// Append an entry that is already fully described.
    pub fn push(&mut self, entry: Entry) {
        if entry.quoted == QuoteNeed::Quoted {
            self.some_quoted = true;
        }
        if entry.acl != AclStatus::None {
            self.any_has_acl = true;
        }
        self.entries.push(entry);
    }

    /// Cache each entry's display width, padding unquoted names when some are quoted.
    pub fn cache_widths(&mut self, opts: &ListingOptions) {
        let pad = opts.align_quotes() && self.some_quoted;
        for e in &mut self.entries {
            let width = quote_name(&e.name, &opts.quoting).width;
            e.width = Some(width + usize::from(pad && e.quoted == QuoteNeed::Unquoted));
        }
    }

    /// Remove the entries matching `pred`, returning them in view order.
    ///
    /// The remaining entries keep their view order, and the view stays valid.
    pub fn extract_sorted(&mut self, mut pred: impl FnMut(&Entry) -> bool) -> Vec<Entry> {
        let order = std::mem::take(&mut self.view);
        let mut slots: Vec<Option<Entry>> =
            std::mem::take(&mut self.entries).into_iter().map(Some).collect();
        let mut taken = Vec::new();
        for idx in order {
            let Some(entry) = slots.get_mut(idx).and_then(Option::take) else {
                continue;
            };
            if pred(&entry) {
                taken.push(entry);
            } else {
                self.view.push(self.entries.len());
                self.entries.push(entry);
            }
        }
        taken
    }

    /// Add `req.name`, querying the filesystem as `opts` requires.
    ///
    /// Returns the entry's allocated size in 512-byte blocks. A command-line
    /// argument that cannot be examined is reported and left out; any other
    /// name is kept without metadata.
    pub fn add(
        &mut self,
        fs: &dyn FileSystem,
        opts: &ListingOptions,
        diag: &mut Diagnostics,
        req: AddRequest<'_>,
    ) -> u64 {
        let mut entry = Entry::new(req.name, req.hint);
        entry.inode_hint = req.inode;
        let path = req.path();
        let shown = path.to_string_lossy();

        if opts.align_quotes() {
            entry.quoted = outer_quote_need(req.name, &opts.quoting);
        }

        if opts.hyperlink {
            match fs.canonicalize(&path) {
                Ok(abs) => entry.absolute_path = Some(abs),
                Err(err) => {
                    diag.file_failure(req.command_line_arg, "error canonicalizing", &shown, &err)
                }
            }
        }

        let check_stat = metadata_needed(opts, req.hint, req.inode, req.command_line_arg);
        trace!(name = %shown, check_stat, "adding entry");

        let mut followed = false;
        if check_stat {
            let request = StatRequest {
                birth_time: opts.wants_birth_time(),
            };
            let result = match opts.dereference {
                Dereference::Always => {
                    followed = true;
                    fs.stat(&path, request)
                }
                Dereference::CommandLineArguments | Dereference::CommandLineSymlinkToDir
                    if req.command_line_arg =>
                {
                    let followed_result = fs.stat(&path, request);
                    let keep = opts.dereference == Dereference::CommandLineArguments
                        || match &followed_result {
                            Ok(md) => md.file_type() == FileType::Directory,
                            Err(err) => !is_missing_or_loop(err),
                        };
                    if keep {
                        followed = true;
                        followed_result
                    } else {
                        fs.lstat(&path, request)
                    }
                }
                _ => fs.lstat(&path, request),
            };

            match result {
                Ok(md) => {
                    entry.file_type = md.file_type();
                    entry.metadata = Some(md);
                }
                Err(err) => {
                    diag.file_failure(req.command_line_arg, "cannot access", &shown, &err);
                    if !req.command_line_arg {
                        self.push(entry);
                    }
                    return 0;
                }
            }
        }

        if entry.file_type == FileType::Directory && req.command_line_arg && !opts.immediate_dirs {
            entry.file_type = FileType::ArgDirectory;
        }

        let want_context = opts.format == Format::Long || opts.print_scontext;
        if check_stat && want_context {
            self.probe_acl(fs, opts, diag, &path, followed, &mut entry);
        }
        if check_stat && opts.needs_capability() && entry.file_type == FileType::Regular {
            entry.has_capability = self.probe_capability(fs, &path, entry.metadata.as_ref());
        }

        let wants_target = opts.format == Format::Long || opts.check_symlink_mode();
        if entry.file_type == FileType::Symlink && wants_target {
            match fs.read_link(&path) {
                Ok(target) => entry.link_target = Some(target),
                Err(err) => {
                    let what = "cannot read symbolic link";
                    diag.file_failure(req.command_line_arg, what, &shown, &err)
                }
            }
            if entry.link_target.is_some()
                && (opts.indicator >= IndicatorStyle::FileType || opts.check_symlink_mode())
            {
                if let Ok(target) = fs.stat(&path, StatRequest::default()) {
                    entry.link_mode = Some(target.mode);
                }
            }
        }

        let blocks = entry.metadata.as_ref().map_or(0, |md| md.blocks);
        if let Some(md) = entry.metadata.clone() {
            self.update_metadata_widths(&entry, &md, opts);
        }
        self.update_name_widths(&entry, opts);
        self.push(entry);
        blocks
    }

    fn probe_acl(
        &mut self,
        fs: &dyn FileSystem,
        opts: &ListingOptions,
        diag: &mut Diagnostics,
        path: &Path,
        follow: bool,
        entry: &mut Entry,
    ) {
        let dev = entry.metadata.as_ref().map(|md| md.dev);
        if dev.is_some() && dev == self.acl_unsupported_dev {
            debug!(dev = ?dev, "ACL query skipped on unsupported device");
            entry.security_context = Some("?".to_string());
            return;
        }

        let info = fs.acl_info(path, follow, opts.print_scontext || opts.format == Format::Long);
        if info.is_unsupported() {
            self.acl_unsupported_dev = dev;
        }

        let has_acl = matches!(info.entries, Ok(n) if n > 0);
        let has_context = info.context.is_ok();
        let refused = matches!(
            &info.entries,
            Err(e) if matches!(e.kind(), io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound)
        );
        entry.acl = match (has_acl, has_context) {
            (true, _) => AclStatus::Full,
            (false, true) => AclStatus::ContextOnly,
            (false, false) if refused => AclStatus::Unknown,
            (false, false) => AclStatus::None,
        };

        if let Err(err) = &info.entries {
            if opts.format == Format::Long && !refused && !is_unsupported(err) {
                diag.note(format_args!("{}: {}", path.display(), crate::diag::describe(err)));
            }
        }
        match info.context {
            Ok(ctx) => entry.security_context = Some(ctx),
            Err(err) => {
                let no_data = err.raw_os_error() == Some(nix::errno::Errno::ENODATA as i32);
                if opts.print_scontext && !is_unsupported(&err) && !no_data {
                    diag.note(format_args!("{}: {}", path.display(), crate::diag::describe(&err)));
                }
                entry.security_context = Some("?".to_string());
            }
        }
    }

    fn probe_capability(
        &mut self,
        fs: &dyn FileSystem,
        path: &Path,
        md: Option<&MetadataSnapshot>,
    ) -> bool {
        let dev = md.map(|m| m.dev);
        if dev.is_some() && dev == self.cap_unsupported_dev {
            return false;
        }
        match fs.has_capability(path) {
            Ok(has) => has,
            Err(err) => {
                if is_unsupported(&err) {
                    self.cap_unsupported_dev = dev;
                }
                false
            }
        }
    }

    fn update_name_widths(&mut self, entry: &Entry, opts: &ListingOptions) {
        if opts.print_inode {
            let len = entry.inode().map_or(1, |i| i.to_string().len());
            self.widths.inode = self.widths.inode.max(len);
        }
    }

    fn update_metadata_widths(
        &mut self,
        entry: &Entry,
        md: &MetadataSnapshot,
        opts: &ListingOptions,
    ) {
        let w = &mut self.widths;
        if opts.format == Format::Long || opts.print_block_size {
            w.block_size = w.block_size.max(block_string(md.blocks, opts.size_units).len());
        }
        if opts.print_scontext {
            let ctx = entry.security_context.as_deref().unwrap_or("?");
            w.scontext = w.scontext.max(UnicodeWidthStr::width(ctx));
        }
        if opts.format != Format::Long {
            return;
        }
        if opts.print_owner {
            let owner = self.names.owner(md.uid, opts.numeric_ids);
            w.owner = w.owner.max(UnicodeWidthStr::width(owner.as_str()));
        }
        if opts.print_group {
            let group = self.names.group(md.gid, opts.numeric_ids);
            w.group = w.group.max(UnicodeWidthStr::width(group.as_str()));
        }
        if opts.print_author {
            let author = self.names.owner(md.uid, opts.numeric_ids);
            w.author = w.author.max(UnicodeWidthStr::width(author.as_str()));
        }
        w.nlink = w.nlink.max(md.nlink.to_string().len());

        if matches!(entry.file_type, FileType::CharDevice | FileType::BlockDevice) {
            let major = nix::sys::stat::major(md.rdev).to_string().len();
            let minor = nix::sys::stat::minor(md.rdev).to_string().len();
            w.major = w.major.max(major);
            w.minor = w.minor.max(minor);
            w.file_size = w.file_size.max(w.major + 2 + w.minor);
        } else {
            w.file_size = w.file_size.max(size_string(md.size, opts.size_units).len());
        }
    }
}

fn is_missing_or_loop(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
        || err.raw_os_error() == Some(nix::errno::Errno::ELOOP as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::SortKey;

    #[test]
    fn metadata_policy_for_plain_listing() {
        let opts = ListingOptions::default();
        assert!(!metadata_needed(&opts, FileType::Regular, Some(1), false));
        assert!(metadata_needed(&opts, FileType::Regular, Some(1), true));
    }

    #[test]
    fn metadata_policy_for_inode_without_hint() {
        let opts = ListingOptions {
            print_inode: true,
            ..ListingOptions::default()
        };
        assert!(metadata_needed(&opts, FileType::Regular, None, false));
        assert!(!metadata_needed(&opts, FileType::Regular, Some(7), false));
    }

    #[test]
    fn metadata_policy_for_type_only_formats() {
        let opts = ListingOptions {
            indicator: IndicatorStyle::Slash,
            ..ListingOptions::default()
        };
        assert!(metadata_needed(&opts, FileType::Unknown, Some(1), false));
        assert!(!metadata_needed(&opts, FileType::Directory, Some(1), false));
        assert!(!metadata_needed(&opts, FileType::Regular, Some(1), false));

        let classify = ListingOptions {
            indicator: IndicatorStyle::Classify,
            ..ListingOptions::default()
        };
        assert!(metadata_needed(&classify, FileType::Regular, Some(1), false));
        assert!(metadata_needed(&classify, FileType::Symlink, Some(1), false));
    }

    #[test]
    fn metadata_policy_for_time_sort() {
        let mut opts = ListingOptions::default();
        opts.sort.key = SortKey::Time;
        assert!(metadata_needed(&opts, FileType::Regular, Some(1), false));
    }

    #[test]
    fn clear_resets_trackers() {
        let mut t = EntryTable::new();
        t.widths.owner = 9;
        let mut e = Entry::new("a", FileType::Regular);
        e.quoted = QuoteNeed::Quoted;
        t.push(e);
        t.reset_view();
        assert!(t.some_quoted());
        t.clear();
        assert!(t.is_empty());
        assert!(t.view().is_empty());
        assert_eq!(t.widths, ColumnWidths::default());
        assert!(!t.some_quoted());
    }

    #[test]
    fn extract_sorted_keeps_view_consistent() {
        let mut t = EntryTable::new();
        for (name, ft) in [
            ("x", FileType::ArgDirectory),
            ("b", FileType::Regular),
            ("y", FileType::ArgDirectory),
            ("a", FileType::Regular),
        ] {
            t.push(Entry::new(name, ft));
        }
        t.reset_view();
        t.view_mut().0.reverse();
        let dirs = t.extract_sorted(|e| e.file_type == FileType::ArgDirectory);
        let dir_names: Vec<_> = dirs
            .iter()
            .map(|e| e.name.to_string_lossy().into_owned())
            .collect();
        assert_eq!(dir_names, ["y", "x"]);
        let rest: Vec<_> = t.sorted().map(|e| e.name.to_string_lossy().into_owned()).collect();
        assert_eq!(rest, ["a", "b"]);
        assert_eq!(t.view().len(), t.len());
    }
}
