#![allow(dead_code)]

use nix::errno::Errno;
use lsgrid::collate::{CollationError, Collator};
use lsgrid::config::ListingOptions;
use lsgrid::diag::{Diagnostic, Diagnostics, ExitStatus};
use lsgrid::entry::{Entry, FileType, MetadataSnapshot, Timestamp, S_IFDIR, S_IFLNK, S_IFREG};
use lsgrid::listing::Session;
use lsgrid::source::{unsupported, AclInfo, DirItem, DirStream, FileSystem, StatRequest};
use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;

/// Reference time used by every in-memory listing.
pub const NOW: Timestamp = Timestamp::new(1_700_000_000, 0);

/// Create a directory structure from a list of relative paths.
/// Paths ending with '/' create directories; others create empty files.
pub fn create_fixture(paths: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for p in paths {
        let full = tmp.path().join(p);
        if p.ends_with('/') {
            fs::create_dir_all(&full).unwrap();
        } else {
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&full, "").unwrap();
        }
    }
    tmp
}

/// Entry with valid metadata of the given size and mtime.
pub fn file_entry(name: &str, size: u64, mtime: i64) -> Entry {
    let mut e = Entry::new(name, FileType::Regular);
    e.metadata = Some(MetadataSnapshot {
        mode: S_IFREG | 0o644,
        size,
        nlink: 1,
        mtime: Timestamp::new(mtime, 0),
        ..MetadataSnapshot::default()
    });
    e
}

pub fn dir_entry(name: &str) -> Entry {
    let mut e = Entry::new(name, FileType::Directory);
    e.metadata = Some(MetadataSnapshot {
        mode: S_IFDIR | 0o755,
        nlink: 2,
        ..MetadataSnapshot::default()
    });
    e
}

/// Collator that succeeds for `fail_at - 1` comparisons and then fails.
pub struct FlakyCollator {
    pub fail_at: usize,
    pub calls: Cell<usize>,
}

impl FlakyCollator {
    pub fn new(fail_at: usize) -> Self {
        FlakyCollator {
            fail_at,
            calls: Cell::new(0),
        }
    }
}

impl Collator for FlakyCollator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering, CollationError> {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        if n == self.fail_at {
            return Err(CollationError {
                left: a.to_vec(),
                right: b.to_vec(),
                reason: "Invalid or incomplete multibyte or wide character",
            });
        }
        // Reverse byte order so a successful collated sort is distinguishable.
        Ok(b.cmp(a))
    }
}

#[derive(Debug, Clone)]
struct Node {
    md: MetadataSnapshot,
    target: Option<PathBuf>,
}

/// In-memory filesystem with scripted failures.
///
/// Paths are stored without `.` components, so `./a` and `a` are the same
/// node and `.` is the root.
#[derive(Debug)]
pub struct MockFs {
    nodes: HashMap<PathBuf, Node>,
    order: Vec<PathBuf>,
    stat_failures: HashMap<PathBuf, Errno>,
    next_ino: Cell<u64>,
    /// Directory reads omit inode numbers.
    pub hide_inodes: bool,
    /// Device whose ACL queries report "not supported".
    pub acl_unsupported_dev: Option<u64>,
    pub acl_calls: Cell<usize>,
}

fn key(path: &Path) -> PathBuf {
    path.components().filter(|c| *c != Component::CurDir).collect()
}

impl MockFs {
    pub fn new() -> Self {
        let mut fs = MockFs {
            nodes: HashMap::new(),
            order: Vec::new(),
            stat_failures: HashMap::new(),
            next_ino: Cell::new(2),
            hide_inodes: false,
            acl_unsupported_dev: None,
            acl_calls: Cell::new(0),
        };
        fs.insert("", S_IFDIR | 0o755, 0, 0, None);
        fs
    }

    fn insert(
        &mut self,
        path: &str,
        mode: u32,
        size: u64,
        mtime: i64,
        target: Option<PathBuf>,
    ) -> &mut Self {
        let ino = self.next_ino.get();
        self.next_ino.set(ino + 1);
        let md = MetadataSnapshot {
            dev: 1,
            ino,
            mode,
            nlink: 1,
            uid: 0,
            gid: 0,
            size,
            blocks: size.div_ceil(512),
            mtime: Timestamp::new(mtime, 0),
            ctime: Timestamp::new(mtime, 0),
            atime: Timestamp::new(mtime, 0),
            ..MetadataSnapshot::default()
        };
        let k = key(Path::new(path));
        if !self.nodes.contains_key(&k) {
            self.order.push(k.clone());
        }
        self.nodes.insert(k, Node { md, target });
        self
    }

    pub fn dir(&mut self, path: &str) -> &mut Self {
        self.insert(path, S_IFDIR | 0o755, 4096, 0, None)
    }

    pub fn file(&mut self, path: &str, size: u64, mtime: i64) -> &mut Self {
        self.insert(path, S_IFREG | 0o644, size, mtime, None)
    }

    pub fn symlink(&mut self, path: &str, target: &str) -> &mut Self {
        let len = target.len() as u64;
        self.insert(path, S_IFLNK | 0o777, len, 0, Some(PathBuf::from(target)))
    }

    /// Give `path` the identity of `other`, as a bind mount or hard link would.
    pub fn alias_identity(&mut self, path: &str, other: &str) -> &mut Self {
        let ino = self.nodes[&key(Path::new(other))].md.ino;
        if let Some(node) = self.nodes.get_mut(&key(Path::new(path))) {
            node.md.ino = ino;
        }
        self
    }

    pub fn set_dev(&mut self, path: &str, dev: u64) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(&key(Path::new(path))) {
            node.md.dev = dev;
        }
        self
    }

    /// Make every stat and lstat of `path` fail with `errno`.
    pub fn fail_stat(&mut self, path: &str, errno: Errno) -> &mut Self {
        self.stat_failures.insert(key(Path::new(path)), errno);
        self
    }

    fn lookup(&self, path: &Path) -> io::Result<(PathBuf, &Node)> {
        let k = key(path);
        if let Some(errno) = self.stat_failures.get(&k) {
            return Err((*errno).into());
        }
        match self.nodes.get(&k) {
            Some(node) => Ok((k, node)),
            None => Err(Errno::ENOENT.into()),
        }
    }

    fn resolve(&self, path: &Path) -> io::Result<(PathBuf, &Node)> {
        let (mut k, mut node) = self.lookup(path)?;
        for _ in 0..8 {
            let Some(target) = &node.target else {
                return Ok((k, node));
            };
            let next = match k.parent() {
                Some(parent) if target.is_relative() => parent.join(target),
                _ => target.clone(),
            };
            (k, node) = self.lookup(&next)?;
        }
        Err(Errno::ELOOP.into())
    }
}

impl FileSystem for MockFs {
    fn stat(&self, path: &Path, _request: StatRequest) -> io::Result<MetadataSnapshot> {
        self.resolve(path).map(|(_, node)| node.md.clone())
    }

    fn lstat(&self, path: &Path, _request: StatRequest) -> io::Result<MetadataSnapshot> {
        self.lookup(path).map(|(_, node)| node.md.clone())
    }

    fn read_link(&self, path: &Path) -> io::Result<OsString> {
        let (_, node) = self.lookup(path)?;
        node.target
            .as_ref()
            .map(|t| t.clone().into_os_string())
            .ok_or_else(|| Errno::EINVAL.into())
    }

    fn read_dir(&self, path: &Path) -> io::Result<DirStream<'_>> {
        let (k, node) = self.resolve(path)?;
        if node.md.file_type() != FileType::Directory {
            return Err(Errno::ENOTDIR.into());
        }
        let hide = self.hide_inodes;
        let items: Vec<io::Result<DirItem>> = self
            .order
            .iter()
            .filter(|p| p.parent() == Some(k.as_path()) && !p.as_os_str().is_empty())
            .map(|p| {
                let child = &self.nodes[p];
                let name = p.file_name().unwrap_or_default().to_os_string();
                let inode = (!hide).then_some(child.md.ino);
                Ok(DirItem::new(name, child.md.file_type(), inode))
            })
            .collect();
        Ok(Box::new(items.into_iter()))
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let (k, _) = self.resolve(path)?;
        Ok(Path::new("/mock").join(k))
    }

    fn acl_info(&self, path: &Path, follow: bool, _want_context: bool) -> AclInfo {
        self.acl_calls.set(self.acl_calls.get() + 1);
        let md = if follow {
            self.stat(path, StatRequest::default())
        } else {
            self.lstat(path, StatRequest::default())
        };
        match md {
            Ok(md) if Some(md.dev) == self.acl_unsupported_dev => AclInfo::unsupported(),
            Ok(_) => AclInfo {
                entries: Ok(0),
                context: Err(unsupported()),
            },
            Err(e) => AclInfo {
                entries: Err(e),
                context: Err(unsupported()),
            },
        }
    }
}

/// Output, exit status and diagnostics of one in-memory listing.
pub struct Run {
    pub stdout: String,
    pub status: ExitStatus,
    pub diagnostics: Vec<Diagnostic>,
}

impl Run {
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(|d| d.message.clone()).collect()
    }
}

/// List `args` on `fs` with a bytewise collator and return what was printed.
pub fn run_listing(fs: &MockFs, opts: ListingOptions, args: &[&str]) -> Run {
    run_listing_with(fs, &lsgrid::collate::ByteCollator, opts, args)
}

pub fn run_listing_with(
    fs: &MockFs,
    collator: &dyn Collator,
    opts: ListingOptions,
    args: &[&str],
) -> Run {
    let args: Vec<PathBuf> = args.iter().map(PathBuf::from).collect();
    let mut out = Vec::new();
    let (status, diag) = Session::new(opts, fs, collator, Diagnostics::capturing(), &mut out)
        .with_now(NOW)
        .run(&args)
        .unwrap();
    Run {
        stdout: String::from_utf8(out).unwrap(),
        status,
        diagnostics: diag.recorded().to_vec(),
    }
}
