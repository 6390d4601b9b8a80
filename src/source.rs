//! Filesystem access behind a trait, so listings can run against the host or a fake.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tracing::trace;
use walkdir::WalkDir;

use crate::entry::{FileType, MetadataSnapshot};

/// Which optional `stat` fields the caller needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatRequest {
    pub birth_time: bool,
}

/// One name read from a directory, with the type and inode hints the read produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirItem {
    pub name: OsString,
    pub hint: FileType,
    pub inode: Option<u64>,
}

impl DirItem {
    pub fn new(name: impl Into<OsString>, hint: FileType, inode: Option<u64>) -> Self {
        DirItem {
            name: name.into(),
            hint,
            inode,
        }
    }
}

pub type DirStream<'a> = Box<dyn Iterator<Item = io::Result<DirItem>> + 'a>;

/// Result of an ACL / security-context query.
#[derive(Debug)]
pub struct AclInfo {
    /// Number of non-trivial ACL entries.
    pub entries: io::Result<usize>,
    pub context: io::Result<String>,
}

impl AclInfo {
    /// Both queries failing with "not supported".
    pub fn unsupported() -> Self {
        AclInfo {
            entries: Err(unsupported()),
            context: Err(unsupported()),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(&self.entries, Err(e) if is_unsupported(e))
    }
}

pub fn unsupported() -> io::Error {
    io::Error::from_raw_os_error(nix::errno::Errno::ENOTSUP as i32)
}

/// "Operation not supported" in either its std or raw errno form.
pub fn is_unsupported(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::Unsupported
        || err.raw_os_error() == Some(nix::errno::Errno::ENOTSUP as i32)
        || err.raw_os_error() == Some(nix::errno::Errno::EOPNOTSUPP as i32)
}

/// The filesystem operations a listing performs.
pub trait FileSystem {
    /// Metadata of `path`, following symlinks.
    fn stat(&self, path: &Path, request: StatRequest) -> io::Result<MetadataSnapshot>;

    /// Metadata of `path` itself.
    fn lstat(&self, path: &Path, request: StatRequest) -> io::Result<MetadataSnapshot>;

    fn read_link(&self, path: &Path) -> io::Result<OsString>;

    /// Names in `path`, excluding `.` and `..`.
    fn read_dir(&self, path: &Path) -> io::Result<DirStream<'_>>;

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    fn acl_info(&self, _path: &Path, _follow: bool, _want_context: bool) -> AclInfo {
        AclInfo::unsupported()
    }

    fn has_capability(&self, _path: &Path) -> io::Result<bool> {
        Err(unsupported())
    }
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl HostFs {
    pub fn new() -> Self {
        HostFs
    }
}

fn snapshot(md: &std::fs::Metadata, request: StatRequest) -> MetadataSnapshot {
    let mut snap = MetadataSnapshot::from(md);
    if !request.birth_time {
        snap.btime = None;
    }
    snap
}

fn hint_from(ft: std::fs::FileType) -> FileType {
    use std::os::unix::fs::FileTypeExt;

    if ft.is_symlink() {
        FileType::Symlink
    } else if ft.is_dir() {
        FileType::Directory
    } else if ft.is_file() {
        FileType::Regular
    } else if ft.is_fifo() {
        FileType::Fifo
    } else if ft.is_socket() {
        FileType::Socket
    } else if ft.is_char_device() {
        FileType::CharDevice
    } else if ft.is_block_device() {
        FileType::BlockDevice
    } else {
        FileType::Unknown
    }
}

impl FileSystem for HostFs {
    fn stat(&self, path: &Path, request: StatRequest) -> io::Result<MetadataSnapshot> {
        std::fs::metadata(path).map(|md| snapshot(&md, request))
    }

    fn lstat(&self, path: &Path, request: StatRequest) -> io::Result<MetadataSnapshot> {
        std::fs::symlink_metadata(path).map(|md| snapshot(&md, request))
    }

    fn read_link(&self, path: &Path) -> io::Result<OsString> {
        std::fs::read_link(path).map(PathBuf::into_os_string)
    }

    fn read_dir(&self, path: &Path) -> io::Result<DirStream<'_>> {
        use walkdir::DirEntryExt;

        let mut walker = WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .into_iter();

        // Opening the directory itself fails eagerly; later errors stay in the stream.
        let first = match walker.next() {
            Some(Err(err)) if err.depth() == 0 => return Err(io::Error::from(err)),
            other => other,
        };
        trace!(path = %path.display(), "directory opened");

        let items = first.into_iter().chain(walker).map(|res| {
            res.map(|entry| {
                DirItem::new(
                    entry.file_name().to_os_string(),
                    hint_from(entry.file_type()),
                    Some(entry.ino()),
                )
            })
            .map_err(io::Error::from)
        });
        Ok(Box::new(items))
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn read_dir_lists_names_without_dot_entries() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "x").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();

        let mut items: Vec<DirItem> = HostFs
            .read_dir(tmp.path())
            .unwrap()
            .collect::<io::Result<_>>()
            .unwrap();
        items.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "a.txt");
        assert_eq!(items[0].hint, FileType::Regular);
        assert_eq!(items[1].hint, FileType::Directory);
        assert!(items[1].inode.is_some());
    }

    #[test]
    fn read_dir_on_missing_path_fails_up_front() {
        let tmp = TempDir::new().unwrap();
        let err = HostFs.read_dir(&tmp.path().join("nope")).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn lstat_does_not_follow_links() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("d")).unwrap();
        std::os::unix::fs::symlink("d", tmp.path().join("l")).unwrap();

        let req = StatRequest::default();
        let link = HostFs.lstat(&tmp.path().join("l"), req).unwrap();
        let target = HostFs.stat(&tmp.path().join("l"), req).unwrap();
        assert_eq!(link.file_type(), FileType::Symlink);
        assert_eq!(target.file_type(), FileType::Directory);
        assert_eq!(HostFs.read_link(&tmp.path().join("l")).unwrap(), "d");
    }

    #[test]
    fn host_reports_acl_unsupported() {
        let info = HostFs.acl_info(Path::new("/"), true, true);
        assert!(info.is_unsupported());
        assert!(is_unsupported(&HostFs.has_capability(Path::new("/")).unwrap_err()));
    }
}
