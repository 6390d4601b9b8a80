//! Per-file records gathered for one listing batch.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

/// File type tag for an entry.
///
/// `ArgDirectory` marks a directory named on the command line that is listed
/// as a batch of its own rather than shown as a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    #[default]
    Unknown,
    Fifo,
    CharDevice,
    Directory,
    BlockDevice,
    Regular,
    Symlink,
    Socket,
    Whiteout,
    ArgDirectory,
}

impl FileType {
    /// Type tag derived from the `S_IFMT` bits of a mode word.
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFIFO => FileType::Fifo,
            S_IFCHR => FileType::CharDevice,
            S_IFDIR => FileType::Directory,
            S_IFBLK => FileType::BlockDevice,
            S_IFREG => FileType::Regular,
            S_IFLNK => FileType::Symlink,
            S_IFSOCK => FileType::Socket,
            _ => FileType::Unknown,
        }
    }

    pub fn is_directory(self) -> bool {
        matches!(self, FileType::Directory | FileType::ArgDirectory)
    }

    /// Leading character of the long-format mode string.
    pub fn mode_letter(self) -> char {
        match self {
            FileType::Unknown => '?',
            FileType::Fifo => 'p',
            FileType::CharDevice => 'c',
            FileType::Directory | FileType::ArgDirectory => 'd',
            FileType::BlockDevice => 'b',
            FileType::Regular => '-',
            FileType::Symlink => 'l',
            FileType::Socket => 's',
            FileType::Whiteout => 'w',
        }
    }
}

pub const S_IFMT: u32 = 0o170_000;
pub const S_IFSOCK: u32 = 0o140_000;
pub const S_IFLNK: u32 = 0o120_000;
pub const S_IFREG: u32 = 0o100_000;
pub const S_IFBLK: u32 = 0o060_000;
pub const S_IFDIR: u32 = 0o040_000;
pub const S_IFCHR: u32 = 0o020_000;
pub const S_IFIFO: u32 = 0o010_000;

pub const S_ISUID: u32 = 0o4000;
pub const S_ISGID: u32 = 0o2000;
pub const S_ISVTX: u32 = 0o1000;
pub const S_IXUGO: u32 = 0o111;
pub const S_IWOTH: u32 = 0o002;

/// Seconds and nanoseconds since the epoch. Ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub const fn new(secs: i64, nanos: u32) -> Self {
        Timestamp { secs, nanos }
    }
}

/// Which timestamp the time sort key and the long format read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeField {
    #[default]
    Modification,
    Change,
    Access,
    Birth,
}

/// A `stat` result, trimmed to the fields the lister consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataSnapshot {
    pub dev: u64,
    pub ino: u64,
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub size: u64,
    /// Allocated blocks in 512-byte units.
    pub blocks: u64,
    pub atime: Timestamp,
    pub mtime: Timestamp,
    pub ctime: Timestamp,
    pub btime: Option<Timestamp>,
}

impl MetadataSnapshot {
    pub fn file_type(&self) -> FileType {
        FileType::from_mode(self.mode)
    }

    /// The requested timestamp; a missing birth time reads as the epoch.
    pub fn time(&self, field: TimeField) -> Timestamp {
        match field {
            TimeField::Modification => self.mtime,
            TimeField::Change => self.ctime,
            TimeField::Access => self.atime,
            TimeField::Birth => self.btime.unwrap_or_default(),
        }
    }
}

impl From<&std::fs::Metadata> for MetadataSnapshot {
    fn from(md: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        let btime = md.created().ok().and_then(|t| {
            t.duration_since(std::time::UNIX_EPOCH)
                .ok()
                .map(|d| Timestamp::new(d.as_secs() as i64, d.subsec_nanos()))
        });
        MetadataSnapshot {
            dev: md.dev(),
            ino: md.ino(),
            mode: md.mode(),
            nlink: md.nlink(),
            uid: md.uid(),
            gid: md.gid(),
            rdev: md.rdev(),
            size: md.size(),
            blocks: md.blocks(),
            atime: Timestamp::new(md.atime(), md.atime_nsec() as u32),
            mtime: Timestamp::new(md.mtime(), md.mtime_nsec() as u32),
            ctime: Timestamp::new(md.ctime(), md.ctime_nsec() as u32),
            btime,
        }
    }
}

/// ACL / security-context classification of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AclStatus {
    #[default]
    None,
    /// The query was refused (access error); shown as `?`.
    Unknown,
    /// Only a security context is present; shown as `.`.
    ContextOnly,
    /// A non-trivial ACL is present; shown as `+`.
    Full,
}

/// Whether the quoted name carries outer quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteNeed {
    /// Not evaluated (quoting alignment is inactive).
    #[default]
    Unknown,
    /// No outer quotes; needs one column of padding when a sibling is quoted.
    Unquoted,
    Quoted,
}

/// One discovered file, directory or link.
#[derive(Debug, Clone, Default)]
pub struct Entry {
    /// Raw name as given or as read from the directory; never display-escaped.
    pub name: OsString,
    /// Stored target of a symlink; `None` for non-links and failed reads.
    pub link_target: Option<OsString>,
    /// Mode of the symlink's target when it could be followed.
    pub link_mode: Option<u32>,
    /// Canonical absolute path, resolved only for hyperlink output.
    pub absolute_path: Option<PathBuf>,
    pub file_type: FileType,
    /// `Some` exactly when `stat` succeeded; otherwise every metadata field is unknown.
    pub metadata: Option<MetadataSnapshot>,
    /// Inode number hinted by the directory read, if any.
    pub inode_hint: Option<u64>,
    pub acl: AclStatus,
    /// Security context, `?` when unavailable.
    pub security_context: Option<String>,
    pub has_capability: bool,
    pub quoted: QuoteNeed,
    /// Display width of the quoted name, cached before sorting/layout.
    pub width: Option<usize>,
}

impl Entry {
    pub fn new(name: impl Into<OsString>, file_type: FileType) -> Self {
        Entry {
            name: name.into(),
            file_type,
            ..Entry::default()
        }
    }

    pub fn name_bytes(&self) -> &[u8] {
        self.name.as_bytes()
    }

    pub fn name_os(&self) -> &OsStr {
        &self.name
    }

    pub fn metadata_valid(&self) -> bool {
        self.metadata.is_some()
    }

    /// Size in bytes, zero when metadata is unavailable.
    pub fn size(&self) -> u64 {
        self.metadata.as_ref().map_or(0, |md| md.size)
    }

    /// Timestamp for sorting, the epoch when metadata is unavailable.
    pub fn time(&self, field: TimeField) -> Timestamp {
        self.metadata
            .as_ref()
            .map_or_else(Timestamp::default, |md| md.time(field))
    }

    /// Inode number from metadata or the directory-read hint.
    pub fn inode(&self) -> Option<u64> {
        self.metadata.as_ref().map(|md| md.ino).or(self.inode_hint)
    }

    /// Directory, command-line directory, or a symlink resolving to a directory.
    pub fn is_directory_like(&self) -> bool {
        self.file_type.is_directory()
            || (self.file_type == FileType::Symlink
                && self.link_mode.is_some_and(|m| m & S_IFMT == S_IFDIR))
    }
}
