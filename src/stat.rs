//! File metadata record and uid/gid sign correction
//!
//! Some stat sources hand back owner ids through a signed 32-bit channel, so
//! `nobody` (`4294967294`) arrives as `-2` and `(uid_t)-1` as `-1`. The
//! corrector restores the unsigned value by adding 2^32 to a negative id and
//! leaves every other field alone.

use std::time::SystemTime;

/// Added to a negative id to recover its unsigned 32-bit value
pub const ID_WRAP: i64 = 1 << 32;

/// What kind of filesystem object a stat describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link (only from `lstat`)
    Symlink,
    /// Device, socket, FIFO, ...
    Other,
}

/// Metadata returned by the stat family
///
/// `uid` and `gid` are signed so that a raw negative value can be carried
/// until the corrector has seen it; after [`correct_ids`] they are always in
/// `0..2^32`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    /// Object kind
    pub kind: FileKind,
    /// Size in bytes
    pub size: u64,
    /// Mode bits (type + permissions)
    pub mode: u32,
    /// Owner user id
    pub uid: i64,
    /// Owner group id
    pub gid: i64,
    /// Number of hard links
    pub nlink: u64,
    /// Inode number
    pub ino: u64,
    /// Device id
    pub dev: u64,
    /// Last access time
    pub accessed: SystemTime,
    /// Last modification time
    pub modified: SystemTime,
    /// Birth time, where the filesystem records one
    pub created: Option<SystemTime>,
}

/// `std` and compio expose the same portable accessors but share no trait
#[cfg(not(unix))]
macro_rules! portable {
    ($metadata:expr) => {{
        let metadata = $metadata;
        let kind = if metadata.is_symlink() {
            FileKind::Symlink
        } else if metadata.is_dir() {
            FileKind::Directory
        } else if metadata.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        };

        FileStat {
            kind,
            size: metadata.len(),
            mode: if metadata.permissions().readonly() {
                0o444
            } else {
                0o666
            },
            uid: 0,
            gid: 0,
            nlink: 1,
            ino: 0,
            dev: 0,
            accessed: metadata.accessed().unwrap_or(SystemTime::UNIX_EPOCH),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            created: metadata.created().ok(),
        }
    }};
}

impl FileStat {
    /// Regular file?
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    /// Directory?
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Symbolic link?
    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }

    /// Build from Unix metadata (`std::fs::Metadata` or `compio::fs::Metadata`)
    #[cfg(unix)]
    #[must_use]
    pub fn from_unix<M: std::os::unix::fs::MetadataExt>(metadata: &M) -> Self {
        let mode = metadata.mode();
        let kind = match mode & libc::S_IFMT as u32 {
            m if m == libc::S_IFREG as u32 => FileKind::File,
            m if m == libc::S_IFDIR as u32 => FileKind::Directory,
            m if m == libc::S_IFLNK as u32 => FileKind::Symlink,
            _ => FileKind::Other,
        };

        Self {
            kind,
            size: metadata.size(),
            mode,
            uid: i64::from(metadata.uid()),
            gid: i64::from(metadata.gid()),
            nlink: metadata.nlink(),
            ino: metadata.ino(),
            dev: metadata.dev(),
            accessed: unix_time(metadata.atime(), metadata.atime_nsec()),
            modified: unix_time(metadata.mtime(), metadata.mtime_nsec()),
            created: None,
        }
    }

    /// Build from portable metadata on hosts without Unix ids
    #[cfg(not(unix))]
    #[must_use]
    pub fn from_std(metadata: &std::fs::Metadata) -> Self {
        portable!(metadata)
    }

    /// Build from compio metadata on hosts without Unix ids
    #[cfg(not(unix))]
    #[must_use]
    pub fn from_compio(metadata: &compio::fs::Metadata) -> Self {
        portable!(metadata)
    }
}

#[cfg(unix)]
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn unix_time(secs: i64, nanos: i64) -> SystemTime {
    let nanos = nanos.clamp(0, 999_999_999) as u32;
    if secs >= 0 {
        SystemTime::UNIX_EPOCH + std::time::Duration::new(secs as u64, nanos)
    } else {
        SystemTime::UNIX_EPOCH - std::time::Duration::new(secs.unsigned_abs(), 0)
            + std::time::Duration::new(0, nanos)
    }
}

/// Add 2^32 to a negative `uid`/`gid`
///
/// Returns `true` if either field was changed.
pub fn correct_ids(stat: &mut FileStat) -> bool {
    let mut corrected = false;
    if stat.uid < 0 {
        stat.uid += ID_WRAP;
        corrected = true;
    }
    if stat.gid < 0 {
        stat.gid += ID_WRAP;
        corrected = true;
    }
    corrected
}
