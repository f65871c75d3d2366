//! Fault-injecting backend
//!
//! Wraps [`OsFs`] and makes it misbehave on demand: a descriptor ceiling,
//! bursts of `EAGAIN` reads, locked renames, failing chown/chmod calls,
//! negative owner ids and a fixed directory order. Call counters let tests
//! check how often the layer reached the backend.

#![allow(dead_code)]

use compio::BufResult;
use graceful_fs::{
    AccessMode, AsyncFs, BlockingFs, ErrorCode, FileStat, FsCapabilities, OpenOptions, OsFs,
};
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Counts calls to one primitive
#[derive(Debug, Default)]
pub struct Calls(AtomicUsize);

impl Calls {
    fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct FaultyFs {
    inner: OsFs,
    /// Descriptors this backend may hold at once
    descriptor_limit: Option<usize>,
    /// Code returned when the ceiling is hit
    exhaustion_code: ErrorCode,
    /// Descriptors currently held
    in_use: AtomicUsize,
    /// Highest value `in_use` ever reached
    peak: AtomicUsize,
    /// Upcoming reads that fail with `EAGAIN`
    eagain_reads: AtomicU32,
    /// Upcoming renames that fail with the lock code
    locked_renames: AtomicU32,
    /// Lock code for renames
    rename_code: ErrorCode,
    /// Error returned by every chown/chmod family call
    ownership_error: Mutex<Option<ErrorCode>>,
    /// Raw owner ids reported by the stat family
    raw_ids: Mutex<Option<(i64, i64)>>,
    /// Directory listing returned instead of the real one
    dir_entries: Mutex<Option<Vec<OsString>>>,
    lchown_supported: AtomicBool,
    lchmod_supported: AtomicBool,

    pub opens: Calls,
    pub closes: Calls,
    pub reads: Calls,
    pub renames: Calls,
    pub stats: Calls,
    pub ownership_calls: Calls,
}

impl Default for FaultyFs {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultyFs {
    pub fn new() -> Self {
        Self {
            inner: OsFs::new(),
            descriptor_limit: None,
            exhaustion_code: ErrorCode::Emfile,
            in_use: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            eagain_reads: AtomicU32::new(0),
            locked_renames: AtomicU32::new(0),
            rename_code: ErrorCode::Eperm,
            ownership_error: Mutex::new(None),
            raw_ids: Mutex::new(None),
            dir_entries: Mutex::new(None),
            lchown_supported: AtomicBool::new(true),
            lchmod_supported: AtomicBool::new(true),
            opens: Calls::default(),
            closes: Calls::default(),
            reads: Calls::default(),
            renames: Calls::default(),
            stats: Calls::default(),
            ownership_calls: Calls::default(),
        }
    }

    /// Allow at most `limit` descriptors at once, failing beyond with `code`
    pub fn with_descriptor_limit(mut self, limit: usize, code: ErrorCode) -> Self {
        self.descriptor_limit = Some(limit);
        self.exhaustion_code = code;
        self
    }

    /// Renames fail with `code` instead of `EPERM`
    pub fn with_rename_code(mut self, code: ErrorCode) -> Self {
        self.rename_code = code;
        self
    }

    pub fn without_lchown(self) -> Self {
        self.lchown_supported.store(false, Ordering::SeqCst);
        self
    }

    pub fn without_lchmod(self) -> Self {
        self.lchmod_supported.store(false, Ordering::SeqCst);
        self
    }

    pub fn fail_reads(&self, count: u32) {
        self.eagain_reads.store(count, Ordering::SeqCst);
    }

    pub fn lock_renames(&self, count: u32) {
        self.locked_renames.store(count, Ordering::SeqCst);
    }

    pub fn fail_ownership(&self, code: Option<ErrorCode>) {
        *self.ownership_error.lock().unwrap() = code;
    }

    pub fn report_ids(&self, uid: i64, gid: i64) {
        *self.raw_ids.lock().unwrap() = Some((uid, gid));
    }

    pub fn list_as(&self, names: &[&str]) {
        *self.dir_entries.lock().unwrap() = Some(names.iter().map(OsString::from).collect());
    }

    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Take a descriptor, or fail like an exhausted process would
    fn acquire(&self) -> io::Result<()> {
        let held = self.in_use.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(limit) = self.descriptor_limit {
            if held > limit {
                self.in_use.fetch_sub(1, Ordering::SeqCst);
                return Err(self.exhaustion_code.to_io_error());
            }
        }
        self.peak.fetch_max(held, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        self.in_use.fetch_sub(1, Ordering::SeqCst);
    }

    /// Run a whole-file operation that holds a descriptor while it runs
    fn with_descriptor<T>(&self, result: impl FnOnce() -> io::Result<T>) -> io::Result<T> {
        self.acquire()?;
        let result = result();
        self.release();
        result
    }

    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn read_fault(&self) -> io::Result<()> {
        self.reads.hit();
        if Self::take(&self.eagain_reads) {
            return Err(ErrorCode::Eagain.to_io_error());
        }
        Ok(())
    }

    fn rename_fault(&self) -> io::Result<()> {
        self.renames.hit();
        if Self::take(&self.locked_renames) {
            return Err(self.rename_code.to_io_error());
        }
        Ok(())
    }

    fn ownership_fault(&self) -> io::Result<()> {
        self.ownership_calls.hit();
        match *self.ownership_error.lock().unwrap() {
            Some(code) => Err(code.to_io_error()),
            None => Ok(()),
        }
    }

    fn patch_ids(&self, result: io::Result<FileStat>) -> io::Result<FileStat> {
        self.stats.hit();
        let ids = *self.raw_ids.lock().unwrap();
        result.map(|mut stat| {
            if let Some((uid, gid)) = ids {
                stat.uid = uid;
                stat.gid = gid;
            }
            stat
        })
    }

    fn listing(&self, real: io::Result<Vec<OsString>>) -> io::Result<Vec<OsString>> {
        match self.dir_entries.lock().unwrap().clone() {
            Some(names) => Ok(names),
            None => real,
        }
    }
}

impl FsCapabilities for FaultyFs {
    fn supports_lchown(&self) -> bool {
        self.lchown_supported.load(Ordering::SeqCst)
    }

    fn supports_lchmod(&self) -> bool {
        self.lchmod_supported.load(Ordering::SeqCst)
    }

    fn name(&self) -> &'static str {
        "faulty"
    }
}

impl AsyncFs for FaultyFs {
    type File = compio::fs::File;

    async fn open(&self, path: &Path, options: &OpenOptions) -> io::Result<Self::File> {
        self.opens.hit();
        self.acquire()?;
        let result = self.inner.open(path, options).await;
        if result.is_err() {
            self.release();
        }
        result
    }

    async fn close(&self, file: Self::File) -> io::Result<()> {
        self.closes.hit();
        self.release();
        self.inner.close(file).await
    }

    async fn read(&self, file: &Self::File, buf: Vec<u8>, position: u64) -> BufResult<usize, Vec<u8>> {
        if let Err(e) = self.read_fault() {
            return BufResult(Err(e), buf);
        }
        self.inner.read(file, buf, position).await
    }

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.acquire()?;
        let result = self.inner.read_file(path).await;
        self.release();
        result
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.acquire()?;
        let result = self.inner.write_file(path, data).await;
        self.release();
        result
    }

    async fn append_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.acquire()?;
        let result = self.inner.append_file(path, data).await;
        self.release();
        result
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        self.acquire()?;
        let result = self.inner.read_dir(path).await;
        self.release();
        self.listing(result)
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.rename_fault()?;
        self.inner.rename(from, to).await
    }

    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        self.patch_ids(self.inner.stat(path).await)
    }

    async fn fstat(&self, file: &Self::File) -> io::Result<FileStat> {
        self.patch_ids(self.inner.fstat(file).await)
    }

    async fn lstat(&self, path: &Path) -> io::Result<FileStat> {
        self.patch_ids(self.inner.lstat(path).await)
    }

    async fn chown(&self, _path: &Path, _uid: u32, _gid: u32) -> io::Result<()> {
        self.ownership_fault()
    }

    async fn fchown(&self, _file: &Self::File, _uid: u32, _gid: u32) -> io::Result<()> {
        self.ownership_fault()
    }

    async fn lchown(&self, _path: &Path, _uid: u32, _gid: u32) -> io::Result<()> {
        self.ownership_fault()
    }

    async fn chmod(&self, _path: &Path, _mode: u32) -> io::Result<()> {
        self.ownership_fault()
    }

    async fn fchmod(&self, _file: &Self::File, _mode: u32) -> io::Result<()> {
        self.ownership_fault()
    }

    async fn lchmod(&self, _path: &Path, _mode: u32) -> io::Result<()> {
        self.ownership_fault()
    }

    async fn access(&self, path: &Path, mode: AccessMode) -> io::Result<()> {
        self.inner.access(path, mode).await
    }
}

impl BlockingFs for FaultyFs {
    type SyncFile = std::fs::File;

    fn open_sync(&self, path: &Path, options: &OpenOptions) -> io::Result<Self::SyncFile> {
        self.opens.hit();
        self.acquire()?;
        let result = self.inner.open_sync(path, options);
        if result.is_err() {
            self.release();
        }
        result
    }

    fn close_sync(&self, file: Self::SyncFile) -> io::Result<()> {
        self.closes.hit();
        self.release();
        self.inner.close_sync(file)
    }

    fn read_sync(&self, file: &Self::SyncFile, buf: &mut [u8], position: u64) -> io::Result<usize> {
        self.read_fault()?;
        self.inner.read_sync(file, buf, position)
    }

    fn read_file_sync(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.with_descriptor(|| self.inner.read_file_sync(path))
    }

    fn write_file_sync(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.with_descriptor(|| self.inner.write_file_sync(path, data))
    }

    fn append_file_sync(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.with_descriptor(|| self.inner.append_file_sync(path, data))
    }

    fn read_dir_sync(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let real = self.with_descriptor(|| self.inner.read_dir_sync(path));
        self.listing(real)
    }

    fn rename_sync(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.rename_fault()?;
        self.inner.rename_sync(from, to)
    }

    fn stat_sync(&self, path: &Path) -> io::Result<FileStat> {
        self.patch_ids(self.inner.stat_sync(path))
    }

    fn fstat_sync(&self, file: &Self::SyncFile) -> io::Result<FileStat> {
        self.patch_ids(self.inner.fstat_sync(file))
    }

    fn lstat_sync(&self, path: &Path) -> io::Result<FileStat> {
        self.patch_ids(self.inner.lstat_sync(path))
    }

    fn chown_sync(&self, _path: &Path, _uid: u32, _gid: u32) -> io::Result<()> {
        self.ownership_fault()
    }

    fn fchown_sync(&self, _file: &Self::SyncFile, _uid: u32, _gid: u32) -> io::Result<()> {
        self.ownership_fault()
    }

    fn lchown_sync(&self, _path: &Path, _uid: u32, _gid: u32) -> io::Result<()> {
        self.ownership_fault()
    }

    fn chmod_sync(&self, _path: &Path, _mode: u32) -> io::Result<()> {
        self.ownership_fault()
    }

    fn fchmod_sync(&self, _file: &Self::SyncFile, _mode: u32) -> io::Result<()> {
        self.ownership_fault()
    }

    fn lchmod_sync(&self, _path: &Path, _mode: u32) -> io::Result<()> {
        self.ownership_fault()
    }

    fn access_sync(&self, path: &Path, mode: AccessMode) -> io::Result<()> {
        self.inner.access_sync(path, mode)
    }
}
