//! Concurrent appends to one file land at the real end of the file

mod common;

use anyhow::Result;
use common::{init_tracing, test_timeout_guard, FaultyFs};
use futures::future::join_all;
use graceful_fs::{AsyncFs, BlockingFs, ErrorCode, GracefulFs};
use std::time::Duration;
use tempfile::TempDir;

const RECORD: &[u8] = b"0123456789";

#[compio::test]
async fn test_concurrent_appends_keep_every_record() -> Result<()> {
    init_tracing();
    let _guard = test_timeout_guard(Duration::from_secs(30));
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("journal.log");
    let fs = GracefulFs::os();
    fs.write_file(&path, b"").await?;

    let results = join_all((0..32).map(|_| fs.append_file(&path, RECORD))).await;
    for result in results {
        result?;
    }

    let contents = fs.read_file(&path).await?;
    assert_eq!(contents.len(), 32 * RECORD.len());
    assert!(contents.chunks(RECORD.len()).all(|chunk| chunk == RECORD));
    Ok(())
}

#[compio::test]
async fn test_queued_appends_keep_every_record() -> Result<()> {
    init_tracing();
    let _guard = test_timeout_guard(Duration::from_secs(30));
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("journal.log");
    let fs = GracefulFs::with_defaults(FaultyFs::new().with_descriptor_limit(3, ErrorCode::Emfile));

    let results = join_all((0..24).map(|_| fs.append_file(&path, RECORD))).await;
    for result in results {
        result?;
    }

    assert_eq!(std::fs::read(&path)?.len(), 24 * RECORD.len());
    assert!(fs.stats().deferred() > 0);
    assert!(fs.backend().peak() <= 3);
    assert!(fs.queue().is_empty());
    Ok(())
}

#[test]
fn test_blocking_appends_from_threads_keep_every_record() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("journal.log");
    let fs = GracefulFs::os();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..4 {
                    fs.append_file_sync(&path, RECORD).unwrap();
                }
            });
        }
    });

    assert_eq!(std::fs::read(&path)?.len(), 32 * RECORD.len());
    Ok(())
}
