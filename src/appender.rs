use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex,
};
use tracing::{debug, error, info};

use crate::pool::SeenSet;

/// Outcome of offering a candidate to the [`DedupAppender`].
#[derive(Debug)]
pub enum Submission {
    /// The candidate was new, and has been appended to the backing file.
    Recorded,
    /// The candidate has been seen before, nothing was written.
    Duplicate,
    /// The appender has already recorded its target number of passwords, nothing was written.
    TargetReached,
    /// Writing to the backing file failed, the candidate wasn't recorded and may be
    /// submitted again.
    Failed(std::io::Error),
}

/// Gate in front of the backing file, ensuring every password is written to it exactly once.
///
/// The membership check, the append and the insert into the [`SeenSet`] all happen while
/// holding a single lock, so concurrent submissions of the same candidate can't both reach the
/// file.
pub struct DedupAppender {
    path: PathBuf,
    sync_writes: bool,
    target: Option<usize>,
    seen: Mutex<SeenSet>,
    recorded: AtomicUsize,
}

impl DedupAppender {
    pub fn new(path: PathBuf, seen: SeenSet, sync_writes: bool) -> Self {
        Self {
            path,
            sync_writes,
            target: None,
            seen: Mutex::new(seen),
            recorded: AtomicUsize::new(0),
        }
    }

    /// Stop accepting new passwords once `target` of them have been recorded.
    #[must_use]
    pub fn with_target(mut self, target: Option<usize>) -> Self {
        self.target = target;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of candidates recorded by this instance.
    pub fn recorded(&self) -> usize {
        self.recorded.load(Ordering::Acquire)
    }

    pub fn target_reached(&self) -> bool {
        self.target.is_some_and(|target| self.recorded() >= target)
    }

    /// Number of distinct passwords known, including the ones loaded at startup.
    pub async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }

    #[cfg(test)]
    pub async fn snapshot(&self) -> SeenSet {
        self.seen.lock().await.clone()
    }

    pub async fn submit(&self, candidate: &str) -> Submission {
        let mut seen = self.seen.lock().await;

        if self.target_reached() {
            return Submission::TargetReached;
        }

        if seen.contains(candidate) {
            return Submission::Duplicate;
        }

        if let Err(e) = self.append(candidate).await {
            return Submission::Failed(e);
        }

        seen.insert(candidate);
        self.recorded.fetch_add(1, Ordering::AcqRel);
        drop(seen);

        info!(password = candidate, "Password saved");

        Submission::Recorded
    }

    /// Appends `candidate` as a single line. If any part of the write fails, the file is
    /// truncated back to its previous length so no partial or unrecorded line is left behind.
    async fn append(&self, candidate: &str) -> Result<(), std::io::Error> {
        let mut file = OpenOptions::default()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let previous_len = file.metadata().await?.len();

        if let Err(e) = write_line(&mut file, candidate, self.sync_writes).await {
            rollback(&mut file, previous_len).await;
            return Err(e);
        }

        Ok(())
    }
}

async fn write_line(file: &mut File, candidate: &str, sync: bool) -> Result<(), std::io::Error> {
    let mut line = Vec::with_capacity(candidate.len() + 1);
    line.extend_from_slice(candidate.as_bytes());
    line.push(b'\n');

    file.write_all(&line).await?;
    file.flush().await?;

    if sync {
        debug!("Syncing wordlist to disk");
        file.sync_data().await?;
    }

    Ok(())
}

async fn rollback(file: &mut File, len: u64) {
    if let Err(e) = file.set_len(len).await {
        error!(len, "Failed to truncate wordlist after failed write: {e}");
    }
}

#[cfg(test)]
mod test {
    use super::{rollback, DedupAppender, Submission};
    use crate::pool::{self, SeenSet};
    use std::{path::Path, sync::Arc};

    fn lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(ToString::to_string)
            .collect()
    }

    #[tokio::test]
    async fn records_then_rejects_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("StormList.txt");
        let appender = DedupAppender::new(path.clone(), SeenSet::default(), false);

        assert!(matches!(
            appender.submit("alpha9999").await,
            Submission::Recorded
        ));
        assert_eq!(lines(&path), vec!["alpha9999"]);

        assert!(matches!(
            appender.submit("alpha9999").await,
            Submission::Duplicate
        ));
        assert_eq!(lines(&path), vec!["alpha9999"]);
        assert_eq!(appender.recorded(), 1);
    }

    #[tokio::test]
    async fn preloaded_passwords_are_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("StormList.txt");
        std::fs::write(&path, "storm0001\n").unwrap();

        let appender = DedupAppender::new(path.clone(), pool::load(&path).await.unwrap(), true);

        assert!(matches!(
            appender.submit("storm0001").await,
            Submission::Duplicate
        ));
        assert!(matches!(
            appender.submit("storm0002").await,
            Submission::Recorded
        ));
        assert_eq!(lines(&path), vec!["storm0001", "storm0002"]);
        assert_eq!(appender.len().await, 2);
    }

    #[tokio::test]
    async fn failed_write_is_not_remembered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("StormList.txt");
        let appender = DedupAppender::new(path.clone(), SeenSet::default(), false);

        assert!(matches!(
            appender.submit("alpha9999").await,
            Submission::Failed(_)
        ));
        assert_eq!(appender.len().await, 0);
        assert_eq!(appender.recorded(), 0);

        std::fs::create_dir(path.parent().unwrap()).unwrap();

        assert!(matches!(
            appender.submit("alpha9999").await,
            Submission::Recorded
        ));
        assert_eq!(lines(&path), vec!["alpha9999"]);
    }

    #[tokio::test]
    async fn cardinality_tracks_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("StormList.txt");
        let appender = DedupAppender::new(path, SeenSet::default(), false);

        let mut expected = 0;
        for candidate in ["a", "b", "a", "c", "b", "d", "a"] {
            let before = appender.len().await;

            match appender.submit(candidate).await {
                Submission::Recorded => expected += 1,
                Submission::Duplicate => {}
                other => panic!("unexpected outcome: {other:?}"),
            }

            let after = appender.len().await;
            assert!(after == before || after == before + 1);
            assert_eq!(after, expected);
        }

        assert_eq!(expected, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_identical_submissions_record_once() {
        const WORKERS: usize = 64;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("StormList.txt");
        let appender = Arc::new(DedupAppender::new(path.clone(), SeenSet::default(), false));
        let barrier = Arc::new(tokio::sync::Barrier::new(WORKERS));

        let handles = (0..WORKERS)
            .map(|_| {
                let appender = appender.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    appender.submit("alpha9999").await
                })
            })
            .collect::<Vec<_>>();

        let mut recorded = 0;
        let mut duplicate = 0;
        for res in futures::future::try_join_all(handles).await.unwrap() {
            match res {
                Submission::Recorded => recorded += 1,
                Submission::Duplicate => duplicate += 1,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }

        assert_eq!(recorded, 1);
        assert_eq!(duplicate, WORKERS - 1);
        assert_eq!(lines(&path), vec!["alpha9999"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_overlapping_submissions_write_each_once_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("StormList.txt");
        let appender = Arc::new(DedupAppender::new(path.clone(), SeenSet::default(), false));

        let handles = (0..16)
            .map(|worker| {
                let appender = appender.clone();
                tokio::spawn(async move {
                    for i in 0..50 {
                        appender.submit(&format!("storm{:04}", (worker + i) % 40)).await;
                    }
                })
            })
            .collect::<Vec<_>>();
        futures::future::try_join_all(handles).await.unwrap();

        let mut written = lines(&path);
        written.sort();
        let before = written.len();
        written.dedup();
        assert_eq!(written.len(), before);
        assert_eq!(written.len(), 40);

        let reloaded = pool::load(&path).await.unwrap();
        assert_eq!(reloaded, appender.snapshot().await);
    }

    #[tokio::test]
    async fn stops_recording_at_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("StormList.txt");
        let appender =
            DedupAppender::new(path.clone(), SeenSet::default(), false).with_target(Some(2));

        assert!(matches!(appender.submit("a").await, Submission::Recorded));
        assert!(!appender.target_reached());
        assert!(matches!(appender.submit("b").await, Submission::Recorded));
        assert!(appender.target_reached());

        assert!(matches!(
            appender.submit("c").await,
            Submission::TargetReached
        ));
        assert_eq!(lines(&path), vec!["a", "b"]);
        assert_eq!(appender.recorded(), 2);
        assert_eq!(appender.len().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_submissions_never_exceed_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("StormList.txt");
        let appender = Arc::new(
            DedupAppender::new(path.clone(), SeenSet::default(), false).with_target(Some(50)),
        );
        let barrier = Arc::new(tokio::sync::Barrier::new(100));

        let handles = (0..100)
            .map(|i| {
                let appender = appender.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    appender.submit(&format!("storm{i:04}")).await
                })
            })
            .collect::<Vec<_>>();

        let outcomes = futures::future::try_join_all(handles).await.unwrap();
        let recorded = outcomes
            .iter()
            .filter(|v| matches!(v, Submission::Recorded))
            .count();
        let refused = outcomes
            .iter()
            .filter(|v| matches!(v, Submission::TargetReached))
            .count();

        assert_eq!(recorded, 50);
        assert_eq!(refused, 50);
        assert_eq!(lines(&path).len(), 50);
    }

    #[tokio::test]
    async fn rollback_removes_partial_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("StormList.txt");
        std::fs::write(&path, "storm0001\n").unwrap();

        let mut file = tokio::fs::OpenOptions::default()
            .append(true)
            .open(&path)
            .await
            .unwrap();
        let previous_len = file.metadata().await.unwrap().len();
        tokio::io::AsyncWriteExt::write_all(&mut file, b"storm00")
            .await
            .unwrap();
        tokio::io::AsyncWriteExt::flush(&mut file).await.unwrap();

        rollback(&mut file, previous_len).await;

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "storm0001\n");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn failed_write_leaves_nothing_behind() {
        let appender = DedupAppender::new("/dev/full".into(), SeenSet::default(), true);

        for _ in 0..2 {
            assert!(matches!(
                appender.submit("alpha9999").await,
                Submission::Failed(_)
            ));
        }

        assert_eq!(appender.len().await, 0);
        assert_eq!(appender.recorded(), 0);
    }
}
