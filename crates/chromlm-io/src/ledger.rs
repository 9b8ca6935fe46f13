use chromlm_core::{AnalysisRecord, AnalysisResult, HISTORY_KEY, PostUrl};
use chromlm_error::{Error, Result};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::store::LocalStore;

/// Number of records kept when no cap is configured.
pub const DEFAULT_HISTORY_CAP: usize = 20;

/// Bounded history of past analyses, newest first, unique by post URL.
///
/// Doubles as the analysis cache: a stored result is returned for its URL
/// regardless of age. Each mutation rewrites the whole `history` record, and
/// mutations made through one ledger are serialized so a read-modify-write
/// never interleaves with another.
#[derive(Debug)]
pub struct HistoryLedger {
    store: LocalStore,
    cap: usize,
    write_lock: Mutex<()>,
}

impl HistoryLedger {
    pub fn new(store: LocalStore, cap: usize) -> Self {
        Self {
            store,
            cap: cap.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_default_cap(store: LocalStore) -> Self {
        Self::new(store, DEFAULT_HISTORY_CAP)
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Creates an empty history on first activation; leaves an existing one alone.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.store.get::<Vec<AnalysisRecord>>(HISTORY_KEY).await?.is_none() {
            debug!("initializing empty history");
            self.store.set(HISTORY_KEY, &Vec::<AnalysisRecord>::new()).await?;
        }
        Ok(())
    }

    /// Snapshot of the history, newest first. A history that cannot be
    /// decoded reads as empty; the next mutation overwrites it.
    pub async fn all(&self) -> Result<Vec<AnalysisRecord>> {
        match self.store.get::<Vec<AnalysisRecord>>(HISTORY_KEY).await {
            Ok(history) => Ok(history.unwrap_or_default()),
            Err(Error::Serialization { message, .. }) => {
                warn!(%message, "history record is unreadable, treating it as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn lookup(&self, url: &PostUrl) -> Result<Option<AnalysisResult>> {
        let history = self.all().await?;
        Ok(history
            .into_iter()
            .find(|record| record.url == url.as_str())
            .map(|record| record.result))
    }

    /// Stores `result` for `url`, replacing an existing entry in place or
    /// inserting a new one at the front, then trims the oldest entries.
    #[instrument(skip(self, url, result), fields(url = %url))]
    pub async fn upsert(&self, url: &PostUrl, result: AnalysisResult) -> Result<AnalysisRecord> {
        let _guard = self.write_lock.lock().await;
        let mut history = self.all().await?;
        let record = AnalysisRecord::new(url, result);
        let dropped = upsert_into(&mut history, record.clone(), self.cap);
        self.store.set(HISTORY_KEY, &history).await?;
        debug!(len = history.len(), dropped, "history updated");
        Ok(record)
    }

    /// Empties the history unconditionally. Confirmation is the caller's job.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.set(HISTORY_KEY, &Vec::<AnalysisRecord>::new()).await?;
        debug!("history cleared");
        Ok(())
    }
}

/// Returns how many records were trimmed from the tail.
fn upsert_into(history: &mut Vec<AnalysisRecord>, record: AnalysisRecord, cap: usize) -> usize {
    match history.iter().position(|existing| existing.url == record.url) {
        Some(idx) => history[idx] = record,
        None => history.insert(0, record),
    }
    let dropped = history.len().saturating_sub(cap);
    history.truncate(cap);
    dropped
}

#[cfg(test)]
mod tests {
    use chromlm_core::{Certainty, Verdict};
    use chromlm_test_utils::post_url;

    use super::*;

    fn url(id: &str) -> PostUrl {
        PostUrl::parse(post_url(id)).unwrap()
    }

    fn verdict(v: Verdict, certainty: i64) -> AnalysisResult {
        AnalysisResult {
            verdict: Some(v),
            certainty: Some(Certainty::new(certainty)),
            ..Default::default()
        }
    }

    #[test]
    fn new_entries_go_to_the_front() {
        let mut history = Vec::new();
        upsert_into(&mut history, AnalysisRecord::new(&url("a"), verdict(Verdict::No, 1)), 20);
        upsert_into(&mut history, AnalysisRecord::new(&url("b"), verdict(Verdict::No, 2)), 20);
        let ids: Vec<_> = history.iter().map(|r| r.post_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn existing_entry_is_replaced_in_place() {
        let mut history = Vec::new();
        for id in ["a", "b", "c"] {
            upsert_into(&mut history, AnalysisRecord::new(&url(id), verdict(Verdict::No, 10)), 20);
        }
        upsert_into(&mut history, AnalysisRecord::new(&url("a"), verdict(Verdict::Yes, 99)), 20);
        let ids: Vec<_> = history.iter().map(|r| r.post_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert_eq!(history[2].result.verdict, Some(Verdict::Yes));
    }

    #[test]
    fn overflow_is_trimmed_from_the_tail() {
        let mut history = Vec::new();
        let mut dropped = 0;
        for i in 0..25 {
            dropped += upsert_into(
                &mut history,
                AnalysisRecord::new(&url(&format!("p{i}")), verdict(Verdict::No, 1)),
                20,
            );
        }
        assert_eq!(history.len(), 20);
        assert_eq!(dropped, 5);
        assert_eq!(history[0].post_id, "p24");
        assert_eq!(history[19].post_id, "p5");
    }

    #[tokio::test]
    async fn initialize_does_not_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = HistoryLedger::with_default_cap(LocalStore::open(dir.path()).unwrap());
        ledger.initialize().await.unwrap();
        assert!(ledger.all().await.unwrap().is_empty());

        ledger.upsert(&url("a"), verdict(Verdict::Yes, 80)).await.unwrap();
        ledger.initialize().await.unwrap();
        assert_eq!(ledger.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unreadable_history_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        std::fs::write(store.record_path(HISTORY_KEY), b"{ not a history").unwrap();
        let ledger = HistoryLedger::with_default_cap(store);

        assert!(ledger.all().await.unwrap().is_empty());
        assert!(ledger.lookup(&url("a")).await.unwrap().is_none());

        ledger.upsert(&url("a"), verdict(Verdict::Yes, 80)).await.unwrap();
        let all = ledger.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].post_id, "a");
    }

    #[tokio::test]
    async fn mixed_case_host_records_the_post_id() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = HistoryLedger::with_default_cap(LocalStore::open(dir.path()).unwrap());
        let url = PostUrl::parse("https://WWW.INSTAGRAM.COM/p/ABC123/").unwrap();
        let record = ledger.upsert(&url, verdict(Verdict::No, 10)).await.unwrap();
        assert_eq!(record.post_id, "ABC123");
    }

    #[tokio::test]
    async fn zero_cap_still_keeps_the_latest() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = HistoryLedger::new(LocalStore::open(dir.path()).unwrap(), 0);
        assert_eq!(ledger.cap(), 1);
        ledger.upsert(&url("a"), verdict(Verdict::No, 1)).await.unwrap();
        ledger.upsert(&url("b"), verdict(Verdict::No, 1)).await.unwrap();
        let all = ledger.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].post_id, "b");
    }
}
