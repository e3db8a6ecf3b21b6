use futures::future::{FutureExt, LocalBoxFuture, Shared};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub mod gallery;
pub mod imageref;

/// The two locales the site is published in. French is the canonical
/// content; English lives in `*_eng` columns and falls back to French.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    #[default]
    Fr,
    En,
}

/// One row of a content set: trimmed header label → cell value.
///
/// There is no fixed schema; the keys are whatever header labels the queried
/// range carries. Rows shorter than the header read as empty strings for the
/// missing trailing columns. Rows are immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContentRow {
    fields: HashMap<String, String>,
}

impl ContentRow {
    pub fn from_fields(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Cell value with an empty-string default for absent columns.
    pub fn text(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    /// Language-aware cell lookup: English reads `<column>_eng` and falls
    /// back to the French column when the English cell is empty or missing.
    pub fn localized(&self, column: &str, lang: Lang) -> &str {
        if lang == Lang::En {
            let english = self.text(&format!("{column}_eng"));
            if !english.is_empty() {
                return english;
            }
        }
        self.text(column)
    }
}

/// Turn a raw `values` grid into rows.
///
/// Row 0 is the header; every later row is zipped against it by position.
/// An empty grid yields an empty row list, which is valid "no data".
pub fn parse_rows(values: &[Vec<String>]) -> Vec<ContentRow> {
    let Some((header, body)) = values.split_first() else {
        return Vec::new();
    };
    let columns: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();
    body.iter()
        .map(|row| {
            let mut fields = HashMap::with_capacity(columns.len());
            for (idx, column) in columns.iter().enumerate() {
                fields.insert(column.clone(), row.get(idx).cloned().unwrap_or_default());
            }
            ContentRow { fields }
        })
        .collect()
}

/// Why a content-set fetch produced no rows.
///
/// Callers that only want best-effort data map all of these to an empty row
/// list; the distinction exists so logs (and retrying callers) can tell a
/// timeout from a misconfiguration or a server-side failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// API key or source identifier was not configured.
    MissingConfig,
    /// The endpoint answered with a non-success HTTP status.
    Status(u16),
    /// The bounded request timeout elapsed and the fetch was aborted.
    TimedOut,
    Network(String),
    Decode(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::MissingConfig => write!(f, "missing API key or spreadsheet id"),
            FetchError::Status(code) => write!(f, "HTTP {}", code),
            FetchError::TimedOut => write!(f, "request timed out"),
            FetchError::Network(msg) => write!(f, "network error: {}", msg),
            FetchError::Decode(msg) => write!(f, "invalid response payload: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Millisecond wall clock, injectable so expiry is testable.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    #[cfg(target_arch = "wasm32")]
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn now_ms(&self) -> f64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as f64)
            .unwrap_or(0.0)
    }
}

/// Persistent key-value surface backing the second cache tier.
///
/// Write failures (quota, unavailable storage) surface as `Err` so the store
/// can log and swallow them; they never fail a caller.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    fn remove(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

/// Where rows actually come from (the network in the app, a double in tests).
pub trait RowSource {
    fn fetch_rows(
        &self,
        set_name: &str,
    ) -> LocalBoxFuture<'static, Result<Vec<ContentRow>, FetchError>>;
}

/// Handle to an in-flight (or completed) preload; cloning never re-fetches.
pub type SharedRows = Shared<LocalBoxFuture<'static, Vec<ContentRow>>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    ts: f64,
    rows: Vec<ContentRow>,
}

/// Two-tier TTL cache plus coalesced fetching for named content sets.
///
/// The memory tier is consulted first; a valid persistent entry rehydrates
/// it. An entry is valid iff `now - ts <= ttl` and the TTL is positive
/// (TTL 0 disables serving cached data entirely). Concurrent preloads of the
/// same set share one underlying fetch.
///
/// All interior state is single-threaded (`RefCell`); a parallel runtime
/// would need real locks around the memory map and the in-flight registry.
pub struct ContentStore {
    ttl_ms: f64,
    namespace: String,
    clock: Box<dyn Clock>,
    persistent: Box<dyn KeyValueStore>,
    source: Box<dyn RowSource>,
    memory: RefCell<HashMap<String, CacheEntry>>,
    inflight: RefCell<HashMap<String, SharedRows>>,
}

impl ContentStore {
    pub fn new(
        ttl_ms: f64,
        namespace: String,
        clock: Box<dyn Clock>,
        persistent: Box<dyn KeyValueStore>,
        source: Box<dyn RowSource>,
    ) -> Self {
        Self {
            ttl_ms,
            namespace,
            clock,
            persistent,
            source,
            memory: RefCell::new(HashMap::new()),
            inflight: RefCell::new(HashMap::new()),
        }
    }

    fn storage_key(&self, name: &str) -> String {
        format!("sheets:{}:{}", self.namespace, name)
    }

    fn entry_valid(&self, entry: &CacheEntry) -> bool {
        self.ttl_ms > 0.0 && self.clock.now_ms() - entry.ts <= self.ttl_ms
    }

    /// Fetch a content set from the row source, bypassing the cache.
    pub async fn fetch_content_set(&self, name: &str) -> Result<Vec<ContentRow>, FetchError> {
        let rows = self.source.fetch_rows(name).await?;
        debug!("fetched {}: {} rows", name, rows.len());
        Ok(rows)
    }

    /// Cached rows for `name`, or `None` when nothing valid is stored.
    ///
    /// `None` means "no cached value" and is distinct from a cached empty
    /// row list. Unreadable persistent payloads count as a miss.
    pub fn get_cached(&self, name: &str) -> Option<Vec<ContentRow>> {
        if let Some(entry) = self.memory.borrow().get(name) {
            if self.entry_valid(entry) {
                return Some(entry.rows.clone());
            }
        }
        let raw = self.persistent.get(&self.storage_key(name))?;
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!("cache read failed for {}: {}", name, err);
                return None;
            }
        };
        if !self.entry_valid(&entry) {
            return None;
        }
        let rows = entry.rows.clone();
        self.memory.borrow_mut().insert(name.to_string(), entry);
        Some(rows)
    }

    /// Store rows in both tiers, stamped with the current time.
    pub fn set_cached(&self, name: &str, rows: &[ContentRow]) {
        let entry = CacheEntry {
            ts: self.clock.now_ms(),
            rows: rows.to_vec(),
        };
        match serde_json::to_string(&entry) {
            Ok(json) => {
                if let Err(err) = self.persistent.set(&self.storage_key(name), &json) {
                    warn!("cache write failed for {}: {}", name, err);
                }
            }
            Err(err) => warn!("cache serialization failed for {}: {}", name, err),
        }
        self.memory.borrow_mut().insert(name.to_string(), entry);
    }

    /// Best-effort background warm-up, coalesced per content set.
    ///
    /// A second call while a fetch for `name` is in flight returns the same
    /// shared handle instead of issuing another request. Completion, whether
    /// it succeeded or not, deregisters the handle so a later call retries.
    /// A successful fetch updates the cache; failures resolve to empty rows.
    pub fn preload(self: &Rc<Self>, name: &str) -> SharedRows {
        if let Some(pending) = self.inflight.borrow().get(name) {
            return pending.clone();
        }
        let store = Rc::clone(self);
        let set = name.to_string();
        let pending = async move {
            let rows = match store.fetch_content_set(&set).await {
                Ok(rows) => {
                    store.set_cached(&set, &rows);
                    rows
                }
                Err(err) => {
                    warn!("preload of {} failed: {}", set, err);
                    Vec::new()
                }
            };
            store.inflight.borrow_mut().remove(&set);
            rows
        }
        .boxed_local()
        .shared();
        self.inflight
            .borrow_mut()
            .insert(name.to_string(), pending.clone());
        pending
    }

    /// Evict entries older than the TTL from both tiers.
    ///
    /// Persistent payloads under this store's namespace that no longer parse
    /// are evicted as well; they could never be served again anyway.
    pub fn sweep_expired(&self) {
        let now = self.clock.now_ms();
        let ttl = self.ttl_ms;
        self.memory.borrow_mut().retain(|_, entry| now - entry.ts <= ttl);
        let prefix = format!("sheets:{}:", self.namespace);
        for key in self.persistent.keys() {
            if !key.starts_with(&prefix) {
                continue;
            }
            let stale = match self.persistent.get(&key) {
                Some(raw) => match serde_json::from_str::<CacheEntry>(&raw) {
                    Ok(entry) => now - entry.ts > ttl,
                    Err(_) => true,
                },
                None => false,
            };
            if stale {
                self.persistent.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use std::cell::Cell;
    use std::collections::VecDeque;

    struct FakeClock {
        now: Rc<Cell<f64>>,
    }

    impl Clock for FakeClock {
        fn now_ms(&self) -> f64 {
            self.now.get()
        }
    }

    #[derive(Default)]
    struct FakeStorage {
        entries: Rc<RefCell<HashMap<String, String>>>,
        fail_writes: Cell<bool>,
    }

    impl KeyValueStore for FakeStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.entries.borrow().get(key).cloned()
        }

        fn set(&self, key: &str, value: &str) -> Result<(), String> {
            if self.fail_writes.get() {
                return Err("quota exceeded".to_string());
            }
            self.entries
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) {
            self.entries.borrow_mut().remove(key);
        }

        fn keys(&self) -> Vec<String> {
            self.entries.borrow().keys().cloned().collect()
        }
    }

    /// Row source double: counts calls and answers from a queue of channels,
    /// so tests control exactly when each fetch resolves.
    struct QueuedSource {
        calls: Rc<Cell<usize>>,
        responses: RefCell<VecDeque<oneshot::Receiver<Result<Vec<ContentRow>, FetchError>>>>,
    }

    impl RowSource for QueuedSource {
        fn fetch_rows(
            &self,
            _set_name: &str,
        ) -> LocalBoxFuture<'static, Result<Vec<ContentRow>, FetchError>> {
            self.calls.set(self.calls.get() + 1);
            let rx = self
                .responses
                .borrow_mut()
                .pop_front()
                .expect("unexpected fetch");
            async move { rx.await.unwrap_or(Ok(Vec::new())) }.boxed_local()
        }
    }

    struct EmptySource;

    impl RowSource for EmptySource {
        fn fetch_rows(
            &self,
            _set_name: &str,
        ) -> LocalBoxFuture<'static, Result<Vec<ContentRow>, FetchError>> {
            async { Ok(Vec::new()) }.boxed_local()
        }
    }

    fn grid(values: &[&[&str]]) -> Vec<Vec<String>> {
        values
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    fn sample_rows() -> Vec<ContentRow> {
        parse_rows(&grid(&[&["title", "content"], &["Aurore", "Delune"]]))
    }

    struct Harness {
        store: Rc<ContentStore>,
        now: Rc<Cell<f64>>,
        entries: Rc<RefCell<HashMap<String, String>>>,
    }

    fn harness(ttl_ms: f64) -> Harness {
        let now = Rc::new(Cell::new(1_000.0));
        let storage = FakeStorage::default();
        let entries = storage.entries.clone();
        let store = Rc::new(ContentStore::new(
            ttl_ms,
            "sheet123".to_string(),
            Box::new(FakeClock { now: now.clone() }),
            Box::new(storage),
            Box::new(EmptySource),
        ));
        Harness { store, now, entries }
    }

    #[test]
    fn parses_header_and_short_rows() {
        let rows = parse_rows(&grid(&[&["a", "b"], &["1", "2"], &["3"]]));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text("a"), "1");
        assert_eq!(rows[0].text("b"), "2");
        assert_eq!(rows[1].text("a"), "3");
        assert_eq!(rows[1].text("b"), "");
    }

    #[test]
    fn parsing_trims_headers_and_ignores_extra_cells() {
        let rows = parse_rows(&grid(&[&[" title ", "size"], &["x", "big", "ignored"]]));
        assert_eq!(rows[0].text("title"), "x");
        assert_eq!(rows[0].text("size"), "big");
        assert_eq!(rows[0].get("ignored"), None);
    }

    #[test]
    fn empty_grid_is_no_data() {
        assert!(parse_rows(&[]).is_empty());
        assert!(parse_rows(&grid(&[&["only", "header"]])).is_empty());
    }

    #[test]
    fn localized_falls_back_to_french() {
        let rows = parse_rows(&grid(&[
            &["title", "title_eng", "content", "content_eng"],
            &["Bonjour", "Hello", "texte", ""],
        ]));
        let row = &rows[0];
        assert_eq!(row.localized("title", Lang::Fr), "Bonjour");
        assert_eq!(row.localized("title", Lang::En), "Hello");
        assert_eq!(row.localized("content", Lang::En), "texte");
    }

    #[test]
    fn cache_round_trips_immediately() {
        let h = harness(120_000.0);
        let rows = sample_rows();
        h.store.set_cached("relics", &rows);
        assert_eq!(h.store.get_cached("relics"), Some(rows));
    }

    #[test]
    fn cached_empty_rows_differ_from_no_cache() {
        let h = harness(120_000.0);
        assert_eq!(h.store.get_cached("relics"), None);
        h.store.set_cached("relics", &[]);
        assert_eq!(h.store.get_cached("relics"), Some(Vec::new()));
    }

    #[test]
    fn expired_entries_are_not_served() {
        let h = harness(120_000.0);
        h.store.set_cached("relics", &sample_rows());
        h.now.set(h.now.get() + 120_001.0);
        assert_eq!(h.store.get_cached("relics"), None);
    }

    #[test]
    fn zero_ttl_never_serves_cache() {
        let h = harness(0.0);
        h.store.set_cached("relics", &sample_rows());
        assert_eq!(h.store.get_cached("relics"), None);
    }

    #[test]
    fn persistent_tier_rehydrates_memory() {
        let h = harness(120_000.0);
        h.store.set_cached("relics", &sample_rows());
        // Simulate a restart: memory gone, persistent tier intact.
        h.store.memory.borrow_mut().clear();
        assert_eq!(h.store.get_cached("relics"), Some(sample_rows()));
        assert!(h.store.memory.borrow().contains_key("relics"));
    }

    #[test]
    fn storage_write_failure_is_swallowed() {
        let now = Rc::new(Cell::new(1_000.0));
        let storage = FakeStorage::default();
        storage.fail_writes.set(true);
        let store = ContentStore::new(
            120_000.0,
            "sheet123".to_string(),
            Box::new(FakeClock { now }),
            Box::new(storage),
            Box::new(EmptySource),
        );
        store.set_cached("relics", &sample_rows());
        // The memory tier still serves the rows.
        assert_eq!(store.get_cached("relics"), Some(sample_rows()));
    }

    #[test]
    fn corrupt_persistent_entries_read_as_miss() {
        let h = harness(120_000.0);
        h.entries
            .borrow_mut()
            .insert("sheets:sheet123:relics".to_string(), "not json".to_string());
        assert_eq!(h.store.get_cached("relics"), None);
    }

    #[test]
    fn sweep_evicts_stale_and_corrupt_entries() {
        let h = harness(120_000.0);
        h.store.set_cached("old", &sample_rows());
        h.now.set(h.now.get() + 200_000.0);
        h.store.set_cached("fresh", &sample_rows());
        h.entries
            .borrow_mut()
            .insert("sheets:sheet123:junk".to_string(), "{broken".to_string());
        h.entries
            .borrow_mut()
            .insert("unrelated".to_string(), "left alone".to_string());
        h.store.sweep_expired();
        assert_eq!(h.store.get_cached("old"), None);
        assert_eq!(h.store.get_cached("fresh"), Some(sample_rows()));
        let entries = h.entries.borrow();
        assert!(!entries.contains_key("sheets:sheet123:old"));
        assert!(!entries.contains_key("sheets:sheet123:junk"));
        assert!(entries.contains_key("unrelated"));
    }

    #[test]
    fn concurrent_preloads_share_one_fetch() {
        let calls = Rc::new(Cell::new(0));
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        let source = QueuedSource {
            calls: calls.clone(),
            responses: RefCell::new(VecDeque::from([rx1, rx2])),
        };
        let now = Rc::new(Cell::new(1_000.0));
        let store = Rc::new(ContentStore::new(
            120_000.0,
            "sheet123".to_string(),
            Box::new(FakeClock { now }),
            Box::new(FakeStorage::default()),
            Box::new(source),
        ));

        let first = store.preload("relics");
        let second = store.preload("relics");

        let rows = sample_rows();
        tx1.send(Ok(rows.clone())).expect("receiver alive");
        let (a, b) = block_on(async { futures::join!(first, second) });
        assert_eq!(a, rows);
        assert_eq!(b, rows);
        // Both handles resolved from a single underlying fetch.
        assert_eq!(calls.get(), 1);
        // The fetch result landed in the cache as a side effect.
        assert_eq!(store.get_cached("relics"), Some(rows));

        // Completion deregistered the handle, so a new preload fetches again.
        let third = store.preload("relics");
        tx2.send(Ok(Vec::new())).expect("receiver alive");
        assert_eq!(block_on(third), Vec::new());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn failed_preload_resolves_empty_and_allows_retry() {
        let calls = Rc::new(Cell::new(0));
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        let source = QueuedSource {
            calls: calls.clone(),
            responses: RefCell::new(VecDeque::from([rx1, rx2])),
        };
        let now = Rc::new(Cell::new(1_000.0));
        let store = Rc::new(ContentStore::new(
            120_000.0,
            "sheet123".to_string(),
            Box::new(FakeClock { now }),
            Box::new(FakeStorage::default()),
            Box::new(source),
        ));

        let pending = store.preload("relics");
        tx1.send(Err(FetchError::TimedOut)).expect("receiver alive");
        assert_eq!(block_on(pending), Vec::new());
        assert_eq!(calls.get(), 1);
        // Nothing was cached and the registry is free again.
        assert_eq!(store.get_cached("relics"), None);
        let retry = store.preload("relics");
        tx2.send(Ok(sample_rows())).expect("receiver alive");
        assert_eq!(block_on(retry), sample_rows());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn preloads_of_different_sets_do_not_coalesce() {
        let calls = Rc::new(Cell::new(0));
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        let source = QueuedSource {
            calls: calls.clone(),
            responses: RefCell::new(VecDeque::from([rx1, rx2])),
        };
        let now = Rc::new(Cell::new(1_000.0));
        let store = Rc::new(ContentStore::new(
            120_000.0,
            "sheet123".to_string(),
            Box::new(FakeClock { now }),
            Box::new(FakeStorage::default()),
            Box::new(source),
        ));

        let a = store.preload("relics");
        let b = store.preload("memories");
        tx1.send(Ok(sample_rows())).expect("receiver alive");
        tx2.send(Ok(Vec::new())).expect("receiver alive");
        let (ra, rb) = block_on(async { futures::join!(a, b) });
        assert_eq!(ra, sample_rows());
        assert_eq!(rb, Vec::new());
        assert_eq!(calls.get(), 2);
    }
}
