//! Test doubles for the external collaborators.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use procguide::application::services::cache::Clock;
use procguide::config::Settings;
use procguide::domain::SearchResult;
use procguide::infrastructure::traits::{
    DurableEntry, DurableStore, GenerationBudget, SearchProvider, TextGenerator,
};

/// Generator answering from a script, one response per call.
/// Once the script runs out every call fails.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<io::Result<String>>>,
    pub budgets: Mutex<Vec<GenerationBudget>>,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<io::Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            budgets: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.budgets.lock().len()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, _prompt: &str, budget: &GenerationBudget) -> io::Result<String> {
        self.budgets.lock().push(*budget);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(io::Error::new(io::ErrorKind::Other, "script exhausted")))
    }
}

/// Search provider returning the same results for every query.
#[derive(Default)]
pub struct FixedSearch {
    results: Vec<SearchResult>,
    pub calls: AtomicUsize,
}

impl FixedSearch {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SearchProvider for FixedSearch {
    fn search(&self, _query: &str, count: usize) -> io::Result<Vec<SearchResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.iter().take(count).cloned().collect())
    }
}

/// Durable tier kept in memory.
#[derive(Default)]
pub struct MemoryStore {
    pub entries: Mutex<HashMap<String, DurableEntry>>,
}

impl DurableStore for MemoryStore {
    fn ping(&self) -> io::Result<()> {
        Ok(())
    }

    fn load(&self, key: &str) -> io::Result<Option<DurableEntry>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn store(&self, key: &str, entry: &DurableEntry) -> io::Result<()> {
        self.entries.lock().insert(key.to_string(), entry.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        self.entries.lock().clear();
        Ok(())
    }
}

/// Durable tier that answers the ping and fails everything else.
pub struct BrokenStore;

impl DurableStore for BrokenStore {
    fn ping(&self) -> io::Result<()> {
        Ok(())
    }

    fn load(&self, _key: &str) -> io::Result<Option<DurableEntry>> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone"))
    }

    fn store(&self, _key: &str, _entry: &DurableEntry) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone"))
    }

    fn remove(&self, _key: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone"))
    }

    fn clear(&self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone"))
    }
}

/// Durable tier that is down from the start.
pub struct UnreachableStore;

impl DurableStore for UnreachableStore {
    fn ping(&self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::ConnectionRefused, "no server"))
    }

    fn load(&self, _key: &str) -> io::Result<Option<DurableEntry>> {
        unreachable!("never connected")
    }

    fn store(&self, _key: &str, _entry: &DurableEntry) -> io::Result<()> {
        unreachable!("never connected")
    }

    fn remove(&self, _key: &str) -> io::Result<()> {
        unreachable!("never connected")
    }

    fn clear(&self) -> io::Result<()> {
        unreachable!("never connected")
    }
}

/// Clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

impl ManualClock {
    pub fn new() -> Self {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Self(Arc::new(Mutex::new(start)))
    }

    pub fn advance(&self, secs: i64) {
        *self.0.lock() += Duration::seconds(secs);
    }

    pub fn clock(&self) -> Clock {
        let inner = self.0.clone();
        Arc::new(move || *inner.lock())
    }
}

pub fn result(title: &str, url: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        url: url.to_string(),
        description: String::new(),
    }
}

/// Settings without delays and without external commands.
pub fn quiet_settings() -> Settings {
    let mut settings = Settings::default();
    settings.search.delay_ms = 0;
    settings
}

/// A tree the validator accepts without complaint.
pub const VALID_TREE: &str = r#"{
  "question": "Which business form?",
  "key": "form",
  "options": ["Sole proprietor", "Corporation"],
  "children": [
    {"procedureList": [
      {"procedure_id": "P1", "name": "Opening notice", "jurisdiction": "Tax office", "url": "https://www.nta.go.jp"}
    ]},
    {"question": "Do you employ staff?", "key": "staff", "options": ["Yes", "No"], "children": [
      {"procedureList": [
        {"procedure_id": "P2", "name": "Company registration", "jurisdiction": "Legal affairs bureau", "url": "https://houmukyoku.moj.go.jp"},
        {"procedure_id": "P3", "name": "Labor insurance", "jurisdiction": "Labor standards office", "url": "https://www.mhlw.go.jp"}
      ]},
      {"procedureList": [
        {"procedure_id": "P2", "name": "Company registration", "jurisdiction": "Legal affairs bureau", "url": "https://houmukyoku.moj.go.jp"}
      ]}
    ]}
  ]
}"#;
