// anonymizer/memo.rs: run-scoped raw -> replacement table for persisted columns
use std::collections::HashMap;

/// Grows for the whole run and is never evicted. Keys are raw text only, so one
/// value maps to one replacement across every table and column that persists it.
#[derive(Debug, Default)]
pub struct PersistenceMemo {
    table: HashMap<String, String>,
}

impl PersistenceMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, raw: &str) -> Option<&str> {
        self.table.get(raw).map(String::as_str)
    }

    /// First write wins.
    pub fn put(&mut self, raw: &str, replacement: String) -> &str {
        self.table.entry(raw.to_string()).or_insert(replacement)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
