// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use crate::tables::ParseTables;
use std::fs;
use std::io;
use std::path::Path;

/// Loads cached tables if the cache is at least as new as the grammar file.
/// Any failure (missing file, unreadable metadata, stale timestamp, decode
/// error) yields `None` and the caller rebuilds.
pub fn load(cache_path: &Path, grammar_path: &Path) -> Option<ParseTables> {
    let grammar_mtime = fs::metadata(grammar_path).ok()?.modified().ok()?;
    let cache_mtime = fs::metadata(cache_path).ok()?.modified().ok()?;
    if cache_mtime < grammar_mtime {
        return None;
    }
    let text = fs::read_to_string(cache_path).ok()?;
    serde_json::from_str(&text).ok()
}

pub fn store(cache_path: &Path, tables: &ParseTables) -> io::Result<()> {
    if let Some(dir) = cache_path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let text = serde_json::to_string(tables)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(cache_path, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;
    use crate::state::generate;

    fn sample_tables() -> ParseTables {
        let terminals: Vec<String> = ["c", "d", "Eof"].iter().map(|s| s.to_string()).collect();
        let grammar = Grammar::parse("S -> C C\nC -> c C\nC -> d\n", &terminals).unwrap();
        generate(grammar, 2).tables
    }

    #[test]
    fn cache_round_trips_identical_tables() {
        let dir = tempfile::tempdir().unwrap();
        let grammar_path = dir.path().join("toy.cfg");
        let cache_path = dir.path().join("cache").join("tables.json");
        fs::write(&grammar_path, "S -> C C\nC -> c C\nC -> d\n").unwrap();

        let tables = sample_tables();
        store(&cache_path, &tables).unwrap();
        let reloaded = load(&cache_path, &grammar_path).expect("cache should be fresh");
        assert_eq!(reloaded, tables);
        // The reloaded tables serialize byte-identically.
        assert_eq!(
            serde_json::to_string(&reloaded).unwrap(),
            serde_json::to_string(&tables).unwrap()
        );
    }

    #[test]
    fn missing_cache_reports_none() {
        let dir = tempfile::tempdir().unwrap();
        let grammar_path = dir.path().join("toy.cfg");
        fs::write(&grammar_path, "S -> d\n").unwrap();
        assert!(load(&dir.path().join("absent.json"), &grammar_path).is_none());
    }

    #[test]
    fn corrupt_cache_reports_none() {
        let dir = tempfile::tempdir().unwrap();
        let grammar_path = dir.path().join("toy.cfg");
        let cache_path = dir.path().join("tables.json");
        fs::write(&grammar_path, "S -> d\n").unwrap();
        fs::write(&cache_path, "not json at all").unwrap();
        assert!(load(&cache_path, &grammar_path).is_none());
    }

    #[test]
    fn stale_cache_reports_none() {
        let dir = tempfile::tempdir().unwrap();
        let grammar_path = dir.path().join("toy.cfg");
        let cache_path = dir.path().join("tables.json");
        store(&cache_path, &sample_tables()).unwrap();
        // Rewrite the grammar after the cache, with a margin comfortably
        // larger than coarse filesystem timestamp resolution.
        std::thread::sleep(std::time::Duration::from_millis(1200));
        fs::write(&grammar_path, "S -> C C\nC -> c C\nC -> d\n").unwrap();
        assert!(load(&cache_path, &grammar_path).is_none());
    }
}
