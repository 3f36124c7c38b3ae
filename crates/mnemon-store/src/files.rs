//! File helpers: atomic JSON replacement and lenient record parsing.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use mnemon_types::MemoryItem;

use crate::error::StoreError;

/// Atomically replace `path` with the JSON serialization of `value`.
///
/// The content is written to a `.tmp` sibling, fsync'd, then renamed over
/// the original. A crash before the rename leaves the original untouched;
/// a crash after it leaves a consistent new file. The temp file is removed
/// on any error path.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = {
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "store.json".to_string());
        path.with_file_name(format!("{filename}.tmp"))
    };

    let write_result = (|| -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        let bytes = serde_json::to_vec_pretty(value)?;
        file.write_all(&bytes)?;
        file.write_all(b"\n")?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }

    Ok(())
}

/// Read a JSON document, treating a missing or unreadable file as absent.
///
/// Load-time failures are not fatal: a file that cannot be read or parsed
/// is logged and skipped, matching the per-record leniency below.
pub(crate) fn read_json_lenient(path: &Path) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!(path = %path.display(), %err, "could not open memory file, skipping");
            return None;
        }
    };
    match serde_json::from_reader(file) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(path = %path.display(), %err, "could not parse memory file, skipping");
            None
        }
    }
}

/// Parse an array of item records, skipping any that fail to deserialize.
pub(crate) fn parse_items_lenient(records: &[Value], context: &str) -> Vec<MemoryItem> {
    let mut items = Vec::with_capacity(records.len());
    for record in records {
        match serde_json::from_value::<MemoryItem>(record.clone()) {
            Ok(item) => items.push(item),
            Err(err) => {
                warn!(context, %err, "skipping corrupt memory record");
            }
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data.json");

        write_json_atomic(&path, &json!({"hello": "world"})).unwrap();

        let value = read_json_lenient(&path).unwrap();
        assert_eq!(value["hello"], "world");
        // No temp file left behind.
        assert!(!path.with_file_name("data.json.tmp").exists());
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        write_json_atomic(&path, &json!({"v": 1})).unwrap();
        write_json_atomic(&path, &json!({"v": 2})).unwrap();

        let value = read_json_lenient(&path).unwrap();
        assert_eq!(value["v"], 2);
    }

    #[test]
    fn test_read_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_json_lenient(&dir.path().join("absent.json")).is_none());
    }

    #[test]
    fn test_read_garbage_file_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.json");
        fs::write(&path, b"{not json").unwrap();
        assert!(read_json_lenient(&path).is_none());
    }

    #[test]
    fn test_parse_items_skips_corrupt_records() {
        let records = vec![
            json!({"id": 1, "type": "semantic", "payload": "good"}),
            json!({"type": "semantic", "payload": "no id"}),
            json!("not even an object"),
            json!({"id": 2, "type": "episodic", "payload": "also good"}),
        ];

        let items = parse_items_lenient(&records, "test");
        let ids: Vec<u64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
