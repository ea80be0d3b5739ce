//! Directory-backed document store.
//!
//! Layout: `<root>/<partition>.jsonl`, one JSON document per line. Files are opened
//! lazily in append mode and flushed after every insert, so a document is on disk
//! once `insert_one` returns.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;
use tick_common::{RecorderError, Result};

use super::DocumentSink;
use crate::destination::Destination;

const EXTENSION: &str = "jsonl";

/// Appends documents to one file per partition under a root directory.
#[derive(Debug)]
pub struct JsonLinesStore {
    root: PathBuf,
    files: HashMap<Destination, BufWriter<File>>,
}

impl JsonLinesStore {
    /// Opens (and creates if needed) the store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| {
            RecorderError::ConnectionSetup(format!("cannot create {}: {}", root.display(), e))
        })?;
        debug!("JSON-lines store opened at {}", root.display());
        Ok(Self {
            root: root.to_path_buf(),
            files: HashMap::new(),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `partition`.
    pub fn partition_path(&self, partition: &Destination) -> PathBuf {
        self.root.join(format!("{}.{}", partition, EXTENSION))
    }

    fn writer(&mut self, partition: &Destination) -> Result<&mut BufWriter<File>> {
        if !self.files.contains_key(partition) {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.partition_path(partition))?;
            self.files.insert(partition.clone(), BufWriter::new(file));
        }
        self.files
            .get_mut(partition)
            .ok_or_else(|| RecorderError::PersistenceWrite(format!("no writer for {}", partition)))
    }

    /// Closes the writer of `partition` without flushing what it still buffers. The
    /// file is reopened on the next insert.
    fn discard(&mut self, partition: &Destination) {
        if let Some(writer) = self.files.remove(partition) {
            let _ = writer.into_parts();
        }
    }

    /// Encodes the whole line before touching the file, so a failed encode never
    /// leaves a partial line behind.
    fn write_line(&mut self, partition: &Destination, document: &serde_json::Value) -> Result<()> {
        let mut line = serde_json::to_vec(document)?;
        line.push(b'\n');
        let writer = self.writer(partition)?;
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}

impl DocumentSink for JsonLinesStore {
    fn insert_one(&mut self, partition: &Destination, document: &serde_json::Value) -> Result<()> {
        if let Err(e) = self.write_line(partition, document) {
            self.discard(partition);
            return Err(RecorderError::PersistenceWrite(format!("{}: {}", partition, e)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{BufRead, BufReader};

    #[test]
    fn appends_one_line_per_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonLinesStore::open(&dir.path().join("md")).unwrap();
        let partition = Destination::parse("ticks").unwrap();

        store.insert_one(&partition, &json!({ "id": "IF2012", "volume": 1 })).unwrap();
        store.insert_one(&partition, &json!({ "id": "IF2012", "volume": 2 })).unwrap();

        let file = File::open(store.partition_path(&partition)).unwrap();
        let lines: Vec<serde_json::Value> = BufReader::new(file)
            .lines()
            .map(|line| serde_json::from_str(&line.unwrap()).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["volume"], 1);
        assert_eq!(lines[1]["volume"], 2);
    }

    #[test]
    fn failed_insert_leaves_no_partial_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonLinesStore::open(dir.path()).unwrap();
        let partition = Destination::parse("ticks").unwrap();
        store.insert_one(&partition, &json!({ "id": "IF2012" })).unwrap();

        let writer = store.files.get_mut(&partition).unwrap();
        writer.write_all(b"{\"id\":\"trunc").unwrap();
        store.discard(&partition);

        store.insert_one(&partition, &json!({ "id": "IC2012" })).unwrap();

        let content = fs::read_to_string(store.partition_path(&partition)).unwrap();
        let ids: Vec<String> = content
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["IF2012", "IC2012"]);
    }

    #[test]
    fn partitions_map_to_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonLinesStore::open(dir.path()).unwrap();
        let a = Destination::parse("a").unwrap();
        let b = Destination::parse("b").unwrap();

        store.insert_one(&a, &json!({ "n": 1 })).unwrap();
        store.insert_one(&b, &json!({ "n": 2 })).unwrap();

        assert!(dir.path().join("a.jsonl").is_file());
        assert!(dir.path().join("b.jsonl").is_file());
    }
}
