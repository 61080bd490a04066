//! Persists a dataset as JSONL and CSV.
//!
//! Both files are staged as `*.partial` siblings and only moved into place once
//! both encodes and writes have succeeded. Existing outputs are kept as
//! `*.bak` until the swap completes and restored if it fails, so a reader
//! never sees one format updated without the other.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::record::QaRecord;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode {}: {message}", path.display())]
    Encode { path: PathBuf, message: String },
}

impl WriteError {
    fn io(path: &Path, source: io::Error) -> Self {
        WriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub struct DatasetWriter {
    jsonl_path: PathBuf,
    csv_path: PathBuf,
}

impl DatasetWriter {
    pub fn new(jsonl_path: impl Into<PathBuf>, csv_path: impl Into<PathBuf>) -> Self {
        Self {
            jsonl_path: jsonl_path.into(),
            csv_path: csv_path.into(),
        }
    }

    pub fn jsonl_path(&self) -> &Path {
        &self.jsonl_path
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn write(&self, records: &[QaRecord]) -> Result<(), WriteError> {
        let jsonl = encode_jsonl(records).map_err(|e| WriteError::Encode {
            path: self.jsonl_path.clone(),
            message: e.to_string(),
        })?;
        let csv = encode_csv(records).map_err(|message| WriteError::Encode {
            path: self.csv_path.clone(),
            message,
        })?;

        let targets = [
            (self.jsonl_path.as_path(), jsonl),
            (self.csv_path.as_path(), csv),
        ];

        let mut staged = Vec::with_capacity(targets.len());
        for (target, bytes) in &targets {
            let partial = sibling(target, "partial");
            if let Err(err) = stage(&partial, bytes) {
                let _ = fs::remove_file(&partial);
                remove_all(&staged);
                return Err(err);
            }
            staged.push(partial);
        }

        let targets: Vec<&Path> = targets.iter().map(|(path, _)| *path).collect();
        if let Err(err) = commit(&targets, &staged) {
            remove_all(&staged);
            return Err(err);
        }

        tracing::info!(
            "Q&A dataset saved as '{}' and '{}' ({} records).",
            self.jsonl_path.display(),
            self.csv_path.display(),
            records.len()
        );
        Ok(())
    }
}

/// One compact JSON object per line, `\n`-terminated, non-ASCII kept as UTF-8.
pub fn encode_jsonl(records: &[QaRecord]) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.push(b'\n');
    }
    Ok(out)
}

/// `question,answer` header followed by one row per record. Fields with
/// delimiters, quotes or newlines are quoted.
pub fn encode_csv(records: &[QaRecord]) -> Result<Vec<u8>, String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(["question", "answer"])
        .map_err(|e| e.to_string())?;
    for record in records {
        writer
            .write_record([record.question.as_str(), record.answer.as_str()])
            .map_err(|e| e.to_string())?;
    }
    writer.into_inner().map_err(|e| e.to_string())
}

fn stage(path: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| WriteError::io(parent, e))?;
    }
    let mut file = File::create(path).map_err(|e| WriteError::io(path, e))?;
    file.write_all(bytes).map_err(|e| WriteError::io(path, e))?;
    file.sync_all().map_err(|e| WriteError::io(path, e))?;
    Ok(())
}

fn commit(targets: &[&Path], staged: &[PathBuf]) -> Result<(), WriteError> {
    let mut backups: Vec<(PathBuf, PathBuf)> = Vec::new();
    for target in targets {
        if target.exists() {
            let backup = sibling(target, "bak");
            if let Err(e) = fs::rename(target, &backup) {
                restore(&backups);
                return Err(WriteError::io(target, e));
            }
            backups.push((target.to_path_buf(), backup));
        }
    }

    for (partial, target) in staged.iter().zip(targets) {
        if let Err(e) = fs::rename(partial, target) {
            for placed in targets {
                let _ = fs::remove_file(placed);
            }
            restore(&backups);
            return Err(WriteError::io(target, e));
        }
    }

    for (_, backup) in &backups {
        let _ = fs::remove_file(backup);
    }
    Ok(())
}

fn restore(backups: &[(PathBuf, PathBuf)]) {
    for (target, backup) in backups {
        if let Err(e) = fs::rename(backup, target) {
            tracing::error!(
                "Failed to restore {} from {}: {}",
                target.display(),
                backup.display(),
                e
            );
        }
    }
}

fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::dataset::load_jsonl;

    fn records() -> Vec<QaRecord> {
        vec![
            QaRecord {
                question: "What does Events mean?".to_string(),
                answer: "Signed JSON, with \"quotes\", commas\nand newlines.".to_string(),
            },
            QaRecord {
                question: "What does Zaps mean?".to_string(),
                answer: "Lightning ⚡ payments".to_string(),
            },
        ]
    }

    #[test]
    fn jsonl_and_csv_hold_the_same_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DatasetWriter::new(dir.path().join("out.jsonl"), dir.path().join("out.csv"));
        writer.write(&records()).unwrap();

        let from_jsonl = load_jsonl(writer.jsonl_path()).unwrap();
        let mut reader = csv::Reader::from_path(writer.csv_path()).unwrap();
        assert_eq!(
            reader.headers().unwrap(),
            &csv::StringRecord::from(vec!["question", "answer"])
        );
        let from_csv: Vec<QaRecord> = reader.deserialize().map(|r| r.unwrap()).collect();

        assert_eq!(from_jsonl, records());
        assert_eq!(from_csv, records());
    }

    #[test]
    fn jsonl_is_one_object_per_line_without_ascii_escapes() {
        let bytes = encode_jsonl(&records()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains('⚡'));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn csv_quotes_embedded_delimiters_and_newlines() {
        let text = String::from_utf8(encode_csv(&records()).unwrap()).unwrap();
        assert!(text.starts_with("question,answer\n"));
        assert!(text.contains("\"Signed JSON, with \"\"quotes\"\", commas\nand newlines.\""));
    }

    #[test]
    fn empty_dataset_still_writes_csv_header() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DatasetWriter::new(dir.path().join("e.jsonl"), dir.path().join("e.csv"));
        writer.write(&[]).unwrap();

        assert_eq!(fs::read_to_string(writer.jsonl_path()).unwrap(), "");
        assert_eq!(fs::read_to_string(writer.csv_path()).unwrap(), "question,answer\n");
    }

    #[test]
    fn rewriting_identical_data_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DatasetWriter::new(dir.path().join("d.jsonl"), dir.path().join("d.csv"));

        writer.write(&records()).unwrap();
        let first = (
            fs::read(writer.jsonl_path()).unwrap(),
            fs::read(writer.csv_path()).unwrap(),
        );
        writer.write(&records()).unwrap();
        let second = (
            fs::read(writer.jsonl_path()).unwrap(),
            fs::read(writer.csv_path()).unwrap(),
        );

        assert_eq!(first, second);
        assert!(!sibling(writer.jsonl_path(), "bak").exists());
        assert!(!sibling(writer.csv_path(), "partial").exists());
    }

    #[test]
    fn failed_write_leaves_previous_outputs_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let jsonl = dir.path().join("keep.jsonl");
        let writer = DatasetWriter::new(&jsonl, dir.path().join("keep.csv"));
        writer.write(&records()).unwrap();
        let before = fs::read(&jsonl).unwrap();

        // A directory where the CSV staging file should go makes staging fail.
        let blocked_csv = dir.path().join("blocked.csv");
        fs::create_dir_all(sibling(&blocked_csv, "partial")).unwrap();
        let failing = DatasetWriter::new(&jsonl, &blocked_csv);
        let err = failing.write(&records()[..1]).unwrap_err();

        assert!(matches!(err, WriteError::Io { .. }));
        assert_eq!(fs::read(&jsonl).unwrap(), before);
        assert!(!sibling(&jsonl, "partial").exists());
        assert!(!blocked_csv.exists());
    }
}
