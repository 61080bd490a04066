use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::record::{Dataset, QaRecord};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid record at {}:{line}: {message}", path.display())]
    Record {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// Loads a JSONL dataset. Blank lines are ignored; records with an empty
/// question or answer are rejected.
pub fn load_jsonl(path: &Path) -> Result<Dataset, DatasetError> {
    let contents = fs::read_to_string(path).map_err(|source| DatasetError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut dataset = Dataset::new();
    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record_err = |message: String| DatasetError::Record {
            path: path.to_path_buf(),
            line: index + 1,
            message,
        };
        let record: QaRecord = serde_json::from_str(line).map_err(|e| record_err(e.to_string()))?;
        if record.question.trim().is_empty() || record.answer.trim().is_empty() {
            return Err(record_err("question and answer must be non-empty".to_string()));
        }
        dataset.push(record);
    }

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_records_and_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.jsonl");
        fs::write(
            &path,
            "{\"question\":\"What does Nostr mean?\",\"answer\":\"A protocol.\"}\n\n{\"question\":\"q2\",\"answer\":\"a2\"}\n",
        )
        .unwrap();

        let dataset = load_jsonl(&path).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset[0].answer, "A protocol.");
    }

    #[test]
    fn reports_line_number_of_bad_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        fs::write(&path, "{\"question\":\"q\",\"answer\":\"a\"}\n{\"question\":\"q\"}\n").unwrap();

        let err = load_jsonl(&path).unwrap_err();
        assert!(matches!(err, DatasetError::Record { line: 2, .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_jsonl(Path::new("/nonexistent/nips.jsonl")).unwrap_err();
        assert!(matches!(err, DatasetError::Read { .. }));
    }
}
