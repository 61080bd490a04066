//! Low-rank adapter fine-tuning, delegated to an external trainer.
//!
//! The dataset is rendered through `prompt_template` into a `text` field,
//! and the trainer receives an axolotl-style YAML config pointing at it.

mod trainer;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::config::{AdapterMethod, FineTuneConfig};
use crate::docs::{load_jsonl, QaRecord};

pub use trainer::{AdapterArtifact, ExternalTrainer, TrainError, Trainer};

pub const TRAINER_CONFIG_FILE: &str = "axolotl_config.yaml";
pub const PREPARED_DATASET_FILE: &str = "prepared_dataset.jsonl";

/// Fills `{question}` and `{answer}` in one pass; placeholder text inside
/// the substituted values is left alone.
pub fn render_prompt(template: &str, record: &QaRecord) -> String {
    let mut out =
        String::with_capacity(template.len() + record.question.len() + record.answer.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{question}") {
            out.push_str(&record.question);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{answer}") {
            out.push_str(&record.answer);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

#[derive(Debug, Serialize)]
struct PreparedRecord<'a> {
    question: &'a str,
    answer: &'a str,
    text: String,
}

#[derive(Debug, Serialize)]
struct TrainerDataset {
    path: PathBuf,
    #[serde(rename = "type")]
    kind: String,
}

/// YAML document handed to the external trainer.
#[derive(Debug, Serialize)]
struct TrainerConfig {
    base_model: String,
    adapter: &'static str,
    load_in_4bit: bool,
    datasets: Vec<TrainerDataset>,
    sequence_len: u64,
    micro_batch_size: u64,
    num_epochs: u64,
    learning_rate: f64,
    weight_decay: f64,
    warmup_steps: u64,
    logging_steps: u64,
    save_steps: u64,
    output_dir: PathBuf,
    lora_r: u64,
    lora_alpha: u64,
    lora_dropout: f64,
    lora_target_linear: bool,
}

impl TrainerConfig {
    fn new(config: &FineTuneConfig, prepared: &Path) -> Self {
        let kind = config
            .datasets
            .first()
            .map(|d| d.kind.clone())
            .unwrap_or_else(crate::core::config::defaults::dataset_type);
        Self {
            base_model: config.base_model.clone(),
            adapter: match config.adapter {
                AdapterMethod::Lora => "lora",
                AdapterMethod::Qlora => "qlora",
            },
            load_in_4bit: config.adapter == AdapterMethod::Qlora,
            datasets: vec![TrainerDataset {
                path: prepared.to_path_buf(),
                kind,
            }],
            sequence_len: config.max_length,
            micro_batch_size: config.batch_size,
            num_epochs: config.num_epochs,
            learning_rate: config.learning_rate,
            weight_decay: config.weight_decay,
            warmup_steps: config.warmup_steps,
            logging_steps: config.logging_steps,
            save_steps: config.save_steps,
            output_dir: config.output_dir.clone(),
            lora_r: config.lora_r,
            lora_alpha: config.lora_alpha,
            lora_dropout: config.lora_dropout,
            lora_target_linear: true,
        }
    }
}

/// Files a training run needs, all under `output_dir`.
#[derive(Debug, Clone)]
pub struct TrainingJob {
    pub config_path: PathBuf,
    pub prepared_dataset: PathBuf,
    pub records: usize,
}

/// Renders the dataset and writes the trainer config. The dataset must exist
/// and hold at least one record.
pub fn prepare_job(dataset_path: &Path, config: &FineTuneConfig) -> Result<TrainingJob, TrainError> {
    let metadata = fs::metadata(dataset_path).map_err(|_| TrainError::MissingDataset {
        path: dataset_path.to_path_buf(),
    })?;
    if metadata.len() == 0 {
        return Err(TrainError::EmptyDataset {
            path: dataset_path.to_path_buf(),
        });
    }
    let records = load_jsonl(dataset_path)?;
    if records.is_empty() {
        return Err(TrainError::EmptyDataset {
            path: dataset_path.to_path_buf(),
        });
    }

    let out_dir = &config.output_dir;
    fs::create_dir_all(out_dir).map_err(|source| TrainError::Io {
        path: out_dir.clone(),
        source,
    })?;

    let prepared_dataset = out_dir.join(PREPARED_DATASET_FILE);
    write_prepared(&prepared_dataset, &records, &config.prompt_template)?;

    let yaml = serde_yaml::to_string(&TrainerConfig::new(config, &prepared_dataset))
        .map_err(|e| TrainError::Render(e.to_string()))?;
    let config_path = out_dir.join(TRAINER_CONFIG_FILE);
    fs::write(&config_path, yaml).map_err(|source| TrainError::Io {
        path: config_path.clone(),
        source,
    })?;

    tracing::info!(
        "Prepared {} training records at {} (config {})",
        records.len(),
        prepared_dataset.display(),
        config_path.display()
    );
    Ok(TrainingJob {
        config_path,
        prepared_dataset,
        records: records.len(),
    })
}

fn write_prepared(path: &Path, records: &[QaRecord], template: &str) -> Result<(), TrainError> {
    let io_err = |source| TrainError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut buf = Vec::new();
    for record in records {
        let line = PreparedRecord {
            question: &record.question,
            answer: &record.answer,
            text: render_prompt(template, record),
        };
        serde_json::to_writer(&mut buf, &line).map_err(|e| TrainError::Render(e.to_string()))?;
        buf.write_all(b"\n").map_err(io_err)?;
    }
    fs::write(path, buf).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::defaults::DEFAULT_PROMPT_TEMPLATE;
    use crate::docs::DatasetWriter;

    fn record() -> QaRecord {
        QaRecord {
            question: "What does Nostr mean?".to_string(),
            answer: "A simple protocol.".to_string(),
        }
    }

    #[test]
    fn render_prompt_fills_both_placeholders() {
        let rendered = render_prompt("Q: {question}\nA: {answer}", &record());
        assert_eq!(rendered, "Q: What does Nostr mean?\nA: A simple protocol.");

        let rendered = render_prompt(DEFAULT_PROMPT_TEMPLATE, &record());
        assert!(!rendered.contains("{question}") && !rendered.contains("{answer}"));
    }

    #[test]
    fn placeholders_inside_values_are_not_expanded() {
        let record = QaRecord {
            question: "What does {answer} mean?".to_string(),
            answer: "Literal {question} braces.".to_string(),
        };
        let rendered = render_prompt("{ Q: {question} | A: {answer} }", &record);
        assert_eq!(
            rendered,
            "{ Q: What does {answer} mean? | A: Literal {question} braces. }"
        );
    }

    #[test]
    fn prepare_job_writes_config_and_rendered_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let jsonl = dir.path().join("nips.jsonl");
        DatasetWriter::new(jsonl.clone(), dir.path().join("nips.csv"))
            .write(&[record()])
            .unwrap();

        let config = FineTuneConfig {
            adapter: AdapterMethod::Qlora,
            output_dir: dir.path().join("out"),
            prompt_template: "{question} => {answer}".to_string(),
            ..FineTuneConfig::default()
        };
        let job = prepare_job(&jsonl, &config).unwrap();

        assert_eq!(job.records, 1);
        assert_eq!(job.config_path, dir.path().join("out").join(TRAINER_CONFIG_FILE));

        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&fs::read_to_string(&job.config_path).unwrap()).unwrap();
        assert_eq!(yaml["adapter"].as_str(), Some("qlora"));
        assert_eq!(yaml["load_in_4bit"].as_bool(), Some(true));
        assert_eq!(yaml["num_epochs"].as_u64(), Some(3));
        assert_eq!(yaml["datasets"][0]["type"].as_str(), Some("completion"));

        let prepared = fs::read_to_string(&job.prepared_dataset).unwrap();
        let line: serde_json::Value = serde_json::from_str(prepared.trim()).unwrap();
        assert_eq!(line["text"], "What does Nostr mean? => A simple protocol.");
    }

    #[test]
    fn missing_or_empty_dataset_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = FineTuneConfig {
            output_dir: dir.path().join("out"),
            ..FineTuneConfig::default()
        };

        let missing = dir.path().join("missing.jsonl");
        assert!(matches!(
            prepare_job(&missing, &config),
            Err(TrainError::MissingDataset { .. })
        ));

        let empty = dir.path().join("empty.jsonl");
        fs::write(&empty, "").unwrap();
        assert!(matches!(
            prepare_job(&empty, &config),
            Err(TrainError::EmptyDataset { .. })
        ));
        assert!(!dir.path().join("out").exists());
    }
}
