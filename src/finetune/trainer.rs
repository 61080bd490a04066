use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::prepare_job;
use crate::core::config::FineTuneConfig;
use crate::docs::DatasetError;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("dataset {} does not exist", path.display())]
    MissingDataset { path: PathBuf },
    #[error("dataset {} is empty", path.display())]
    EmptyDataset { path: PathBuf },
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("failed to render trainer config: {0}")]
    Render(String),
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("trainer command `{0}` not found on PATH")]
    CommandNotFound(String),
    #[error("trainer command is empty")]
    EmptyCommand,
    #[error("failed to spawn trainer: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("trainer exited with {0}")]
    Failed(String),
}

/// Location of the trained adapter weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterArtifact {
    pub output_dir: PathBuf,
    pub config_path: PathBuf,
}

#[async_trait]
pub trait Trainer: Send + Sync {
    async fn train(
        &self,
        dataset_path: &Path,
        config: &FineTuneConfig,
    ) -> Result<AdapterArtifact, TrainError>;
}

/// Runs the configured trainer command with the rendered config path as its
/// final argument.
pub struct ExternalTrainer {
    command: Vec<String>,
}

impl ExternalTrainer {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    pub fn from_config(config: &FineTuneConfig) -> Self {
        Self::new(config.trainer_command.clone())
    }

    fn locate(&self) -> Result<(PathBuf, &[String]), TrainError> {
        let (program, args) = self.command.split_first().ok_or(TrainError::EmptyCommand)?;
        let path = which::which(program)
            .map_err(|_| TrainError::CommandNotFound(program.clone()))?;
        Ok((path, args))
    }
}

#[async_trait]
impl Trainer for ExternalTrainer {
    async fn train(
        &self,
        dataset_path: &Path,
        config: &FineTuneConfig,
    ) -> Result<AdapterArtifact, TrainError> {
        let (program, args) = self.locate()?;
        let job = prepare_job(dataset_path, config)?;

        tracing::info!(
            "Launching trainer {} {} {}",
            program.display(),
            args.join(" "),
            job.config_path.display()
        );
        let mut cmd = Command::new(&program);
        cmd.args(args).arg(&job.config_path);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(TrainError::Spawn)?;

        let stdout_task = child.stdout.take().map(|stdout| {
            tokio::spawn(async move {
                let mut reader = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    tracing::info!("[trainer] {}", line);
                }
            })
        });
        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    tracing::warn!("[trainer-err] {}", line);
                }
            })
        });

        let status = child.wait().await.map_err(TrainError::Spawn)?;
        for task in [stdout_task, stderr_task].into_iter().flatten() {
            let _ = task.await;
        }

        if !status.success() {
            return Err(TrainError::Failed(status.to_string()));
        }

        tracing::info!("Adapter written to {}", config.output_dir.display());
        Ok(AdapterArtifact {
            output_dir: config.output_dir.clone(),
            config_path: job.config_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::{DatasetWriter, QaRecord};

    fn dataset(dir: &Path) -> PathBuf {
        let jsonl = dir.join("nips.jsonl");
        DatasetWriter::new(jsonl.clone(), dir.join("nips.csv"))
            .write(&[QaRecord {
                question: "What does Relays mean?".to_string(),
                answer: "Servers.".to_string(),
            }])
            .unwrap();
        jsonl
    }

    fn config(dir: &Path) -> FineTuneConfig {
        FineTuneConfig {
            output_dir: dir.join("out"),
            ..FineTuneConfig::default()
        }
    }

    #[tokio::test]
    async fn unknown_command_is_reported_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let trainer = ExternalTrainer::new(vec!["nips-chat-no-such-trainer".to_string()]);

        let err = trainer
            .train(&dataset(dir.path()), &config(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, TrainError::CommandNotFound(ref c) if c == "nips-chat-no-such-trainer"));
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExternalTrainer::new(Vec::new())
            .train(&dataset(dir.path()), &config(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, TrainError::EmptyCommand));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_run_returns_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let artifact = ExternalTrainer::new(vec!["true".to_string()])
            .train(&dataset(dir.path()), &cfg)
            .await
            .unwrap();

        assert_eq!(artifact.output_dir, cfg.output_dir);
        assert!(artifact.config_path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_train_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExternalTrainer::new(vec!["false".to_string()])
            .train(&dataset(dir.path()), &config(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, TrainError::Failed(_)));
    }
}
