use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub log_dir: PathBuf,
    pub config_path: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    /// Resolves paths, preferring an explicit config file over
    /// `NIPS_CONFIG_PATH` and `<project_root>/config.yml`.
    pub fn new(explicit_config: Option<&Path>) -> Self {
        let project_root = discover_project_root();
        let config_path = match explicit_config {
            Some(path) => path.to_path_buf(),
            None => env::var("NIPS_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| project_root.join("config.yml")),
        };
        let secrets_path = config_path
            .parent()
            .map(|dir| dir.join("secrets.yaml"))
            .unwrap_or_else(|| project_root.join("secrets.yaml"));
        let log_dir = env::var("NIPS_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| project_root.join("logs"));

        AppPaths {
            project_root,
            log_dir,
            config_path,
            secrets_path,
        }
    }

    /// Relative paths in the config are resolved against the project root.
    pub fn resolve(&self, raw: &Path) -> PathBuf {
        if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.project_root.join(raw)
        }
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("NIPS_ROOT") {
        return PathBuf::from(root);
    }

    let current = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if current.join("config.yml").exists() {
        return current;
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    current
}
