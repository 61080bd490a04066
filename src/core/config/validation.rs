use serde_json::{Map, Value};

use crate::core::errors::ConfigError;

const ADAPTERS: [&str; 2] = ["lora", "qlora"];
const PROVIDERS: [&str; 2] = ["replicate", "openai"];
const STRATEGIES: [&str; 2] = ["keyword", "embedding"];

/// Validates the merged YAML document before it is deserialised.
///
/// Type mismatches and out-of-range values are reported with their dotted
/// path so the operator can find them in `config.yml`.
pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    validate_optional_string_field(root, "base_model", "base_model")?;
    validate_enum_field(root, "adapter", "adapter", &ADAPTERS)?;
    validate_u64_field(root, "max_length", "max_length", 1, 1_000_000)?;
    validate_u64_field(root, "batch_size", "batch_size", 1, 4_096)?;
    validate_u64_field(root, "num_epochs", "num_epochs", 1, 1_000)?;
    validate_f64_field(root, "learning_rate", "learning_rate", f64::MIN_POSITIVE, 1.0)?;
    validate_f64_field(root, "weight_decay", "weight_decay", 0.0, 1.0)?;
    validate_u64_field(root, "warmup_steps", "warmup_steps", 0, 10_000_000)?;
    validate_u64_field(root, "logging_steps", "logging_steps", 1, 10_000_000)?;
    validate_u64_field(root, "save_steps", "save_steps", 1, 10_000_000)?;
    validate_u64_field(root, "lora_r", "lora_r", 1, 4_096)?;
    validate_u64_field(root, "lora_alpha", "lora_alpha", 1, 65_536)?;
    validate_f64_field(root, "lora_dropout", "lora_dropout", 0.0, 1.0)?;
    validate_string_array_field(root, "trainer_command", "trainer_command")?;

    if let Some(template) = root.get("prompt_template") {
        let Some(text) = template.as_str() else {
            return Err(config_type_error("prompt_template", "string"));
        };
        for placeholder in ["{question}", "{answer}"] {
            if !text.contains(placeholder) {
                return Err(ConfigError::invalid(
                    "prompt_template",
                    format!("must contain the {} placeholder", placeholder),
                ));
            }
        }
    }

    if let Some(datasets) = root.get("datasets") {
        let items = datasets
            .as_array()
            .ok_or_else(|| config_type_error("datasets", "array"))?;
        if items.is_empty() {
            return Err(ConfigError::invalid("datasets", "at least one dataset is required"));
        }
        for (index, item) in items.iter().enumerate() {
            let path = format!("datasets[{}]", index);
            let entry = item
                .as_object()
                .ok_or_else(|| config_type_error(&path, "object"))?;
            validate_required_string_field(entry, &format!("{}.path", path), "path")?;
        }
    }

    if let Some(scraping) = expect_optional_object(root, "scraping")? {
        validate_u64_field(
            scraping,
            "scraping.min_heading_length",
            "min_heading_length",
            0,
            1_000,
        )?;
        validate_u64_field(scraping, "scraping.concurrency", "concurrency", 1, 64)?;
        validate_u64_field(
            scraping,
            "scraping.fetch_timeout_secs",
            "fetch_timeout_secs",
            1,
            3_600,
        )?;
        validate_string_array_field(scraping, "scraping.urls", "urls")?;
        validate_optional_string_field(scraping, "scraping.local_dir", "local_dir")?;

        if let Some(github) = expect_optional_object(scraping, "github")? {
            validate_required_string_field(github, "scraping.github.owner", "owner")?;
            validate_required_string_field(github, "scraping.github.repo", "repo")?;
            validate_optional_string_field(github, "scraping.github.path", "path")?;
            validate_optional_string_field(github, "scraping.github.username", "username")?;
        }

        if let Some(output) = expect_optional_object(scraping, "output")? {
            validate_optional_string_field(output, "scraping.output.jsonl", "jsonl")?;
            validate_optional_string_field(output, "scraping.output.csv", "csv")?;
            if let (Some(jsonl), Some(csv)) = (output.get("jsonl"), output.get("csv")) {
                if jsonl == csv {
                    return Err(ConfigError::invalid(
                        "scraping.output",
                        "jsonl and csv outputs must be different files",
                    ));
                }
            }
        }
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_enum_field(retrieval, "retrieval.strategy", "strategy", &STRATEGIES)?;
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 100)?;
        validate_optional_string_field(retrieval, "retrieval.dataset", "dataset")?;
        validate_optional_string_field(
            retrieval,
            "retrieval.embedding_model",
            "embedding_model",
        )?;
        validate_optional_string_field(
            retrieval,
            "retrieval.embedding_base_url",
            "embedding_base_url",
        )?;
    }

    if let Some(upstream) = expect_optional_object(root, "upstream")? {
        validate_enum_field(upstream, "upstream.provider", "provider", &PROVIDERS)?;
        validate_optional_string_field(upstream, "upstream.model", "model")?;
        validate_optional_string_field(upstream, "upstream.base_url", "base_url")?;
        validate_optional_string_field(upstream, "upstream.token_env", "token_env")?;
        validate_u64_field(upstream, "upstream.timeout_secs", "timeout_secs", 1, 3_600)?;
        validate_u64_field(
            upstream,
            "upstream.max_new_tokens",
            "max_new_tokens",
            1,
            1_000_000,
        )?;
        validate_f64_field(upstream, "upstream.temperature", "temperature", 0.0, 2.0)?;
    }

    if let Some(chat) = expect_optional_object(root, "chat")? {
        validate_optional_string_field(chat, "chat.system_prompt", "system_prompt")?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "non-negative integer"));
    };
    if number < min || number > max {
        return Err(ConfigError::invalid(
            path,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if !number.is_finite() || number < min || number > max {
        return Err(ConfigError::invalid(
            path,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text) {
        return Err(ConfigError::invalid(
            path,
            format!("expected one of {}", allowed.join(", ")),
        ));
    }
    Ok(())
}

fn validate_required_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let value = section
        .get(key)
        .ok_or_else(|| ConfigError::Missing(path.to_string()))?;
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ConfigError::invalid(path, "value cannot be empty"));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    match section.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(config_type_error(path, "string")),
    }
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ConfigError::invalid(
                format!("{}[{}]", path, index),
                "value cannot be empty",
            ));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::invalid(path, format!("expected {}", expected))
}
