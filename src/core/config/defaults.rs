use std::path::PathBuf;

pub const NIPS_RAW_BASE_URL: &str = "https://raw.githubusercontent.com/nostr-protocol/nips/master";

/// NIP identifiers scraped when no explicit URL list is configured.
pub const DEFAULT_NIPS: &[&str] = &[
    "01", "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "13", "14", "15", "17",
    "18", "19", "21", "22", "23", "24", "25", "26", "27", "28", "29", "30", "31", "32", "34",
    "35", "36", "37", "38", "39", "40", "42", "44", "45", "46", "47", "48", "49", "50", "51",
    "52", "53", "54", "55", "56", "57", "58", "59", "60", "61", "62", "64", "65", "66", "68",
    "69", "70", "71", "72", "73", "75", "78", "7D", "84", "86", "89", "90", "92", "94", "96",
    "98", "99", "A0", "B0", "B7", "C0", "C7", "EE",
];

/// Fallback for `scraping.github.access_token`.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant specialized in the NIPS documentation.";

pub const DEFAULT_PROMPT_TEMPLATE: &str =
    "[INST] <<SYS>>You are a helpful assistant answering questions about NIPS documentation.<</SYS>>\n\nQuestion: {question}\n[/INST]\n{answer}";

pub fn default_nip_urls() -> Vec<String> {
    DEFAULT_NIPS
        .iter()
        .map(|nip| format!("{}/{}.md", NIPS_RAW_BASE_URL, nip))
        .collect()
}

pub fn base_model() -> String {
    "NousResearch/Llama-2-7b-hf".to_string()
}

pub fn dataset_path() -> PathBuf {
    PathBuf::from("data/nips_dataset.jsonl")
}

pub fn csv_path() -> PathBuf {
    PathBuf::from("data/nips_dataset.csv")
}

pub fn dataset_type() -> String {
    "completion".to_string()
}

pub fn prompt_template() -> String {
    DEFAULT_PROMPT_TEMPLATE.to_string()
}

pub fn max_length() -> u64 {
    512
}

pub fn batch_size() -> u64 {
    4
}

pub fn num_epochs() -> u64 {
    3
}

pub fn learning_rate() -> f64 {
    2e-4
}

pub fn warmup_steps() -> u64 {
    10
}

pub fn logging_steps() -> u64 {
    10
}

pub fn save_steps() -> u64 {
    100
}

pub fn output_dir() -> PathBuf {
    PathBuf::from("outputs/nips-lora")
}

pub fn lora_r() -> u64 {
    8
}

pub fn lora_alpha() -> u64 {
    16
}

pub fn lora_dropout() -> f64 {
    0.05
}

pub fn min_heading_length() -> usize {
    3
}

pub fn concurrency() -> usize {
    4
}

pub fn fetch_timeout_secs() -> u64 {
    10
}

pub fn github_urls_file() -> String {
    "nips_docs.py".to_string()
}

pub fn top_k() -> usize {
    3
}

pub fn embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

pub fn openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

pub fn embedding_token_env() -> String {
    "OPENAI_API_KEY".to_string()
}

pub fn upstream_model() -> String {
    "deepseek-ai/deepseek-v3".to_string()
}

pub fn replicate_base_url() -> String {
    "https://api.replicate.com".to_string()
}

pub fn upstream_token_env() -> String {
    "REPLICATE_API_TOKEN".to_string()
}

pub fn upstream_timeout_secs() -> u64 {
    60
}

pub fn max_new_tokens() -> u64 {
    512
}

pub fn system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

pub fn host() -> String {
    "127.0.0.1".to_string()
}

pub fn port() -> u16 {
    8000
}

pub fn cors_allowed_origins() -> Vec<String> {
    vec![
        "https://nbuild.io".to_string(),
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

pub fn trainer_command() -> Vec<String> {
    ["accelerate", "launch", "-m", "axolotl.cli.train"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
