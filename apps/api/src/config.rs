use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Panics at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub groq_api_key: String,
    pub extraction_base_url: String,
    pub extraction_model: String,
    /// Ceiling on normalized resume text submitted to the extraction service.
    pub max_text_chars: usize,
    /// Minimum normalized text length worth spending an extraction call on.
    pub min_text_chars: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            groq_api_key: require_env("GROQ_API_KEY")?,
            extraction_base_url: std::env::var("EXTRACTION_BASE_URL")
                .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string()),
            extraction_model: std::env::var("EXTRACTION_MODEL")
                .unwrap_or_else(|_| "llama3-8b-8192".to_string()),
            max_text_chars: std::env::var("MAX_TEXT_CHARS")
                .unwrap_or_else(|_| "12000".to_string())
                .parse::<usize>()
                .context("MAX_TEXT_CHARS must be a positive integer")?,
            min_text_chars: std::env::var("MIN_TEXT_CHARS")
                .unwrap_or_else(|_| "20".to_string())
                .parse::<usize>()
                .context("MIN_TEXT_CHARS must be a positive integer")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
