//! Configuration for Mesa
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;

/// Mesa - place aggregation and review backend
#[derive(Parser, Debug, Clone)]
#[command(name = "mesa")]
#[command(about = "Place aggregation and review backend")]
pub struct Args {
    /// Base URL of the external place-search provider
    #[arg(long, env = "SEARCH_BASE_URL", default_value = "https://search.mesa.dev")]
    pub search_base_url: String,

    /// Default number of suggestions returned when the caller passes none
    #[arg(long, env = "SUGGESTION_LIMIT", default_value = "5")]
    pub suggestion_limit: usize,

    /// How long resolved suggestions stay cached for `resolve`, in seconds
    #[arg(long, env = "SUGGESTION_TTL_SECONDS", default_value = "300")]
    pub suggestion_ttl_seconds: u64,

    /// Outbound request timeout in milliseconds
    ///
    /// Applies to both the search provider and the media store. There is no
    /// hidden transport default; this knob is the timeout policy.
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Maximum number of media uploads in flight for one review submission
    #[arg(long, env = "UPLOAD_CONCURRENCY", default_value = "4")]
    pub upload_concurrency: usize,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "mesa")]
    pub mongodb_db: String,

    /// Base URL of the media object store
    #[arg(long, env = "MEDIA_BASE_URL", default_value = "https://media.mesa.dev")]
    pub media_base_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Load `.env` if present, then parse arguments and environment
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::parse()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.suggestion_limit == 0 {
            return Err("SUGGESTION_LIMIT must be at least 1".to_string());
        }

        if self.upload_concurrency == 0 {
            return Err("UPLOAD_CONCURRENCY must be at least 1".to_string());
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be nonzero".to_string());
        }

        if !self.search_base_url.starts_with("http") {
            return Err(format!(
                "SEARCH_BASE_URL must be an http(s) URL, got '{}'",
                self.search_base_url
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_args() -> Args {
        Args::parse_from(["mesa"])
    }

    #[test]
    fn test_defaults_validate() {
        let args = default_args();
        assert!(args.validate().is_ok());
        assert_eq!(args.suggestion_limit, 5);
        assert_eq!(args.request_timeout_ms, 30000);
    }

    #[test]
    fn test_zero_upload_concurrency_rejected() {
        let mut args = default_args();
        args.upload_concurrency = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_non_http_search_url_rejected() {
        let mut args = default_args();
        args.search_base_url = "ftp://somewhere".to_string();
        assert!(args.validate().is_err());
    }
}
