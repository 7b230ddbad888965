use leakscan_core::ConfigError;
use leakscan_db::DatabaseError;
use leakscan_github::GithubError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Search provider error: {0}")]
    Provider(#[from] GithubError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, ScanError>;
