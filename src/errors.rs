#[derive(Debug, thiserror::Error)]
pub enum CookieStoreError {
    #[error("Store transport error: {0:#}")]
    Transport(anyhow::Error),

    #[error("Cannot decode stored cookie: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Cannot encode cookie: {0}")]
    Encode(#[source] serde_json::Error),
}

impl From<anyhow::Error> for CookieStoreError {
    fn from(err: anyhow::Error) -> Self {
        CookieStoreError::Transport(err)
    }
}

impl CookieStoreError {
    /// Returns true when the error came from the key-value store rather than from the codec.
    pub fn is_transport(&self) -> bool {
        matches!(self, CookieStoreError::Transport(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("store_id must not be empty")]
    EmptyStoreId,

    #[error("store_id {0:?} must not contain ':' or glob characters")]
    InvalidStoreId(String),

    #[error("page_size must be at least 1")]
    ZeroPageSize,

    #[error("scan_timeout must be longer than zero")]
    ZeroScanTimeout,

    #[error("max_concurrent_scans must be at least 1")]
    ZeroConcurrency,
}
