use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanlaunchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Download error for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Remote execution error: {0}")]
    Remote(String),

    #[error("Interrupted: {0}")]
    Interrupted(String),
}

pub type Error = ScanlaunchError;
pub type Result<T> = std::result::Result<T, Error>;
