use std::path::PathBuf;
use thiserror::Error;

/// Result type for dirflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dirflow operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A directory was registered more than once
    #[error("The path has been added to the configuration already: {}", .0.display())]
    DuplicatePath(PathBuf),

    /// File watching errors
    #[error("Watcher error: {0}")]
    Watcher(String),

    /// A pipeline step failed; later steps of that pipeline did not run
    #[error("Step {index} failed: {source}")]
    Step {
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Creates a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a duplicate path error
    pub fn duplicate_path(path: impl Into<PathBuf>) -> Self {
        Self::DuplicatePath(path.into())
    }

    /// Creates a watcher error
    pub fn watcher(msg: impl Into<String>) -> Self {
        Self::Watcher(msg.into())
    }

    /// Creates a step failure for the step at `index`
    pub fn step(index: usize, source: anyhow::Error) -> Self {
        Self::Step { index, source }
    }

    /// Creates an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Adds context to any error
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error was raised while validating configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::DuplicatePath(_) | Self::InvalidInput(_)
        )
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::with_context(context, e))
    }
}
