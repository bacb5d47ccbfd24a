use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Malformed graph: {0}")]
    MalformedGraph(String),
    #[error("Unsupported socket type: {0}")]
    UnsupportedSocketType(String),
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),
    #[error("Dispatch error: {0}")]
    Dispatch(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CompositorError {
    pub fn malformed(message: impl Into<String>) -> Self {
        CompositorError::MalformedGraph(message.into())
    }

    pub fn exhausted(message: impl Into<String>) -> Self {
        CompositorError::ResourceExhausted(message.into())
    }

    pub fn dispatch(message: impl Into<String>) -> Self {
        CompositorError::Dispatch(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        CompositorError::Config(message.into())
    }
}
