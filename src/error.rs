use std::path::PathBuf;

use thiserror::Error;

/// Page or image could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{url} answered with HTTP {status}")]
    Status { status: u16, url: String },
}

/// Template and data disagree. A defect, not a runtime condition.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("placeholders left unreplaced: {}", .0.join(", "))]
    Unreplaced(Vec<String>),

    #[error("template could not be read: {0}")]
    Template(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("could not start PDF converter: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("PDF converter exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("PDF converter reported success but {0} is missing")]
    MissingOutput(PathBuf),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("messaging request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("messaging API answered {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not read attachment: {0}")]
    Io(#[from] std::io::Error),

    #[error("telegram token is not configured")]
    MissingToken,
}
