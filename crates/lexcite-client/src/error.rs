use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unauthorized: {path}")]
    Unauthorized { path: String },

    #[error("{status} from {path}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response body from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ClientError>;
