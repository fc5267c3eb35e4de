//! Error taxonomy shared by the controller, the upstream client and the
//! attachment pipeline.

use std::path::PathBuf;

/// Failure talking to the upstream model.
///
/// Never surfaces past the conversation controller: it is converted into a
/// synthetic assistant message there.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no API key configured (set GEMINI_API_KEY or api_key in config.toml)")]
    MissingApiKey,
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_decode() {
            UpstreamError::Malformed(err.to_string())
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}

/// Failure turning an uploaded file into text.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("{} is not a PDF file", .0.display())]
    NotPdf(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse PDF: {0}")]
    Parse(String),
    #[error("{0} contains no extractable text")]
    NoText(String),
}

/// A send attempted without anything to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("type a message or attach a PDF before sending")]
    EmptyMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_mentions_code_and_body() {
        let err = UpstreamError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "upstream returned HTTP 500: boom");
    }

    #[test]
    fn missing_key_names_the_env_var() {
        assert!(UpstreamError::MissingApiKey.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn not_pdf_shows_path() {
        let err = ExtractionError::NotPdf(PathBuf::from("notes.txt"));
        assert_eq!(err.to_string(), "notes.txt is not a PDF file");
    }
}
