use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DocsError {
    #[error("invalid ontology term id: {0}")]
    InvalidTermId(String),

    #[error("invalid gene key: {0:?}")]
    InvalidGeneKey(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read snapshot at {0}")]
    SnapshotRead(PathBuf),

    #[error("failed to parse snapshot: {0}")]
    SnapshotParse(String),

    #[error("OLS request failed: {0}")]
    OlsHttp(String),

    #[error("OLS returned status {status}: {message}")]
    OlsStatus { status: u16, message: String },

    #[error("Ensembl request failed: {0}")]
    EnsemblHttp(String),

    #[error("Ensembl returned status {status}: {message}")]
    EnsemblStatus { status: u16, message: String },

    #[error("count store request failed: {0}")]
    CountStore(String),

    #[error("malformed {source_name} payload: {message}")]
    MalformedPayload {
        source_name: &'static str,
        message: String,
    },

    #[error("gene {0} has no identifier in any namespace")]
    MissingIdentity(String),

    #[error("document {id} is missing required field `{field}`")]
    IncompleteDocument { id: String, field: &'static str },

    #[error("term batch of {size} exceeds the store limit of {limit} values")]
    #[diagnostic(help("split the term set with a batch size not above the limit"))]
    BatchTooLarge { size: usize, limit: usize },

    #[error("no usable documents remained after validation")]
    #[diagnostic(help("check the run report for compromised ids and degraded terms"))]
    EmptyOutput,

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl DocsError {
    /// Upstream failures that are recovered locally by degrading the item.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            DocsError::OlsHttp(_)
                | DocsError::OlsStatus { .. }
                | DocsError::EnsemblHttp(_)
                | DocsError::EnsemblStatus { .. }
                | DocsError::CountStore(_)
                | DocsError::MalformedPayload { .. }
        )
    }
}
