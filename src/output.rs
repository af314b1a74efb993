use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::info;

use crate::app::{BuildResult, ClosureResult, ProgressEvent, ProgressSink, RunReport};
use crate::error::DocsError;

pub const GENE_FILE: &str = "gene_data.json";
pub const TRAIT_FILE: &str = "trait_data.json";
pub const VARIANT_FILE: &str = "variant_data.json";

pub struct JsonOutput;

impl JsonOutput {
    /// Writes one file per non-empty document type and returns the paths
    /// written.
    pub fn write_documents(
        out_dir: &Utf8Path,
        result: &BuildResult,
    ) -> Result<Vec<Utf8PathBuf>, DocsError> {
        let mut written = Vec::new();
        if !result.genes.is_empty() {
            written.push(Self::write_json_atomic(&out_dir.join(GENE_FILE), &result.genes)?);
        }
        if !result.traits.is_empty() {
            written.push(Self::write_json_atomic(&out_dir.join(TRAIT_FILE), &result.traits)?);
        }
        if !result.variants.is_empty() {
            written.push(Self::write_json_atomic(
                &out_dir.join(VARIANT_FILE),
                &result.variants,
            )?);
        }
        Ok(written)
    }

    pub fn write_json_atomic<T: Serialize + ?Sized>(
        path: &Utf8Path,
        value: &T,
    ) -> Result<Utf8PathBuf, DocsError> {
        let parent = path
            .parent()
            .ok_or_else(|| DocsError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| DocsError::Filesystem(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix("gwas-docs")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| DocsError::Filesystem(err.to_string()))?;
        serde_json::to_writer(temp.as_file_mut(), value)
            .map_err(|err| DocsError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| DocsError::Filesystem(err.to_string()))?;
        info!(path = %path, "documents written");
        Ok(path.to_path_buf())
    }

    pub fn print_report(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_closure(result: &ClosureResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Forwards progress events to the log.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => info!("{}", event.message),
        }
    }
}
