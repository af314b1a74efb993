use std::io::Write;

use assert_matches::assert_matches;

use gwas_search_docs::config::{Config, ConfigLoader, RetryEntry};
use gwas_search_docs::error::DocsError;

#[test]
fn partial_config_keeps_remaining_defaults() {
    let config: Config = serde_json::from_str(
        r#"{"ontology": "mondo", "page_size": 500, "retry": {"max_retries": 5}}"#,
    )
    .unwrap();
    let resolved = ConfigLoader::resolve_config(config);
    assert_eq!(resolved.ontology, "mondo");
    assert_eq!(resolved.closure.page_size, 500);
    assert_eq!(resolved.closure.max_batch, 999);
    assert_eq!(resolved.retry.max_retries, 5);
    assert_eq!(resolved.retry.delay_ms, 2000);
    assert_eq!(resolved.ensembl_base_url, "https://rest.ensembl.org");
}

#[test]
fn retry_delay_override() {
    let config = Config {
        retry: Some(RetryEntry {
            max_retries: None,
            delay_ms: Some(10),
        }),
        ..Config::default()
    };
    let resolved = ConfigLoader::resolve_config(config);
    assert_eq!(resolved.retry.max_retries, 3);
    assert_eq!(resolved.retry.delay_ms, 10);
}

#[test]
fn resolve_reads_an_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"max_pages": 7, "timeout_secs": 5}}"#).unwrap();
    let resolved = ConfigLoader::resolve(file.path().to_str()).unwrap();
    assert_eq!(resolved.closure.max_pages, 7);
    assert_eq!(resolved.timeout.as_secs(), 5);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, DocsError::ConfigRead(_));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{not json").unwrap();
    let err = ConfigLoader::resolve(file.path().to_str()).unwrap_err();
    assert_matches!(err, DocsError::ConfigParse(_));
}
