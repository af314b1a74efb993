use camino::Utf8PathBuf;

use gwas_search_docs::app::{BuildResult, RunReport};
use gwas_search_docs::assembler::assemble_trait;
use gwas_search_docs::domain::AggregateCount;
use gwas_search_docs::output::{GENE_FILE, JsonOutput, TRAIT_FILE};
use gwas_search_docs::source::TraitRow;

fn result() -> BuildResult {
    let row = TraitRow {
        id: 1,
        label: "asthma".to_string(),
        uri: "http://www.ebi.ac.uk/efo/EFO_0000270".to_string(),
        short_form: "EFO_0000270".parse().unwrap(),
    };
    let aggregate = AggregateCount {
        term: row.short_form.clone(),
        study_count: 12,
        association_count: 40,
        closure_size: 3,
        degraded: false,
    };
    BuildResult {
        traits: vec![assemble_trait(&row, &[], &aggregate, None, &[])],
        report: RunReport::default(),
        ..BuildResult::default()
    }
}

#[test]
fn writes_only_populated_document_types() {
    let temp = tempfile::tempdir().unwrap();
    let out = Utf8PathBuf::from_path_buf(temp.path().join("data")).unwrap();

    let written = JsonOutput::write_documents(&out, &result()).unwrap();
    assert_eq!(written, vec![out.join(TRAIT_FILE)]);
    assert!(!out.join(GENE_FILE).as_std_path().exists());

    let content = std::fs::read_to_string(out.join(TRAIT_FILE).as_std_path()).unwrap();
    let documents: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(documents[0]["id"], "trait:1");
    assert_eq!(documents[0]["studyCount"], 12);
}

#[test]
fn rewrite_replaces_the_previous_file() {
    let temp = tempfile::tempdir().unwrap();
    let out = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let path = out.join(TRAIT_FILE);
    std::fs::write(path.as_std_path(), b"stale").unwrap();

    JsonOutput::write_documents(&out, &result()).unwrap();
    let content = std::fs::read_to_string(path.as_std_path()).unwrap();
    assert!(content.starts_with('['));
    let leftovers = std::fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(leftovers, 1);
}
