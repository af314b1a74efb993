use std::io::Write;

use assert_matches::assert_matches;
use flate2::Compression;
use flate2::write::GzEncoder;

use gwas_search_docs::domain::{CountKind, TermId};
use gwas_search_docs::error::DocsError;
use gwas_search_docs::source::{
    CountStore, CrossRefLookup, OverlapSource, RecordSource, Snapshot, SnapshotTables,
};

const SNAPSHOT: &str = r#"{
  "variants": [
    {"id": 1, "rs_id": "rs7903146", "chromosome": "10", "position": 112998590, "region": "10q25.2", "functional_class": "intron_variant"}
  ],
  "genomic_contexts": [
    {"variant_id": 1, "gene_id": 20, "gene_name": "TCF7L2", "is_intergenic": false, "distance": 0}
  ],
  "genes": [
    {"gene_id": 20, "symbol": "TCF7L2", "ensembl_ids": ["ENSG00000148737"], "entrez_ids": ["6934"], "synonyms": ["TCF4"], "alternative_ids": ["HGNC:11641"]}
  ],
  "associations": [
    {"id": 100, "study_id": 1000, "variant_ids": [1], "trait_short_forms": ["EFO_0001360"]},
    {"id": 101, "study_id": 1000, "variant_ids": [1], "trait_short_forms": ["EFO:0001360", "EFO_0000400"]}
  ],
  "studies": [
    {"id": 1000, "trait_short_forms": ["EFO_0001360"], "reported_traits": ["Type 2 diabetes"]},
    {"id": 1001, "trait_short_forms": ["EFO_0001360"], "reported_traits": ["Type 2 diabetes", "Fasting glucose"]}
  ],
  "traits": [
    {"id": 5, "label": "type 2 diabetes mellitus", "uri": "http://www.ebi.ac.uk/efo/EFO_0001360", "short_form": "EFO_0001360"}
  ]
}"#;

fn term(value: &str) -> TermId {
    value.parse().unwrap()
}

#[test]
fn loads_plain_json() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(SNAPSHOT.as_bytes()).unwrap();
    let snapshot = Snapshot::load(file.path()).unwrap();
    assert_eq!(snapshot.tables().variants.len(), 1);
    assert_eq!(snapshot.tables().associations.len(), 2);
}

#[test]
fn loads_gzip_snapshot() {
    let file = tempfile::Builder::new().suffix(".json.gz").tempfile().unwrap();
    let mut encoder = GzEncoder::new(file.reopen().unwrap(), Compression::default());
    encoder.write_all(SNAPSHOT.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let snapshot = Snapshot::load(file.path()).unwrap();
    let overlaps = snapshot.overlaps(1).unwrap();
    assert_eq!(overlaps.len(), 1);
    assert!(overlaps[0].overlaps_gene_body());
    let refs = snapshot.cross_refs(20).unwrap().unwrap();
    assert_eq!(refs.entrez_ids, vec!["6934"]);
    assert_eq!(refs.synonyms, vec!["TCF4"]);
    assert_eq!(refs.alternative_ids, vec!["HGNC:11641"]);
}

#[test]
fn missing_snapshot() {
    let temp = tempfile::tempdir().unwrap();
    let err = Snapshot::load(&temp.path().join("absent.json")).unwrap_err();
    assert_matches!(err, DocsError::SnapshotRead(_));
}

#[test]
fn invalid_term_in_snapshot_is_a_parse_error() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(br#"{"traits": [{"id": 1, "label": "x", "uri": "u", "short_form": "no term"}]}"#)
        .unwrap();
    assert_matches!(Snapshot::load(file.path()), Err(DocsError::SnapshotParse(_)));
}

#[test]
fn linked_entities_are_distinct() {
    let tables: SnapshotTables = serde_json::from_str(SNAPSHOT).unwrap();
    let snapshot = Snapshot::new(tables, 2);
    let terms = vec![term("EFO_0001360"), term("EFO_0000400")];
    let associations = snapshot
        .linked_entities(CountKind::Association, &terms)
        .unwrap();
    assert_eq!(associations.into_iter().collect::<Vec<_>>(), vec![100, 101]);
    let studies = snapshot.linked_entities(CountKind::Study, &terms).unwrap();
    assert_eq!(studies.len(), 2);
}

#[test]
fn oversized_batches_are_rejected() {
    let snapshot = Snapshot::new(SnapshotTables::default(), 2);
    let terms = vec![term("EFO_0000001"), term("EFO_0000002"), term("EFO_0000003")];
    assert_matches!(
        snapshot.linked_entities(CountKind::Study, &terms),
        Err(DocsError::BatchTooLarge { size: 3, limit: 2 })
    );
    assert_eq!(snapshot.max_batch(), 2);
}

#[test]
fn reported_traits_are_distinct_and_sorted() {
    let tables: SnapshotTables = serde_json::from_str(SNAPSHOT).unwrap();
    let snapshot = Snapshot::new(tables, 999);
    assert_eq!(
        snapshot.reported_traits(&term("EFO_0001360")).unwrap(),
        vec!["Fasting glucose", "Type 2 diabetes"]
    );
    assert!(snapshot.reported_traits(&term("EFO_0000400")).unwrap().is_empty());
}

#[test]
fn variant_counts_deduplicate_studies() {
    let tables: SnapshotTables = serde_json::from_str(SNAPSHOT).unwrap();
    let snapshot = Snapshot::new(tables, 999);
    let counts = snapshot.variant_counts(1).unwrap();
    assert_eq!(counts.association_count, 2);
    assert_eq!(counts.study_count, 1);
    assert_eq!(snapshot.variant_counts(2).unwrap().association_count, 0);
}
