use assert_matches::assert_matches;

use gwas_search_docs::domain::{
    DocumentType, GeneKey, GeneOverlapRecord, TermId, is_primary_chromosome,
};
use gwas_search_docs::error::DocsError;

#[test]
fn term_id_round_trips_through_serde() {
    let term: TermId = serde_json::from_str(r#""EFO:0004339""#).unwrap();
    assert_eq!(term.as_str(), "EFO_0004339");
    assert_eq!(serde_json::to_string(&term).unwrap(), r#""EFO_0004339""#);
}

#[test]
fn term_id_from_iri_rejects_garbage() {
    assert_matches!(
        TermId::from_iri("http://www.ebi.ac.uk/efo/"),
        Err(DocsError::InvalidTermId(_))
    );
}

#[test]
fn blank_gene_key_fails_deserialisation() {
    assert!(serde_json::from_str::<GeneKey>(r#""   ""#).is_err());
}

#[test]
fn overlap_record_defaults_to_intergenic() {
    let record: GeneOverlapRecord =
        serde_json::from_str(r#"{"variant_id": 1, "gene_id": 2, "gene_name": "X"}"#).unwrap();
    assert!(record.is_intergenic);
    assert!(!record.overlaps_gene_body());
    assert_eq!(record.distance, 0);
}

#[test]
fn document_type_selection() {
    assert!(DocumentType::All.includes(DocumentType::Gene));
    assert!(DocumentType::Trait.includes(DocumentType::Trait));
    assert!(!DocumentType::Trait.includes(DocumentType::Variant));
    assert_eq!(DocumentType::Variant.to_string(), "variant");
}

#[test]
fn mitochondrial_aliases_are_primary() {
    assert!(is_primary_chromosome("M"));
    assert!(is_primary_chromosome("chrMT"));
    assert!(!is_primary_chromosome("KI270728.1"));
}
