use assert_matches::assert_matches;

use gwas_search_docs::accumulator::GeneAccumulator;
use gwas_search_docs::assembler::{
    GeneIdentifiers, GeneOutcome, NO_DESCRIPTION, SearchDocument, assemble_gene, assemble_trait,
    assemble_variant, retain_complete,
};
use gwas_search_docs::domain::{AggregateCount, GeneKey, TermId, TermMetadata, Variant};
use gwas_search_docs::ensembl::EnsemblGene;
use gwas_search_docs::error::DocsError;
use gwas_search_docs::reconcile::{GeneCrossRefs, IdentifierReconciler};
use gwas_search_docs::source::{TraitRow, VariantCounts};

fn key(value: &str) -> GeneKey {
    value.parse().unwrap()
}

fn ensembl_gene(chromosome: &str) -> EnsemblGene {
    EnsemblGene {
        id: "ENSG00000157764".to_string(),
        display_name: Some("BRAF".to_string()),
        seq_region_name: chromosome.to_string(),
        start: 140_719_327,
        end: 140_924_929,
        biotype: Some("protein_coding".to_string()),
        description: None,
    }
}

fn trait_row() -> TraitRow {
    TraitRow {
        id: 42,
        label: "type 2 diabetes mellitus".to_string(),
        uri: "http://purl.obolibrary.org/obo/MONDO_0005148".to_string(),
        short_form: "MONDO_0005148".parse::<TermId>().unwrap(),
    }
}

fn aggregate(studies: usize, associations: usize) -> AggregateCount {
    AggregateCount {
        term: "MONDO_0005148".parse().unwrap(),
        study_count: studies,
        association_count: associations,
        closure_size: 4,
        degraded: false,
    }
}

#[test]
fn missing_annotation_compromises_the_gene() {
    let gene = key("ENSG00000157764");
    let outcome = assemble_gene(
        &gene,
        &Default::default(),
        &GeneIdentifiers::default(),
        None,
        &[],
    );
    assert_eq!(outcome, GeneOutcome::Compromised(gene));
}

#[test]
fn scaffold_genes_are_excluded() {
    let gene = key("ENSG00000157764");
    let annotation = ensembl_gene("CHR_HSCHR7_2_CTG6");
    let outcome = assemble_gene(
        &gene,
        &Default::default(),
        &GeneIdentifiers::default(),
        Some(&annotation),
        &[],
    );
    assert_matches!(outcome, GeneOutcome::NonPrimary { chromosome, .. } if chromosome == "CHR_HSCHR7_2_CTG6");
}

#[test]
fn gene_document_fallbacks() {
    let gene = key("ENSG00000157764");
    let mut accumulator = GeneAccumulator::new();
    accumulator.record(&gene, 1, 10, "rs113488022");
    let annotation = ensembl_gene("7");
    let outcome = assemble_gene(
        &gene,
        accumulator.get(&gene).unwrap(),
        &GeneIdentifiers::default(),
        Some(&annotation),
        &[],
    );
    let GeneOutcome::Document(document) = outcome else {
        panic!("expected a document");
    };
    assert_eq!(document.ensembl_description, NO_DESCRIPTION);
    assert_eq!(document.cytobands, "NA");
    assert_eq!(
        document.description,
        "No description available|7:140719327-140924929|NA|protein_coding"
    );
    assert!(document.validate().is_ok());

    let json = serde_json::to_value(&*document).unwrap();
    assert_eq!(json["ensemblID"], "ENSG00000157764");
    assert_eq!(json["rsIDs"][0], "rs113488022");
    assert_eq!(json["chromosomeStart"], 140_719_327);
    assert_eq!(json["resourcename"], "gene");
}

#[test]
fn gene_document_carries_synonyms_and_alternative_ids() {
    let reconciler = IdentifierReconciler::new(vec![GeneCrossRefs {
        gene_id: 1,
        symbol: "BRAF".to_string(),
        ensembl_ids: vec!["ENSG00000157764".to_string()],
        entrez_ids: vec!["673".to_string()],
        synonyms: vec!["BRAF1".to_string(), "BRAF".to_string(), " ".to_string()],
        alternative_ids: vec!["HGNC:1097".to_string(), "uc003vwc.5".to_string()],
    }]);
    let refs = reconciler.cross_refs(1).unwrap();
    let mut identifiers = GeneIdentifiers::default();
    for candidate in reconciler.candidates(1) {
        identifiers.absorb(&candidate, refs);
    }

    let gene = key("ENSG00000157764");
    let mut accumulator = GeneAccumulator::new();
    accumulator.record(&gene, 1, 10, "rs113488022");
    let annotation = ensembl_gene("7");
    let GeneOutcome::Document(document) = assemble_gene(
        &gene,
        accumulator.get(&gene).unwrap(),
        &identifiers,
        Some(&annotation),
        &[],
    ) else {
        panic!("expected a document");
    };
    assert_eq!(document.synonyms_gene, vec!["BRAF", "BRAF1"]);
    assert_eq!(document.cross_refs, vec!["HGNC:1097", "uc003vwc.5"]);
    assert_eq!(document.entrez_id, vec!["673"]);

    let json = serde_json::to_value(&*document).unwrap();
    assert_eq!(json["synonymsGene"][1], "BRAF1");
    assert_eq!(json["crossRefs"][0], "HGNC:1097");
}

#[test]
fn trait_description_placeholders() {
    let document = assemble_trait(&trait_row(), &[], &aggregate(3, 5), None, &[]);
    assert_eq!(document.description, "NA|associations: 5, studies: 3|NA|NA");
    assert_eq!(document.title, "type 2 diabetes mellitus (MONDO_0005148)");
    assert_eq!(document.descendant_count, 3);
    assert_eq!(document.reported_trait_s, None);

    let json = serde_json::to_value(&document).unwrap();
    assert!(json.get("reportedTrait_s").is_none());
    assert_eq!(json["shortform_autosuggest"][0], "MONDO_0005148");
    assert_eq!(json["label_autosuggest_e"][0], "type 2 diabetes mellitus");
    assert!(json.get("synonym_autosuggest").is_none());
    assert_eq!(
        json["efoLink"][0],
        "type 2 diabetes mellitus|MONDO_0005148|http://purl.obolibrary.org/obo/MONDO_0005148"
    );
}

#[test]
fn trait_description_with_every_part() {
    let metadata = TermMetadata {
        label: Some("type 2 diabetes mellitus".to_string()),
        short_form: Some("MONDO_0005148".to_string()),
        description: vec!["A type of diabetes.".to_string()],
        synonyms: vec!["T2D".to_string()],
        ..TermMetadata::default()
    };
    let reported = vec!["Type 2 diabetes".to_string(), "T2D (males)".to_string()];
    let ancestors = vec!["diabetes mellitus".to_string()];
    let document = assemble_trait(
        &trait_row(),
        &reported,
        &aggregate(3, 5),
        Some(&metadata),
        &ancestors,
    );
    assert_eq!(
        document.description,
        "A type of diabetes.|associations: 5, studies: 3|Type 2 diabetes, T2D (males)|diabetes mellitus"
    );
    assert_eq!(document.reported_trait_s.as_deref(), Some("Type 2 diabetes"));
    assert_eq!(document.synonyms, vec!["T2D"]);
    assert_eq!(document.label_autosuggest, vec!["type 2 diabetes mellitus"]);
    assert_eq!(document.label_autosuggest_ws, document.label_autosuggest);
    assert_eq!(document.synonym_autosuggest, vec!["T2D"]);
    assert_eq!(document.synonym_autosuggest_ws, vec!["T2D"]);

    let json = serde_json::to_value(&document).unwrap();
    assert_eq!(json["synonym_autosuggest_e"][0], "T2D");
}

#[test]
fn merged_variant_title() {
    let variant = Variant {
        id: 5,
        rs_id: "rs123".to_string(),
        chromosome: "1".to_string(),
        position: 1_000,
        region: None,
        functional_class: Some("missense_variant".to_string()),
        current_rs_id: Some("rs456".to_string()),
    };
    let counts = VariantCounts {
        association_count: 2,
        study_count: 1,
    };
    let document = assemble_variant(&variant, counts, vec!["ABC|ENSG1|12".to_string()]).unwrap();
    assert_eq!(document.title, "rs456 (rs123)");
    assert_eq!(document.current_rs_id, "rs456");
    assert_eq!(document.merged_rs_id, "rs123");
    assert_eq!(document.link, "variants/rs123");
    assert_eq!(document.description, "1:1000|NA|Missense variant|ABC");
}

#[test]
fn variant_without_associations_is_not_assembled() {
    let variant = Variant {
        id: 6,
        rs_id: "rs9".to_string(),
        chromosome: "2".to_string(),
        position: 5,
        region: None,
        functional_class: None,
        current_rs_id: None,
    };
    assert!(assemble_variant(&variant, VariantCounts::default(), Vec::new()).is_none());
}

#[test]
fn incomplete_documents_are_removed() {
    let mut blank = assemble_trait(&trait_row(), &[], &aggregate(0, 0), None, &[]);
    blank.title = " ".to_string();
    let complete = assemble_trait(&trait_row(), &[], &aggregate(0, 0), None, &[]);

    let (kept, rejected) = retain_complete(vec![blank, complete]);
    assert_eq!(kept.len(), 1);
    assert_matches!(
        rejected.as_slice(),
        [DocsError::IncompleteDocument { field: "title", .. }]
    );
}
