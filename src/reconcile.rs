use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::{EntityId, GeneKey};

/// Cross-references of one internal gene across the two external namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeneCrossRefs {
    pub gene_id: EntityId,
    pub symbol: String,
    #[serde(default)]
    pub ensembl_ids: Vec<String>,
    #[serde(default)]
    pub entrez_ids: Vec<String>,
    /// Alias and previous symbols and names.
    #[serde(default)]
    pub synonyms: Vec<String>,
    /// Identifiers in other resources (HGNC, UCSC, RefSeq, UniProt, ...).
    #[serde(default)]
    pub alternative_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GeneCandidate {
    pub symbol: String,
    pub ensembl_id: Option<String>,
    pub entrez_id: Option<String>,
}

impl GeneCandidate {
    pub fn canonical_key(&self) -> Option<GeneKey> {
        canonical_key(
            &self.symbol,
            self.ensembl_id.as_deref(),
            self.entrez_id.as_deref(),
        )
    }
}

/// Ensembl id first, then Entrez id, then the bare symbol. Blank values count
/// as absent; `None` means the gene has no identity at all.
pub fn canonical_key(
    gene_name: &str,
    ensembl_id: Option<&str>,
    entrez_id: Option<&str>,
) -> Option<GeneKey> {
    [ensembl_id, entrez_id, Some(gene_name)]
        .into_iter()
        .flatten()
        .find_map(|value| value.parse::<GeneKey>().ok())
}

#[derive(Debug, Clone, Default)]
pub struct IdentifierReconciler {
    genes: HashMap<EntityId, GeneCrossRefs>,
}

impl IdentifierReconciler {
    pub fn new<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = GeneCrossRefs>,
    {
        let mut reconciler = Self::default();
        for row in rows {
            reconciler.insert(row);
        }
        reconciler
    }

    pub fn insert(&mut self, row: GeneCrossRefs) {
        let entry = self
            .genes
            .entry(row.gene_id)
            .or_insert_with(|| GeneCrossRefs {
                gene_id: row.gene_id,
                symbol: row.symbol.clone(),
                ..GeneCrossRefs::default()
            });
        if entry.symbol.trim().is_empty() {
            entry.symbol = row.symbol.clone();
        }
        extend_unique(&mut entry.ensembl_ids, row.ensembl_ids);
        extend_unique(&mut entry.entrez_ids, row.entrez_ids);
        extend_unique(&mut entry.synonyms, row.synonyms);
        extend_unique(&mut entry.alternative_ids, row.alternative_ids);
    }

    pub fn contains(&self, gene_id: EntityId) -> bool {
        self.genes.contains_key(&gene_id)
    }

    pub fn cross_refs(&self, gene_id: EntityId) -> Option<&GeneCrossRefs> {
        self.genes.get(&gene_id)
    }

    /// Every Ensembl/Entrez pairing known for the gene. Disagreeing sources
    /// are all reported; nothing is adjudicated here.
    pub fn candidates(&self, gene_id: EntityId) -> Vec<GeneCandidate> {
        let Some(refs) = self.genes.get(&gene_id) else {
            return Vec::new();
        };
        let ensembl = optional_values(&refs.ensembl_ids);
        let entrez = optional_values(&refs.entrez_ids);
        let mut candidates = BTreeSet::new();
        for ensembl_id in &ensembl {
            for entrez_id in &entrez {
                candidates.insert(GeneCandidate {
                    symbol: refs.symbol.trim().to_string(),
                    ensembl_id: ensembl_id.clone(),
                    entrez_id: entrez_id.clone(),
                });
            }
        }
        candidates.into_iter().collect()
    }

    /// One key per distinct Ensembl gene, falling back to Entrez ids and then
    /// the symbol when the preferred namespace is empty.
    pub fn canonical_keys(&self, gene_id: EntityId) -> Vec<GeneKey> {
        let keys = self
            .candidates(gene_id)
            .iter()
            .filter_map(GeneCandidate::canonical_key)
            .collect::<BTreeSet<_>>();
        keys.into_iter().collect()
    }

    /// `symbol|ensembl|entrez` labels, one per Ensembl/Entrez pairing from
    /// [`Self::candidates`], empty parts skipped.
    pub fn labels(&self, gene_id: EntityId) -> Vec<String> {
        self.candidates(gene_id)
            .into_iter()
            .map(|candidate| {
                [
                    Some(candidate.symbol),
                    candidate.ensembl_id,
                    candidate.entrez_id,
                ]
                .into_iter()
                .flatten()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join("|")
            })
            .filter(|label| !label.is_empty())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

fn extend_unique(target: &mut Vec<String>, values: Vec<String>) {
    for value in values {
        let value = value.trim().to_string();
        if !value.is_empty() && !target.contains(&value) {
            target.push(value);
        }
    }
}

fn optional_values(values: &[String]) -> Vec<Option<String>> {
    let present = values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(|value| Some(value.to_string()))
        .collect::<Vec<_>>();
    if present.is_empty() { vec![None] } else { present }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_namespaces_fall_through() {
        let key = canonical_key("BRCA2", Some("  "), Some("675")).unwrap();
        assert_eq!(key.as_str(), "675");
    }

    #[test]
    fn rows_for_same_gene_merge() {
        let reconciler = IdentifierReconciler::new(vec![
            GeneCrossRefs {
                gene_id: 1,
                symbol: "TP53".to_string(),
                ensembl_ids: vec!["ENSG00000141510".to_string()],
                entrez_ids: vec![],
                ..GeneCrossRefs::default()
            },
            GeneCrossRefs {
                gene_id: 1,
                symbol: "TP53".to_string(),
                ensembl_ids: vec!["ENSG00000141510".to_string()],
                entrez_ids: vec!["7157".to_string()],
                ..GeneCrossRefs::default()
            },
        ]);
        assert_eq!(reconciler.len(), 1);
        assert_eq!(reconciler.labels(1), vec!["TP53|ENSG00000141510|7157"]);
    }
}
