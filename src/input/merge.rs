use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, info};

use super::InputError;
use crate::evaluator::SequenceRecord;

static NUMERIC_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("numeric id pattern is a valid regex"));

/// Pair proteomics records with the genomics records describing them.
///
/// Records are first joined on identical sequences. When no pair shares a
/// sequence, the first run of digits in the protein name is matched against
/// the first run of digits in the gene name instead. Each pair yields one
/// record: gene and chromosome from the genomics side, protein and sequence
/// from the proteomics side. Pairs follow proteomics order, then genomics
/// order.
pub fn integrate(
    proteomics: &[SequenceRecord],
    genomics: &[SequenceRecord],
) -> Result<Vec<SequenceRecord>, InputError> {
    let by_sequence = join(
        proteomics,
        genomics,
        |r| Some(r.sequence.as_str()),
        |r| Some(r.sequence.as_str()),
    );
    debug!(matches = by_sequence.len(), "Sequence-based matching");
    if !by_sequence.is_empty() {
        info!(records = by_sequence.len(), "Integrated datasets on sequence");
        return Ok(by_sequence);
    }

    let by_id = join(
        proteomics,
        genomics,
        |r| numeric_id(r.protein_name.as_deref()),
        |r| numeric_id(r.gene_name.as_deref()),
    );
    debug!(matches = by_id.len(), "ID-based matching");
    if by_id.is_empty() {
        return Err(InputError::NoMatches {
            proteomics: proteomics.len(),
            genomics: genomics.len(),
        });
    }

    info!(records = by_id.len(), "Integrated datasets on numeric identifiers");
    Ok(by_id)
}

fn numeric_id(name: Option<&str>) -> Option<&str> {
    NUMERIC_ID.find(name?).map(|m| m.as_str())
}

fn join<'a>(
    proteomics: &'a [SequenceRecord],
    genomics: &'a [SequenceRecord],
    protein_key: impl Fn(&'a SequenceRecord) -> Option<&'a str>,
    gene_key: impl Fn(&'a SequenceRecord) -> Option<&'a str>,
) -> Vec<SequenceRecord> {
    let mut index: HashMap<&str, Vec<&SequenceRecord>> = HashMap::new();
    for record in genomics {
        if let Some(key) = gene_key(record) {
            index.entry(key).or_default().push(record);
        }
    }

    let mut merged = Vec::new();
    for protein in proteomics {
        let Some(matches) = protein_key(protein).and_then(|key| index.get(key)) else {
            continue;
        };
        merged.extend(matches.iter().map(|gene| SequenceRecord {
            gene_name: gene.gene_name.clone(),
            protein_name: protein.protein_name.clone(),
            chromosome: gene.chromosome.clone(),
            sequence: protein.sequence.clone(),
        }));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protein(name: &str, sequence: &str) -> SequenceRecord {
        SequenceRecord {
            gene_name: None,
            protein_name: Some(name.to_string()),
            chromosome: None,
            sequence: sequence.to_string(),
        }
    }

    fn gene(name: &str, chromosome: &str, sequence: &str) -> SequenceRecord {
        SequenceRecord {
            gene_name: Some(name.to_string()),
            protein_name: None,
            chromosome: Some(chromosome.to_string()),
            sequence: sequence.to_string(),
        }
    }

    #[test]
    fn shared_sequences_are_joined() {
        let proteomics = vec![protein("P1", "KRSAAA"), protein("P2", "CCCC")];
        let genomics = vec![
            gene("BRCA1", "17", "KRSAAA"),
            gene("TP53", "17", "GGGG"),
            gene("BRCA1-alt", "X", "KRSAAA"),
        ];

        let merged = integrate(&proteomics, &genomics).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].gene_name.as_deref(), Some("BRCA1"));
        assert_eq!(merged[0].protein_name.as_deref(), Some("P1"));
        assert_eq!(merged[0].chromosome.as_deref(), Some("17"));
        assert_eq!(merged[1].gene_name.as_deref(), Some("BRCA1-alt"));
        assert_eq!(merged[1].chromosome.as_deref(), Some("X"));
    }

    #[test]
    fn numeric_ids_are_used_when_no_sequence_matches() {
        let proteomics = vec![protein("prot_7157", "MEEPQ"), protein("prot_672", "MDLSA")];
        let genomics = vec![gene("gene7157", "17", "ATGGAG"), gene("nothing", "2", "ATG")];

        let merged = integrate(&proteomics, &genomics).unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].gene_name.as_deref(), Some("gene7157"));
        assert_eq!(merged[0].protein_name.as_deref(), Some("prot_7157"));
        assert_eq!(merged[0].sequence, "MEEPQ");
    }

    #[test]
    fn sequence_matches_take_precedence_over_ids() {
        let proteomics = vec![protein("p1", "KRS"), protein("p2", "AAA")];
        let genomics = vec![gene("g2", "1", "KRS")];

        let merged = integrate(&proteomics, &genomics).unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].protein_name.as_deref(), Some("p1"));
    }

    #[test]
    fn disjoint_datasets_are_an_error() {
        let err = integrate(&[protein("alpha", "KRS")], &[gene("beta", "1", "AAA")]).unwrap_err();
        assert!(matches!(
            err,
            InputError::NoMatches {
                proteomics: 1,
                genomics: 1
            }
        ));
    }
}
