use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::types::{Assessment, Criteria, EvaluationError, SequenceRecord};

/// Phosphorylation-site motif searched for in every sequence.
pub const MOTIF_PATTERN: &str = "KR[ST]";

pub const MIN_LENGTH: usize = 100;
pub const MIN_DISTINCT_SYMBOLS: usize = 15;
pub const MITOCHONDRIAL: &str = "MT";

pub const LENGTH_WEIGHT: u8 = 25;
pub const MOTIF_WEIGHT: u8 = 40;
pub const VARIABILITY_WEIGHT: u8 = 25;
pub const NON_MITOCHONDRIAL_WEIGHT: u8 = 10;

static MOTIF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(MOTIF_PATTERN).expect("motif pattern is a valid regex"));

pub fn has_motif(sequence: &str) -> bool {
    MOTIF.is_match(sequence)
}

pub fn distinct_symbols(sequence: &str) -> usize {
    sequence.chars().collect::<HashSet<_>>().len()
}

pub fn is_mitochondrial(chromosome: Option<&str>) -> bool {
    chromosome
        .map(|c| c.trim().eq_ignore_ascii_case(MITOCHONDRIAL))
        .unwrap_or(false)
}

/// Weighted sum of the criteria that hold, 0..=100.
pub fn score(criteria: &Criteria) -> u8 {
    let mut total = 0;
    if criteria.length_gt_100 {
        total += LENGTH_WEIGHT;
    }
    if criteria.has_motif {
        total += MOTIF_WEIGHT;
    }
    if criteria.unique_gt_15 {
        total += VARIABILITY_WEIGHT;
    }
    if criteria.not_mitochondrial {
        total += NON_MITOCHONDRIAL_WEIGHT;
    }
    total
}

/// Reject sequences the criteria cannot be meaningfully applied to.
pub fn check_record(index: usize, record: &SequenceRecord) -> Result<(), EvaluationError> {
    if record.sequence.is_empty() {
        return Err(EvaluationError::EmptySequence { index });
    }

    if let Some((position, symbol)) = record
        .sequence
        .chars()
        .enumerate()
        .find(|(_, c)| !c.is_ascii_graphic())
    {
        return Err(EvaluationError::InvalidSymbol {
            index,
            symbol,
            position,
        });
    }

    Ok(())
}

pub fn assess(index: usize, record: &SequenceRecord) -> Result<Assessment, EvaluationError> {
    check_record(index, record)?;

    let sequence_length = record.sequence.chars().count();
    let distinct = distinct_symbols(&record.sequence);

    let criteria = Criteria {
        length_gt_100: sequence_length > MIN_LENGTH,
        has_motif: has_motif(&record.sequence),
        unique_gt_15: distinct > MIN_DISTINCT_SYMBOLS,
        not_mitochondrial: !is_mitochondrial(record.chromosome.as_deref()),
    };

    Ok(Assessment {
        gene_name: record.gene_name.clone(),
        chromosome: record.chromosome.clone(),
        sequence_length,
        distinct_symbols: distinct,
        score: score(&criteria),
        criteria,
    })
}
