use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One sequence entry as handed to the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub gene_name: Option<String>,
    pub protein_name: Option<String>,
    pub chromosome: Option<String>,
    pub sequence: String,
}

impl SequenceRecord {
    pub fn new(
        gene_name: impl Into<String>,
        protein_name: impl Into<String>,
        chromosome: impl Into<String>,
        sequence: impl Into<String>,
    ) -> Self {
        Self {
            gene_name: Some(gene_name.into()),
            protein_name: Some(protein_name.into()),
            chromosome: Some(chromosome.into()),
            sequence: sequence.into(),
        }
    }

    pub fn with_gene(mut self, gene_name: Option<String>) -> Self {
        self.gene_name = gene_name;
        self
    }

    pub fn with_chromosome(mut self, chromosome: Option<String>) -> Self {
        self.chromosome = chromosome;
        self
    }
}

/// The four qualification criteria for a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    pub length_gt_100: bool,
    pub has_motif: bool,
    pub unique_gt_15: bool,
    pub not_mitochondrial: bool,
}

impl Criteria {
    /// All four hold. This, not the score, gates emission.
    pub fn all(&self) -> bool {
        self.length_gt_100 && self.has_motif && self.unique_gt_15 && self.not_mitochondrial
    }
}

/// Per-record evaluation, produced for every input whether or not it qualifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub gene_name: Option<String>,
    pub chromosome: Option<String>,
    pub sequence_length: usize,
    pub distinct_symbols: usize,
    pub criteria: Criteria,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiomarkerCandidate {
    pub name: String,
    pub gene_name: Option<String>,
    pub protein_name: Option<String>,
    pub chromosome: Option<String>,
    pub sequence_length: usize,
    pub distinct_symbols: usize,
    pub has_motif: bool,
    pub motif_pattern: String,
    pub score: u8,
    pub significant: bool,
    pub annotation: String,
}

/// Output of one evaluator pass over a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub assessments: Vec<Assessment>,
    pub candidates: Vec<BiomarkerCandidate>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("record {index} has an empty sequence")]
    EmptySequence { index: usize },

    #[error("record {index} contains invalid symbol {symbol:?} at position {position}")]
    InvalidSymbol {
        index: usize,
        symbol: char,
        position: usize,
    },

    #[error("input could not be loaded: {reason}")]
    Input { reason: String },
}
