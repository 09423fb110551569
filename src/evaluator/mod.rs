// Biomarker evaluator
//
// Scores sequence records against four weighted criteria and names the
// records that satisfy all of them.

pub mod criteria;
pub mod demo;
pub mod naming;
pub mod types;

use tracing::{debug, warn};

pub use criteria::MOTIF_PATTERN;
pub use naming::canonical_name;
pub use types::{
    Assessment, BiomarkerCandidate, Criteria, EvaluationError, EvaluationReport, SequenceRecord,
};

/// Evaluate a batch, failing on the first malformed record.
///
/// The report holds one assessment per input record, in input order, and a
/// candidate for each record meeting every criterion.
pub fn try_evaluate(records: &[SequenceRecord]) -> Result<EvaluationReport, EvaluationError> {
    let mut report = EvaluationReport::default();

    for (index, record) in records.iter().enumerate() {
        let assessment = criteria::assess(index, record)?;

        if assessment.criteria.all() {
            report.candidates.push(candidate(record, &assessment));
        }
        report.assessments.push(assessment);
    }

    debug!(
        records = records.len(),
        candidates = report.candidates.len(),
        "Evaluated sequence batch"
    );

    Ok(report)
}

/// Fail-closed evaluation: any malformed record yields no candidates at all.
pub fn evaluate(records: &[SequenceRecord]) -> Vec<BiomarkerCandidate> {
    match try_evaluate(records) {
        Ok(report) => report.candidates,
        Err(e) => {
            warn!(error = %e, records = records.len(), "Evaluation failed, discarding batch");
            Vec::new()
        }
    }
}

fn candidate(record: &SequenceRecord, assessment: &Assessment) -> BiomarkerCandidate {
    let has_motif = assessment.criteria.has_motif;

    BiomarkerCandidate {
        name: canonical_name(
            record.gene_name.as_deref(),
            MOTIF_PATTERN,
            assessment.sequence_length,
            record.chromosome.as_deref(),
        ),
        gene_name: record.gene_name.clone(),
        protein_name: record.protein_name.clone(),
        chromosome: record.chromosome.clone(),
        sequence_length: assessment.sequence_length,
        distinct_symbols: assessment.distinct_symbols,
        has_motif,
        motif_pattern: MOTIF_PATTERN.to_string(),
        score: assessment.score,
        significant: assessment.criteria.all(),
        annotation: format!(
            "Sequence length: {}, unique residues: {}, motif present: {}",
            assessment.sequence_length, assessment.distinct_symbols, has_motif
        ),
    }
}
