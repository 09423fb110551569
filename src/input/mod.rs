// Input record sources
//
// Turns an analysis' attached data file into sequence records for the
// evaluator, or supplies the demonstration set when nothing is attached. A
// proteomics file paired with a genomics file is integrated first.

pub mod fasta;
pub mod merge;
pub mod table;

pub use merge::integrate;

use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::analysis::Analysis;
use crate::evaluator::{demo, EvaluationError, SequenceRecord};
use crate::upload::DataFileKind;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input is empty")]
    Empty,

    #[error("no records found")]
    NoRecords,

    #[error("line {line}: header has no identifier")]
    EmptyHeader { line: usize },

    #[error("line {line}: sequence data before the first header")]
    SequenceBeforeHeader { line: usize },

    #[error("malformed FASTA: {0}")]
    Fasta(String),

    #[error("no matches between {proteomics} proteomics and {genomics} genomics records")]
    NoMatches { proteomics: usize, genomics: usize },

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("{0:?} files cannot be read as sequence records")]
    Unsupported(DataFileKind),

    #[error("unrecognised data file: {0}")]
    UnknownKind(String),

    #[error("delimited text error: {0}")]
    Table(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<InputError> for EvaluationError {
    fn from(err: InputError) -> Self {
        EvaluationError::Input {
            reason: err.to_string(),
        }
    }
}

/// Parse text of a known kind into records.
pub fn parse(kind: DataFileKind, text: &str) -> Result<Vec<SequenceRecord>, InputError> {
    match kind {
        DataFileKind::Fasta | DataFileKind::Txt => fasta::parse(text),
        DataFileKind::Csv => table::parse(text, b','),
        DataFileKind::Tsv => table::parse(text, b'\t'),
        DataFileKind::Vcf => Err(InputError::Unsupported(kind)),
    }
}

/// Read and parse a data file, choosing the parser from its extension.
pub fn read_records(path: &Path) -> Result<Vec<SequenceRecord>, InputError> {
    let kind = DataFileKind::from_path(path)
        .ok_or_else(|| InputError::UnknownKind(path.display().to_string()))?;
    let text = std::fs::read_to_string(path)?;
    parse(kind, &text)
}

/// Supplies the records scored at an analysis' terminal stage.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait RecordSource: Send + Sync {
    fn load(&self, analysis: &Analysis) -> Result<Vec<SequenceRecord>, EvaluationError>;
}

/// Always the fixed demonstration records.
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoRecords;

impl RecordSource for DemoRecords {
    fn load(&self, _analysis: &Analysis) -> Result<Vec<SequenceRecord>, EvaluationError> {
        Ok(demo::example_records())
    }
}

/// Reads the analysis' attached file, or the demonstration set without one.
///
/// With a genomics file attached as well, the attached file is taken as the
/// proteomics side and the two are integrated.
#[derive(Debug, Default, Clone, Copy)]
pub struct UploadedFileSource;

impl RecordSource for UploadedFileSource {
    fn load(&self, analysis: &Analysis) -> Result<Vec<SequenceRecord>, EvaluationError> {
        let Some(path) = &analysis.input_path else {
            return Ok(demo::example_records());
        };

        let records = read_records(path)?;
        info!(
            analysis.id = %analysis.id,
            path = %path.display(),
            records = records.len(),
            "Loaded input records"
        );

        match &analysis.genomics_path {
            Some(genomics_path) => {
                let genomics = read_records(genomics_path)?;
                info!(
                    analysis.id = %analysis.id,
                    path = %genomics_path.display(),
                    records = genomics.len(),
                    "Loaded genomics records"
                );
                Ok(integrate(&records, &genomics)?)
            }
            None => Ok(records),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::NewAnalysis;
    use std::io::Write;

    fn analysis_with(path: Option<std::path::PathBuf>) -> Analysis {
        let mut analysis = Analysis::new(NewAnalysis::new("user-1", "run")).unwrap();
        analysis.input_path = path;
        analysis
    }

    #[test]
    fn no_attachment_uses_demo_records() {
        let records = UploadedFileSource.load(&analysis_with(None)).unwrap();
        assert_eq!(records, demo::example_records());
    }

    #[test]
    fn reads_attached_fasta() {
        let mut file = tempfile::Builder::new().suffix(".fasta").tempfile().unwrap();
        writeln!(file, ">gene=ABC chr=chr2\nKRSACDEFGH").unwrap();

        let records = UploadedFileSource
            .load(&analysis_with(Some(file.path().to_path_buf())))
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].gene_name.as_deref(), Some("ABC"));
        assert_eq!(records[0].chromosome.as_deref(), Some("chr2"));
    }

    fn fasta_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".fasta").tempfile().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn paired_files_are_integrated_on_sequence() {
        let proteomics = fasta_file(">ID=P38398 Breast cancer type 1\nKRSACDEFGH\n>ID=Q00000\nWWWW\n");
        let genomics = fasta_file(">gene=BRCA1 chr=17\nKRSACDEFGH\n");

        let mut analysis = analysis_with(Some(proteomics.path().to_path_buf()));
        analysis.genomics_path = Some(genomics.path().to_path_buf());
        let records = UploadedFileSource.load(&analysis).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].gene_name.as_deref(), Some("BRCA1"));
        assert_eq!(records[0].protein_name.as_deref(), Some("P38398"));
        assert_eq!(records[0].chromosome.as_deref(), Some("17"));
    }

    #[test]
    fn paired_files_fall_back_to_numeric_ids() {
        let proteomics = fasta_file(">ID=PROT7157\nMEEPQSDPSV\n");
        let genomics = fasta_file(">gene=GENE7157 chr=17\nATGGAGGAGCCG\n");

        let mut analysis = analysis_with(Some(proteomics.path().to_path_buf()));
        analysis.genomics_path = Some(genomics.path().to_path_buf());
        let records = UploadedFileSource.load(&analysis).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].gene_name.as_deref(), Some("GENE7157"));
        assert_eq!(records[0].sequence, "MEEPQSDPSV");
    }

    #[test]
    fn unrelated_pair_is_an_input_error() {
        let proteomics = fasta_file(">ID=alpha\nKRS\n");
        let genomics = fasta_file(">gene=beta chr=1\nAAA\n");

        let mut analysis = analysis_with(Some(proteomics.path().to_path_buf()));
        analysis.genomics_path = Some(genomics.path().to_path_buf());
        let err = UploadedFileSource.load(&analysis).unwrap_err();

        match err {
            EvaluationError::Input { reason } => assert!(reason.contains("no matches")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn vcf_is_rejected_as_input_error() {
        let mut file = tempfile::Builder::new().suffix(".vcf").tempfile().unwrap();
        writeln!(file, "##fileformat=VCFv4.2").unwrap();

        let err = UploadedFileSource
            .load(&analysis_with(Some(file.path().to_path_buf())))
            .unwrap_err();

        assert!(matches!(err, EvaluationError::Input { .. }));
    }
}
