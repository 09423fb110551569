use csv::{ReaderBuilder, StringRecord, Trim};

use super::InputError;
use crate::evaluator::SequenceRecord;

/// Column positions resolved from the header row.
struct Columns {
    gene: usize,
    protein: Option<usize>,
    chromosome: Option<usize>,
    sequence: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, InputError> {
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

        Ok(Self {
            gene: find("gene").ok_or(InputError::MissingColumn("gene"))?,
            protein: find("protein"),
            chromosome: find("chromosome"),
            sequence: find("sequence").ok_or(InputError::MissingColumn("sequence"))?,
        })
    }

    fn record(&self, row: &StringRecord) -> SequenceRecord {
        let field = |i: usize| {
            row.get(i)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        SequenceRecord {
            gene_name: field(self.gene),
            protein_name: self.protein.and_then(field),
            chromosome: self.chromosome.and_then(field),
            sequence: row
                .get(self.sequence)
                .unwrap_or_default()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect(),
        }
    }
}

/// Parse delimited text with a header row naming `gene` and `sequence`
/// (plus optional `protein` and `chromosome`) columns.
pub fn parse(text: &str, delimiter: u8) -> Result<Vec<SequenceRecord>, InputError> {
    if text.trim().is_empty() {
        return Err(InputError::Empty);
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns = Columns::resolve(reader.headers()?)?;

    let records = reader
        .records()
        .map(|row| row.map(|r| columns.record(&r)))
        .collect::<Result<Vec<_>, _>>()?;

    if records.is_empty() {
        return Err(InputError::NoRecords);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_with_mixed_case_headers() {
        let text = "Gene,Protein,Chromosome,Sequence\nBRCA1,Breast cancer 1,17,mdlsa\nTP53,,,MEEPQ\n";
        let records = parse(text, b',').unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].gene_name.as_deref(), Some("BRCA1"));
        assert_eq!(records[0].sequence, "mdlsa");
        assert_eq!(records[1].protein_name, None);
        assert_eq!(records[1].chromosome, None);
    }

    #[test]
    fn tsv_without_optional_columns() {
        let text = "sequence\tgene\nKRSAAA\tX1\n";
        let records = parse(text, b'\t').unwrap();

        assert_eq!(records[0].gene_name.as_deref(), Some("X1"));
        assert_eq!(records[0].chromosome, None);
    }

    #[test]
    fn missing_required_column() {
        let err = parse("gene,chromosome\nA,1\n", b',').unwrap_err();
        assert!(matches!(err, InputError::MissingColumn("sequence")));
    }

    #[test]
    fn header_only_has_no_records() {
        assert!(matches!(parse("gene,sequence\n", b','), Err(InputError::NoRecords)));
    }
}
