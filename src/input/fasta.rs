use bio::io::fasta;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::InputError;
use crate::evaluator::SequenceRecord;

static KEY_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)=(\S+)$").expect("key-value pattern is a valid regex"));

/// Parse FASTA text into sequence records.
///
/// Header tokens (the record id and its description) are split on whitespace
/// and `|`; `key=value` tokens feed the gene, protein and chromosome fields.
/// Sequence lines are joined with whitespace removed. Residues keep their case.
pub fn parse(text: &str) -> Result<Vec<SequenceRecord>, InputError> {
    if text.trim().is_empty() {
        return Err(InputError::Empty);
    }
    check_layout(text)?;

    let mut records = Vec::new();
    for result in fasta::Reader::new(text.trim_start().as_bytes()).records() {
        let record = result.map_err(|e| InputError::Fasta(e.to_string()))?;
        let header = match record.desc() {
            Some(desc) => format!("{} {}", record.id(), desc),
            None => record.id().to_string(),
        };
        let sequence: String = String::from_utf8_lossy(record.seq())
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        records.push(into_record(&header, sequence));
    }

    if records.is_empty() {
        return Err(InputError::NoRecords);
    }
    Ok(records)
}

/// Line-numbered checks the record reader cannot report.
///
/// The reader stops silently at a bare `>` and only says "expected >" when
/// data precedes the first header.
fn check_layout(text: &str) -> Result<(), InputError> {
    let mut seen_header = false;
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.strip_prefix('>') {
            Some(header) if header.trim().is_empty() => {
                return Err(InputError::EmptyHeader { line: number + 1 });
            }
            Some(_) => seen_header = true,
            None if !seen_header => {
                return Err(InputError::SequenceBeforeHeader { line: number + 1 });
            }
            None => {}
        }
    }
    Ok(())
}

fn into_record(header: &str, sequence: String) -> SequenceRecord {
    let tokens: Vec<&str> = header
        .split(|c: char| c.is_whitespace() || c == '|')
        .filter(|t| !t.is_empty())
        .collect();

    let fields: HashMap<&str, &str> = tokens
        .iter()
        .filter_map(|t| KEY_VALUE.captures(t))
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .collect();

    let first = tokens.first().copied().map(str::to_string);
    let lookup = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| fields.get(k))
            .map(|v| v.to_string())
    };

    SequenceRecord {
        gene_name: lookup(&["gene", "GN", "GeneID"]).or_else(|| first.clone()),
        protein_name: lookup(&["protein", "ID"]).or(first),
        chromosome: lookup(&["chromosome", "chr"]),
        sequence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::try_evaluate;

    #[test]
    fn genomics_header_key_values() {
        let text = ">GeneID=7157|chr=17|gene=TP53 Homo sapiens tumor protein p53\nmeepq sdp\nSVEPP\n";
        let records = parse(text).unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.gene_name.as_deref(), Some("TP53"));
        assert_eq!(r.chromosome.as_deref(), Some("17"));
        assert_eq!(r.sequence, "meepqsdpSVEPP");
    }

    #[test]
    fn uniprot_header_uses_gn_and_first_token() {
        let text = ">sp|P04637|P53_HUMAN Cellular tumor antigen p53 OS=Homo sapiens GN=TP53 PE=1\nMEEPQ\n";
        let r = &parse(text).unwrap()[0];

        assert_eq!(r.gene_name.as_deref(), Some("TP53"));
        assert_eq!(r.protein_name.as_deref(), Some("sp"));
        assert_eq!(r.chromosome, None);
    }

    #[test]
    fn multiple_records_and_blank_lines() {
        let text = "\n>a gene=A\nAAA\n\n>b gene=B\nCCC\nGGG\n";
        let records = parse(text).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].gene_name.as_deref(), Some("A"));
        assert_eq!(records[1].sequence, "CCCGGG");
    }

    #[test]
    fn windows_line_endings() {
        let records = parse(">x gene=X\r\nKRS\r\nAAA\r\n").unwrap();
        assert_eq!(records[0].sequence, "KRSAAA");
    }

    #[test]
    fn format_violations() {
        assert!(matches!(parse("   \n"), Err(InputError::Empty)));
        assert!(matches!(
            parse("ACGT\n>x\n"),
            Err(InputError::SequenceBeforeHeader { line: 1 })
        ));
        assert!(matches!(parse(">\nACGT"), Err(InputError::EmptyHeader { line: 1 })));
        assert!(matches!(
            parse(">a\nAAA\n>  \nCCC\n"),
            Err(InputError::EmptyHeader { line: 3 })
        ));
    }

    #[test]
    fn lowercase_motif_is_not_a_candidate() {
        // Long, diverse and nuclear, but the motif is only present in lower case
        let residues = "ACDEFGHIKLMNPQSTVWYkrs".repeat(5);
        let records = parse(&format!(">gene=LOWER chr=3\n{residues}\n")).unwrap();
        assert_eq!(records[0].sequence, residues);

        let report = try_evaluate(&records).unwrap();
        assert!(!report.assessments[0].criteria.has_motif);
        assert!(report.candidates.is_empty());

        let upper = parse(&format!(">gene=UPPER chr=3\n{}\n", residues.to_uppercase())).unwrap();
        assert_eq!(try_evaluate(&upper).unwrap().candidates.len(), 1);
    }
}
