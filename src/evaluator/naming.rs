use super::criteria::MOTIF_PATTERN;

/// Canonical biomarker name: `{GENE}_{MOTIF}_{LEN}_{CHROM}`.
pub fn canonical_name(
    gene_name: Option<&str>,
    motif_pattern: &str,
    sequence_length: usize,
    chromosome: Option<&str>,
) -> String {
    format!(
        "{}_{}_{}_{}",
        gene_segment(gene_name),
        motif_segment(motif_pattern),
        length_segment(sequence_length),
        chromosome_label(chromosome)
    )
}

fn gene_segment(gene_name: Option<&str>) -> String {
    let stripped: String = gene_name
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    if stripped.is_empty() {
        "UNK".to_string()
    } else {
        stripped
    }
}

fn motif_segment(motif_pattern: &str) -> &'static str {
    if motif_pattern == MOTIF_PATTERN {
        "KRS"
    } else {
        "GEN"
    }
}

fn length_segment(sequence_length: usize) -> &'static str {
    match sequence_length {
        n if n > 500 => "L",
        n if n > 200 => "M",
        _ => "S",
    }
}

pub fn chromosome_label(chromosome: Option<&str>) -> String {
    let raw = match chromosome.map(str::trim) {
        Some(c) if !c.is_empty() => c,
        _ => return "X".to_string(),
    };

    let stripped = match raw.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &raw[3..],
        _ => raw,
    };

    if stripped.is_empty() {
        "X".to_string()
    } else {
        stripped.to_uppercase()
    }
}
