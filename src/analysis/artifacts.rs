use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::types::{
    AnalysisSummary, ArtifactPayload, ChartKind, LengthBin, ResultArtifact, ScatterPoint,
};
use crate::evaluator::naming::chromosome_label;
use crate::evaluator::{Assessment, EvaluationReport};

pub const CRITERIA_ANALYSIS: &str = "criteria_analysis";
pub const BIOMARKER_DISTRIBUTION: &str = "biomarker_distribution";
pub const CHROMOSOME_DISTRIBUTION: &str = "chromosome_distribution";
pub const LENGTH_DISTRIBUTION: &str = "length_distribution";
pub const SCATTER_PLOT: &str = "scatter_plot";
pub const SUMMARY: &str = "summary";

/// Width of the sequence length histogram bins.
pub const LENGTH_BIN_WIDTH: usize = 100;

/// Artifacts persisted alongside the biomarkers of a completed analysis.
pub fn build(analysis_id: Uuid, report: &EvaluationReport, now: DateTime<Utc>) -> Vec<ResultArtifact> {
    let artifact = |result_type: &str, payload: ArtifactPayload| ResultArtifact {
        id: Uuid::new_v4(),
        analysis_id,
        result_type: result_type.to_string(),
        payload,
        created_at: now,
    };

    vec![
        artifact(CRITERIA_ANALYSIS, chart(ChartKind::Bar, criteria_counts(report))),
        artifact(BIOMARKER_DISTRIBUTION, chart(ChartKind::Pie, biomarker_split(report))),
        artifact(CHROMOSOME_DISTRIBUTION, chart(ChartKind::Bar, chromosome_counts(report))),
        artifact(
            LENGTH_DISTRIBUTION,
            ArtifactPayload::Histogram {
                bin_width: LENGTH_BIN_WIDTH,
                bins: length_bins(report),
            },
        ),
        artifact(
            SCATTER_PLOT,
            ArtifactPayload::Scatter {
                points: scatter_points(report),
            },
        ),
        artifact(SUMMARY, ArtifactPayload::Summary(summarize(report))),
    ]
}

fn chart(chart: ChartKind, counts: BTreeMap<String, u64>) -> ArtifactPayload {
    ArtifactPayload::Chart { chart, counts }
}

fn count<F>(report: &EvaluationReport, predicate: F) -> u64
where
    F: Fn(&Assessment) -> bool,
{
    report.assessments.iter().filter(|a| predicate(*a)).count() as u64
}

fn criteria_counts(report: &EvaluationReport) -> BTreeMap<String, u64> {
    BTreeMap::from([
        ("length_gt_100".to_string(), count(report, |a| a.criteria.length_gt_100)),
        ("has_motif".to_string(), count(report, |a| a.criteria.has_motif)),
        ("unique_gt_15".to_string(), count(report, |a| a.criteria.unique_gt_15)),
        ("not_mitochondrial".to_string(), count(report, |a| a.criteria.not_mitochondrial)),
        ("biomarkers".to_string(), report.candidates.len() as u64),
    ])
}

fn biomarker_split(report: &EvaluationReport) -> BTreeMap<String, u64> {
    let biomarkers = report.candidates.len() as u64;
    let total = report.assessments.len() as u64;

    BTreeMap::from([
        ("biomarker".to_string(), biomarkers),
        ("non_biomarker".to_string(), total.saturating_sub(biomarkers)),
    ])
}

fn chromosome_counts(report: &EvaluationReport) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for assessment in &report.assessments {
        *counts
            .entry(chromosome_label(assessment.chromosome.as_deref()))
            .or_insert(0) += 1;
    }
    counts
}

/// Non-empty length bins in ascending order, split by biomarker status.
fn length_bins(report: &EvaluationReport) -> Vec<LengthBin> {
    let mut bins: BTreeMap<usize, LengthBin> = BTreeMap::new();
    for assessment in &report.assessments {
        let start = assessment.sequence_length / LENGTH_BIN_WIDTH * LENGTH_BIN_WIDTH;
        let bin = bins.entry(start).or_insert(LengthBin {
            start,
            biomarkers: 0,
            non_biomarkers: 0,
        });
        if assessment.criteria.all() {
            bin.biomarkers += 1;
        } else {
            bin.non_biomarkers += 1;
        }
    }
    bins.into_values().collect()
}

fn scatter_points(report: &EvaluationReport) -> Vec<ScatterPoint> {
    report
        .assessments
        .iter()
        .map(|a| ScatterPoint {
            sequence_length: a.sequence_length,
            distinct_symbols: a.distinct_symbols,
            is_biomarker: a.criteria.all(),
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage(part: u64, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(part as f64 * 100.0 / total as f64)
    }
}

pub fn summarize(report: &EvaluationReport) -> AnalysisSummary {
    let total = report.assessments.len();
    let lengths = report.assessments.iter().map(|a| a.sequence_length);
    let mean = |sum: usize| if total == 0 { 0.0 } else { round2(sum as f64 / total as f64) };

    AnalysisSummary {
        total_entries: total,
        biomarker_count: report.candidates.len(),
        biomarker_percentage: percentage(report.candidates.len() as u64, total),
        avg_sequence_length: mean(lengths.clone().sum()),
        min_sequence_length: lengths.clone().min().unwrap_or(0),
        max_sequence_length: lengths.max().unwrap_or(0),
        avg_distinct_symbols: mean(report.assessments.iter().map(|a| a.distinct_symbols).sum()),
        motif_percentage: percentage(count(report, |a| a.criteria.has_motif), total),
        length_criteria_percentage: percentage(count(report, |a| a.criteria.length_gt_100), total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{demo, try_evaluate};

    #[test]
    fn demo_report_artifacts() {
        let report = try_evaluate(&demo::example_records()).unwrap();
        let analysis_id = Uuid::new_v4();
        let artifacts = build(analysis_id, &report, Utc::now());

        let types: Vec<&str> = artifacts.iter().map(|a| a.result_type.as_str()).collect();
        assert_eq!(
            types,
            vec![
                CRITERIA_ANALYSIS,
                BIOMARKER_DISTRIBUTION,
                CHROMOSOME_DISTRIBUTION,
                LENGTH_DISTRIBUTION,
                SCATTER_PLOT,
                SUMMARY,
            ]
        );
        assert!(artifacts.iter().all(|a| a.analysis_id == analysis_id));

        match &artifacts[0].payload {
            ArtifactPayload::Chart { chart, counts } => {
                assert_eq!(*chart, ChartKind::Bar);
                assert_eq!(counts["not_mitochondrial"], 1);
                assert_eq!(counts["has_motif"], 2);
                assert_eq!(counts["biomarkers"], 1);
            }
            other => panic!("unexpected payload {other:?}"),
        }

        match &artifacts[2].payload {
            ArtifactPayload::Chart { counts, .. } => {
                assert_eq!(counts.get("17"), Some(&1));
                assert_eq!(counts.get("MT"), Some(&1));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn length_histogram_and_scatter_split_by_status() {
        let report = try_evaluate(&demo::example_records()).unwrap();
        let artifacts = build(Uuid::new_v4(), &report, Utc::now());

        match &artifacts[3].payload {
            ArtifactPayload::Histogram { bin_width, bins } => {
                assert_eq!(*bin_width, LENGTH_BIN_WIDTH);
                assert_eq!(
                    bins,
                    &vec![
                        LengthBin {
                            start: 200,
                            biomarkers: 0,
                            non_biomarkers: 1,
                        },
                        LengthBin {
                            start: 1800,
                            biomarkers: 1,
                            non_biomarkers: 0,
                        },
                    ]
                );
            }
            other => panic!("unexpected payload {other:?}"),
        }

        match &artifacts[4].payload {
            ArtifactPayload::Scatter { points } => {
                assert_eq!(points.len(), 2);
                assert_eq!(points.iter().filter(|p| p.is_biomarker).count(), 1);
                let biomarker = points.iter().find(|p| p.is_biomarker).unwrap();
                assert_eq!(biomarker.sequence_length, 1863);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn summary_statistics() {
        let report = try_evaluate(&demo::example_records()).unwrap();
        let summary = summarize(&report);

        assert_eq!(summary.total_entries, 2);
        assert_eq!(summary.biomarker_count, 1);
        assert_eq!(summary.biomarker_percentage, 50.0);
        assert_eq!(summary.min_sequence_length, 240);
        assert_eq!(summary.max_sequence_length, 1863);
        assert_eq!(summary.avg_sequence_length, 1051.5);
        assert_eq!(summary.motif_percentage, 100.0);
    }

    #[test]
    fn empty_report_has_zeroed_summary() {
        let summary = summarize(&EvaluationReport::default());
        assert_eq!(summary.total_entries, 0);
        assert_eq!(summary.avg_sequence_length, 0.0);
        assert_eq!(summary.max_sequence_length, 0);
    }
}
