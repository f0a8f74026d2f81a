//! Dashboard statistics over the indicator population.

use std::collections::BTreeMap;

use hitos_core::{present, Indicator};
use serde::{Deserialize, Serialize};

/// Read-only summary of every indicator and milestone.
///
/// Groupings are keyed by the values found in the data. Missing or blank
/// values are left out of a grouping but still count towards the totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    /// Number of indicators
    pub total_indicators: usize,

    /// Number of milestones across all indicators
    pub total_milestones: usize,

    /// Indicators per organizational unit (`vp`)
    pub count_by_organizational_unit: BTreeMap<String, usize>,

    /// Indicators per area, grouped by organizational unit
    pub count_by_area_per_unit: BTreeMap<String, BTreeMap<String, usize>>,

    /// Indicators per indicator type
    pub count_by_indicator_type: BTreeMap<String, usize>,

    /// Milestones per status label
    pub milestone_status_distribution: BTreeMap<String, usize>,

    /// Data-quality signals
    pub completeness: CompletenessMetrics,

    /// Mean milestone progress, two decimals
    pub average_milestone_progress: f64,

    /// Mean milestone progress per area, two decimals
    pub average_progress_by_area: BTreeMap<String, f64>,
}

/// How much of the indicator data is filled in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessMetrics {
    /// Denominator for both ratios
    pub total_indicators: usize,

    /// Indicators with both start and end date
    pub with_dates: usize,

    /// Indicators naming an overall responsible person
    pub with_responsible: usize,
}

/// Running sum for a mean.
#[derive(Debug, Clone, Copy, Default)]
struct ProgressSum {
    total: f64,
    count: usize,
}

impl ProgressSum {
    fn add(&mut self, progress: f64) {
        self.total += progress;
        self.count += 1;
    }

    fn mean(self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        round2(self.total / self.count as f64)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn tally(counts: &mut BTreeMap<String, usize>, key: &str) {
    *counts.entry(key.to_string()).or_default() += 1;
}

impl StatisticsReport {
    /// Fold indicators (with their milestones) into a report in one pass.
    pub fn from_indicators<'a, I>(indicators: I) -> Self
    where
        I: IntoIterator<Item = &'a Indicator>,
    {
        let mut report = Self::default();
        let mut overall = ProgressSum::default();
        let mut by_area: BTreeMap<String, ProgressSum> = BTreeMap::new();

        for indicator in indicators {
            report.total_indicators += 1;

            let vp = present(indicator.vp.as_deref());
            let area = present(indicator.area.as_deref());

            if let Some(vp) = vp {
                tally(&mut report.count_by_organizational_unit, vp);
                if let Some(area) = area {
                    let areas = report.count_by_area_per_unit.entry(vp.to_string()).or_default();
                    tally(areas, area);
                }
            }
            if let Some(kind) = present(indicator.kind.as_deref()) {
                tally(&mut report.count_by_indicator_type, kind);
            }

            if indicator.has_complete_dates() {
                report.completeness.with_dates += 1;
            }
            if indicator.has_responsible() {
                report.completeness.with_responsible += 1;
            }

            let mut area_sum = area.map(|a| by_area.entry(a.to_string()).or_default());
            for milestone in &indicator.milestones {
                report.total_milestones += 1;
                if let Some(status) = present(milestone.status.as_deref()) {
                    tally(&mut report.milestone_status_distribution, status);
                }
                overall.add(milestone.progress);
                if let Some(sum) = area_sum.as_mut() {
                    sum.add(milestone.progress);
                }
            }
        }

        report.completeness.total_indicators = report.total_indicators;
        report.average_milestone_progress = overall.mean();
        report.average_progress_by_area = by_area
            .into_iter()
            .map(|(area, sum)| (area, sum.mean()))
            .collect();

        report
    }

    /// Share of indicators with both dates, 0.0 to 1.0.
    pub fn date_coverage(&self) -> f64 {
        ratio(self.completeness.with_dates, self.completeness.total_indicators)
    }

    /// Share of indicators with a responsible person, 0.0 to 1.0.
    pub fn responsible_coverage(&self) -> f64 {
        ratio(self.completeness.with_responsible, self.completeness.total_indicators)
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use hitos_core::{IndicatorId, Milestone, MilestoneId};

    fn indicator(id: i64, vp: Option<&str>, area: Option<&str>, kind: Option<&str>) -> Indicator {
        let now = Utc::now();
        Indicator {
            id: IndicatorId::new(id),
            vp: vp.map(str::to_string),
            area: area.map(str::to_string),
            name: Some(format!("Indicador {id}")),
            kind: kind.map(str::to_string),
            start_date: None,
            end_date: None,
            responsible: None,
            data_entry_responsible: None,
            milestones: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn milestone(id: i64, owner: i64, status: Option<&str>, progress: f64) -> Milestone {
        let now = Utc::now();
        Milestone {
            id: MilestoneId::new(id),
            indicator_id: IndicatorId::new(owner),
            name: None,
            start_date: None,
            end_date: None,
            progress,
            status: status.map(str::to_string),
            responsible: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_population() {
        let report = StatisticsReport::from_indicators(Vec::<Indicator>::new().iter());
        assert_eq!(report, StatisticsReport::default());
        assert_eq!(report.total_indicators, 0);
        assert!(report.count_by_organizational_unit.is_empty());
        assert!(report.milestone_status_distribution.is_empty());
        assert_eq!(report.average_milestone_progress, 0.0);
        assert_eq!(report.date_coverage(), 0.0);
    }

    #[test]
    fn test_dashboard_scenario() {
        let mut vpd = indicator(1, Some("VPD"), Some("Alianzas"), Some("Estratégico"));
        vpd.milestones = vec![
            milestone(1, 1, Some("Completado"), 100.0),
            milestone(2, 1, Some("En Progreso"), 40.0),
        ];

        let report = StatisticsReport::from_indicators(&[vpd]);
        assert_eq!(report.total_indicators, 1);
        assert_eq!(report.total_milestones, 2);
        assert_eq!(report.count_by_organizational_unit["VPD"], 1);
        assert_eq!(report.count_by_area_per_unit["VPD"]["Alianzas"], 1);
        assert_eq!(report.count_by_indicator_type["Estratégico"], 1);
        assert_eq!(report.milestone_status_distribution["Completado"], 1);
        assert_eq!(report.milestone_status_distribution["En Progreso"], 1);
        assert_eq!(report.average_milestone_progress, 70.0);
        assert_eq!(report.average_progress_by_area["Alianzas"], 70.0);
    }

    #[test]
    fn test_unknown_values_become_keys() {
        let indicators = vec![
            indicator(1, Some("VPD"), Some("Alianzas"), Some("Regular")),
            indicator(2, Some("VP Operaciones"), Some("Tecnología"), Some("Táctico")),
            indicator(3, Some("VP Operaciones"), Some("Tecnología"), Some("Táctico")),
        ];

        let report = StatisticsReport::from_indicators(&indicators);
        assert_eq!(report.count_by_organizational_unit.len(), 2);
        assert_eq!(report.count_by_organizational_unit["VP Operaciones"], 2);
        assert_eq!(report.count_by_area_per_unit["VP Operaciones"]["Tecnología"], 2);
        assert_eq!(report.count_by_indicator_type["Táctico"], 2);
    }

    #[test]
    fn test_blank_values_excluded_but_counted_in_totals() {
        let mut blank = indicator(1, Some("  "), Some("Legal"), None);
        blank.milestones = vec![milestone(1, 1, Some(""), 20.0), milestone(2, 1, None, 30.0)];
        let no_area = indicator(2, Some("PRE"), None, Some(""));

        let report = StatisticsReport::from_indicators(&[blank, no_area]);
        assert_eq!(report.total_indicators, 2);
        assert_eq!(report.total_milestones, 2);
        assert_eq!(report.count_by_organizational_unit.len(), 1);
        assert_eq!(report.count_by_organizational_unit["PRE"], 1);
        // area without a unit, and a unit without an area, are both skipped
        assert!(report.count_by_area_per_unit.is_empty());
        assert!(report.count_by_indicator_type.is_empty());
        assert!(report.milestone_status_distribution.is_empty());
        assert_eq!(report.average_milestone_progress, 25.0);
        assert_eq!(report.average_progress_by_area["Legal"], 25.0);
    }

    #[test]
    fn test_status_is_not_inferred_from_progress() {
        let mut ind = indicator(1, Some("VPF"), Some("Reporting"), None);
        ind.milestones = vec![
            milestone(1, 1, Some("En Progreso"), 100.0),
            milestone(2, 1, Some("Completado"), 10.0),
        ];

        let report = StatisticsReport::from_indicators(&[ind]);
        assert_eq!(report.milestone_status_distribution["En Progreso"], 1);
        assert_eq!(report.milestone_status_distribution["Completado"], 1);
    }

    #[test]
    fn test_completeness_metrics() {
        let mut complete = indicator(1, Some("VPE"), Some("TI"), None);
        complete.start_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        complete.end_date = NaiveDate::from_ymd_opt(2024, 6, 30);
        complete.responsible = Some("Laura Pérez".to_string());

        let mut half = indicator(2, Some("VPE"), Some("TI"), None);
        half.start_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        half.responsible = Some("   ".to_string());

        let bare = indicator(3, None, None, None);
        let report = StatisticsReport::from_indicators(&[complete, half, bare]);

        assert_eq!(
            report.completeness,
            CompletenessMetrics {
                total_indicators: 3,
                with_dates: 1,
                with_responsible: 1,
            }
        );
        assert!((report.date_coverage() - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_average_rounds_to_two_decimals() {
        let mut ind = indicator(1, Some("VPO"), Some("Cartera"), None);
        ind.milestones = vec![
            milestone(1, 1, None, 10.0),
            milestone(2, 1, None, 20.0),
            milestone(3, 1, None, 20.0),
        ];
        let empty_area = indicator(2, Some("VPO"), Some("Riesgos"), None);

        let report = StatisticsReport::from_indicators(&[ind, empty_area]);
        assert_eq!(report.average_milestone_progress, 16.67);
        assert_eq!(report.average_progress_by_area["Cartera"], 16.67);
        assert_eq!(report.average_progress_by_area["Riesgos"], 0.0);
    }

    #[test]
    fn test_report_serializes_groupings_as_objects() {
        let mut ind = indicator(1, Some("VPD"), Some("Alianzas"), Some("Estratégico"));
        ind.milestones = vec![milestone(1, 1, Some("Completado"), 100.0)];

        let report = StatisticsReport::from_indicators(&[ind]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["count_by_organizational_unit"]["VPD"], 1);
        assert_eq!(json["count_by_area_per_unit"]["VPD"]["Alianzas"], 1);
        assert_eq!(json["completeness"]["total_indicators"], 1);
    }
}
