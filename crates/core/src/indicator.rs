//! Indicator model - a tracked organizational goal that owns milestones.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::id::IndicatorId;
use crate::milestone::Milestone;
use crate::{present, Time};

/// An indicator is a strategic or operational goal of an organizational unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    /// Unique identifier
    pub id: IndicatorId,

    /// Organizational unit (vice-presidency)
    pub vp: Option<String>,

    /// Sub-unit within the organizational unit
    pub area: Option<String>,

    /// Indicator name, not unique
    pub name: Option<String>,

    /// Indicator type tag (Estratégico, Regular, Operativo, ...)
    pub kind: Option<String>,

    /// Planned start
    pub start_date: Option<NaiveDate>,

    /// Planned end
    pub end_date: Option<NaiveDate>,

    /// Person accountable for the indicator
    pub responsible: Option<String>,

    /// Person in charge of data entry
    pub data_entry_responsible: Option<String>,

    /// Owned milestones, in insertion order
    #[serde(default)]
    pub milestones: Vec<Milestone>,

    /// When created
    pub created_at: Time,

    /// Last updated
    pub updated_at: Time,
}

impl Indicator {
    /// Both planned dates are filled in.
    pub fn has_complete_dates(&self) -> bool {
        self.start_date.is_some() && self.end_date.is_some()
    }

    /// An overall responsible person is named.
    pub fn has_responsible(&self) -> bool {
        present(self.responsible.as_deref()).is_some()
    }
}

/// Attributes for a new indicator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewIndicator {
    /// Organizational unit
    pub vp: Option<String>,
    /// Area within the unit
    pub area: Option<String>,
    /// Indicator name
    pub name: Option<String>,
    /// Indicator type tag
    pub kind: Option<String>,
    /// Planned start
    pub start_date: Option<NaiveDate>,
    /// Planned end
    pub end_date: Option<NaiveDate>,
    /// Overall responsible person
    pub responsible: Option<String>,
    /// Data-entry responsible person
    pub data_entry_responsible: Option<String>,
}

/// Partial update of an indicator. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorPatch {
    /// Organizational unit
    pub vp: Option<String>,
    /// Area within the unit
    pub area: Option<String>,
    /// Indicator name
    pub name: Option<String>,
    /// Indicator type tag
    pub kind: Option<String>,
    /// Planned start
    pub start_date: Option<NaiveDate>,
    /// Planned end
    pub end_date: Option<NaiveDate>,
    /// Overall responsible person
    pub responsible: Option<String>,
    /// Data-entry responsible person
    pub data_entry_responsible: Option<String>,
}

impl IndicatorPatch {
    /// No field is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Write the provided fields into `indicator` and stamp `now`.
    ///
    /// Milestones are never touched.
    pub fn apply_to(&self, indicator: &mut Indicator, now: Time) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }

        set(&mut indicator.vp, &self.vp);
        set(&mut indicator.area, &self.area);
        set(&mut indicator.name, &self.name);
        set(&mut indicator.kind, &self.kind);
        set(&mut indicator.start_date, &self.start_date);
        set(&mut indicator.end_date, &self.end_date);
        set(&mut indicator.responsible, &self.responsible);
        set(&mut indicator.data_entry_responsible, &self.data_entry_responsible);
        indicator.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MilestoneId;

    fn sample() -> Indicator {
        let now = chrono::Utc::now();
        Indicator {
            id: IndicatorId::new(1),
            vp: Some("VPD".to_string()),
            area: Some("Alianzas".to_string()),
            name: Some("Convenios firmados".to_string()),
            kind: Some("Estratégico".to_string()),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            end_date: None,
            responsible: Some("   ".to_string()),
            data_entry_responsible: None,
            milestones: vec![Milestone {
                id: MilestoneId::new(9),
                indicator_id: IndicatorId::new(1),
                name: Some("Kickoff".to_string()),
                start_date: None,
                end_date: None,
                progress: 40.0,
                status: Some("En Progreso".to_string()),
                responsible: None,
                created_at: now,
                updated_at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_completeness_helpers() {
        let mut indicator = sample();
        assert!(!indicator.has_complete_dates());
        assert!(!indicator.has_responsible());

        indicator.end_date = NaiveDate::from_ymd_opt(2024, 12, 31);
        indicator.responsible = Some("Carlos Mendoza".to_string());
        assert!(indicator.has_complete_dates());
        assert!(indicator.has_responsible());
    }

    #[test]
    fn test_patch_only_touches_provided_fields() {
        let mut indicator = sample();
        let before = indicator.clone();
        let later = before.updated_at + chrono::Duration::seconds(5);

        let patch = IndicatorPatch {
            area: Some("Estudios Económicos".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply_to(&mut indicator, later);

        assert_eq!(indicator.area.as_deref(), Some("Estudios Económicos"));
        assert_eq!(indicator.vp, before.vp);
        assert_eq!(indicator.name, before.name);
        assert_eq!(indicator.start_date, before.start_date);
        assert_eq!(indicator.milestones, before.milestones);
        assert_eq!(indicator.created_at, before.created_at);
        assert_eq!(indicator.updated_at, later);
    }

    #[test]
    fn test_empty_patch_deserializes_from_empty_object() {
        let patch: IndicatorPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());

        let new: NewIndicator =
            serde_json::from_str(r#"{"vp":"VPF","start_date":"2024-02-01"}"#).unwrap();
        assert_eq!(new.vp.as_deref(), Some("VPF"));
        assert_eq!(new.start_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert!(new.area.is_none());
    }
}
