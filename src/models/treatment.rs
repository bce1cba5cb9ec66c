use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreatmentKind {
    Vaccine,
    Deworming,
    Antiparasitic,
    Medication,
    Other,
}

impl fmt::Display for TreatmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreatmentKind::Vaccine => write!(f, "vaccine"),
            TreatmentKind::Deworming => write!(f, "deworming"),
            TreatmentKind::Antiparasitic => write!(f, "antiparasitic"),
            TreatmentKind::Medication => write!(f, "medication"),
            TreatmentKind::Other => write!(f, "other"),
        }
    }
}

impl FromStr for TreatmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vaccine" => Ok(TreatmentKind::Vaccine),
            "deworming" => Ok(TreatmentKind::Deworming),
            "antiparasitic" => Ok(TreatmentKind::Antiparasitic),
            "medication" => Ok(TreatmentKind::Medication),
            "other" => Ok(TreatmentKind::Other),
            _ => Err(format!(
                "Invalid treatment kind '{}'. Valid options: vaccine, deworming, antiparasitic, medication, other",
                s
            )),
        }
    }
}

/// A vaccination, deworming, or other medical treatment given to a pet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Treatment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub pet_id: i64,
    pub name: String,
    pub kind: TreatmentKind,
    pub administered_on: NaiveDate,
    pub next_due: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Treatment {
    pub fn new(
        pet_id: i64,
        name: impl Into<String>,
        kind: TreatmentKind,
        administered_on: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            pet_id,
            name: name.into(),
            kind,
            administered_on,
            next_due: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_next_due(mut self, date: NaiveDate) -> Self {
        self.next_due = Some(date);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl fmt::Display for Treatment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  {} ({})",
            self.administered_on, self.name, self.kind
        )?;
        if let Some(due) = self.next_due {
            write!(f, "  next due {}", due)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_treatment_new() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();
        let t = Treatment::new(1, "Rabies booster", TreatmentKind::Vaccine, date);

        assert_eq!(t.pet_id, 1);
        assert_eq!(t.kind, TreatmentKind::Vaccine);
        assert!(t.next_due.is_none());
    }

    #[test]
    fn test_treatment_kind_from_str() {
        assert_eq!(
            TreatmentKind::from_str("vaccine").unwrap(),
            TreatmentKind::Vaccine
        );
        assert_eq!(
            TreatmentKind::from_str("Deworming").unwrap(),
            TreatmentKind::Deworming
        );
        assert!(TreatmentKind::from_str("surgery").is_err());
    }

    #[test]
    fn test_treatment_display_includes_next_due() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();
        let due = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let t = Treatment::new(1, "Rabies booster", TreatmentKind::Vaccine, date)
            .with_next_due(due);

        let out = format!("{}", t);
        assert!(out.contains("Rabies booster"));
        assert!(out.contains("next due 2026-02-10"));
    }
}
