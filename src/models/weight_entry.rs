use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single weight measurement for one pet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub pet_id: i64,
    pub recorded_on: NaiveDate,
    pub weight_kg: f64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WeightEntry {
    pub fn new(pet_id: i64, recorded_on: NaiveDate, weight_kg: f64) -> Self {
        Self {
            id: None,
            pet_id,
            recorded_on,
            weight_kg,
            note: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl fmt::Display for WeightEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {:.2} kg", self.recorded_on, self.weight_kg)?;
        if let Some(note) = &self.note {
            write!(f, "  ({})", note)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_entry_new() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let entry = WeightEntry::new(3, date, 12.4);

        assert_eq!(entry.pet_id, 3);
        assert_eq!(entry.weight_kg, 12.4);
        assert!(entry.note.is_none());
    }

    #[test]
    fn test_weight_entry_display() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let entry = WeightEntry::new(3, date, 12.4).with_note("after breakfast");
        let out = format!("{}", entry);

        assert!(out.contains("12.40 kg"));
        assert!(out.contains("after breakfast"));
    }
}
