use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A notable health event: vet visit, injury, illness, observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub pet_id: i64,
    pub title: String,
    pub occurred_on: NaiveDate,
    pub vet: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HealthEvent {
    pub fn new(pet_id: i64, title: impl Into<String>, occurred_on: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            pet_id,
            title: title.into(),
            occurred_on,
            vet: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_vet(mut self, vet: impl Into<String>) -> Self {
        self.vet = Some(vet.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl fmt::Display for HealthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.occurred_on, self.title)?;
        if let Some(vet) = &self.vet {
            write!(f, "  ({})", vet)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_event_new() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
        let event = HealthEvent::new(1, "Annual checkup", date).with_vet("Dr. Lin");

        assert_eq!(event.title, "Annual checkup");
        assert_eq!(event.vet.as_deref(), Some("Dr. Lin"));
        assert!(event.notes.is_none());
    }
}
