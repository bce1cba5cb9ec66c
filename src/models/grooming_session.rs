use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A grooming appointment: bath, haircut, nail trim, and so on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroomingSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub pet_id: i64,
    pub service: String,
    pub performed_on: NaiveDate,
    pub groomer: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GroomingSession {
    pub fn new(pet_id: i64, service: impl Into<String>, performed_on: NaiveDate) -> Self {
        Self {
            id: None,
            pet_id,
            service: service.into(),
            performed_on,
            groomer: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_groomer(mut self, groomer: impl Into<String>) -> Self {
        self.groomer = Some(groomer.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl fmt::Display for GroomingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.performed_on, self.service)?;
        if let Some(groomer) = &self.groomer {
            write!(f, "  by {}", groomer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grooming_session_new() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        let session = GroomingSession::new(2, "Full groom", date).with_groomer("Pat");

        assert_eq!(session.pet_id, 2);
        assert_eq!(session.service, "Full groom");
        assert_eq!(session.groomer.as_deref(), Some("Pat"));
    }
}
