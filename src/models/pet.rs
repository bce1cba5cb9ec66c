use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::species::Species;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub species: Species,
    pub breed: Option<String>,
    pub birth_date: Option<NaiveDate>,
    /// Base64-encoded photo payload, compressed before transmission.
    pub photo: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pet {
    pub fn new(name: impl Into<String>, species: Species, created_by: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: name.into(),
            species,
            breed: None,
            birth_date: None,
            photo: None,
            notes: None,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_breed(mut self, breed: impl Into<String>) -> Self {
        self.breed = Some(breed.into());
        self
    }

    pub fn with_birth_date(mut self, date: NaiveDate) -> Self {
        self.birth_date = Some(date);
        self
    }

    pub fn with_photo(mut self, photo: impl Into<String>) -> Self {
        self.photo = Some(photo.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Age in whole years as of today, if a birth date is known.
    pub fn age_years(&self) -> Option<i32> {
        let today = Utc::now().date_naive();
        today.years_since(self.birth_date?).map(|y| y as i32)
    }
}

impl fmt::Display for Pet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;
        writeln!(f, "Species: {}", self.species)?;

        if let Some(breed) = &self.breed {
            writeln!(f, "Breed: {}", breed)?;
        }

        if let Some(birth) = self.birth_date {
            write!(f, "Born: {}", birth)?;
            if let Some(age) = self.age_years() {
                write!(f, " ({} year{})", age, if age == 1 { "" } else { "s" })?;
            }
            writeln!(f)?;
        }

        if let Some(notes) = &self.notes {
            writeln!(f, "\nNotes: {}", notes)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pet_new() {
        let pet = Pet::new("Rex", Species::Dog, "user1");

        assert_eq!(pet.name, "Rex");
        assert_eq!(pet.species, Species::Dog);
        assert!(pet.id.is_none());
        assert!(pet.breed.is_none());
        assert!(pet.photo.is_none());
    }

    #[test]
    fn test_pet_builders() {
        let birth = NaiveDate::from_ymd_opt(2020, 3, 14).unwrap();
        let pet = Pet::new("Misha", Species::Cat, "user1")
            .with_breed("Siberian")
            .with_birth_date(birth)
            .with_notes("Sheds a lot");

        assert_eq!(pet.breed.as_deref(), Some("Siberian"));
        assert_eq!(pet.birth_date, Some(birth));
        assert_eq!(pet.notes.as_deref(), Some("Sheds a lot"));
    }

    #[test]
    fn test_pet_display() {
        let pet = Pet::new("Rex", Species::Dog, "user1").with_breed("Beagle");
        let out = format!("{}", pet);

        assert!(out.contains("Rex"));
        assert!(out.contains("Species: dog"));
        assert!(out.contains("Breed: Beagle"));
    }

    #[test]
    fn test_pet_serializes_without_unset_id() {
        let pet = Pet::new("Rex", Species::Dog, "user1");
        let json = serde_json::to_value(&pet).unwrap();
        assert!(json.get("id").is_none());
    }
}
