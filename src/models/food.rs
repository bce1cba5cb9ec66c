use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A food product fed to one or more pets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Food {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub brand: Option<String>,
    pub kcal_per_100g: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Food {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            brand: None,
            kcal_per_100g: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_kcal_per_100g(mut self, kcal: f64) -> Self {
        self.kcal_per_100g = Some(kcal);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl fmt::Display for Food {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(brand) = &self.brand {
            write!(f, " ({})", brand)?;
        }
        if let Some(kcal) = self.kcal_per_100g {
            write!(f, "  {} kcal/100g", kcal)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_food_new() {
        let food = Food::new("Salmon kibble")
            .with_brand("Acme")
            .with_kcal_per_100g(360.0);

        assert_eq!(food.name, "Salmon kibble");
        assert_eq!(food.brand.as_deref(), Some("Acme"));
        assert_eq!(food.kcal_per_100g, Some(360.0));
    }
}
