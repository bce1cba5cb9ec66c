use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Dog,
    Cat,
    Bird,
    Rabbit,
    Reptile,
    Other,
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Species::Dog => write!(f, "dog"),
            Species::Cat => write!(f, "cat"),
            Species::Bird => write!(f, "bird"),
            Species::Rabbit => write!(f, "rabbit"),
            Species::Reptile => write!(f, "reptile"),
            Species::Other => write!(f, "other"),
        }
    }
}

impl FromStr for Species {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dog" => Ok(Species::Dog),
            "cat" => Ok(Species::Cat),
            "bird" => Ok(Species::Bird),
            "rabbit" => Ok(Species::Rabbit),
            "reptile" => Ok(Species::Reptile),
            "other" => Ok(Species::Other),
            _ => Err(format!(
                "Invalid species '{}'. Valid options: dog, cat, bird, rabbit, reptile, other",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_species_display() {
        assert_eq!(format!("{}", Species::Dog), "dog");
        assert_eq!(format!("{}", Species::Cat), "cat");
        assert_eq!(format!("{}", Species::Reptile), "reptile");
    }

    #[test]
    fn test_species_from_str() {
        assert_eq!(Species::from_str("dog").unwrap(), Species::Dog);
        assert_eq!(Species::from_str("CAT").unwrap(), Species::Cat);
        assert_eq!(Species::from_str("Rabbit").unwrap(), Species::Rabbit);
    }

    #[test]
    fn test_species_from_str_invalid() {
        assert!(Species::from_str("dragon").is_err());
        assert!(Species::from_str("").is_err());
    }

    #[test]
    fn test_species_json_roundtrip() {
        let species = Species::Bird;
        let json = serde_json::to_string(&species).unwrap();
        assert_eq!(json, "\"bird\"");

        let parsed: Species = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, species);
    }
}
