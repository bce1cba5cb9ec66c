mod config_cmd;
mod food;
mod grooming;
mod health;
mod pet;
mod sync_cmd;
mod treatment;
mod weight;

pub use config_cmd::ConfigCommand;
pub use food::FoodCommand;
pub use grooming::GroomingCommand;
pub use health::HealthCommand;
pub use pet::PetCommand;
pub use sync_cmd::SyncCommand;
pub use treatment::TreatmentCommand;
pub use weight::WeightCommand;

use serde_json::Value;

use pawtrack::db::LocalStore;
use pawtrack::models::Pet;

/// Resolves a pet by numeric id or by exact name.
pub(crate) async fn resolve_pet(
    store: &LocalStore,
    identifier: &str,
) -> Result<Pet, Box<dyn std::error::Error>> {
    if let Ok(id) = identifier.parse::<i64>() {
        if let Some(pet) = store.fetch::<Pet>(id).await? {
            return Ok(pet);
        }
    }

    let mut matches: Vec<Pet> = store
        .find_by("name", &Value::String(identifier.to_string()))
        .await?;

    match matches.len() {
        0 => Err(format!("Pet not found: {}", identifier).into()),
        1 => Ok(matches.remove(0)),
        n => Err(format!(
            "{} pets named '{}'; use the numeric id instead",
            n, identifier
        )
        .into()),
    }
}
