use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};
use serde_json::Value;

use pawtrack::models::WeightEntry;
use pawtrack::sync::TrackedStore;

use super::resolve_pet;

#[derive(Args)]
pub struct WeightCommand {
    #[command(subcommand)]
    pub command: WeightSubcommand,
}

#[derive(Subcommand)]
pub enum WeightSubcommand {
    /// Record a weight measurement
    Add {
        /// Pet id or name
        pet: String,

        /// Weight in kilograms
        weight_kg: f64,

        /// Measurement date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Note, e.g. "after breakfast"
        #[arg(long)]
        note: Option<String>,
    },

    /// List weight history for a pet
    List {
        /// Pet id or name
        pet: String,
    },

    /// Delete a weight entry
    Delete {
        /// Weight entry id
        id: i64,
    },
}

impl WeightCommand {
    pub async fn run(&self, tracked: &TrackedStore) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            WeightSubcommand::Add {
                pet,
                weight_kg,
                date,
                note,
            } => {
                if *weight_kg <= 0.0 {
                    return Err("Weight must be positive".into());
                }

                let pet = resolve_pet(tracked.store(), pet).await?;
                let date = date.unwrap_or_else(|| Utc::now().date_naive());

                let mut entry =
                    WeightEntry::new(pet.id.expect("stored pet has an id"), date, *weight_kg);
                if let Some(note) = note {
                    entry = entry.with_note(note);
                }

                let id = tracked.create(&mut entry).await?;
                println!("Recorded weight #{} for {}: {}", id, pet.name, entry);
                Ok(())
            }

            WeightSubcommand::List { pet } => {
                let pet = resolve_pet(tracked.store(), pet).await?;
                let mut entries: Vec<WeightEntry> = tracked
                    .store()
                    .find_by("pet_id", &Value::from(pet.id.unwrap()))
                    .await?;
                entries.sort_by_key(|e| e.recorded_on);

                if entries.is_empty() {
                    println!("No weight entries for {}", pet.name);
                    return Ok(());
                }

                println!("Weight history for {}:", pet.name);
                for entry in &entries {
                    println!("  #{:<4} {}", entry.id.unwrap_or_default(), entry);
                }
                Ok(())
            }

            WeightSubcommand::Delete { id } => {
                if tracked.delete::<WeightEntry>(*id).await? {
                    println!("Deleted weight entry #{}", id);
                    Ok(())
                } else {
                    Err(format!("Weight entry not found: {}", id).into())
                }
            }
        }
    }
}
