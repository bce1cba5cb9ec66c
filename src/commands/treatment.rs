use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};
use serde_json::Value;

use pawtrack::models::{Treatment, TreatmentKind};
use pawtrack::sync::TrackedStore;

use super::resolve_pet;

#[derive(Args)]
pub struct TreatmentCommand {
    #[command(subcommand)]
    pub command: TreatmentSubcommand,
}

#[derive(Subcommand)]
pub enum TreatmentSubcommand {
    /// Record a treatment
    Add {
        /// Pet id or name
        pet: String,

        /// Treatment name, e.g. "Rabies booster"
        name: String,

        /// Kind (vaccine, deworming, antiparasitic, medication, other)
        #[arg(long, short, default_value = "other")]
        kind: TreatmentKind,

        /// Administration date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Date the next dose is due (YYYY-MM-DD)
        #[arg(long)]
        next_due: Option<NaiveDate>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List treatments for a pet
    List {
        /// Pet id or name
        pet: String,

        /// Only treatments with a due date in the future
        #[arg(long)]
        due: bool,
    },

    /// Delete a treatment
    Delete {
        /// Treatment id
        id: i64,
    },
}

impl TreatmentCommand {
    pub async fn run(&self, tracked: &TrackedStore) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            TreatmentSubcommand::Add {
                pet,
                name,
                kind,
                date,
                next_due,
                notes,
            } => {
                let pet = resolve_pet(tracked.store(), pet).await?;
                let date = date.unwrap_or_else(|| Utc::now().date_naive());

                let mut treatment = Treatment::new(
                    pet.id.expect("stored pet has an id"),
                    name.trim(),
                    *kind,
                    date,
                );
                if let Some(next_due) = next_due {
                    treatment = treatment.with_next_due(*next_due);
                }
                if let Some(notes) = notes {
                    treatment = treatment.with_notes(notes);
                }

                let id = tracked.create(&mut treatment).await?;
                println!("Recorded treatment #{} for {}: {}", id, pet.name, treatment);
                Ok(())
            }

            TreatmentSubcommand::List { pet, due } => {
                let pet = resolve_pet(tracked.store(), pet).await?;
                let mut treatments: Vec<Treatment> = tracked
                    .store()
                    .find_by("pet_id", &Value::from(pet.id.unwrap()))
                    .await?;
                treatments.sort_by_key(|t| t.administered_on);

                if *due {
                    let today = Utc::now().date_naive();
                    treatments.retain(|t| t.next_due.map(|d| d >= today).unwrap_or(false));
                }

                if treatments.is_empty() {
                    println!("No treatments for {}", pet.name);
                    return Ok(());
                }

                println!("Treatments for {}:", pet.name);
                for treatment in &treatments {
                    println!("  #{:<4} {}", treatment.id.unwrap_or_default(), treatment);
                }
                Ok(())
            }

            TreatmentSubcommand::Delete { id } => {
                if tracked.delete::<Treatment>(*id).await? {
                    println!("Deleted treatment #{}", id);
                    Ok(())
                } else {
                    Err(format!("Treatment not found: {}", id).into())
                }
            }
        }
    }
}
