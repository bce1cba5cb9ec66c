use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};
use serde_json::Value;

use pawtrack::models::HealthEvent;
use pawtrack::sync::TrackedStore;

use super::resolve_pet;

#[derive(Args)]
pub struct HealthCommand {
    #[command(subcommand)]
    pub command: HealthSubcommand,
}

#[derive(Subcommand)]
pub enum HealthSubcommand {
    /// Record a health event
    Add {
        /// Pet id or name
        pet: String,

        /// Short title, e.g. "Annual checkup"
        title: String,

        /// Event date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Attending vet
        #[arg(long)]
        vet: Option<String>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List health events for a pet
    List {
        /// Pet id or name
        pet: String,
    },

    /// Delete a health event
    Delete {
        /// Health event id
        id: i64,
    },
}

impl HealthCommand {
    pub async fn run(&self, tracked: &TrackedStore) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            HealthSubcommand::Add {
                pet,
                title,
                date,
                vet,
                notes,
            } => {
                let pet = resolve_pet(tracked.store(), pet).await?;
                let date = date.unwrap_or_else(|| Utc::now().date_naive());

                let mut event =
                    HealthEvent::new(pet.id.expect("stored pet has an id"), title.trim(), date);
                if let Some(vet) = vet {
                    event = event.with_vet(vet);
                }
                if let Some(notes) = notes {
                    event = event.with_notes(notes);
                }

                let id = tracked.create(&mut event).await?;
                println!("Recorded health event #{} for {}: {}", id, pet.name, event);
                Ok(())
            }

            HealthSubcommand::List { pet } => {
                let pet = resolve_pet(tracked.store(), pet).await?;
                let mut events: Vec<HealthEvent> = tracked
                    .store()
                    .find_by("pet_id", &Value::from(pet.id.unwrap()))
                    .await?;
                events.sort_by_key(|e| e.occurred_on);

                if events.is_empty() {
                    println!("No health events for {}", pet.name);
                    return Ok(());
                }

                println!("Health events for {}:", pet.name);
                for event in &events {
                    println!("  #{:<4} {}", event.id.unwrap_or_default(), event);
                }
                Ok(())
            }

            HealthSubcommand::Delete { id } => {
                if tracked.delete::<HealthEvent>(*id).await? {
                    println!("Deleted health event #{}", id);
                    Ok(())
                } else {
                    Err(format!("Health event not found: {}", id).into())
                }
            }
        }
    }
}
