use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};
use serde_json::Value;

use pawtrack::models::GroomingSession;
use pawtrack::sync::TrackedStore;

use super::resolve_pet;

#[derive(Args)]
pub struct GroomingCommand {
    #[command(subcommand)]
    pub command: GroomingSubcommand,
}

#[derive(Subcommand)]
pub enum GroomingSubcommand {
    /// Record a grooming session
    Add {
        /// Pet id or name
        pet: String,

        /// Service performed, e.g. "Full groom", "Nail trim"
        service: String,

        /// Session date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Groomer's name
        #[arg(long)]
        groomer: Option<String>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List grooming sessions for a pet
    List {
        /// Pet id or name
        pet: String,
    },

    /// Delete a grooming session
    Delete {
        /// Grooming session id
        id: i64,
    },
}

impl GroomingCommand {
    pub async fn run(&self, tracked: &TrackedStore) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            GroomingSubcommand::Add {
                pet,
                service,
                date,
                groomer,
                notes,
            } => {
                let pet = resolve_pet(tracked.store(), pet).await?;
                let date = date.unwrap_or_else(|| Utc::now().date_naive());

                let mut session = GroomingSession::new(
                    pet.id.expect("stored pet has an id"),
                    service.trim(),
                    date,
                );
                if let Some(groomer) = groomer {
                    session = session.with_groomer(groomer);
                }
                if let Some(notes) = notes {
                    session = session.with_notes(notes);
                }

                let id = tracked.create(&mut session).await?;
                println!("Recorded grooming #{} for {}: {}", id, pet.name, session);
                Ok(())
            }

            GroomingSubcommand::List { pet } => {
                let pet = resolve_pet(tracked.store(), pet).await?;
                let mut sessions: Vec<GroomingSession> = tracked
                    .store()
                    .find_by("pet_id", &Value::from(pet.id.unwrap()))
                    .await?;
                sessions.sort_by_key(|s| s.performed_on);

                if sessions.is_empty() {
                    println!("No grooming sessions for {}", pet.name);
                    return Ok(());
                }

                println!("Grooming sessions for {}:", pet.name);
                for session in &sessions {
                    println!("  #{:<4} {}", session.id.unwrap_or_default(), session);
                }
                Ok(())
            }

            GroomingSubcommand::Delete { id } => {
                if tracked.delete::<GroomingSession>(*id).await? {
                    println!("Deleted grooming session #{}", id);
                    Ok(())
                } else {
                    Err(format!("Grooming session not found: {}", id).into())
                }
            }
        }
    }
}
