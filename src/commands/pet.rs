use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;

use pawtrack::config::Config;
use pawtrack::models::{Pet, Species};
use pawtrack::sync::TrackedStore;

use super::resolve_pet;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct PetCommand {
    #[command(subcommand)]
    pub command: PetSubcommand,
}

#[derive(Subcommand)]
pub enum PetSubcommand {
    /// Add a new pet
    Add {
        /// Pet's name
        name: String,

        /// Species (dog, cat, bird, rabbit, reptile, other)
        #[arg(long, short)]
        species: Species,

        /// Breed
        #[arg(long)]
        breed: Option<String>,

        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<NaiveDate>,

        /// Path to a photo file, stored base64-encoded
        #[arg(long)]
        photo_file: Option<PathBuf>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List all pets
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a pet's details
    Show {
        /// Pet id or name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update an existing pet
    Update {
        /// Pet id or name
        identifier: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New breed
        #[arg(long)]
        breed: Option<String>,

        /// New birth date (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<NaiveDate>,

        /// Replace the photo from a file
        #[arg(long)]
        photo_file: Option<PathBuf>,

        /// Remove the stored photo
        #[arg(long)]
        clear_photo: bool,

        /// New notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a pet
    Delete {
        /// Pet id or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl PetCommand {
    pub async fn run(
        &self,
        tracked: &TrackedStore,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            PetSubcommand::Add {
                name,
                species,
                breed,
                birth_date,
                photo_file,
                notes,
            } => {
                if name.trim().is_empty() {
                    return Err("Pet name cannot be empty".into());
                }

                let mut pet = Pet::new(name.trim(), *species, &config.owner);

                if let Some(breed) = breed {
                    pet = pet.with_breed(breed);
                }
                if let Some(birth_date) = birth_date {
                    pet = pet.with_birth_date(*birth_date);
                }
                if let Some(path) = photo_file {
                    pet = pet.with_photo(read_photo(path)?);
                }
                if let Some(notes) = notes {
                    pet = pet.with_notes(notes);
                }

                let id = tracked.create(&mut pet).await?;
                println!("Added pet #{}:", id);
                println!("{}", pet);
                Ok(())
            }

            PetSubcommand::List { format } => {
                let pets: Vec<Pet> = tracked.store().list().await?;

                if pets.is_empty() {
                    println!("No pets found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&pets)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<6}  {:<20}  {:<8}  BREED", "ID", "NAME", "SPECIES");
                        println!("{}", "-".repeat(60));
                        for pet in &pets {
                            println!(
                                "{:<6}  {:<20}  {:<8}  {}",
                                pet.id.unwrap_or_default(),
                                pet.name,
                                pet.species.to_string(),
                                pet.breed.as_deref().unwrap_or("-")
                            );
                        }
                        println!("\nTotal: {} pet(s)", pets.len());
                    }
                }
                Ok(())
            }

            PetSubcommand::Show { identifier, format } => {
                let pet = resolve_pet(tracked.store(), identifier).await?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&pet)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", pet);
                    }
                }
                Ok(())
            }

            PetSubcommand::Update {
                identifier,
                name,
                breed,
                birth_date,
                photo_file,
                clear_photo,
                notes,
            } => {
                let has_updates = name.is_some()
                    || breed.is_some()
                    || birth_date.is_some()
                    || photo_file.is_some()
                    || *clear_photo
                    || notes.is_some();

                if !has_updates {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let mut pet = resolve_pet(tracked.store(), identifier).await?;

                if let Some(name) = name {
                    pet.name = name.clone();
                }
                if let Some(breed) = breed {
                    pet.breed = Some(breed.clone());
                }
                if let Some(birth_date) = birth_date {
                    pet.birth_date = Some(*birth_date);
                }
                if let Some(path) = photo_file {
                    pet.photo = Some(read_photo(path)?);
                }
                if *clear_photo {
                    pet.photo = None;
                }
                if let Some(notes) = notes {
                    pet.notes = Some(notes.clone());
                }
                pet.updated_at = chrono::Utc::now();

                tracked.update(&pet).await?;
                println!("Updated pet:");
                println!("{}", pet);
                Ok(())
            }

            PetSubcommand::Delete { identifier, force } => {
                let pet = resolve_pet(tracked.store(), identifier).await?;
                let id = pet.id.expect("stored pet has an id");

                if !force {
                    print!("Delete pet '{}' (#{})? [y/N] ", pet.name, id);
                    io::stdout().flush()?;
                    let mut answer = String::new();
                    io::stdin().read_line(&mut answer)?;
                    if !answer.trim().eq_ignore_ascii_case("y") {
                        println!("Cancelled");
                        return Ok(());
                    }
                }

                tracked.delete::<Pet>(id).await?;
                println!("Deleted pet '{}'", pet.name);
                Ok(())
            }
        }
    }
}

fn read_photo(path: &PathBuf) -> Result<String, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Failed to read photo '{}': {}", path.display(), e))?;
    Ok(BASE64.encode(bytes))
}
