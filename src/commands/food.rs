use clap::{Args, Subcommand};

use pawtrack::models::Food;
use pawtrack::sync::TrackedStore;

#[derive(Args)]
pub struct FoodCommand {
    #[command(subcommand)]
    pub command: FoodSubcommand,
}

#[derive(Subcommand)]
pub enum FoodSubcommand {
    /// Add a food product
    Add {
        /// Product name
        name: String,

        /// Brand
        #[arg(long)]
        brand: Option<String>,

        /// Energy density in kcal per 100g
        #[arg(long)]
        kcal: Option<f64>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List food products
    List,

    /// Delete a food product
    Delete {
        /// Food id
        id: i64,
    },
}

impl FoodCommand {
    pub async fn run(&self, tracked: &TrackedStore) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            FoodSubcommand::Add {
                name,
                brand,
                kcal,
                notes,
            } => {
                if name.trim().is_empty() {
                    return Err("Food name cannot be empty".into());
                }

                let mut food = Food::new(name.trim());
                if let Some(brand) = brand {
                    food = food.with_brand(brand);
                }
                if let Some(kcal) = kcal {
                    food = food.with_kcal_per_100g(*kcal);
                }
                if let Some(notes) = notes {
                    food = food.with_notes(notes);
                }

                let id = tracked.create(&mut food).await?;
                println!("Added food #{}: {}", id, food);
                Ok(())
            }

            FoodSubcommand::List => {
                let foods: Vec<Food> = tracked.store().list().await?;

                if foods.is_empty() {
                    println!("No foods found");
                    return Ok(());
                }

                for food in &foods {
                    println!("  #{:<4} {}", food.id.unwrap_or_default(), food);
                }
                println!("\nTotal: {} food(s)", foods.len());
                Ok(())
            }

            FoodSubcommand::Delete { id } => {
                if tracked.delete::<Food>(*id).await? {
                    println!("Deleted food #{}", id);
                    Ok(())
                } else {
                    Err(format!("Food not found: {}", id).into())
                }
            }
        }
    }
}
