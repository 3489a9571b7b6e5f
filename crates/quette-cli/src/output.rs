//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use quette_core::models::MAX_SLICES;
use quette_core::{Collection, Rating};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// An ingredient and how many ratings use it
pub struct IngredientUsage {
    pub name: String,
    pub count: usize,
    pub standard: bool,
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single rating and the collections it belongs to
    pub fn print_rating(&self, rating: &Rating, collections: &[&Collection]) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", rating.id);
                println!("Title:       {}", rating.title);
                println!("Type:        {}", rating.media_type.label());
                println!(
                    "Slices:      {} {}/{}",
                    slices_bar(rating.slices),
                    rating.slices,
                    MAX_SLICES
                );
                println!("Flavor:      {}", rating.flavor);
                println!("Ingredients: {}", rating.ingredients.join(", "));
                println!("Created:     {}", rating.created_at.format("%Y-%m-%d %H:%M"));
                if !collections.is_empty() {
                    let names: Vec<_> = collections.iter().map(|c| c.name.as_str()).collect();
                    println!("Collections: {}", names.join(", "));
                }
            }
            OutputFormat::Json => print_json(rating),
            OutputFormat::Quiet => println!("{}", rating.id),
        }
    }

    /// Print a list of ratings
    pub fn print_ratings(&self, ratings: &[Rating]) {
        match self.format {
            OutputFormat::Human => {
                if ratings.is_empty() {
                    println!("No ratings found.");
                    return;
                }
                for rating in ratings {
                    println!("{}", rating_line(rating));
                }
                println!("\n{} rating(s)", ratings.len());
            }
            OutputFormat::Json => print_json(&ratings),
            OutputFormat::Quiet => {
                for rating in ratings {
                    println!("{}", rating.id);
                }
            }
        }
    }

    /// Print a collection with its member ratings
    pub fn print_collection(&self, collection: &Collection, members: &[Rating]) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:      {}", collection.id);
                println!("Name:    {}", collection.name);
                println!("Created: {}", collection.created_at.format("%Y-%m-%d %H:%M"));
                println!();
                if members.is_empty() {
                    println!("No ratings in this collection.");
                    return;
                }
                println!("── Ratings ({}) ──", members.len());
                for rating in members {
                    println!("{}", rating_line(rating));
                }
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "collection": collection,
                "ratings": members,
            })),
            OutputFormat::Quiet => {
                for rating in members {
                    println!("{}", rating.id);
                }
            }
        }
    }

    /// Print a list of collections
    pub fn print_collections(&self, collections: &[Collection]) {
        match self.format {
            OutputFormat::Human => {
                if collections.is_empty() {
                    println!("No collections found.");
                    return;
                }
                for collection in collections {
                    println!(
                        "{} | {} [{}]",
                        short_id(&collection.id),
                        truncate(&collection.name, 40),
                        collection.len()
                    );
                }
                println!("\n{} collection(s)", collections.len());
            }
            OutputFormat::Json => print_json(&collections),
            OutputFormat::Quiet => {
                for collection in collections {
                    println!("{}", collection.id);
                }
            }
        }
    }

    /// Print ingredients with usage counts
    pub fn print_ingredients(&self, ingredients: &[IngredientUsage]) {
        match self.format {
            OutputFormat::Human => {
                for usage in ingredients {
                    let marker = if usage.standard { ' ' } else { '+' };
                    println!("{} {} ({})", marker, usage.name, usage.count);
                }
                println!("\n{} ingredient(s), + marks custom ones", ingredients.len());
            }
            OutputFormat::Json => {
                let items: Vec<_> = ingredients
                    .iter()
                    .map(|u| {
                        serde_json::json!({
                            "name": u.name,
                            "count": u.count,
                            "standard": u.standard
                        })
                    })
                    .collect();
                print_json(&items);
            }
            OutputFormat::Quiet => {
                for usage in ingredients {
                    println!("{}", usage.name);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warn(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

fn rating_line(rating: &Rating) -> String {
    format!(
        "{} | {:<35} | {:<6} | {:>2}/{} | {}",
        short_id(&rating.id),
        truncate(&rating.title, 35),
        rating.media_type.as_str(),
        rating.slices,
        MAX_SLICES,
        truncate(&rating.flavor, 25)
    )
}

/// First eight characters of an id
pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// One pizza glyph per slice
fn slices_bar(slices: u8) -> String {
    let filled = usize::from(slices.min(MAX_SLICES));
    let empty = usize::from(MAX_SLICES) - filled;
    format!("{}{}", "●".repeat(filled), "○".repeat(empty))
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
