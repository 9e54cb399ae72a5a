//! CLI interface for flipped-tutor

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{self, Config};
use crate::dashboard::Dashboard;
use crate::levels::{self, LevelStore, ManualOutcome};
use crate::types::{Concept, MasteryTier};

#[derive(Parser)]
#[command(name = "flipped-tutor")]
#[command(about = "Flipped Classroom mastery dashboard with generated study content", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true, env = "FLIPPED_TUTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Student level CSV (overrides [store] path)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the JSON API server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },
    /// Show a student's levels and generated content
    Show {
        /// Student id
        id: u32,
        /// Only show levels, skip content generation
        #[arg(long)]
        no_content: bool,
    },
    /// Update levels from an exam-results CSV
    Ingest {
        /// Path to the uploaded CSV
        file: PathBuf,
    },
    /// Manually set one concept level for a student
    Set {
        /// Student id
        id: u32,
        /// Concept tag, e.g. FC_ROLES
        concept: Concept,
        /// basic, intermediate, advanced (or 0.25 / 0.55 / 0.85)
        tier: MasteryTier,
    },
    /// Configure the dashboard
    Config {
        /// Store the content API key in the keyring
        #[arg(long)]
        set_api_key: Option<String>,
        /// Remove the stored content API key
        #[arg(long)]
        delete_api_key: bool,
        /// Write a default config file
        #[arg(long)]
        init: bool,
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

/// Run the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config.store.path = store;
    }

    match cli.command {
        Commands::Serve { port, host } => {
            let dashboard = Arc::new(Dashboard::from_config(&config)?);
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            crate::server::start(&host, port, dashboard).await?;
        }
        Commands::Show { id, no_content } => {
            if no_content {
                let store = LevelStore::open(&config.store.path)?;
                match store.find(id) {
                    Some(record) => {
                        println!("Student: {} (id {})", record.name, record.id);
                        for (concept, tier) in record.levels() {
                            println!("  {:<14} {:<12} {}", concept.tag(), tier.label(), tier.value());
                        }
                    }
                    None => println!("Student id {} not found. Please check the id.", id),
                }
            } else {
                show_student(&config, id).await?;
            }
        }
        Commands::Ingest { file } => {
            let mut store = LevelStore::open(&config.store.path)?;
            let reader = std::fs::File::open(&file)
                .with_context(|| format!("Failed to open exam file {}", file.display()))?;
            let report = levels::ingest(&mut store, reader, &config.ingest)?;

            if !report.preview.is_empty() {
                println!("Uploaded exam results (last entries):");
                println!("  {}", report.headers.join(" | "));
                for row in &report.preview {
                    println!("  {}", row.join(" | "));
                }
                println!();
            }
            for outcome in &report.outcomes {
                let marker = if outcome.is_warning() { "!" } else { "✓" };
                println!("{} {}", marker, outcome.message());
            }
            println!(
                "\n{} students updated, {} warnings. Store saved to {}",
                report.updated(),
                report.warnings(),
                store.location()
            );
        }
        Commands::Set { id, concept, tier } => {
            let mut store = LevelStore::open(&config.store.path)?;
            println!("{}", set_level(&mut store, id, concept, tier)?);
        }
        Commands::Config { set_api_key, delete_api_key, init, show } => {
            if let Some(key) = set_api_key {
                crate::security::set_api_key(&key)?;
                println!("Content API key stored securely.");
            } else if delete_api_key {
                crate::security::delete_api_key()?;
                println!("Content API key deleted.");
            } else if init {
                let path = config.save(cli.config.as_deref())?;
                println!("Wrote default configuration to {}", path.display());
            } else if show {
                config::show_config(&config);
            } else {
                println!("{}", config::default_config_toml());
            }
        }
    }

    Ok(())
}

async fn show_student(config: &Config, id: u32) -> Result<()> {
    let dashboard = Dashboard::from_config(config)?;

    let Some(student) = dashboard.student(id).await else {
        println!("Student id {} not found. Please check the id.", id);
        return Ok(());
    };

    println!("Student: {} (id {})", student.name, student.id);
    println!("\nCurrent knowledge level:");
    for point in &student.levels {
        let bar = "█".repeat((point.value * 20.0).round() as usize);
        println!("  {:<14} {:<20} {}", point.concept.tag(), bar, point.label);
    }

    if let Some(contents) = dashboard.student_content(id).await {
        for item in contents {
            println!("\n──── {} (Level: {}) ────", item.concept, item.tier);
            if let Some(notice) = &item.content.notice {
                eprintln!("⚠ {}", notice);
            }
            println!("{}", item.content.text);
        }
    }

    Ok(())
}

/// Apply a `set` command; an unknown student is an error
fn set_level(store: &mut LevelStore, id: u32, concept: Concept, tier: MasteryTier) -> Result<String> {
    let outcome = levels::apply_manual_update(store, id, concept, tier)?;
    if let ManualOutcome::NotFound { .. } = outcome {
        anyhow::bail!(outcome.message());
    }
    Ok(outcome.message())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE_CSV: &str = "id,name,FC_DEFINICION,FC_ROLES,FC_TECNOLOGIA,FC_APLICACION,FC_BENEFICIOS\n\
                             7,Ana,0.25,0.25,0.25,0.25,0.25\n";

    #[test]
    fn test_set_level_unknown_student_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("estudiantes.csv");
        std::fs::write(&path, STORE_CSV).unwrap();
        let mut store = LevelStore::open(&path).unwrap();

        let err = set_level(&mut store, 99, Concept::Roles, MasteryTier::Advanced).unwrap_err();
        assert!(err.to_string().contains("Student with id 99 not found"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), STORE_CSV);

        let message = set_level(&mut store, 7, Concept::Roles, MasteryTier::Advanced).unwrap();
        assert!(message.contains("student 7"));
        assert_eq!(LevelStore::open(&path).unwrap().find(7).unwrap().tier(Concept::Roles), MasteryTier::Advanced);
    }
}
