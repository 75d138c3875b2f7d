#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jiff::civil::Date;
use log::{info, warn};
use std::path::PathBuf;
use vaccine_schedule::{
    ChildRecord, Compliance, Engine, EngineConfig, Guideline, NarrativeTextProvider,
    ProfileStore, RationaleNarrative, RonProfileStore, SerializedSchedule,
};

#[derive(Parser)]
#[command(name = "vaccine-schedule")]
#[command(about = "Childhood immunization schedules and catch-up planning")]
struct Cli {
    /// Profile store
    #[arg(long, default_value = "profiles.ron")]
    profiles: PathBuf,

    /// Guideline bundle (catalog and dose rules); the embedded CDC bundle if unset
    #[arg(long)]
    guideline: Option<PathBuf>,

    /// Engine configuration
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a child profile
    Add {
        name: String,
        /// Date of birth, YYYY-MM-DD
        dob: Date,
    },

    /// List stored profiles
    List {
        /// Also print each child's free-text history as entered
        #[arg(long)]
        history: bool,
    },

    /// Append free-text vaccination history to a profile
    Import {
        child: String,
        /// e.g. "Hepatitis B - 2023-01-15, Rotavirus - 2023-03-15"
        text: String,
    },

    /// Replace a recorded dose with a corrected one
    Correct {
        child: String,
        dose_id: u32,
        #[arg(long)]
        date: Date,
        /// Series id; defaults to the corrected dose's series
        #[arg(long)]
        series: Option<String>,
    },

    /// Remove a profile
    Remove { child: String },

    /// Print the next due dose of every series as JSON
    Schedule {
        child: String,
        /// Evaluate as of this date instead of today
        #[arg(long)]
        today: Option<Date>,
        /// Expand notes into caregiver-facing prose
        #[arg(long)]
        narrate: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let loaded;
    let guideline = match &cli.guideline {
        Some(path) => {
            loaded = Guideline::load(path)?;
            &loaded
        }
        None => Guideline::builtin(),
    };
    let engine = Engine::new(config);
    let mut store = RonProfileStore::open(&cli.profiles)
        .with_context(|| format!("opening {}", cli.profiles.display()))?;

    match cli.command {
        Commands::Add { name, dob } => {
            let child = store.save(ChildRecord::new(&name, dob))?;
            println!("{}", child.id());
        }
        Commands::List { history } => {
            for id in store.ids() {
                let child = store.get_by_id(&id)?;
                println!("{id}\t{}\t{} doses", child.name(), child.effective_doses().count());
                if history {
                    for line in child.vaccination_history().lines() {
                        println!("\t{line}");
                    }
                }
            }
        }
        Commands::Import { child, text } => {
            let mut record = store.get_by_id(&child)?;
            let parsed = engine.parse_history(&text, guideline.catalog());
            for issue in &parsed.issues {
                warn!("{child}: {issue}");
                println!("unparsed\t{}", issue.fragment());
            }
            let added = record.import_history(&text, &parsed);
            store.update(record)?;
            info!(
                "{child}: imported {} doses, {} fragments left unparsed",
                added.len(),
                parsed.unparsed.len()
            );
        }
        Commands::Correct {
            child,
            dose_id,
            date,
            series,
        } => {
            let mut record = store.get_by_id(&child)?;
            let series = match series {
                Some(series) => series,
                None => record
                    .administered_doses()
                    .iter()
                    .find(|dose| dose.id == dose_id)
                    .map(|dose| dose.series_id.clone())
                    .with_context(|| format!("{child} has no dose {dose_id}"))?,
            };
            let id = record.correct_dose(dose_id, &series, date, "corrected")?;
            store.update(record)?;
            println!("{id}");
        }
        Commands::Remove { child } => store.remove(&child)?,
        Commands::Schedule {
            child,
            today,
            narrate,
        } => {
            let record = store.get_by_id(&child)?;
            let today = today.unwrap_or_else(|| jiff::Zoned::now().date());
            let schedule =
                engine.generate_schedule(&record, guideline.catalog(), guideline.rules(), today)?;
            for warning in &schedule.warnings {
                warn!("{child}: {warning}");
            }
            let narrative = narrate.then_some(&RationaleNarrative as &dyn NarrativeTextProvider);
            let wire = SerializedSchedule::new(&schedule, guideline.catalog(), narrative);
            println!("{}", wire.to_json()?);

            let compliance = Compliance::measure(&record, guideline.catalog(), &schedule, today);
            info!("{child}: {compliance}");
        }
    }
    Ok(())
}
