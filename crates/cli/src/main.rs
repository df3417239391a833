use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use triage_catalog::{Catalog, CatalogStore};
use triage_core::constants::{CONSULTATIONS_DIR_NAME, DEFAULT_DIAGNOSIS_TOP_K};
use triage_core::matcher::{rank_diseases, referenced_symptom_ids, SymptomNames};
use triage_core::{ConsultationRepository, ConsultationStatus, FileConsultationRepository};
use triage_types::SymptomId;

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Symptom triage catalog and consultation tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a catalog file
    CheckCatalog {
        /// Path to the catalog YAML
        path: PathBuf,
    },
    /// Rank diseases for a set of symptoms
    Match {
        /// Path to the catalog YAML
        #[arg(long)]
        catalog: PathBuf,
        /// Symptom ids (comma-separated)
        #[arg(long)]
        symptoms: String,
        /// Maximum number of candidates
        #[arg(long, default_value_t = DEFAULT_DIAGNOSIS_TOP_K)]
        top_k: usize,
    },
    /// List stored consultations
    List {
        /// Data directory the server was started with
        #[arg(long)]
        data_dir: PathBuf,
        /// Statuses to include (comma-separated); all when omitted
        #[arg(long)]
        status: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::CheckCatalog { path }) => check_catalog(&path)?,
        Some(Commands::Match {
            catalog,
            symptoms,
            top_k,
        }) => match_symptoms(&catalog, &symptoms, top_k)?,
        Some(Commands::List { data_dir, status }) => list(&data_dir, status.as_deref())?,
        None => {
            println!("Use 'triage --help' for commands");
        }
    }

    Ok(())
}

fn check_catalog(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::load(path)?;
    println!(
        "Catalog OK: {} symptoms, {} diseases, {} recommendations",
        catalog.symptom_count(),
        catalog.disease_count(),
        catalog.recommendation_count()
    );
    Ok(())
}

fn match_symptoms(
    catalog_path: &Path,
    symptoms: &str,
    top_k: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::load(catalog_path)?;
    let reported = symptoms
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SymptomId::parse)
        .collect::<Result<BTreeSet<_>, _>>()?;

    let diseases = catalog.diseases()?;
    let names = SymptomNames::from_symptoms(
        &catalog.symptoms_by_ids(&referenced_symptom_ids(&reported, &diseases))?,
    );
    let candidates = rank_diseases(&reported, &diseases, &names, top_k);

    if candidates.is_empty() {
        println!("No matching diseases.");
    }
    for c in candidates {
        println!(
            "{:>6.1}%  {}  {} (missing: {})",
            c.percentage,
            c.disease_id,
            c.disease_name,
            if c.missing_symptom_names.is_empty() {
                "-".to_string()
            } else {
                c.missing_symptom_names.join(", ")
            }
        );
    }
    Ok(())
}

fn list(data_dir: &Path, status: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let consultations_dir = data_dir.join(CONSULTATIONS_DIR_NAME);
    if !consultations_dir.is_dir() {
        println!("No consultations found.");
        return Ok(());
    }

    let statuses = ConsultationStatus::parse_filter(status.unwrap_or(""))?;
    let repository = FileConsultationRepository::open(consultations_dir)?;
    let consultations: Vec<_> = repository
        .list()?
        .into_iter()
        .filter(|c| statuses.is_empty() || statuses.contains(&c.status))
        .collect();

    if consultations.is_empty() {
        println!("No consultations found.");
    }
    for c in consultations {
        println!(
            "ID: {}, Patient: {}, Status: {}, Symptoms: {}, Created: {}",
            c.id,
            c.patient_id,
            c.status,
            c.symptom_ids.len(),
            c.created_at
        );
    }
    Ok(())
}
