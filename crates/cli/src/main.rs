use clap::{Parser, Subcommand};
use codebridge_core::{
    config::{
        code_systems_from_env_vars, default_country_from_env_value,
        subject_linking_from_env_value, terminology_candidates_from_env_value,
    },
    constants::{DEFAULT_BUNDLE_DATA_DIR, DEFAULT_UPLOAD_DIR},
    CodeSystem, ConversionOutcome, ConversionService, CoreConfig, MappingQuery, PatientForm,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "codebridge")]
#[command(about = "CodeBridge clinical table to FHIR converter")]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Bundle directory (overrides BUNDLE_DATA_DIR)
    #[arg(long, global = true)]
    bundle_dir: Option<PathBuf>,

    /// Terminology source tried before the built-in candidates
    #[arg(long, global = true)]
    mapping_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a spreadsheet or delimited file into a bundle
    Convert {
        /// Input file (.xlsx, .xls, .csv, .tsv)
        file: PathBuf,
        /// Write the bundle here instead of the bundle directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Also write each resource to its own file in this directory
        #[arg(long)]
        resources_dir: Option<PathBuf>,
    },
    /// Convert one manually entered patient
    Patient {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        postal_code: Option<String>,
        #[arg(long)]
        country: Option<String>,
        /// Condition name, mapped across coding systems
        #[arg(long)]
        condition: Option<String>,
        #[arg(long)]
        snomed_code: Option<String>,
        /// Observation name
        #[arg(long)]
        observation: Option<String>,
        #[arg(long)]
        value: Option<String>,
        #[arg(long)]
        unit: Option<String>,
    },
    /// Look up equivalent codes for a disease or code
    Map {
        #[arg(long)]
        disease: Option<String>,
        #[arg(long)]
        snomed: Option<String>,
        #[arg(long)]
        icd11: Option<String>,
        #[arg(long)]
        ayurveda: Option<String>,
        #[arg(long)]
        siddha: Option<String>,
        #[arg(long)]
        unani: Option<String>,
    },
    /// Print a stored bundle
    Show {
        /// Bundle id
        bundle_id: String,
    },
    /// Print the CSV summary of a stored bundle
    Export {
        /// Bundle id
        bundle_id: String,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("codebridge_core={level}").parse()?)
                .add_directive(format!("codebridge_terminology={level}").parse()?)
                .add_directive(format!("codebridge_ingest={level}").parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = config(cli.bundle_dir, cli.mapping_file)?;

    match cli.command {
        Commands::Convert {
            file,
            out_dir,
            resources_dir,
        } => {
            let cfg = match out_dir {
                Some(dir) => config_with_bundle_dir(&cfg, dir)?,
                None => cfg,
            };
            let service = ConversionService::load(Arc::new(cfg));
            let outcome = service.convert_file(&file)?;
            print_outcome(&outcome);

            if let Some(dir) = resources_dir {
                let written = service.save_individual(&outcome.bundle, &dir)?;
                println!("Wrote {} resource files to {}", written.len(), dir.display());
            }
        }
        Commands::Patient {
            first_name,
            last_name,
            gender,
            birth_date,
            phone,
            email,
            address,
            city,
            state,
            postal_code,
            country,
            condition,
            snomed_code,
            observation,
            value,
            unit,
        } => {
            let form = PatientForm {
                first_name,
                last_name,
                gender,
                birth_date,
                phone,
                email,
                address,
                city,
                state,
                postal_code,
                country,
                condition,
                snomed_code,
                observation,
                value,
                unit,
            };
            let service = ConversionService::load(Arc::new(cfg));
            let outcome = service.submit_patient(&form)?;
            print_outcome(&outcome);
        }
        Commands::Map {
            disease,
            snomed,
            icd11,
            ayurveda,
            siddha,
            unani,
        } => {
            let query = MappingQuery::new()
                .disease(disease)
                .code(CodeSystem::Snomed, snomed)
                .code(CodeSystem::Icd11, icd11)
                .code(CodeSystem::Ayurveda, ayurveda)
                .code(CodeSystem::Siddha, siddha)
                .code(CodeSystem::Unani, unani);
            if query.is_empty() {
                anyhow::bail!(
                    "provide at least one of --disease/--snomed/--icd11/--ayurveda/--siddha/--unani"
                );
            }

            let service = ConversionService::load(Arc::new(cfg));
            match service.map_codes(&query) {
                Some(mapping) => println!("{}", serde_json::to_string_pretty(&mapping)?),
                None => {
                    eprintln!("No mapping found.");
                    std::process::exit(1);
                }
            }
        }
        Commands::Show { bundle_id } => {
            let service = ConversionService::new(Arc::new(cfg), None);
            match service.bundle(&bundle_id)? {
                Some(bundle) => println!("{}", bundle.render()?),
                None => anyhow::bail!("bundle not found: {bundle_id}"),
            }
        }
        Commands::Export { bundle_id, output } => {
            let service = ConversionService::new(Arc::new(cfg), None);
            let Some(csv) = service.export_csv(&bundle_id)? else {
                anyhow::bail!("bundle not found: {bundle_id}");
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, csv)?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{csv}"),
            }
        }
    }

    Ok(())
}

fn config(
    bundle_dir: Option<PathBuf>,
    mapping_file: Option<PathBuf>,
) -> anyhow::Result<CoreConfig> {
    let bundle_dir = bundle_dir.unwrap_or_else(|| {
        std::env::var("BUNDLE_DATA_DIR")
            .unwrap_or_else(|_| DEFAULT_BUNDLE_DATA_DIR.into())
            .into()
    });
    let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.into());
    let mapping_file = mapping_file
        .map(|p| p.to_string_lossy().into_owned())
        .or_else(|| std::env::var("CODEBRIDGE_MAPPING_FILE").ok());

    Ok(CoreConfig::new(
        bundle_dir,
        PathBuf::from(upload_dir),
        terminology_candidates_from_env_value(mapping_file),
        code_systems_from_env_vars(std::env::vars()),
        default_country_from_env_value(std::env::var("CODEBRIDGE_DEFAULT_COUNTRY").ok()),
        subject_linking_from_env_value(std::env::var("CODEBRIDGE_LINK_SUBJECTS").ok())?,
    )?)
}

fn config_with_bundle_dir(cfg: &CoreConfig, dir: PathBuf) -> anyhow::Result<CoreConfig> {
    Ok(CoreConfig::new(
        dir,
        cfg.upload_dir().to_path_buf(),
        cfg.terminology_candidates().to_vec(),
        cfg.code_systems().clone(),
        cfg.default_country().to_string(),
        cfg.subject_linking(),
    )?)
}

fn print_outcome(outcome: &ConversionOutcome) {
    println!("Bundle {} written to {}", outcome.bundle.id, outcome.path.display());
    println!("FHIR resources summary:");
    for (kind, count) in outcome.bundle.summary() {
        println!("  {kind}: {count}");
    }
    println!("Total resources: {}", outcome.resource_count());
    for skipped in &outcome.skipped {
        println!("Skipped row {}: {}", skipped.row, skipped.reason);
    }
}
