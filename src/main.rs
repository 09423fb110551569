use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use proteogenomix::analysis::Analysis;
use proteogenomix::config::ProteogenomixConfig;
use proteogenomix::evaluator::{try_evaluate, BiomarkerCandidate};
use proteogenomix::{
    config, init_telemetry, input, shutdown_telemetry, AnalysisPipeline, AnalysisScheduler,
    AnalysisStore, InMemoryStore, NewAnalysis, ResultArtifact, ShutdownCoordinator,
    UploadPolicy, UploadedFileSource,
};

#[derive(Parser)]
#[command(name = "proteogenomix")]
#[command(about = "Staged biomarker discovery over protein sequence data")]
#[command(long_about = "ProteogenomiX scores protein sequences against fixed biomarker criteria, \
                       driving each analysis through preprocessing, mutation analysis, biomarker \
                       identification and results generation. Start with 'proteogenomix run'.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an analysis and drive it to completion
    Run {
        /// Owning user identity
        #[arg(long)]
        owner: String,
        /// Analysis name
        #[arg(long)]
        name: String,
        /// Free-form description
        #[arg(long)]
        description: Option<String>,
        /// FASTA, CSV or TSV file to analyse (demonstration records when omitted)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Genomics FASTA, CSV or TSV file integrated with --input
        #[arg(long, requires = "input")]
        genomics: Option<PathBuf>,
        /// Skip the stage delays
        #[arg(long, help = "Run every stage immediately instead of waiting the configured delays")]
        fast: bool,
    },
    /// Score a data file and print the biomarker candidates
    Evaluate {
        /// FASTA, CSV or TSV file
        file: PathBuf,
    },
    /// Check a data file against the upload constraints
    Validate {
        /// File to check
        file: PathBuf,
    },
    /// List stored analyses for an owner
    #[cfg(feature = "database")]
    List {
        #[arg(long)]
        owner: String,
    },
    /// Write the default configuration file
    InitConfig {
        /// Destination path
        #[arg(long, default_value = "proteogenomix.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Serialize)]
struct RunReport {
    analysis: Analysis,
    biomarkers: Vec<BiomarkerCandidate>,
    artifacts: Vec<ResultArtifact>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config()?;
    init_telemetry(&config.observability)?;

    let result = match cli.command {
        Commands::Run {
            owner,
            name,
            description,
            input,
            genomics,
            fast,
        } => tokio::runtime::Runtime::new()?.block_on(async {
            let inputs = RunInputs { input, genomics };
            run_command(config, owner, name, description, inputs, fast).await
        }),
        Commands::Evaluate { file } => evaluate_command(&file),
        Commands::Validate { file } => validate_command(config, &file),
        #[cfg(feature = "database")]
        Commands::List { owner } => {
            tokio::runtime::Runtime::new()?.block_on(async { list_command(config, &owner).await })
        }
        Commands::InitConfig { path, force } => init_config_command(&path, force),
    };

    shutdown_telemetry();
    result
}

/// Data files attached to a run.
struct RunInputs {
    input: Option<PathBuf>,
    genomics: Option<PathBuf>,
}

async fn run_command(
    config: &ProteogenomixConfig,
    owner: String,
    name: String,
    description: Option<String>,
    inputs: RunInputs,
    fast: bool,
) -> Result<()> {
    let policy = UploadPolicy::new(&config.upload);
    let mut request = NewAnalysis::new(owner, name);
    if let Some(description) = description {
        request = request.with_description(description);
    }
    if let Some(path) = inputs.input {
        request = request.with_input(policy.inspect(&path)?.location);
    }
    if let Some(path) = inputs.genomics {
        request = request.with_genomics(policy.inspect(&path)?.location);
    }

    let store = OpenStore::open(config).await?;
    let outcome = drive_analysis(config, &store, request, fast).await;
    store.close().await;
    outcome
}

async fn drive_analysis(
    config: &ProteogenomixConfig,
    store: &OpenStore,
    request: NewAnalysis,
    fast: bool,
) -> Result<()> {
    let pipeline = Arc::new(
        AnalysisPipeline::new(store.handle(), Arc::new(UploadedFileSource))
            .with_evaluation_fallback(config.pipeline.fallback_on_evaluation_error),
    );
    let scheduler = Arc::new(if fast {
        AnalysisScheduler::immediate(pipeline.clone())
    } else {
        AnalysisScheduler::new(pipeline.clone(), config.pipeline.step_delays())
    });

    let created = pipeline.create(request).await?;
    scheduler.start(&created.owner, created.id).await?;

    let analysis = tokio::select! {
        finished = scheduler.wait(created.id) => finished?,
        signal = ShutdownCoordinator::wait_for_signal() => {
            signal?;
            ShutdownCoordinator::new(scheduler.clone()).shutdown().await?;
            pipeline.get(&created.owner, created.id).await?
        }
    };

    let report = RunReport {
        biomarkers: pipeline.biomarkers(&analysis.owner, analysis.id).await?,
        artifacts: pipeline.artifacts(&analysis.owner, analysis.id).await?,
        analysis,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.analysis.status == proteogenomix::AnalysisStatus::Failed {
        anyhow::bail!(
            "analysis failed: {}",
            report.analysis.failure_reason.as_deref().unwrap_or("unknown reason")
        );
    }
    Ok(())
}

fn evaluate_command(file: &Path) -> Result<()> {
    let records = input::read_records(file)?;
    let report = try_evaluate(&records)?;
    println!("{}", serde_json::to_string_pretty(&report.candidates)?);
    Ok(())
}

fn validate_command(config: &ProteogenomixConfig, file: &Path) -> Result<()> {
    let upload = UploadPolicy::new(&config.upload).inspect(file)?;
    println!("{}", serde_json::to_string_pretty(&upload)?);
    Ok(())
}

#[cfg(feature = "database")]
async fn list_command(config: &ProteogenomixConfig, owner: &str) -> Result<()> {
    let store = OpenStore::open(config).await?;
    let analyses = store.handle().list_analyses(owner).await;
    store.close().await;
    println!("{}", serde_json::to_string_pretty(&analyses?)?);
    Ok(())
}

fn init_config_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
    }
    ProteogenomixConfig::default().save_to_file(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// The analysis store for one command, closed explicitly before exit.
struct OpenStore {
    store: Arc<dyn AnalysisStore>,
    #[cfg(feature = "database")]
    sqlite: Option<Arc<proteogenomix::SqliteStore>>,
}

impl OpenStore {
    async fn open(config: &ProteogenomixConfig) -> Result<Self> {
        #[cfg(feature = "database")]
        {
            if let Some(database) = &config.database {
                let sqlite = Arc::new(proteogenomix::SqliteStore::new(database).await?);
                return Ok(Self {
                    store: sqlite.clone(),
                    sqlite: Some(sqlite),
                });
            }
        }
        #[cfg(not(feature = "database"))]
        if config.database.is_some() {
            tracing::warn!("Database configured but the 'database' feature is disabled, using memory store");
        }

        Ok(Self {
            store: Arc::new(InMemoryStore::new()),
            #[cfg(feature = "database")]
            sqlite: None,
        })
    }

    fn handle(&self) -> Arc<dyn AnalysisStore> {
        self.store.clone()
    }

    /// Flush and close the database pool, if one was opened.
    async fn close(self) {
        #[cfg(feature = "database")]
        if let Some(sqlite) = self.sqlite {
            sqlite.shutdown().await;
        }
    }
}
