//! ufsda - Command-line driver for the UFS data-assimilation workflow applications

mod output;
mod settings;
mod telemetry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use ufsda_core::application::{Fetch, Gdas, Launch, Task, WorkflowTask};
use ufsda_core::domain::Options;
use ufsda_core::port::{ObjectStore, ProcessEnvSource, SystemTimeProvider, TimeProvider};
use ufsda_infra_s3::S3ObjectStore;
use ufsda_infra_system::HpssObjectStore;

use settings::Settings;
use telemetry::LogFormat;

#[derive(Parser)]
#[command(name = "ufsda")]
#[command(about = "UFS data-assimilation workflow applications", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// YAML-formatted driver settings
    #[arg(long, env = "UFSDA_SETTINGS")]
    settings: Option<PathBuf>,

    /// Log format (overrides the settings file)
    #[arg(long, value_enum, env = "UFSDA_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

/// Options shared by every application
#[derive(Args)]
struct CycleArgs {
    /// YAML-formatted experiment configuration
    #[arg(short, long)]
    yaml_file: PathBuf,

    /// Analysis cycle (YYYYMMDDHHMMSS)
    #[arg(short, long)]
    cycle: String,
}

/// Options of applications working under the experiment directory
#[derive(Args)]
struct ExperimentArgs {
    #[command(flatten)]
    cycle: CycleArgs,

    /// Experiment name
    #[arg(short, long)]
    expt_name: String,

    /// Root of the experiment directories
    #[arg(short, long)]
    work_path: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch files listed under `fetch:` in the experiment configuration
    Fetch {
        #[command(flatten)]
        cycle: CycleArgs,

        /// Only this platform (aws_s3, noaa_hpss)
        #[arg(long)]
        platform: Option<String>,

        /// Only this fetch type
        #[arg(long)]
        fetch_type: Option<String>,

        /// Only this file identifier
        #[arg(long)]
        fileid: Option<String>,

        /// List the transfers without fetching
        #[arg(long)]
        dry_run: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the cycle directory tree and snapshot the configuration
    Launch {
        #[command(flatten)]
        experiment: ExperimentArgs,

        /// Task identifier recorded with the launch
        #[arg(long)]
        task_id: Option<String>,
    },

    /// Run a GDAS application
    Gdas {
        #[command(flatten)]
        experiment: ExperimentArgs,

        /// GDAS application (soca)
        #[arg(long)]
        app: String,

        /// Application type (global_3dvar, global_letkf)
        #[arg(long)]
        app_type: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate PDY / cyc and print the cycle variables for `eval`
    Task {
        /// YAML-formatted experiment configuration
        #[arg(short, long)]
        yaml_file: PathBuf,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Fetch { .. } => "fetch",
            Commands::Launch { .. } => "launch",
            Commands::Gdas { .. } => "gdas",
            Commands::Task { .. } => "task",
        }
    }
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.display().to_string()).into_owned())
}

impl CycleArgs {
    fn options(&self) -> Options {
        Options {
            yaml_file: Some(expand_path(&self.yaml_file)),
            cycle: Some(self.cycle.clone()),
            ..Options::default()
        }
    }
}

impl ExperimentArgs {
    fn options(&self) -> Options {
        Options {
            expt_name: Some(self.expt_name.clone()),
            work_path: Some(expand_path(&self.work_path)),
            ..self.cycle.options()
        }
    }
}

fn object_stores(
    settings: &Settings,
    time_provider: Arc<dyn TimeProvider>,
) -> Vec<Arc<dyn ObjectStore>> {
    let s3: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(settings.s3.clone()));
    let hpss: Arc<dyn ObjectStore> =
        Arc::new(HpssObjectStore::new(settings.hpss.clone(), time_provider));
    vec![s3, hpss]
}

async fn run(
    command: Commands,
    settings: &Settings,
    time_provider: Arc<dyn TimeProvider>,
) -> Result<()> {
    match command {
        Commands::Fetch {
            cycle,
            platform,
            fetch_type,
            fileid,
            dry_run,
            json,
        } => {
            let options = Options {
                platform,
                fetch_type,
                fileid,
                ..cycle.options()
            };
            let mut app = Fetch::new(
                &options,
                object_stores(settings, time_provider.clone()),
                time_provider,
            )?;

            if dry_run {
                app.build_fetch_dict()?;
                let plan = app.build_plan()?;
                if json {
                    output::print_json(&plan)?;
                } else {
                    output::print_plan(&plan);
                }
            } else {
                let summary = app.run().await.context("Fetch failed")?;
                if json {
                    output::print_json(&summary)?;
                } else {
                    output::print_fetch_summary(&summary);
                }
            }
        }

        Commands::Launch {
            experiment,
            task_id,
        } => {
            let mut launch = Launch::new(&experiment.options(), task_id.as_deref())?;
            let dirpath = launch.run().await.context("Launch failed")?;
            println!("{}", dirpath.display());
        }

        Commands::Gdas {
            experiment,
            app,
            app_type,
            json,
        } => {
            let options = Options {
                app: Some(app),
                app_type: Some(app_type),
                ..experiment.options()
            };
            let mut gdas = Gdas::new(&options)?;
            let outcome = gdas.run().await.context("GDAS application failed")?;
            if json {
                output::print_json(&outcome)?;
            } else {
                output::print_soca_outcome(&outcome);
            }
        }

        Commands::Task { yaml_file } => {
            let task = Task::new(&expand_path(&yaml_file), &ProcessEnvSource, Default::default())?;
            for (key, value) in task.describe() {
                println!("{key}={value}");
            }
        }
    }

    Ok(())
}

/// Log the outcome of a command and hand its result back to `main`
fn finish(result: Result<()>, elapsed_ms: i64) -> Result<()> {
    match &result {
        Ok(()) => info!("Completed application"),
        Err(err) => error!(error = format!("{err:#}"), "Application failed"),
    }
    info!(
        "Total Elapsed Time: {:.3} seconds",
        elapsed_ms as f64 / 1000.0
    );
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = cli.settings.as_deref().map(expand_path);
    let settings = Settings::load(settings_path.as_deref())?;

    let log_format = cli.log_format.unwrap_or(settings.log_format);
    let _guard = telemetry::init_logging(log_format, settings.log_dir.as_deref())?;

    info!(
        version = ufsda_core::VERSION,
        command = cli.command.name(),
        "Beginning application"
    );

    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let start_ms = time_provider.now_millis();

    let result = run(cli.command, &settings, time_provider.clone()).await;

    finish(result, time_provider.now_millis() - start_ms)
}
