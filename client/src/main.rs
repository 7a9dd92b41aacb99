//! SwarmHub client - Entry Point
//!
//! Command line front end for submitting tests, provisioning grids and
//! following their deployment logs.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use swarmhub::app::options::AppOptions;
use swarmhub::app::run::{await_shutdown_signal, follow_tail};
use swarmhub::app::state::AppState;
use swarmhub::errors::ClientError;
use swarmhub::filesys::file::File;
use swarmhub::logs::{init_logging, LogLevel, LogOptions};
use swarmhub::notify::{Notice, NoticeLevel};
use swarmhub::resolver::Resolution;
use swarmhub::storage::layout::StorageLayout;
use swarmhub::storage::settings::Settings;
use swarmhub::tail::TailPhase;
use swarmhub::upload::UploadProgress;
use swarmhub::utils::version_info;
use swarmhub_models::{Grid, SubmitAck, Test};

#[derive(Parser)]
#[command(name = "swarmhub")]
#[command(about = "Submit load tests, provision grids and follow their deployments")]
#[command(version)]
struct Cli {
    /// SwarmHub server URL (overrides the settings file)
    #[arg(long, env = "SWARMHUB_URL", global = true)]
    url: Option<String>,

    /// Settings file
    #[arg(long, env = "SWARMHUB_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Also write logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level (overrides the settings file)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage tests
    Tests {
        #[command(subcommand)]
        command: TestsCommand,
    },

    /// Manage grids
    Grids {
        #[command(subcommand)]
        command: GridsCommand,
    },

    /// Print version and build information
    Version,
}

#[derive(Subcommand)]
enum TestsCommand {
    /// List tests
    List,

    /// Show one test
    Show { id: String },

    /// Upload a workload file as a new test
    Create {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        desc: String,

        #[arg(long)]
        file: PathBuf,
    },

    /// Launch a test on a deployed grid
    Launch {
        id: String,

        /// Grid to run on
        #[arg(long)]
        grid: String,

        /// Start generating load as soon as the test is deployed
        #[arg(long)]
        auto: bool,
    },

    /// Stop a running test
    Stop { id: String },

    /// Cancel a test deployment that is still in progress
    Cancel { id: String },

    /// Attach a label to a test, or detach it with --remove
    Label {
        id: String,

        label: String,

        #[arg(long)]
        remove: bool,
    },

    /// Delete a test
    Delete { id: String },

    /// Follow a test's deployment logs
    Logs { id: String },
}

#[derive(Subcommand)]
enum GridsCommand {
    /// List grids
    List {
        /// Only grids ready to run tests
        #[arg(long)]
        deployed: bool,
    },

    /// Show one grid
    Show { id: String },

    /// Show providers, or the regions of a provider, or the instance types of a region
    Options {
        #[arg(long)]
        provider: Option<String>,

        #[arg(long, requires = "provider")]
        region: Option<String>,
    },

    /// Provision a new grid
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        provider: String,

        #[arg(long)]
        region: String,

        /// Master node instance type
        #[arg(long)]
        master: String,

        /// Slave node instance type
        #[arg(long)]
        slave: String,

        /// Number of slave nodes
        #[arg(long)]
        nodes: String,

        /// Time to live in seconds
        #[arg(long)]
        ttl: String,
    },

    /// Provision a grid that is ready
    Start { id: String },

    /// Tear down a running grid
    Stop { id: String },

    /// Delete a grid
    Delete { id: String },

    /// Follow a grid's deployment logs
    Logs { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Print version and exit
    if let Commands::Version = cli.command {
        println!("{}", serde_json::to_string_pretty(&version_info())?);
        return Ok(ExitCode::SUCCESS);
    }

    // Retrieve the settings file
    let layout = StorageLayout::default();
    let settings_file = cli
        .config
        .clone()
        .map(File::new)
        .unwrap_or_else(|| layout.settings_file());
    let settings = Settings::load(&settings_file)
        .await
        .with_context(|| format!("Unable to read {}", settings_file.path().display()))?;

    // Initialize logging
    let log_options = LogOptions {
        log_level: cli.log_level.clone().unwrap_or(settings.log_level.clone()),
        stderr: cli.verbose,
        log_dir: Some(layout.logs_dir()),
        json_format: settings.log_json,
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let mut options = AppOptions::from_settings(settings);
    if let Some(url) = cli.url {
        options.backend_base_url = url;
    }
    debug!("Running with options: {:?}", options);

    let state = AppState::init(&options).context("Invalid backend configuration")?;
    let mut notices = state.notifier.subscribe();

    let result = match cli.command {
        Commands::Tests { command } => run_tests(&state, command).await,
        Commands::Grids { command } => run_grids(&state, command).await,
        Commands::Version => Ok(()),
    };
    state.shutdown();

    let shown = print_notices(&mut notices);
    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            if shown == 0 {
                eprintln!("{} {}", "error:".red().bold(), e);
            }
            if e.is_network() {
                eprintln!(
                    "{} check that SwarmHub is reachable at {}",
                    "hint:".cyan().bold(),
                    options.backend_base_url
                );
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

// ================================== TESTS ======================================= //

async fn run_tests(state: &AppState, command: TestsCommand) -> Result<(), ClientError> {
    match command {
        TestsCommand::List => {
            let tests = state.tests.refresh().await?;
            print_tests(&tests);
        }
        TestsCommand::Show { id } => {
            let test = state.tests.get(&id).await?;
            println!("{}", serde_json::to_string_pretty(&test)?);
        }
        TestsCommand::Create { name, desc, file } => {
            state.tests.set_name(&name);
            state.tests.set_desc(&desc);
            state.tests.set_file(file);

            let bar = upload_bar();
            let progress = state.tests.uploader().subscribe();
            let result = tokio::select! {
                result = state.tests.create() => result,
                _ = render_progress(&bar, progress) => {
                    Err(ClientError::Internal("upload progress closed".to_string()))
                }
            };

            let last = state.tests.uploader().progress();
            bar.set_length(last.total);
            bar.set_position(last.loaded);
            match &result {
                Ok(_) => bar.finish_with_message("uploaded"),
                Err(_) => bar.abandon_with_message("upload failed"),
            }
            print_ack("Test submitted", &result?);
        }
        TestsCommand::Launch { id, grid, auto } => {
            let ack = state.tests.launch(&id, &grid, auto).await?;
            print_ack("Test launched", &ack);
        }
        TestsCommand::Stop { id } => {
            let ack = state.tests.stop(&id).await?;
            print_ack("Test stopped", &ack);
        }
        TestsCommand::Cancel { id } => {
            let ack = state.tests.cancel(&id).await?;
            print_ack("Deployment cancelled", &ack);
        }
        TestsCommand::Label { id, label, remove } => {
            if remove {
                state.tests.remove_label(&id, &label).await?;
                println!("Removed label {:?} from {}", label, id);
            } else {
                state.tests.add_label(&id, &label).await?;
                println!("Labelled {} with {:?}", id, label);
            }
        }
        TestsCommand::Delete { id } => {
            let ack = state.tests.delete(&id).await?;
            print_ack("Test deleted", &ack);
        }
        TestsCommand::Logs { id } => {
            state.tests.watch_logs(&id).await?;
            follow(state).await;
        }
    }
    Ok(())
}

fn upload_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.cyan} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {msg}",
    ) {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

/// Mirror upload progress onto `bar` until the sender goes away
async fn render_progress(bar: &ProgressBar, mut progress: watch::Receiver<UploadProgress>) {
    while progress.changed().await.is_ok() {
        let current = *progress.borrow_and_update();
        if current.in_flight {
            bar.set_length(current.total);
            bar.set_position(current.loaded);
        }
    }
}

fn print_tests(tests: &[Test]) {
    if tests.is_empty() {
        println!("No tests");
        return;
    }
    println!("{:<24} {:<28} {:<12} {}", "ID", "NAME", "STATUS", "CREATED");
    for test in tests {
        println!(
            "{:<24} {:<28} {:<12} {}",
            test.id, test.name, test.status, test.created
        );
    }
}

// ================================== GRIDS ======================================= //

async fn run_grids(state: &AppState, command: GridsCommand) -> Result<(), ClientError> {
    match command {
        GridsCommand::List { deployed } => {
            state.grids.refresh().await?;
            let grids = if deployed {
                state.grids.deployed_grids()
            } else {
                state.grids.grids()
            };
            print_grids(&grids);
        }
        GridsCommand::Show { id } => {
            let grid = state.grids.get(&id).await?;
            println!("{}", serde_json::to_string_pretty(&grid)?);
        }
        GridsCommand::Options { provider, region } => {
            let resolver = state.grids.resolver();
            resolver.load_providers().await?;
            let Some(provider) = provider else {
                print_list("Providers", &resolver.snapshot().options.providers);
                return Ok(());
            };
            resolver.select_provider(&provider).await?;
            let Some(region) = region else {
                print_list("Regions", &resolver.snapshot().options.regions);
                return Ok(());
            };
            resolver.select_region(&provider, &region).await?;
            print_list("Instance types", &resolver.snapshot().options.master_types);
        }
        GridsCommand::Create {
            name,
            provider,
            region,
            master,
            slave,
            nodes,
            ttl,
        } => {
            let resolver = state.grids.resolver();
            resolver.load_providers().await?;
            expect_applied(resolver.select_provider(&provider).await?)?;
            expect_applied(resolver.select_region(&provider, &region).await?)?;
            resolver.set_name(&name);
            resolver.select_master_type(&master)?;
            resolver.select_slave_type(&slave)?;
            resolver.set_slave_nodes(&nodes);
            resolver.set_ttl(&ttl);

            let ack = state.grids.create().await?;
            print_ack("Grid requested", &ack);
        }
        GridsCommand::Start { id } => {
            let ack = state.grids.start(&id).await?;
            print_ack("Grid starting", &ack);
        }
        GridsCommand::Stop { id } => {
            let ack = state.grids.stop(&id).await?;
            print_ack("Grid stopping", &ack);
        }
        GridsCommand::Delete { id } => {
            let ack = state.grids.delete(&id).await?;
            print_ack("Grid deleted", &ack);
        }
        GridsCommand::Logs { id } => {
            state.grids.watch_logs(&id).await?;
            follow(state).await;
        }
    }
    Ok(())
}

fn expect_applied(resolution: Resolution) -> Result<(), ClientError> {
    match resolution {
        Resolution::Applied(_) => Ok(()),
        Resolution::Superseded => Err(ClientError::Internal(
            "selection changed while options were loading".to_string(),
        )),
    }
}

fn print_grids(grids: &[Grid]) {
    if grids.is_empty() {
        println!("No grids");
        return;
    }
    println!(
        "{:<24} {:<20} {:<10} {:<14} {:>5} {:>6} {}",
        "ID", "NAME", "PROVIDER", "REGION", "NODES", "TTL", "STATUS"
    );
    for grid in grids {
        let status = if grid.is_deployed() {
            grid.status.green()
        } else if grid.status.to_lowercase().contains("fail") {
            grid.status.red()
        } else {
            grid.status.yellow()
        };
        println!(
            "{:<24} {:<20} {:<10} {:<14} {:>5} {:>6} {}",
            grid.id, grid.name, grid.provider, grid.region, grid.slave_nodes, grid.ttl, status
        );
    }
}

fn print_list(title: &str, items: &[String]) {
    println!("{}:", title.bold());
    for item in items {
        println!("  {}", item);
    }
}

// =================================== SHARED ===================================== //

async fn follow(state: &AppState) {
    let view = follow_tail(&state.tail, |line| println!("{}", line), await_shutdown_signal()).await;
    match (view.phase(), view.error()) {
        (TailPhase::Stopped, Some(error)) => info!("Log tail aborted: {}", error),
        (TailPhase::Stopped, None) if view.running == Some(false) => {
            eprintln!("{}", "Deployment finished".green());
        }
        _ => {}
    }
}

fn print_ack(action: &str, ack: &SubmitAck) {
    let mut line = action.to_string();
    if !ack.id.is_empty() {
        line.push_str(&format!(" ({})", ack.id));
    }
    if !ack.description.is_empty() {
        line.push_str(&format!(": {}", ack.description));
    } else if !ack.status.is_empty() {
        line.push_str(&format!(": {}", ack.status));
    }
    println!("{}", line);
}

/// Print queued notices as banners. Returns how many errors were shown.
fn print_notices(rx: &mut broadcast::Receiver<Notice>) -> usize {
    let mut errors = 0;
    while let Ok(notice) = rx.try_recv() {
        let label = match notice.level {
            NoticeLevel::Info => "info:".cyan().bold(),
            NoticeLevel::Warn => "warning:".yellow().bold(),
            NoticeLevel::Error => {
                errors += 1;
                "error:".red().bold()
            }
        };
        eprintln!("{} {}", label, notice.message);
    }
    errors
}
