use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use practice_comp::api::{render_table, run_http_server};
use practice_comp::core::{CURRENT_YEAR, CompensationModel, ScenarioKey, default_historic_years};
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliScenario {
    A,
    B,
}

impl From<CliScenario> for ScenarioKey {
    fn from(value: CliScenario) -> Self {
        match value {
            CliScenario::A => ScenarioKey::A,
            CliScenario::B => ScenarioKey::B,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "practice-comp",
    about = "Physician compensation allocation for a partnership practice"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the JSON HTTP API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Print the compensation table for one year.
    Table {
        #[arg(long, default_value_t = CURRENT_YEAR)]
        year: i32,
        #[arg(long, value_enum, default_value_t = CliScenario::A)]
        scenario: CliScenario,
        #[arg(long, help = "Snapshot JSON to load instead of the built-in defaults")]
        snapshot: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_model(snapshot: Option<PathBuf>) -> Result<CompensationModel, String> {
    let mut model = CompensationModel::new(default_historic_years());
    if let Some(path) = snapshot {
        let json = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        model.load_snapshot_json(&json).map_err(|e| e.to_string())?;
    }
    Ok(model)
}

fn run_table(year: i32, scenario: CliScenario, snapshot: Option<PathBuf>) -> Result<(), String> {
    let model = load_model(snapshot)?;
    let table = render_table(&model, year, scenario.into())?;
    print!("{table}");
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { port } => {
            if let Err(e) = run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Table {
            year,
            scenario,
            snapshot,
        } => {
            if let Err(e) = run_table(year, scenario, snapshot) {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }
}
