use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use traffic_dashboard::config::{self, DashboardConfig};
use traffic_dashboard::context::AppContext;
use traffic_dashboard::display::SummaryDisplay;
use traffic_dashboard::error::PipelineError;
use traffic_dashboard::{logging, ui};

const USAGE: &str = "Usage: traffic-dashboard [--headless] [--granularity EXPR]";

/// Terminal table width and bucket rows for `--headless`.
const DISPLAY_WIDTH: usize = 70;
const DISPLAY_ROWS: usize = 40;

struct Args {
    headless: bool,
    granularity: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        headless: false,
        granularity: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--headless" => args.headless = true,
            "--granularity" => {
                let value = it.next().context("--granularity needs a value")?;
                args.granularity = Some(value);
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other => bail!("Unknown argument '{}'\n{}", other, USAGE),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Ignoring unreadable .env file: {}", e);
        }
    }
    if let Err(e) = logging::init() {
        eprintln!("{}", e);
    }

    let args = parse_args()?;
    let mut config = DashboardConfig::load().context("Failed to load dashboard config")?;
    if let Some(granularity) = args.granularity {
        config.granularity = granularity;
    }

    let context = AppContext::new(config, config::map_access_token())
        .context("Invalid dashboard config")?;

    if args.headless {
        println!("🚦 Traffic Dashboard (headless)\n");
        let display = SummaryDisplay::new(DISPLAY_WIDTH, DISPLAY_ROWS);
        let spec = context.default_filter();
        let (dataset, view) = match context.run_pass(&spec, &context.config().granularity) {
            Ok(pass) => pass,
            Err(PipelineError::EmptyDataset { pattern }) => {
                warn!(%pattern, "No input files, nothing to summarise");
                display.display_no_data(&pattern);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        info!(files = dataset.sources().len(), rows = dataset.len(), "Loaded dataset");
        if view.filtered.is_empty() {
            warn!("No rows match the default filter");
        }
        display.display(&view);
        return Ok(());
    }

    ui::launch_dashboard(context)
}
