use clap::Parser;
use tracing_subscriber::EnvFilter;

mod compile;
mod diagnostics;
mod orchestrator;
mod render;
mod resolve;
mod settings;
mod spec;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "gst-pipeline-generator")]
#[command(
    about = "Compile camera/workload assignments into one gst-launch-1.0 command",
    long_about = None
)]
struct Cli {
    /// How many times to replicate every camera's branches (positive integer).
    #[arg(allow_hyphen_values = true)]
    count: Option<String>,

    /// Put every element on its own continued line.
    #[arg(long)]
    multiline: bool,

    /// Debug-level diagnostics on stderr.
    #[arg(short, long)]
    verbose: bool,
}

/// Invalid or missing counts fall back to 1 with a warning.
fn parse_count(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        return 1;
    };
    match raw.trim().parse::<i64>() {
        Ok(n) if n >= 1 => n as usize,
        Ok(n) => {
            diagnostics::warn(format!(
                "Invalid num_of_pipelines value {}, using default 1",
                n
            ));
            1
        }
        Err(_) => {
            diagnostics::warn(format!(
                "Invalid num_of_pipelines value '{}', using default 1",
                raw
            ));
            1
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr; stdout carries only the compiled command.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "gst_pipeline_generator=debug"
        } else {
            "gst_pipeline_generator=info"
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let count = parse_count(cli.count.as_deref());
    let layout = if cli.multiline {
        render::Layout::Multiline
    } else {
        render::Layout::Compact
    };

    let settings = settings::Settings::from_env();
    tracing::debug!("settings: {:?}", settings);

    let results_dir = settings.results_dir();
    if let Err(e) = std::fs::create_dir_all(&results_dir) {
        diagnostics::warn(format!(
            "cannot create results directory {}: {}",
            results_dir.display(),
            e
        ));
    }

    let command = orchestrator::run(&settings, count, layout)
        .inspect_err(|e| tracing::error!("{:#}", e))?;
    println!("{}", command);

    Ok(())
}
