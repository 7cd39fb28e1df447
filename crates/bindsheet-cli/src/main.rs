use bindsheet::output::{NoRasterizer, OutputError, OutputFormat};
use bindsheet::{Conversion, RenderOptions};
use chrono::NaiveDate;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

const LOG_ENV: &str = "BINDSHEET_LOG";

#[derive(Debug)]
enum CliError {
    Output(OutputError),
    #[cfg_attr(feature = "raster", allow(dead_code))]
    RasterUnavailable,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Output(err) => write!(f, "{err}"),
            CliError::RasterUnavailable => {
                write!(f, "PDF output requires bindsheet-cli built with the `raster` feature")
            }
        }
    }
}

impl From<OutputError> for CliError {
    fn from(value: OutputError) -> Self {
        Self::Output(value)
    }
}

/// Render a Joystick Gremlin profile into a labeled SVG/PDF diagram.
#[derive(Debug, Parser)]
#[command(name = "bindsheet", version, about, long_about = None)]
struct Cli {
    /// Joystick Gremlin profile (XML)
    #[arg(value_name = "PROFILE")]
    profile: PathBuf,

    /// SVG template with placeholder labels
    #[arg(value_name = "TEMPLATE")]
    template: PathBuf,

    /// Output directory (defaults to the profile's directory)
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Output format (svg or pdf)
    #[arg(
        short,
        long,
        value_name = "FORMAT",
        default_value = "svg",
        value_parser = parse_format
    )]
    format: OutputFormat,

    /// Date written for CURRENT_DATE (DD/MM/YYYY); defaults to today
    #[arg(long, value_name = "DD/MM/YYYY", value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Log level (overridden by the BINDSHEET_LOG filter)
    #[arg(long, value_name = "LEVEL", default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse::<OutputFormat>()
        .map_err(|()| format!("unsupported format `{s}` (expected svg or pdf)"))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), bindsheet::template::DATE_FORMAT)
        .map_err(|e| format!("expected DD/MM/YYYY: {e}"))
}

/// Logging setup for one run. Built from flags and the environment, then scoped over the run.
#[derive(Debug, Clone)]
struct LogConfig {
    level: LevelFilter,
    directives: Option<String>,
    ansi: bool,
}

impl LogConfig {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            level: if cli.quiet {
                LevelFilter::ERROR
            } else {
                cli.log_level
            },
            directives: std::env::var(LOG_ENV).ok().filter(|s| !s.trim().is_empty()),
            ansi: std::io::stderr().is_terminal(),
        }
    }

    fn into_subscriber(self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let filter = EnvFilter::builder()
            .with_default_directive(self.level.into())
            .parse_lossy(self.directives.as_deref().unwrap_or_default());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(self.ansi)
            .with_target(false)
            .finish()
    }
}

fn conversion(cli: &Cli) -> Conversion {
    Conversion::new(&cli.profile, &cli.template)
        .with_output_dir(cli.output_dir.clone())
        .with_format(cli.format)
        .with_options(RenderOptions::default().with_fixed_today(cli.date))
}

#[cfg(feature = "raster")]
fn run_pdf(conversion: &Conversion) -> Result<PathBuf, CliError> {
    let mut rasterizer = bindsheet::raster::VectorRasterizer::default();
    Ok(conversion.run(&mut rasterizer)?)
}

#[cfg(not(feature = "raster"))]
fn run_pdf(_conversion: &Conversion) -> Result<PathBuf, CliError> {
    Err(CliError::RasterUnavailable)
}

fn run(cli: &Cli) -> Result<PathBuf, CliError> {
    let conversion = conversion(cli);
    match conversion.format {
        OutputFormat::Svg => Ok(conversion.run(&mut NoRasterizer)?),
        OutputFormat::Pdf => run_pdf(&conversion),
    }
}

fn main() {
    let cli = Cli::parse();
    let log = LogConfig::from_cli(&cli);

    let result = tracing::subscriber::with_default(log.into_subscriber(), || {
        let result = run(&cli);
        if let Err(err) = &result {
            tracing::error!("{err}");
        }
        result
    });

    match result {
        Ok(out) => match cli.format {
            OutputFormat::Svg => {
                println!("Successfully updated SVG and saved to {}", out.display())
            }
            OutputFormat::Pdf => {
                println!("Successfully rendered PDF and saved to {}", out.display())
            }
        },
        Err(_) => std::process::exit(1),
    }
}
