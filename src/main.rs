pub mod config;
pub mod container;
pub mod data;
pub mod error;
pub mod render;
pub mod scale;
pub mod server;
pub mod types;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use container::{ChartController, RenderOutcome};
use data::CsvFile;
use futures::future::join_all;
use render::DrawingSurface;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use types::Viewport;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the scatter chart to an SVG file
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Viewport as WIDTHxHEIGHT; repeat to replay a sequence of resizes
        #[arg(short, long, value_name = "WxH", default_value = "960x600")]
        size: Vec<Viewport>,
        /// Output file, defaults to `output.svg` from the config
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Serve the responsive chart page
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { config, size, out } => {
            info!("Rendering chart with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let out = out.clone().unwrap_or_else(|| app_config.output.svg.clone());
            let surface = render_command(&app_config, size, &out).await?;
            println!("Wrote {} chart to {:?}", surface.viewport(), out);
        }
        Commands::Serve { config } => {
            info!("Serving chart with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            server::start_server(app_config).await?;
        }
    }

    Ok(())
}

/// Replays `sizes` as a burst of resizes and writes the surface that
/// survives to `out`.
async fn render_command(
    app_config: &config::AppConfig,
    sizes: &[Viewport],
    out: &Path,
) -> anyhow::Result<DrawingSurface> {
    let controller = ChartController::new(
        CsvFile::new(&app_config.input.data_csv),
        app_config.chart.clone(),
    );

    // Triggered in order, resolved concurrently.
    let renders: Vec<_> = sizes.iter().map(|v| controller.resize(*v)).collect();
    let mut last_error = None;
    for outcome in join_all(renders).await {
        match outcome {
            RenderOutcome::Drawn { generation } => info!("Render #{} kept", generation),
            RenderOutcome::Superseded { generation, latest } => {
                info!("Render #{} superseded by #{}", generation, latest)
            }
            RenderOutcome::Failed { generation, error } => {
                warn!("Render #{} failed: {}", generation, error);
                last_error = Some(error);
            }
        }
    }

    let Some(surface) = controller.snapshot() else {
        return Err(match last_error {
            Some(e) => anyhow!(e).context("No chart was drawn"),
            None => anyhow!("No chart was drawn"),
        });
    };

    std::fs::write(out, surface.to_svg())
        .with_context(|| format!("Failed to write chart to {:?}", out))?;
    Ok(surface)
}
