pub mod types;
pub mod config;
pub mod data;
pub mod jitter;
pub mod presentation;
pub mod registry;
pub mod counter;
pub mod toggle;
pub mod layer;
pub mod overlay;
pub mod server;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::jitter::JitterPositioner;
use crate::layer::{InvestorLayer, LayerView};
use crate::presentation::CountReadout;
use crate::types::{Category, Cluster, Tier};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Scheme {
    Tier,
    Cluster,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a layer and print how many investors fall in each category
    Summary {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long, value_enum, default_value = "tier")]
        scheme: Scheme,
    },
    /// Serve the tier and cluster layers with their toggles
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

fn positioner(app_config: &AppConfig) -> JitterPositioner {
    JitterPositioner::new(app_config.layer.jitter_degrees, app_config.layer.seed)
}

fn build_layer<C: Category>(
    app_config: &AppConfig,
    positioner: &mut JitterPositioner,
) -> InvestorLayer<C> {
    InvestorLayer::from_source(
        &app_config.input.investors,
        positioner,
        app_config.layer.live_counter,
        CountReadout::new(),
    )
}

fn print_summary<C: Category>(layer: &InvestorLayer<C>) {
    let registry = layer.registry();
    if registry.is_empty() {
        warn!("No {} markers to summarise", C::SCHEME);
    } else {
        info!(
            "{} markers across {} {} categories",
            registry.len(),
            registry.categories().len(),
            C::SCHEME
        );
    }
    for toggle in layer.toggle_states() {
        println!("{:<45} {:>6}", toggle.category, toggle.markers);
    }
    match layer.presentation().text() {
        Some(text) => println!("{}", text),
        None => println!("{} markers", layer.visible_count()),
    }
}

fn load_overlay(app_config: &AppConfig) -> geojson::FeatureCollection {
    let sites = match &app_config.input.fsa_overlay {
        Some(path) => overlay::load_priority_fsas(path, app_config.overlay.priority_cluster)
            .unwrap_or_else(|e| {
                warn!("FSA overlay skipped: {:#}", e);
                Vec::new()
            }),
        None => Vec::new(),
    };
    overlay::overlay_geojson(&sites)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Summary { config, scheme } => {
            info!("Summarising with config: {:?}", config);
            let app_config = AppConfig::load_from_file(config)?;

            let mut positioner = positioner(&app_config);
            match scheme {
                Scheme::Tier => print_summary(&build_layer::<Tier>(&app_config, &mut positioner)),
                Scheme::Cluster => {
                    print_summary(&build_layer::<Cluster>(&app_config, &mut positioner))
                }
            }
        }
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let app_config = AppConfig::load_from_file(config)?;

            // Both layers load up front and draw offsets from one generator;
            // the map only draws after this.
            let mut positioner = positioner(&app_config);
            let layers: Vec<Box<dyn LayerView>> = vec![
                Box::new(build_layer::<Tier>(&app_config, &mut positioner)),
                Box::new(build_layer::<Cluster>(&app_config, &mut positioner)),
            ];
            let overlay = load_overlay(&app_config);

            server::start_server(app_config.clone(), server::AppState::new(layers, overlay)).await?;
        }
    }

    Ok(())
}
