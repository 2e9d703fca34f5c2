use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use formats::MapConfig;
use tools::{LayerKind, summarize_str};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect GeoJSON region maps offline")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a layer from a GeoJSON file and print what came out
    Summary {
        /// GeoJSON FeatureCollection
        geojson: PathBuf,

        /// JSON config overrides merged over the defaults
        #[arg(long)]
        config: Option<PathBuf>,

        /// Which layer's options to build with
        #[arg(long, value_enum, default_value_t = LayerKind::Map)]
        layer: LayerKind,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as JSON
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main(Args::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main(args: Args) -> Result<(), String> {
    match args.command {
        Command::Summary {
            geojson,
            config,
            layer,
            json,
        } => {
            let config = load_config(config)?;
            let payload =
                fs::read_to_string(&geojson).map_err(|e| format!("read {geojson:?}: {e}"))?;
            let summary =
                summarize_str(&config, layer, &payload).map_err(|e| format!("{geojson:?}: {e}"))?;
            info!(layer = summary.layer, meshes = summary.meshes, "layer built");
            if json {
                let text = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
                println!("{text}");
            } else {
                print!("{summary}");
            }
            Ok(())
        }
        Command::Config => {
            let text =
                serde_json::to_string_pretty(&MapConfig::default()).map_err(|e| e.to_string())?;
            println!("{text}");
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<MapConfig, String> {
    let Some(path) = path else {
        return Ok(MapConfig::default());
    };
    let text = fs::read_to_string(&path).map_err(|e| format!("read {path:?}: {e}"))?;
    let overrides: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| format!("{path:?}: {e}"))?;
    MapConfig::with_overrides(&overrides).map_err(|e| format!("{path:?}: {e}"))
}
