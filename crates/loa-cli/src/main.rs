//! Command line front end for the LOA engine.
//!
//! Loads the rule and ownership documents from a directory and answers
//! one-shot queries: match a flight, resolve a sector's controller, or
//! just validate the configuration.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loa_core::{
    cop_tag, destination_claimed, next_sector_tag, xfl_tag, ConfigError, ConfigSource,
    ControllerDirectory, EngineConfig, FlightFacts, LoaConfig, LoaEngine, OwnershipConfig,
};

/// Inspect Letter-of-Agreement matching from the command line
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory holding loa.json and sector_ownership.json
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Position we are controlling as
    #[arg(long)]
    sector: String,

    /// Connected controller positions, comma separated
    #[arg(long, value_delimiter = ',')]
    online: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match one flight against the loaded agreements
    Match {
        /// Callsign
        #[arg(long, default_value = "TEST123")]
        callsign: String,

        /// Departure airport (ICAO)
        #[arg(long)]
        origin: String,

        /// Destination airport (ICAO)
        #[arg(long)]
        destination: String,

        /// Route points, comma separated
        #[arg(long, value_delimiter = ',')]
        route: Vec<String>,

        /// Cleared altitude in feet
        #[arg(long, default_value_t = 0)]
        cleared: i32,

        /// Final requested altitude in feet
        #[arg(long, default_value_t = 0)]
        final_altitude: i32,
    },

    /// Show who works a sector under the given online positions
    Resolve { sector: String },

    /// Parse the configuration and report what was loaded
    Check,
}

/// Reads both configuration documents from one directory.
struct FileConfigSource {
    dir: PathBuf,
}

impl FileConfigSource {
    fn read(&self, name: &str) -> Result<String, ConfigError> {
        let path = self.dir.join(name);
        fs::read_to_string(&path)
            .map_err(|e| ConfigError::Unreadable(format!("{}: {e}", path.display())))
    }
}

impl ConfigSource for FileConfigSource {
    fn load_rules(&self) -> Result<LoaConfig, ConfigError> {
        Ok(serde_json::from_str(&self.read("loa.json")?)?)
    }

    fn load_ownership(&self) -> Result<OwnershipConfig, ConfigError> {
        Ok(serde_json::from_str(&self.read("sector_ownership.json")?)?)
    }
}

struct StaticDirectory(Vec<String>);

impl ControllerDirectory for StaticDirectory {
    fn connected_positions(&self) -> Vec<String> {
        self.0.clone()
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("loa_core=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let source = FileConfigSource {
        dir: args.config_dir.clone(),
    };
    let directory = StaticDirectory(args.online.clone());

    let mut engine = LoaEngine::new(EngineConfig::default());
    engine.init(&args.sector, &source)?;
    engine.notify_online_controllers_changed(&directory);

    match args.command {
        Command::Match {
            callsign,
            origin,
            destination,
            route,
            cleared,
            final_altitude,
        } => {
            let facts = FlightFacts::new(callsign, &origin, &destination)
                .with_route(route)
                .with_altitudes(cleared, final_altitude);

            let handle = engine.match_rule(&facts, &directory);
            let rule = handle.and_then(|h| engine.rule(h));
            match rule {
                Some(rule) => {
                    println!("matched agreement from {}", rule.source_sectors.join(", "));
                    println!("  xfl:          FL{}", rule.exit_flight_level);
                    println!("  cop:          {}", rule.handoff_text);
                    println!("  next sectors: {}", rule.next_sectors.join(", "));
                }
                None => println!("no agreement matched"),
            }

            let claimed = destination_claimed(
                engine.store(),
                engine.table(),
                engine.my_sector(),
                &facts.destination,
            );
            println!(
                "tag fields: xfl={:?} cop={:?} next={:?}",
                xfl_tag(&facts, rule, None, claimed).text,
                cop_tag(&facts, rule, None).text,
                next_sector_tag(&facts, rule, engine.online_snapshot()).text,
            );
        }

        Command::Resolve { sector } => match engine.resolve_sector_controller(&sector) {
            Some(controller) => println!("{sector} is worked by {controller}"),
            None => println!("{sector} is not covered by any online position"),
        },

        Command::Check => {
            println!(
                "loaded {} rules from {} sector(s)",
                engine.store().len(),
                engine.store().loaded_sectors().len()
            );
            for sector in engine.store().loaded_sectors() {
                println!("  {sector}");
            }
        }
    }

    Ok(())
}
