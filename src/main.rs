//! # geotag CLI
//!
//! ## Usage
//!
//! ```bash
//! geotag --config ./config/geotag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `geotag tag --footprint <WKT>` | Tag a footprint and print the JSON result |
//! | `geotag taggers` | List registered taggers |
//! | `geotag check` | Verify the database connection |
//! | `geotag serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! # Baseline only (area)
//! geotag tag --footprint "POLYGON((1 43,2 43,2 44,1 44,1 43))"
//!
//! # Land cover then political, political without toponyms
//! geotag tag --footprint "POLYGON((1 43,2 43,2 44,1 44,1 43))" \
//!     --tagger LandCover --tagger Political --option Political.toponyms=false
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use geotagger::config::{self, EngineConfig};
use geotagger::engine::Engine;
use geotagger::models::{FootprintMetadata, ProviderRequest, TaggerOptions};
use geotagger::registry::TaggerRegistry;
use geotagger::{db, server};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// geotagger: enrich geographic footprints with land cover, hydrology,
/// political, population and geology tags.
#[derive(Parser)]
#[command(name = "geotag", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/geotag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag a footprint and print the result as JSON.
    Tag {
        /// Footprint polygon in WKT (lon/lat, EPSG:4326).
        #[arg(long)]
        footprint: String,

        /// Acquisition time, RFC 3339 (e.g. `2020-01-01T00:00:00Z`).
        #[arg(long)]
        timestamp: Option<String>,

        /// Tagger to run. Repeat for several; order is merge order.
        #[arg(long = "tagger")]
        taggers: Vec<String>,

        /// Tagger option as `Tagger.key=value`. JSON values are parsed,
        /// anything else is taken as a string.
        #[arg(long = "option", value_parser = parse_key_val)]
        options: Vec<(String, String)>,
    },

    /// List registered taggers.
    Taggers,

    /// Connect to the database and report success.
    Check,

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

/// Parse a `key=value` pair for `--option` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Builds the ordered request from `--tagger` names and `--option` pairs.
fn build_request(
    taggers: Vec<String>,
    options: Vec<(String, String)>,
) -> anyhow::Result<ProviderRequest> {
    let mut request: ProviderRequest = taggers.into_iter().collect();
    for (key, raw) in options {
        let (tagger, option) = key
            .split_once('.')
            .with_context(|| format!("option '{}' must be written as Tagger.key", key))?;
        let value = serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw));
        match request.options_mut(tagger) {
            Some(opts) => {
                opts.insert(option.to_string(), value);
            }
            None => {
                let mut opts = TaggerOptions::new();
                opts.insert(option.to_string(), value);
                request.insert(tagger, opts);
            }
        }
    }
    Ok(request)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geotagger=info,geotag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Taggers = cli.command {
        for name in TaggerRegistry::with_builtins().names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Tag {
            footprint,
            timestamp,
            taggers,
            options,
        } => {
            if let Some(ts) = timestamp.as_deref() {
                chrono::DateTime::parse_from_rfc3339(ts)
                    .with_context(|| format!("invalid --timestamp '{}'", ts))?;
            }
            let request = build_request(taggers, options)?;
            let metadata = FootprintMetadata {
                footprint: Some(footprint),
                timestamp,
                area: None,
            };

            let engine = Engine::connect(&cfg.database, EngineConfig::from(&cfg)).await?;
            let result = engine.tag(&metadata, &request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Check => {
            let handle = db::connect(&cfg.database).await?;
            let postgis: Option<String> = sqlx::query_scalar("SELECT PostGIS_Version()")
                .fetch_optional(handle.pool())
                .await
                .unwrap_or(None);
            println!("Database connection OK.");
            match postgis {
                Some(v) => println!("PostGIS {}", v),
                None => println!("PostGIS not detected."),
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Taggers => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_request_orders_and_parses_options() {
        let request = build_request(
            vec!["LandCover".into(), "Political".into()],
            vec![
                ("Political.toponyms".into(), "false".into()),
                ("Generic.table".into(), "custom.soils".into()),
            ],
        )
        .unwrap();

        let entries: Vec<_> = request.iter().collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].0, "LandCover");
        assert_eq!(entries[1].1["toponyms"], json!(false));
        assert_eq!(entries[2].0, "Generic");
        assert_eq!(entries[2].1["table"], json!("custom.soils"));
    }

    #[test]
    fn test_build_request_rejects_unscoped_option() {
        assert!(build_request(vec![], vec![("toponyms".into(), "1".into())]).is_err());
    }
}
