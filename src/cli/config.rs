//! Config command handler
//!
//! View and modify configuration settings.

use crate::config::Config;
use crate::error::{Error, Result};
use clap::Args;

/// Config command arguments
#[derive(Args)]
pub struct ConfigArgs {
    /// Configuration key (e.g., "analysis.default_radius_miles")
    pub key: Option<String>,

    /// Value to set (if not provided, shows current value)
    pub value: Option<String>,

    /// Show config file path
    #[arg(long)]
    pub path: bool,

    /// Reset config to defaults
    #[arg(long)]
    pub reset: bool,
}

/// Run the config command
pub fn run(args: ConfigArgs) -> Result<()> {
    if args.path {
        let path = Config::config_path()?;
        println!("{}", path.display());
        return Ok(());
    }

    if args.reset {
        Config::default().save()?;
        println!("Configuration reset to defaults");
        return Ok(());
    }

    let mut config = Config::load()?;

    match (&args.key, &args.value) {
        (None, None) => print!("{}", render_all(&config)),

        (Some(key), None) => match config.get(key) {
            Some(value) => println!("{}", value),
            None => {
                eprintln!("Available keys:");
                for k in Config::available_keys() {
                    eprintln!("  {}", k);
                }
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        },

        (Some(key), Some(value)) => {
            config.set(key, value)?;
            config.save()?;
            println!("{} = {}", key, value);
        }

        (None, Some(_)) => {
            return Err(Error::Config(
                "Must specify a key to set a value".to_string(),
            ))
        }
    }

    Ok(())
}

/// Every setting grouped by section, secrets masked
fn render_all(config: &Config) -> String {
    let mut out = String::new();
    let mut section = "";

    for key in Config::available_keys() {
        let Some((prefix, name)) = key.rsplit_once('.') else {
            continue;
        };
        if prefix != section {
            if !section.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("[{}]\n", prefix));
            section = prefix;
        }

        let value = config.get(key).unwrap_or_default();
        let shown = match key {
            "provider.api_key" if value.is_empty() => "\"\" # not configured".to_string(),
            "provider.api_key" => "\"***\" # configured".to_string(),
            _ => value,
        };
        out.push_str(&format!("{} = {}\n", name, shown));
    }
    out
}
