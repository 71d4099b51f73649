use std::path::PathBuf;

use clap::Parser;

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "codsync")]
#[command(
    author,
    version,
    about = "Sync COD geoservice and population resources to the data portal"
)]
#[command(after_help = "Examples:
  codsync --countries-url https://example.org/countries.json
  codsync --dry-run --countries-url https://example.org/countries.json
  PORTAL_API_KEY=... codsync --portal-url https://data.humdata.org")]
pub struct Config {
    /// Base URL of the data portal
    #[arg(long, env = "PORTAL_URL", default_value = "https://data.humdata.org")]
    pub portal_url: String,

    /// Portal API key; required to push updates
    #[arg(long, env = "PORTAL_API_KEY")]
    pub api_key: Option<String>,

    /// Path to the TOML configuration file with the upstream service URLs
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// HXL-tagged country export URL (overrides the config file)
    #[arg(long, env = "COUNTRIES_URL")]
    pub countries_url: Option<String>,

    /// Attribution recorded on updated datasets
    #[arg(long, default_value = "COD service sync")]
    pub updated_by: String,

    /// Discover and reconcile, but do not push updates to the portal
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Config::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["codsync"]);
        assert_eq!(config.portal_url, "https://data.humdata.org");
        assert_eq!(config.updated_by, "COD service sync");
        assert!(!config.dry_run);
        assert!(config.config.is_none());
    }
}
