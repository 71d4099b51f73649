use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use codsync_cli::Config;
use codsync_client::{
    discover_resources, fetch_boundary_catalogs, fetch_countries, HttpFetcher, JsonFetch,
    ServiceCatalogs,
};
use codsync_core::config::{load_config, HttpConfig, ServiceUrls};
use codsync_core::models::{CodType, Country};
use codsync_core::report::ErrorLog;
use codsync_core::sync::{add_service_resources, remove_upstream_resources};
use codsync_portal::{PortalClient, UpdateOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Setup logging (stderr, like the rest of the portal tooling)
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    // Parse command line arguments and the configuration file
    let cli = Config::parse();
    let app_config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    let countries_url = cli
        .countries_url
        .clone()
        .or_else(|| app_config.countries_url.clone())
        .context("No countries URL configured; pass --countries-url or set countries_url in the config file")?;

    // Initialize clients
    let http_config = HttpConfig::default();
    let fetcher = HttpFetcher::new(&http_config).context("Failed to build HTTP client")?;
    let portal = PortalClient::new(&cli.portal_url, cli.api_key.clone(), &http_config)
        .context("Invalid portal URL")?;

    // Errors accumulate across the whole run and are reported once at exit.
    let errors = ErrorLog::new();

    sync(
        &cli,
        &app_config.service_urls,
        &countries_url,
        &fetcher,
        &portal,
        &errors,
    )
    .await;

    let error_count = errors.report();
    if error_count > 0 {
        info!("Run completed with {error_count} error(s)");
        std::process::exit(1);
    }

    info!("Run completed successfully");
    Ok(())
}

/// Process every (country, dataset type) pair sequentially: discover the
/// upstream services, strip previously published service resources, apply
/// the fresh set, and push the dataset back to the portal.
async fn sync(
    cli: &Config,
    service_urls: &ServiceUrls,
    countries_url: &str,
    fetcher: &HttpFetcher,
    portal: &PortalClient,
    errors: &ErrorLog,
) {
    info!("Fetching boundary service catalogs...");
    let catalogs = fetch_boundary_catalogs(fetcher, service_urls, errors).await;
    if !catalogs.is_complete() {
        // Without both catalogs every boundary dataset would be stripped and
        // left empty, so nothing is attempted at all.
        errors.add("Could not get boundary service data");
        return;
    }

    info!("Fetching country reference data...");
    let countries = match fetch_countries(fetcher, countries_url).await {
        Ok(countries) => countries,
        Err(e) => {
            errors.add(format!("Could not get country data from {countries_url}: {e}"));
            return;
        }
    };
    info!("Found {} countries", countries.len());

    let update_options = UpdateOptions {
        updated_by_script: cli.updated_by.clone(),
        ..UpdateOptions::default()
    };

    for country in &countries {
        for cod_type in CodType::ALL {
            process_dataset(
                cli,
                service_urls,
                fetcher,
                portal,
                &catalogs,
                country,
                cod_type,
                &update_options,
                errors,
            )
            .await;
        }
    }
}

/// One unit of work: a single country/type pair, fully processed before the
/// next begins. Failures are recorded and never propagate to other pairs.
#[allow(clippy::too_many_arguments)]
async fn process_dataset(
    cli: &Config,
    service_urls: &ServiceUrls,
    fetcher: &dyn JsonFetch,
    portal: &PortalClient,
    catalogs: &ServiceCatalogs,
    country: &Country,
    cod_type: CodType,
    update_options: &UpdateOptions,
    errors: &ErrorLog,
) {
    let key = cod_type.dataset_key(&country.iso3);

    let mut dataset = match portal.read_dataset(&key).await {
        Ok(Some(dataset)) => dataset,
        // Countries without a published COD dataset are skipped silently.
        Ok(None) => return,
        Err(e) => {
            errors.add(format!("{key}: {e}"));
            return;
        }
    };

    info!("Starting to update {} {} dataset", country.name, cod_type);

    let resources =
        discover_resources(fetcher, catalogs, service_urls, country, cod_type, errors).await;
    let updated = remove_upstream_resources(&mut dataset, errors);

    // Nothing discovered and nothing removed: the dataset is untouched.
    if resources.is_empty() && !updated {
        return;
    }

    if !resources.is_empty() && !add_service_resources(&mut dataset, resources, errors) {
        return;
    }

    if cli.dry_run {
        info!("Dry run: not pushing {key} to the portal");
        return;
    }

    if let Err(e) = portal.update_dataset(&dataset, update_options).await {
        errors.add(format!("{}: {}", dataset.name, e));
    }
}
