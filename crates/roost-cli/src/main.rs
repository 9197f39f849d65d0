use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use roost_adapters::{HtmlAdapter, HtmlSelectors, RestAdapter};
use roost_core::aggregate::SearchResults;
use roost_core::{Aggregator, AggregatorConfig, PropertyType, SearchFilters, ServiceRegistry};

#[derive(Parser)]
#[command(name = "roost", version, about = "Rental listing metasearch across multiple sources")]
struct Cli {
    /// JSON API source as name=url[#priority]. Repeatable; lower priority
    /// numbers are fetched first.
    #[arg(long = "source", env = "ROOST_SOURCES", value_delimiter = ',', global = true)]
    sources: Vec<String>,

    /// HTML-scraped source as name=url-template[#priority]; the template
    /// must contain a {location} placeholder. Uses the default selector set.
    #[arg(long = "scrape", env = "ROOST_SCRAPE_SOURCES", value_delimiter = ',', global = true)]
    scrape_sources: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every configured source and print one merged ranking
    Search {
        /// City or area to search in
        #[arg(short, long)]
        location: String,

        #[arg(long)]
        min_price: Option<u32>,

        #[arg(long)]
        max_price: Option<u32>,

        #[arg(long)]
        min_bedrooms: Option<u8>,

        #[arg(long)]
        min_bathrooms: Option<u8>,

        /// flat, house, studio, room, or shared
        #[arg(long)]
        property_type: Option<PropertyType>,

        #[arg(long)]
        furnished: Option<bool>,

        #[arg(long)]
        bills_included: Option<bool>,

        /// Earliest move-in date (YYYY-MM-DD)
        #[arg(long)]
        available_from: Option<NaiveDate>,

        #[arg(long)]
        radius_km: Option<f32>,

        /// Independent timeout for each source call, in seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,

        /// Skip lower-priority sources once this many listings are collected
        #[arg(long, default_value_t = 50)]
        early_stop: usize,

        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show configured sources and their health
    Sources,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("roost=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let registry = Arc::new(ServiceRegistry::new());
    register_sources(&registry, &cli.sources, &cli.scrape_sources)?;

    match cli.command {
        Commands::Search {
            location,
            min_price,
            max_price,
            min_bedrooms,
            min_bathrooms,
            property_type,
            furnished,
            bills_included,
            available_from,
            radius_km,
            timeout_secs,
            early_stop,
            format,
        } => {
            if registry.sources().is_empty() {
                bail!("No sources configured. Pass --source name=url or set ROOST_SOURCES.");
            }

            let config = AggregatorConfig {
                adapter_timeout: Duration::from_secs(timeout_secs),
                early_stop_threshold: early_stop,
                ..AggregatorConfig::default()
            };
            let aggregator = Aggregator::with_config(registry, config);

            let filters = SearchFilters {
                location,
                min_price,
                max_price,
                min_bedrooms,
                min_bathrooms,
                property_type,
                furnished,
                bills_included,
                available_from,
                radius_km,
            };

            let results = aggregator.search(&filters).await;
            print_results(&results, format)?;
        }
        Commands::Sources => {
            cmd_sources(&registry);
        }
    }

    Ok(())
}

/// Build adapters from `name=url[#priority]` specs and register them.
fn register_sources(
    registry: &Arc<ServiceRegistry>,
    rest: &[String],
    scrape: &[String],
) -> Result<()> {
    for spec in rest {
        let (name, url, priority) = parse_source_spec(spec)?;
        registry.register(&name, Arc::new(RestAdapter::new(&name, &url)), priority);
    }
    for spec in scrape {
        let (name, url, priority) = parse_source_spec(spec)?;
        registry.register(
            &name,
            Arc::new(HtmlAdapter::new(&name, &url, HtmlSelectors::default())),
            priority,
        );
    }
    Ok(())
}

/// Parse `name=url[#priority]`; priority defaults to 1.
fn parse_source_spec(spec: &str) -> Result<(String, String, u8)> {
    let (name, rest) = spec
        .split_once('=')
        .with_context(|| format!("Source spec '{spec}' must be name=url[#priority]"))?;
    if name.is_empty() {
        bail!("Source spec '{spec}' has an empty name");
    }

    let (url, priority) = match rest.rsplit_once('#') {
        Some((url, priority)) => {
            let priority: u8 = priority
                .parse()
                .with_context(|| format!("Invalid priority in source spec '{spec}'"))?;
            (url, priority)
        }
        None => (rest, 1),
    };
    if url.is_empty() {
        bail!("Source spec '{spec}' has an empty url");
    }

    Ok((name.to_string(), url.to_string(), priority))
}

fn print_results(results: &SearchResults, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_table(results),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results)?);
        }
        OutputFormat::Csv => print_csv(results)?,
    }
    Ok(())
}

fn print_table(results: &SearchResults) {
    for (i, listing) in results.listings.iter().enumerate() {
        println!(
            "{:>3}. £{:<5} {}  {} bed {}  [{}] {}/{}",
            i + 1,
            format!("{}/{}", listing.price, listing.price_period),
            listing.location,
            listing.bedrooms,
            listing.property_type,
            listing.source,
            listing.quality_score,
            listing.suitability_score,
        );
        println!("     {}", listing.title);
        if !listing.source_url.is_empty() {
            println!("     {}", listing.source_url);
        }
    }

    let summary = &results.summary;
    println!(
        "\n{} listings from {} source(s) in {}ms{}",
        summary.total_found,
        summary.per_source.len(),
        summary.elapsed_ms,
        if summary.cache_hit { " (cached)" } else { "" },
    );
    for error in &summary.errors {
        println!("warning: {error}");
    }
}

fn print_csv(results: &SearchResults) -> Result<()> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    writer.write_record([
        "id",
        "source",
        "title",
        "price",
        "period",
        "location",
        "bedrooms",
        "bathrooms",
        "furnished",
        "bills_included",
        "quality_score",
        "suitability_score",
        "url",
    ])?;
    for listing in &results.listings {
        writer.write_record([
            listing.id.clone(),
            listing.source.clone(),
            listing.title.clone(),
            listing.price.to_string(),
            listing.price_period.to_string(),
            listing.location.clone(),
            listing.bedrooms.to_string(),
            listing.bathrooms.to_string(),
            listing.furnished.to_string(),
            listing.bills.included.to_string(),
            listing.quality_score.to_string(),
            listing.suitability_score.to_string(),
            listing.source_url.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn cmd_sources(registry: &Arc<ServiceRegistry>) {
    let sources = registry.sources();
    if sources.is_empty() {
        println!("No sources configured.");
        return;
    }
    for status in sources {
        println!(
            "{:<16} priority {:<3} {}",
            status.name,
            status.priority,
            if status.enabled { "enabled" } else { "disabled" },
        );
        let h = &status.health;
        if h.total_requests > 0 {
            println!(
                "                 {} requests, {:.0}% errors, avg {:.0}ms",
                h.total_requests,
                h.error_rate * 100.0,
                h.average_response_ms,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_spec_with_priority() {
        let (name, url, priority) =
            parse_source_spec("openrent=https://api.openrent.example/search#2").unwrap();
        assert_eq!(name, "openrent");
        assert_eq!(url, "https://api.openrent.example/search");
        assert_eq!(priority, 2);
    }

    #[test]
    fn test_parse_source_spec_defaults_priority() {
        let (_, _, priority) = parse_source_spec("x=https://x.example").unwrap();
        assert_eq!(priority, 1);
    }

    #[test]
    fn test_parse_source_spec_rejects_garbage() {
        assert!(parse_source_spec("just-a-name").is_err());
        assert!(parse_source_spec("=https://x.example").is_err());
        assert!(parse_source_spec("x=").is_err());
        assert!(parse_source_spec("x=https://x.example#loud").is_err());
    }
}
