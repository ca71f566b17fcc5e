//! product-lens entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use product_lens::pim::DEFAULT_PIM_BASE;
use product_lens::{
    populate, FetchClient, OverrideStore, PimLookup, PopulateOptions, Product, Resolver,
};
use product_lens_server::config::{resolve_addr, resolve_config, ConfigFlags};

#[derive(Parser)]
#[command(
    name = "product-lens",
    about = "Resolve manufacturer SKUs to a product image and datasheet page",
    version
)]
struct Cli {
    /// Override document: an http(s) URL or a local JSON file.
    #[arg(long, global = true)]
    overrides: Option<String>,

    /// Origin of the manufacturer site.
    #[arg(long, global = true)]
    origin: Option<String>,

    /// Per-request timeout in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Retries after the first failed attempt.
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default).
    Serve {
        /// Listen address (host:port). Also reads PRODUCT_LENS_ADDR.
        #[arg(long)]
        addr: Option<String>,
    },

    /// Resolve one SKU and print the result as JSON.
    Resolve {
        sku: String,

        /// Include the resolution trace.
        #[arg(long)]
        debug: bool,
    },

    /// Fill missing images in a product catalog file.
    Populate {
        /// Catalog JSON array to read.
        #[arg(long)]
        input: PathBuf,

        /// Where to write the updated catalog.
        #[arg(long)]
        output: PathBuf,

        /// First product to examine.
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// How many products to examine.
        #[arg(long)]
        limit: Option<usize>,

        /// PIM blob container base URL.
        #[arg(long, default_value = DEFAULT_PIM_BASE)]
        pim_base: String,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   product-lens completions bash > ~/.local/share/bash-completion/completions/product-lens
    ///   product-lens completions zsh > ~/.zfunc/_product-lens
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let flags = ConfigFlags {
        origin: cli.origin.clone(),
        overrides: cli.overrides.clone(),
        timeout_ms: cli.timeout_ms,
        max_retries: cli.max_retries,
    };

    match cli.command.unwrap_or(Commands::Serve { addr: None }) {
        Commands::Serve { addr } => {
            let addr = resolve_addr(addr.as_deref())?;
            let config = resolve_config(&flags)?;
            tracing::info!("product-lens server");
            tracing::info!("Origin: {}", config.origin);
            let resolver = Arc::new(Resolver::new(config));
            product_lens_server::rest::start(addr, resolver).await?;
        }

        Commands::Resolve { sku, debug } => {
            let resolver = Resolver::new(resolve_config(&flags)?);
            let result = resolver.resolve(&sku, debug).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Populate {
            input,
            output,
            offset,
            limit,
            pim_base,
        } => {
            let config = resolve_config(&flags)?;
            let text = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("reading {}", input.display()))?;
            let mut products: Vec<Product> = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a product array", input.display()))?;

            let client = FetchClient::from_config(&config);
            let overrides =
                OverrideStore::new(config.overrides.clone(), client.clone(), config.page_timeout());
            let pim = PimLookup::new(client, &pim_base, config.page_timeout());
            let options = PopulateOptions {
                offset,
                limit,
                ..PopulateOptions::default()
            };

            let report = populate(&mut products, &overrides, &pim, &options).await;

            tokio::fs::write(&output, serde_json::to_string_pretty(&products)?)
                .await
                .with_context(|| format!("writing {}", output.display()))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "product-lens", &mut std::io::stdout());
        }
    }

    Ok(())
}
