use anyhow::Result;
use clap::{CommandFactory, Parser};
use color_eyre::config::HookBuilder;
use sitepilot_core::{load_config_or_default, validate_config, ConfigFile, Context, Session};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod handlers;

/// sitepilot - deploy static websites on AWS
#[derive(Parser, Debug)]
#[command(name = "sitepilot")]
#[command(version)]
#[command(about = "Deploy static websites to S3, Route 53 and CloudFront", long_about = None)]
struct Cli {
    /// AWS profile from the shared config files
    #[arg(long, global = true, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// AWS region (defaults to the profile's region)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Configuration file (default: ~/.config/sitepilot/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List all buckets
    ListBuckets {
        /// Show a table with creation dates
        #[arg(short, long)]
        long: bool,
    },

    /// List the objects in a bucket
    ListBucketObjects {
        bucket: String,
        /// Show a table with sizes and dates
        #[arg(short, long)]
        long: bool,
    },

    /// Create a bucket and configure it for website hosting
    SetupBucket { bucket: String },

    /// Upload a local directory tree to a bucket
    Sync {
        /// Local directory to upload
        path: PathBuf,
        bucket: String,
    },

    /// Point a domain at the website bucket of the same name
    SetupDomain { domain: String },

    /// Find an issued ACM certificate covering a domain
    FindCert { domain: String },

    /// Serve a domain over HTTPS through CloudFront
    SetupCdn { domain: String, bucket: String },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Shell completion
    Completion {
        /// Shell type (bash, zsh, fish, elvish, powershell)
        shell: String,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Check the configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

/// Filter directives for the log subscriber when `RUST_LOG` is unset
fn log_filter(verbose: u8, configured: Option<&str>) -> String {
    match verbose {
        0 => configured.unwrap_or("warn").to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn init_logging(verbose: u8, configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(verbose, configured)));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}

/// Check the config, then load the AWS session and wire the managers.
/// Flags win over the file.
async fn connect(cli: &Cli, config: &ConfigFile) -> Result<Context> {
    validate_config(config)?;

    let profile = cli.profile.as_deref().or(config.aws.profile.as_deref());
    let region = cli.region.as_deref().or(config.aws.region.as_deref());

    let session = Session::load(profile, region).await;
    Ok(Context::from_session(&session, config))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup error handling
    if let Err(e) = HookBuilder::default().install() {
        eprintln!("Warning: Failed to install error handler: {}", e);
    }

    // Parse CLI arguments
    let cli = Cli::parse();

    let config = load_config_or_default(cli.config.as_deref())?;
    init_logging(cli.verbose, config.log_level());

    // Execute command
    match &cli.command {
        Commands::ListBuckets { long } => {
            let ctx = connect(&cli, &config).await?;
            handlers::handle_list_buckets(&ctx, *long).await
        }
        Commands::ListBucketObjects { bucket, long } => {
            let ctx = connect(&cli, &config).await?;
            handlers::handle_list_bucket_objects(&ctx, bucket, *long).await
        }
        Commands::SetupBucket { bucket } => {
            let ctx = connect(&cli, &config).await?;
            handlers::handle_setup_bucket(&ctx, bucket).await
        }
        Commands::Sync { path, bucket } => {
            handlers::ensure_site_dir(path)?;
            let ctx = connect(&cli, &config).await?;
            handlers::handle_sync(&ctx, path, bucket).await
        }
        Commands::SetupDomain { domain } => {
            let ctx = connect(&cli, &config).await?;
            handlers::handle_setup_domain(&ctx, domain).await
        }
        Commands::FindCert { domain } => {
            let ctx = connect(&cli, &config).await?;
            handlers::handle_find_cert(&ctx, domain).await
        }
        Commands::SetupCdn { domain, bucket } => {
            let ctx = connect(&cli, &config).await?;
            handlers::handle_setup_cdn(&ctx, domain, bucket).await
        }
        Commands::Config { action } => {
            let action_str = match action {
                ConfigAction::Show => "show",
                ConfigAction::Validate => "validate",
                ConfigAction::Path => "path",
            };
            handlers::handle_config(action_str, cli.config.as_deref(), &config)
        }
        Commands::Completion { shell } => handlers::handle_completion(shell, &mut Cli::command()),
    }
}
