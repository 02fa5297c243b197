use std::time::Duration;

use anyhow::{anyhow, Context};
use blink_common::{
    build_href, extract_params,
    share::{decode_share_link, encode_share_link},
    validation::validate_action_metadata,
    ParameterValue, ParameterValues,
};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use crate::rpc::{ActionClient, HttpActionClient, HttpActionClientOptions};

/// Blink Client CLI - Inspect actions and work with action links
#[derive(Parser, Debug, Clone, PartialEq)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
struct CliArgs {
    #[clap(subcommand)]
    command: Command,

    /// Request timeout in seconds.
    #[clap(long, default_value = "30")]
    timeout: u64,

    /// Enable verbose logging.
    #[clap(long)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Fetch and validate the metadata of an action and print it.
    Describe {
        /// Action endpoint. Example: http://localhost:4242/api/actions/donate
        url: String,
    },
    /// Resolve an href template with parameter values.
    Href {
        template: String,
        /// Parameter value as name=value. Repeat a name to pass a list.
        #[clap(short = 'p', long = "param", number_of_values = 1)]
        params: Vec<String>,
    },
    /// Wrap an action URL into a sharable link.
    Share {
        target: String,
        #[clap(long, default_value = "https://dial.to", env = "BLINK_SHARE_BASE")]
        base: String,
        #[clap(long, default_value = "")]
        path: String,
    },
    /// Recover the action URL from a sharable link.
    Unshare { link: String },
}

/// Parses repeated `name=value` pairs. Repeated names collect into a list value.
fn parse_params(params: &[String]) -> anyhow::Result<ParameterValues> {
    let mut values = ParameterValues::new();
    for param in params {
        let (name, value) = param
            .split_once('=')
            .ok_or_else(|| anyhow!("Parameter `{param}` must be formatted as name=value"))?;
        let value = match values.remove(name) {
            None => ParameterValue::Single(value.to_string()),
            Some(ParameterValue::Single(first)) => {
                ParameterValue::Multiple(vec![first, value.to_string()])
            }
            Some(ParameterValue::Multiple(mut all)) => {
                all.push(value.to_string());
                ParameterValue::Multiple(all)
            }
        };
        values.insert(name.to_string(), value);
    }
    Ok(values)
}

pub async fn run_cli() -> anyhow::Result<()> {
    let args: CliArgs = CliArgs::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to set up logging subscriber: {e}"))?;

    run(args).await
}

async fn run(args: CliArgs) -> anyhow::Result<()> {
    match args.command {
        Command::Describe { url } => {
            let client = HttpActionClient::new(
                HttpActionClientOptions::new().with_timeout(Duration::from_secs(args.timeout)),
            )?;
            let body = client
                .get_metadata(&url)
                .await
                .with_context(|| format!("Failed to fetch {url}"))?;
            let metadata = validate_action_metadata(&body).context("Invalid action metadata")?;
            info!(title = %metadata.title, "Fetched action");
            for action in metadata.linked_actions() {
                debug!(
                    href = %action.href,
                    placeholders = ?extract_params(&action.href),
                    "Linked action"
                );
            }
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Command::Href { template, params } => {
            let values = parse_params(&params)?;
            println!("{}", build_href(&template, &values));
        }
        Command::Share { target, base, path } => {
            println!("{}", encode_share_link(&base, &path, &target)?);
        }
        Command::Unshare { link } => {
            println!("{}", decode_share_link(&link)?);
        }
    }
    Ok(())
}
