use anyhow::{Context, Result, anyhow};
use clap::Parser;
use gbif_client::config::join_url;
use gbif_client::http::{Params, RequestError};
use gbif_client::literature::LiteratureQuery;
use gbif_client::maps::MapQuery;
use gbif_client::occurrence::OccurrenceQuery;
use gbif_client::species::NameMatch;
use gbif_client::{CacheConfig, ClientConfig, Gbif, OAuthConfig, RetryPolicy};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// gbif - command-line client for the GBIF REST API
///
/// Prints responses as pretty JSON. Failures are printed as {"error": ...}
/// and exit with a non-zero status.
///
/// Write operations need credentials: either GBIF_USERNAME/GBIF_PASSWORD
/// for HTTP Basic, or GBIF_CLIENT_ID/GBIF_CLIENT_SECRET/GBIF_TOKEN_URL for OAuth.
///
/// Examples:
///   gbif get species/search -p q=puma -p limit=5
///   gbif occurrence 1258202889
///   gbif search --taxon-key 2435099 --country DK
///   gbif match-name "Puma concolor" --kingdom Animalia
#[derive(Parser, Debug)]
#[command(author, version = env!("GBIF_CLIENT_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the v1 API
    #[arg(long = "api-url", env = "GBIF_API_URL", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Base URL of the v2 (maps) API
    #[arg(long = "maps-url", env = "GBIF_MAPS_URL", value_name = "URL", global = true)]
    pub maps_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", env = "GBIF_TIMEOUT_SECS", value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Cache successful anonymous GETs for this many seconds
    #[arg(long = "cache-ttl", env = "GBIF_CACHE_TTL_SECS", value_name = "SECS", global = true)]
    pub cache_ttl: Option<u64>,

    /// Make a single attempt per request
    #[arg(long = "no-retry", global = true)]
    pub no_retry: bool,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

#[derive(clap::Args, Debug, Default)]
pub struct CredentialArgs {
    #[arg(long, env = "GBIF_USERNAME", global = true, hide_env_values = true)]
    pub username: Option<String>,

    #[arg(long, env = "GBIF_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long = "client-id", env = "GBIF_CLIENT_ID", global = true, hide_env_values = true)]
    pub client_id: Option<String>,

    #[arg(long = "client-secret", env = "GBIF_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    #[arg(long = "token-url", env = "GBIF_TOKEN_URL", global = true)]
    pub token_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// GET any v1 endpoint and print the JSON response
    Get(GetArgs),

    /// Parse one or more scientific names
    ParseName(ParseNameArgs),

    /// Match a scientific name against the backbone taxonomy
    MatchName(MatchNameArgs),

    /// Show a registered dataset by key
    Dataset(DatasetArgs),

    /// Search literature citing GBIF-mediated data
    Literature(LiteratureArgs),

    /// Show a single occurrence by GBIF id
    Occurrence(OccurrenceArgs),

    /// Search occurrences
    Search(SearchArgs),

    /// Show the status of an occurrence download
    DownloadStatus(DownloadKeyArgs),

    /// Save a finished occurrence download as <key>.zip
    FetchDownload(FetchDownloadArgs),

    /// Cancel a running occurrence download (requires credentials)
    CancelDownload(DownloadKeyArgs),

    /// Summarize the density map for a query
    MapSummary(MapSummaryArgs),
}

#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Path below the API base URL, e.g. "species/search"
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Query parameter; repeat the same key to send several values
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
}

#[derive(clap::Args, Debug)]
pub struct ParseNameArgs {
    #[arg(value_name = "NAME", required = true)]
    pub names: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct MatchNameArgs {
    #[arg(value_name = "NAME")]
    pub name: String,

    #[arg(long)]
    pub rank: Option<String>,

    #[arg(long)]
    pub kingdom: Option<String>,

    #[arg(long)]
    pub family: Option<String>,

    /// Only match the name itself, never the classification
    #[arg(long)]
    pub strict: bool,
}

#[derive(clap::Args, Debug)]
pub struct DatasetArgs {
    #[arg(value_name = "UUID")]
    pub key: String,
}

#[derive(clap::Args, Debug)]
pub struct LiteratureArgs {
    /// Full-text query
    #[arg(long)]
    pub q: Option<String>,

    #[arg(long = "taxon-key", value_name = "KEY")]
    pub taxon_key: Vec<i64>,

    #[arg(long = "dataset-key", value_name = "UUID")]
    pub dataset_key: Option<String>,

    #[arg(long)]
    pub year: Option<String>,

    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(clap::Args, Debug)]
pub struct OccurrenceArgs {
    #[arg(value_name = "GBIF_ID")]
    pub gbif_id: u64,

    /// Show the verbatim record instead of the interpreted one
    #[arg(long)]
    pub verbatim: bool,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Full-text query
    #[arg(long)]
    pub q: Option<String>,

    #[arg(long = "taxon-key", value_name = "KEY")]
    pub taxon_key: Vec<i64>,

    #[arg(long = "dataset-key", value_name = "UUID")]
    pub dataset_key: Vec<String>,

    #[arg(long, value_name = "CODE")]
    pub country: Vec<String>,

    /// Year or from,to range
    #[arg(long)]
    pub year: Option<String>,

    #[arg(long)]
    pub limit: Option<u32>,

    #[arg(long)]
    pub offset: Option<u32>,
}

#[derive(clap::Args, Debug)]
pub struct DownloadKeyArgs {
    #[arg(value_name = "KEY")]
    pub key: String,
}

#[derive(clap::Args, Debug)]
pub struct FetchDownloadArgs {
    #[arg(value_name = "KEY")]
    pub key: String,

    /// Directory to write the archive to
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = ".")]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct MapSummaryArgs {
    #[arg(long = "taxon-key")]
    pub taxon_key: Option<i64>,

    #[arg(long = "dataset-key")]
    pub dataset_key: Option<String>,

    #[arg(long = "network-key")]
    pub network_key: Option<String>,

    #[arg(long = "publishing-org")]
    pub publishing_org: Option<String>,

    #[arg(long = "publishing-country")]
    pub publishing_country: Option<String>,

    #[arg(long)]
    pub country: Option<String>,

    #[arg(long = "basis-of-record")]
    pub basis_of_record: Option<String>,

    #[arg(long)]
    pub year: Option<String>,
}

fn parse_key_value(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(anyhow!("Parameter name must not be empty in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

impl Cli {
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::from_env()?;
        if let Some(url) = &self.api_url {
            config = config.with_api_url(url);
        }
        if let Some(url) = &self.maps_url {
            config = config.with_maps_url(url);
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.cache_ttl {
            config = config.with_cache(CacheConfig {
                ttl: Duration::from_secs(secs),
                ..CacheConfig::default()
            });
        }
        if self.no_retry {
            config = config.with_retry(RetryPolicy::none());
        }
        Ok(config)
    }
}

/// Builds the root client, attaching whichever credentials were supplied.
async fn connect(cli: &Cli) -> Result<Gbif> {
    let gbif = Gbif::new(cli.client_config()?)?;
    let creds = &cli.credentials;

    if let (Some(id), Some(secret), Some(token_url)) =
        (&creds.client_id, &creds.client_secret, &creds.token_url)
    {
        return gbif.with_oauth(OAuthConfig::new(id, secret, token_url)?).await;
    }
    if let (Some(username), Some(password)) = (&creds.username, &creds.password) {
        return Ok(gbif.with_basic_auth(username, password));
    }
    Ok(gbif)
}

async fn run(cli: Cli) -> Result<Value> {
    let gbif = connect(&cli).await?;

    match cli.command {
        Commands::Get(args) => {
            let params = args
                .params
                .into_iter()
                .fold(Params::new(), |params, (key, value)| params.set(&key, value));
            let url = join_url(&gbif.config().api_url, &args.path);
            Ok(gbif.client().fetch_with_params(&url, &params, None).await?)
        }
        Commands::ParseName(args) => gbif.name_parser().parse_scientific_name(&args.names).await,
        Commands::MatchName(args) => {
            let name = NameMatch {
                rank: args.rank,
                kingdom: args.kingdom,
                family: args.family,
                strict: args.strict.then_some(true),
                ..NameMatch::name(args.name)
            };
            gbif.name_search().match_name(&name).await
        }
        Commands::Dataset(args) => gbif.datasets().get(&args.key).await,
        Commands::Literature(args) => {
            let query = LiteratureQuery {
                q: args.q,
                gbif_taxon_key: args.taxon_key,
                gbif_dataset_key: args.dataset_key,
                year: args.year,
                limit: args.limit,
                ..Default::default()
            };
            gbif.literature().search(&query).await
        }
        Commands::Occurrence(args) => {
            let occurrences = gbif.single_occurrence();
            if args.verbatim {
                occurrences.get_verbatim(args.gbif_id).await
            } else {
                occurrences.get(args.gbif_id).await
            }
        }
        Commands::Search(args) => {
            let query = OccurrenceQuery {
                q: args.q,
                taxon_key: args.taxon_key,
                dataset_key: args.dataset_key,
                country: args.country,
                year: args.year,
                limit: args.limit,
                offset: args.offset,
                ..Default::default()
            };
            gbif.occurrence_search().search(&query).await
        }
        Commands::DownloadStatus(args) => gbif.occurrence_downloads().download_status(&args.key).await,
        Commands::FetchDownload(args) => {
            let path = gbif
                .occurrence_downloads()
                .save_download(&args.key, &args.output)
                .await?;
            Ok(json!({ "path": path.display().to_string() }))
        }
        Commands::CancelDownload(args) => {
            let outcome = gbif.occurrence_downloads().cancel_download(&args.key).await?;
            Ok(Value::String(outcome.to_string()))
        }
        Commands::MapSummary(args) => {
            let query = MapQuery {
                basis_of_record: args.basis_of_record,
                year: args.year,
                country: args.country,
                taxon_key: args.taxon_key,
                dataset_key: args.dataset_key,
                publishing_org: args.publishing_org,
                publishing_country: args.publishing_country,
                network_key: args.network_key,
            };
            gbif.maps().density_summary(&query).await
        }
    }
}

/// `{"error": ...}` for any failure; request failures keep their remote message.
fn error_json(error: &anyhow::Error) -> Value {
    match error
        .chain()
        .find_map(|cause| cause.downcast_ref::<RequestError>())
    {
        Some(request_error) => {
            let mut value = request_error.to_json();
            let outer = error.to_string();
            if outer != request_error.to_string() {
                value["error"] = Value::String(format!("{}: {}", outer, request_error));
            }
            value
        }
        None => json!({ "error": format!("{:#}", error) }),
    }
}

fn print_json(value: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
    println!("{}", rendered);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let (value, code) = match run(cli).await {
        Ok(value) => (value, ExitCode::SUCCESS),
        Err(e) => {
            log::debug!("Command failed: {:?}", e);
            (error_json(&e), ExitCode::FAILURE)
        }
    };

    if let Err(e) = print_json(&value) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }
    code
}
