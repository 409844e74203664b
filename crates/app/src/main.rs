use anyhow::Context;
use care_navigator_core::{
    CaregiverCompanion, ChatModel, ChatModelConfig, DirectoryConfig, DirectorySource,
    FileDirectory, GeoFilter, HttpDirectory, Mode, Navigator, PostalTable, ProviderSearch,
    Router, CAREGIVER_SYSTEM_PROMPT, DEFAULT_DIRECTORY_URL, PROVIDER_SYSTEM_PROMPT,
};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type BoxedDirectory = Box<dyn DirectorySource + Send + Sync>;

#[derive(Parser)]
#[command(name = "care-navigator", version)]
struct Cli {
    /// Pipeline to run. `auto` routes each request by its text.
    #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
    mode: ModeArg,

    /// Provider directory JSON endpoint.
    #[arg(long, env = "PROVIDER_DIRECTORY_URL", default_value = DEFAULT_DIRECTORY_URL)]
    directory_url: String,

    /// Read the provider directory from a local file instead of the endpoint.
    #[arg(long)]
    directory_file: Option<PathBuf>,

    /// GeoNames postal code dump used for radius search.
    #[arg(long, env = "ZIP_TABLE_PATH")]
    zip_table: Option<PathBuf>,

    /// Directory fetch timeout in seconds.
    #[arg(long, default_value = "25")]
    timeout_secs: u64,

    /// Request text. Starts an interactive session when omitted.
    text: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Auto,
    Provider,
    Caregiver,
}

impl ModeArg {
    fn explicit(self) -> Option<Mode> {
        match self {
            ModeArg::Auto => None,
            ModeArg::Provider => Some(Mode::Provider),
            ModeArg::Caregiver => Some(Mode::Caregiver),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let directory = build_directory(&cli)?;
    let geo = GeoFilter::new(load_postal_table(cli.zip_table.as_deref()));

    let provider_model = ChatModel::new(
        ChatModelConfig::openai_from_env()
            .context("configuring provider model")?
            .with_system_prompt(PROVIDER_SYSTEM_PROMPT),
    )?;
    let caregiver_model = ChatModel::new(
        ChatModelConfig::groq_from_env()
            .context("configuring caregiver model")?
            .with_system_prompt(CAREGIVER_SYSTEM_PROMPT),
    )?;

    let providers =
        ProviderSearch::new(directory, provider_model, geo).context("compiling reply patterns")?;
    let caregiver = CaregiverCompanion::new(caregiver_model).context("compiling redaction rules")?;
    let navigator = Navigator::new(Router::default(), providers, caregiver);

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "care-navigator boot"
    );

    let explicit = cli.mode.explicit();
    if !cli.text.is_empty() {
        let text = cli.text.join(" ");
        println!("{}", navigator.respond(explicit, &text).await);
        return Ok(());
    }

    interactive(&navigator, explicit).await
}

fn build_directory(cli: &Cli) -> anyhow::Result<BoxedDirectory> {
    if let Some(path) = &cli.directory_file {
        info!(path = %path.display(), "using local provider directory");
        return Ok(Box::new(FileDirectory::new(path.clone())));
    }

    let config = DirectoryConfig {
        endpoint: cli.directory_url.clone(),
        timeout: Duration::from_secs(cli.timeout_secs),
    };
    let directory = HttpDirectory::new(&config)
        .with_context(|| format!("invalid directory endpoint {}", cli.directory_url))?;
    Ok(Box::new(directory))
}

fn load_postal_table(path: Option<&std::path::Path>) -> Option<PostalTable> {
    let path = path?;
    match PostalTable::from_geonames_file(path) {
        Ok(table) => {
            info!(path = %path.display(), zips = table.len(), "loaded postal table");
            Some(table)
        }
        Err(error) => {
            warn!(path = %path.display(), error = %error, "postal table unavailable; radius search disabled");
            None
        }
    }
}

async fn interactive(
    navigator: &Navigator<BoxedDirectory, ChatModel, ChatModel>,
    explicit: Option<Mode>,
) -> anyhow::Result<()> {
    println!("Care navigator ready. Describe a provider search or paste caregiver notes (Ctrl-D to exit).");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        println!("{}\n", navigator.respond(explicit, &line).await);
    }

    Ok(())
}
