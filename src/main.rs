use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use magsearch::client::HttpSearchService;
use magsearch::config::{CONFIG, Overrides};
use magsearch::controller::{SearchController, SessionView};
use magsearch::data_models::Category;
use magsearch::repl;
use magsearch::terminal::{self, TerminalView};

#[derive(Parser)]
#[command(name = "magsearch", version, about = "Search magazine content from the terminal")]
struct Cli {
    /// Search server, e.g. http://localhost:8000 [env: SEARCH_SERVER_HOST]
    #[arg(long, global = true)]
    server: Option<String>,

    /// Endpoint path on the server [env: SEARCH_ENDPOINT]
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Request timeout in seconds [env: SEARCH_TIMEOUT_SECS]
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Log requests and state changes to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit filters and page through results interactively (default)
    Interactive {
        /// Never clear the screen when a new page arrives
        #[arg(long)]
        no_clear: bool,
    },
    /// Run one search and print a single page
    Query(QueryArgs),
}

#[derive(Args)]
struct QueryArgs {
    #[arg(default_value = "")]
    keyword: String,

    #[arg(long, default_value = "")]
    title: String,

    #[arg(long, default_value = "")]
    author: String,

    /// Repeat to select several categories
    #[arg(long = "category")]
    categories: Vec<Category>,

    /// Earliest publication date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Latest publication date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// 1-based page to print; stops at the last page available
    #[arg(long, default_value_t = 1)]
    page: u64,

    /// Print the page as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber (handles both tracing and log crate)
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let overrides = Overrides {
        server_host: cli.server,
        endpoint: cli.endpoint,
        timeout_secs: cli.timeout_secs,
    };
    let settings = CONFIG
        .resolve(&overrides)
        .context("invalid search client configuration")?;
    tracing::info!(
        "using {}{} (timeout {:?})",
        settings.server_host,
        settings.endpoint,
        settings.timeout
    );

    let service = Arc::new(
        HttpSearchService::from_settings(&settings).context("failed to build http client")?,
    );

    match cli.command.unwrap_or(Commands::Interactive { no_clear: false }) {
        Commands::Interactive { no_clear } => {
            let ansi = !no_clear && io::stdout().is_terminal();
            repl::run(service, ansi).await
        }
        Commands::Query(args) => run_query(service, args).await,
    }
}

async fn run_query(service: Arc<HttpSearchService>, args: QueryArgs) -> Result<()> {
    // intermediate pages are not printed
    let (mut controller, mut completions) =
        SearchController::new(service, TerminalView::new(io::sink(), false));

    controller.set_keyword(args.keyword);
    let filters = controller.filters_mut();
    filters.title = args.title;
    filters.author = args.author;
    filters.min_date = args.from;
    filters.max_date = args.to;
    for category in args.categories {
        if !filters.is_selected(category) {
            filters.toggle_category(category);
        }
    }

    let reached = controller
        .load_page(&mut completions, args.page)
        .await
        .context("query did not complete")?;
    if reached < args.page {
        tracing::warn!("only {reached} page(s) available, showing the last one");
    }

    let session = controller.session();
    if args.json {
        terminal::write_json(&mut io::stdout().lock(), session)?;
    } else {
        TerminalView::stdout(false).render(session);
    }
    Ok(())
}
