use std::sync::Arc;

use clap::Parser;
use eventscout_core::{
    Config, ControllerEvent, DiscoveryRepository, Event, EventsController, FetchState,
    Subscription, MIN_SEARCH_QUERY_LEN,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "eventscout")]
#[command(version, about = "Browse and search live events from the terminal", long_about = None)]
struct Cli {
    /// Discovery API key (overrides the config file)
    #[arg(long, env = "EVENTSCOUT_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// How many pages to pull before stopping
    #[arg(long, default_value_t = 1, global = true)]
    pages: u32,

    /// Print events as JSON lines instead of a table
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// List upcoming events
    Browse,
    /// Search events by keyword
    Search {
        /// Search query (at least four characters)
        query: String,
    },
    /// Write the config file, storing --api-key if one was given
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "eventscout=debug"
    } else {
        "eventscout=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(command) = cli.command else {
        println!("No command specified. Try --help");
        return Ok(());
    };

    let mut config = Config::load()?;
    if let Some(key) = cli.api_key {
        config.api.api_key = Some(key);
    }

    let search_query = match command {
        Commands::Init => {
            config.save()?;
            println!("Config written to {}", Config::config_path()?.display());
            return Ok(());
        }
        Commands::Browse => None,
        Commands::Search { query } => Some(query),
    };

    let repository = DiscoveryRepository::from_config(&config)?;
    let controller = EventsController::new(Arc::new(repository));
    let mut events = controller.subscribe();
    let printer = Printer { json: cli.json };

    let first_in_flight = match search_query {
        None => {
            tracing::info!("Browsing events");
            false
        }
        Some(query) => {
            tracing::info!("Searching for: {}", query);
            if !controller.set_search_query(&query) {
                println!(
                    "Search queries need at least {} characters",
                    MIN_SEARCH_QUERY_LEN
                );
                return Ok(());
            }
            true
        }
    };

    let shown =
        show_pages(&controller, &mut events, cli.pages, first_in_flight, &printer).await?;
    if !cli.json {
        println!("{} events", shown);
    }

    Ok(())
}

/// Pull up to `pages` pages, printing whatever the controller appends
async fn show_pages(
    controller: &EventsController,
    events: &mut Subscription,
    pages: u32,
    first_in_flight: bool,
    printer: &Printer,
) -> anyhow::Result<usize> {
    let mut shown = 0;
    let mut in_flight = first_in_flight;

    for _ in 0..pages {
        if !in_flight && !controller.request_next_page() {
            break;
        }
        in_flight = false;

        while let Some(event) = events.recv().await {
            match event {
                ControllerEvent::EventsAppended(batch) => {
                    for item in &batch {
                        printer.print(item)?;
                    }
                    shown += batch.len();
                }
                ControllerEvent::ErrorOccurred(message) => eprintln!("{}", message),
                ControllerEvent::ExhaustedChanged(true) => {
                    tracing::info!("No more events");
                }
                ControllerEvent::LoadingChanged(false) => break,
                _ => {}
            }
        }

        if controller.snapshot().state == FetchState::Errored {
            break;
        }
    }

    Ok(shown)
}

struct Printer {
    json: bool,
}

impl Printer {
    fn print(&self, event: &Event) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(event)?);
            return Ok(());
        }

        let date = event
            .start_date()
            .map(|d| d.format("%a %d %b %Y").to_string())
            .unwrap_or_else(|| "TBA".to_string());
        println!("{} | {} | {}", event.name, date, event.venue_summary);
        Ok(())
    }
}
