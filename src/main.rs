use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parkr::clock::SystemClock;
use parkr::logging;
use parkr::models::{Quote, Registry, VehicleId};
use parkr::storage::{Config, ConfigStorage, FileStore, TomlConfigStorage, ensure_directories};
use parkr::ui;

#[derive(Parser)]
#[command(name = "parkr")]
#[command(about = "Parking lot registry and billing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a vehicle entering the lot
    Register {
        plate: String,
        brand: String,
        model: String,
        color: String,
    },

    /// Show parked vehicles with live elapsed time and cost
    List {
        /// Redraw the listing every SECS seconds (default 1) until interrupted
        #[arg(short, long, value_name = "SECS", num_args = 0..=1, default_missing_value = "1")]
        watch: Option<u64>,
    },

    /// Show the current charge for a vehicle without checking it out
    Quote(Target),

    /// Bill a vehicle and remove it from the lot
    Checkout {
        #[command(flatten)]
        target: Target,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show occupancy and accrued fees
    Stats,
}

/// Which vehicle to act on
#[derive(Args)]
#[group(required = true, multiple = false)]
struct Target {
    /// Position in the current listing (shifts as vehicles leave)
    position: Option<usize>,

    /// Ticket id shown in the listing (stable)
    #[arg(long)]
    id: Option<u64>,
}

/// Everything a command needs, built once per invocation
struct Session {
    registry: Registry,
    store: Arc<FileStore>,
    config: Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut session = open_session()?;

    match cli.command {
        Some(Commands::Register {
            plate,
            brand,
            model,
            color,
        }) => cmd_register(&mut session, &plate, &brand, &model, &color),
        Some(Commands::List { watch: Some(secs) }) => cmd_watch(&session, secs),
        Some(Commands::List { watch: None }) | None => cmd_list(&session),
        Some(Commands::Quote(target)) => cmd_quote(&session, &target),
        Some(Commands::Checkout { target, yes }) => cmd_checkout(&mut session, &target, yes),
        Some(Commands::Stats) => cmd_stats(&session),
    }
}

/// Load config, start logging and restore the registry
fn open_session() -> Result<Session> {
    let (data_dir, config_dir) = ensure_directories()?;

    let config_storage = TomlConfigStorage::new(config_dir.join("parkr.toml"));
    let config = config_storage.load()?;

    init_logging(&config, &data_dir);

    let store = Arc::new(FileStore::new(data_dir));
    let registry = Registry::open(store.clone(), Arc::new(SystemClock))
        .with_policy(config.billing.policy());

    Ok(Session {
        registry,
        store,
        config,
    })
}

fn init_logging(config: &Config, data_dir: &std::path::Path) {
    let general = &config.general;
    if general.log_to_file {
        match logging::init_logger(
            data_dir.join("parkr.log"),
            &general.log_level,
            &general.console_level,
        ) {
            Ok(()) => return,
            Err(e) => eprintln!("warning: file logging unavailable: {:#}", e),
        }
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(general.console_level.as_str()),
    )
    .init();
}

fn cmd_register(
    session: &mut Session,
    plate: &str,
    brand: &str,
    model: &str,
    color: &str,
) -> Result<()> {
    let vehicle = session.registry.register(plate, brand, model, color)?;
    print!("{}", ui::render_registered(&vehicle));
    Ok(())
}

fn cmd_list(session: &Session) -> Result<()> {
    let rows = session.registry.list();
    print!(
        "{}",
        ui::render_table(&rows, &session.config.billing.currency)
    );
    Ok(())
}

/// Redraw the listing periodically; re-reads the snapshot each tick so
/// registrations and checkouts from other invocations show up
fn cmd_watch(session: &Session, secs: u64) -> Result<()> {
    let interval = Duration::from_secs(secs.max(1));
    let policy = session.config.billing.policy();
    let currency = &session.config.billing.currency;

    loop {
        let registry =
            Registry::open(session.store.clone(), Arc::new(SystemClock)).with_policy(policy);

        // Clear screen and home the cursor
        print!("\x1B[2J\x1B[H");
        print!("{}", ui::render_table(&registry.list(), currency));
        println!();
        println!(
            "Refreshing every {}s, press Ctrl-C to stop",
            interval.as_secs()
        );
        io::stdout().flush().context("Failed to flush stdout")?;

        thread::sleep(interval);
    }
}

fn resolve_quote(registry: &Registry, target: &Target) -> Result<Quote> {
    let quote = match (target.position, target.id) {
        (_, Some(id)) => registry.quote_id(VehicleId(id))?,
        (Some(position), None) => registry.quote(position)?,
        (None, None) => anyhow::bail!("Specify a position or --id"),
    };
    Ok(quote)
}

fn cmd_quote(session: &Session, target: &Target) -> Result<()> {
    let quote = resolve_quote(&session.registry, target)?;
    print!(
        "{}",
        ui::render_quote(&quote, &session.config.billing.currency)
    );
    Ok(())
}

fn cmd_checkout(session: &mut Session, target: &Target, yes: bool) -> Result<()> {
    let currency = session.config.billing.currency.clone();
    let quote = resolve_quote(&session.registry, target)?;

    if !yes {
        print!("{}", ui::render_quote(&quote, &currency));
        if !confirm("Confirm checkout?")? {
            println!("Checkout cancelled.");
            return Ok(());
        }
    }

    // Remove by ticket id: the position may have been resolved from a stale listing
    let receipt = session.registry.remove_id(quote.vehicle.id())?;
    print!("{}", ui::render_receipt(&receipt, &currency));
    Ok(())
}

fn cmd_stats(session: &Session) -> Result<()> {
    let stats = session.registry.stats();
    print!(
        "{}",
        ui::render_stats(&stats, &session.config.billing.currency)
    );
    Ok(())
}

/// Ask a yes/no question on stdin, defaulting to no
fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch_of(args: &[&str]) -> Option<u64> {
        match Cli::try_parse_from(args).unwrap().command {
            Some(Commands::List { watch }) => watch,
            _ => panic!("expected list command"),
        }
    }

    #[test]
    fn test_list_watch_flag() {
        assert_eq!(watch_of(&["parkr", "list"]), None);
        assert_eq!(watch_of(&["parkr", "list", "--watch"]), Some(1));
        assert_eq!(watch_of(&["parkr", "list", "--watch", "5"]), Some(5));
        assert_eq!(watch_of(&["parkr", "list", "-w", "3"]), Some(3));
        assert!(Cli::try_parse_from(["parkr", "list", "--watch", "soon"]).is_err());
    }
}
