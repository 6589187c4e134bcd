mod activity;
mod auth;
mod cli;
mod dates;
mod db;
mod error;
mod export;
mod fmt;
mod guard;
mod maintenance;
mod models;
#[cfg(feature = "pdf")]
mod pdf;
mod reports;
mod resets;
mod roles;
mod settings;
mod store;
mod subscription;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, MaintenanceCommands, ResetsCommands, UsersCommands};

const LOG_ENV: &str = "FLEETDESK_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn dispatch(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init {
            data_dir,
            organization,
            utc_offset,
            page_size,
        } => cli::init::run(data_dir, organization, utc_offset, page_size)?,
        Commands::Import { file, collection } => cli::import::run(&file, &collection)?,
        Commands::Report {
            from_date,
            to_date,
            page,
        } => cli::report::run(from_date, to_date, page)?,
        Commands::Export {
            from_date,
            to_date,
            format,
            output,
        } => cli::export::run(from_date, to_date, &format, output)?,
        Commands::Logs {
            search,
            from_date,
            to_date,
        } => cli::logs::run(search, from_date, to_date)?,
        Commands::Resets { command } => match command {
            ResetsCommands::List { search } => cli::resets::list(search)?,
            ResetsCommands::Approve { id, email } => cli::resets::approve(&id, email)?,
            ResetsCommands::Decline { id } => cli::resets::decline(&id)?,
        },
        Commands::Maintenance { command } => match command {
            MaintenanceCommands::Show => cli::maintenance::show()?,
            MaintenanceCommands::Set { mode, message } => cli::maintenance::set(&mode, &message)?,
        },
        Commands::Users { command } => match command {
            UsersCommands::Add { email, role, name } => cli::users::add(&email, &role, name)?,
            UsersCommands::List => cli::users::list()?,
        },
        Commands::Login { email, route } => cli::login::run(&email, route)?,
        Commands::Backup { output } => cli::backup::run(output)?,
        Commands::Status => cli::status::run()?,
    }
    Ok(())
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli.command) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
