use clap::Parser;
use tracing_subscriber::EnvFilter;

use pwstore::cli::{commands, Cli, Commands};

fn main() {
    // PWSTORE_LOG=pwstore=debug for verbose diagnostics. Secret values are
    // never logged at any level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PWSTORE_LOG")
                .unwrap_or_else(|_| EnvFilter::new("pwstore=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Reject nonsensical flag combinations before prompting for anything.
    if let Err(e) = cli.validate() {
        pwstore::cli::output::error(&e.to_string());
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Add { ref input_file } => commands::add::execute(&cli, input_file.as_deref()),
        Commands::Lookup { ref key } => commands::lookup::execute(&cli, key.as_deref()),
        Commands::Get => commands::get::execute(&cli),
        Commands::Remove => commands::remove::execute(&cli),
        Commands::Dump => commands::dump::execute(&cli),
        Commands::Init { sample } => commands::init::execute(&cli, sample),
        Commands::ChangePasswd => commands::change_passwd::execute(&cli),
        Commands::GenPasswd {
            ref url,
            ref username,
            no_store,
        } => commands::gen_passwd::execute(&cli, url.as_deref(), username.as_deref(), no_store),
        Commands::Merge {
            ref a,
            ref b,
            ref dest,
            include_a,
            include_b,
            report_duplicates,
        } => commands::merge::execute(a, b, dest, include_a, include_b, report_duplicates),
    };

    if let Err(e) = result {
        pwstore::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
