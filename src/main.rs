use clap::Parser;
use acdkn_store::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let session = cli::bootstrap(cli.config.as_deref()).await?;

    match cli.command {
        Command::Check => cli::check::run(&session).await,
        Command::Get { id } => cli::units::get(&session, &id).await,
        Command::Delete { id } => cli::units::delete(&session, &id).await,
        Command::List { domain } => cli::units::list(&session, &domain).await,
    }
}
