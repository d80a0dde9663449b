use augur::adapter::inbound::cli::{self, command::Cli};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = Cli::parse();
    cli::run(args)
        .await
        .map_err(|error| anyhow::anyhow!(cli::describe(&error)))
}
