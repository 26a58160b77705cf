use clap::Parser;
use docqa_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    docqa_telemetry::init_with_format("docqa", cli.settings.log_format.into());
    docqa_cli::run(cli).await
}
