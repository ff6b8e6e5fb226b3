use clap::Parser;
use dotenv::dotenv;
use portfolio_chat::cli::{ Args, Command };
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    let args = Args::parse();

    // The terminal chat shares stdout with the conversation, so keep it quiet by default.
    let default_filter = match args.command {
        Command::Serve(_) => "info",
        Command::Chat(_) => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    portfolio_chat::run(args).await
}
