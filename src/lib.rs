pub mod cli;
pub mod client;
pub mod config;
pub mod llm;
pub mod models;
pub mod server;

use cli::{ Args, Command };
use log::info;
use server::Server;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command {
        Command::Serve(serve) => {
            info!("--- Core Configuration ---");
            info!("Listen Address: {}:{}", serve.host, serve.port);
            info!("Static Directory: {}", serve.static_dir);
            info!(
                "Gemini Base URL: {}",
                serve.gemini_base_url.as_deref().unwrap_or(llm::gemini::DEFAULT_BASE_URL)
            );
            info!("Gemini Model: {}", serve.gemini_model.as_deref().unwrap_or(llm::gemini::DEFAULT_MODEL));
            let has_key = serve.gemini_api_key.as_deref().is_some_and(|k| !k.trim().is_empty());
            info!("Gemini API Key: {}", if has_key { "configured" } else { "NOT configured" });
            info!("Temperature: {}", serve.temperature);
            info!("Max Output Tokens: {}", serve.max_output_tokens);
            info!("Upstream Timeout (s): {}", serve.upstream_timeout_secs);
            if serve.chat_rate_per_minute > 0 {
                info!("Chat Rate Limit: {}/min", serve.chat_rate_per_minute);
            } else {
                info!("Chat Rate Limit: disabled");
            }
            info!("-------------------------");

            let server = Server::new(&serve)?;
            server.run().await?;
        }
        Command::Chat(chat) => {
            client::terminal::run(&chat).await?;
        }
    }

    Ok(())
}
