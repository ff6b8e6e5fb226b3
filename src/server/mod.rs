pub mod api;
pub mod error;

use crate::cli::ServeArgs;
use crate::llm::{ ApiKey, GenerationConfig, GenerativeBackend };
use crate::llm::gemini::GeminiBackend;
use api::AppState;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use log::{ info, warn };

pub struct Server {
    host: String,
    port: u16,
    static_dir: String,
    state: AppState,
}

impl Server {
    pub fn new(args: &ServeArgs) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let api_key = ApiKey::from_option(args.gemini_api_key.clone());
        if api_key.is_none() {
            warn!("GEMINI_API_KEY is not set. /api/chat will answer 500 until it is configured.");
        }

        let generation = GenerationConfig {
            temperature: args.temperature,
            max_output_tokens: args.max_output_tokens,
        };
        let backend: Arc<dyn GenerativeBackend> = Arc::new(GeminiBackend::new(
            args.gemini_base_url.clone(),
            args.gemini_model.clone(),
            generation,
            Duration::from_secs(args.upstream_timeout_secs),
        )?);

        Ok(Self {
            host: args.host.clone(),
            port: args.port,
            static_dir: args.static_dir.clone(),
            state: AppState::new(backend, api_key, args.chat_rate_per_minute, args.port),
        })
    }

    /// Resolves `host` as a name or IP literal, so `localhost` and `::1` both work.
    pub async fn bind(&self) -> Result<TcpListener, Box<dyn Error + Send + Sync>> {
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await
            .map_err(|e| {
                format!(
                    "Failed to bind HTTP server to {}:{}: {}. Try a different port.",
                    self.host, self.port, e
                )
            })?;
        Ok(listener)
    }

    pub async fn run(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let listener = self.bind().await?;
        info!("Server is running on http://{}", listener.local_addr()?);

        let app = api::router(self.state, &self.static_dir);
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}

/// Longest prefix of `s` holding at most `max` characters.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::{ truncate_chars, Server };
    use crate::cli::{ Args, Command };
    use clap::Parser;

    fn serve_args(host: &str) -> crate::cli::ServeArgs {
        let args = Args::try_parse_from([
            "portfolio-chat", "serve", "--host", host, "--port", "0", "--gemini-api-key", "k",
        ]).unwrap();
        match args.command {
            Command::Serve(serve) => serve,
            Command::Chat(_) => panic!("expected serve"),
        }
    }

    #[tokio::test]
    async fn binds_hostnames_as_well_as_ip_literals() {
        for host in ["localhost", "127.0.0.1"] {
            let server = Server::new(&serve_args(host)).unwrap();
            let listener = server.bind().await.unwrap();
            let addr = listener.local_addr().unwrap();
            assert!(addr.ip().is_loopback(), "host {} bound {}", host, addr);
            assert_ne!(addr.port(), 0);
        }
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 2), "he");
        assert_eq!(truncate_chars("ääää", 3), "äää");
        assert_eq!(truncate_chars("", 0), "");
    }
}
