use clap::{ Parser, Subcommand };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the portfolio site and the chat proxy.
    Serve(ServeArgs),
    /// Chat with the assistant from the terminal through a running proxy.
    Chat(ChatArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    // --- Listener Args ---
    /// Interface the HTTP server binds to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the HTTP server listens on.
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Directory holding the static site. Unknown paths fall back to its index.html.
    #[arg(long, env = "STATIC_DIR", default_value = "public")]
    pub static_dir: String,

    // --- Upstream Args ---
    /// Gemini API key. Without it the server still runs but /api/chat answers 500.
    #[arg(long, env = "GEMINI_API_KEY")]
    pub gemini_api_key: Option<String>,

    /// Base URL of the Gemini REST API (e.g., https://generativelanguage.googleapis.com/v1beta)
    #[arg(long, env = "GEMINI_BASE_URL")] // No default, let the backend handle it if None
    pub gemini_base_url: Option<String>,

    /// Gemini model name (e.g., gemini-flash-latest)
    #[arg(long, env = "GEMINI_MODEL")]
    pub gemini_model: Option<String>,

    /// Sampling temperature sent with every request.
    #[arg(long, env = "GEMINI_TEMPERATURE", default_value = "0.7")]
    pub temperature: f32,

    /// Output token budget sent with every request.
    #[arg(long, env = "GEMINI_MAX_OUTPUT_TOKENS", default_value = "1000")]
    pub max_output_tokens: u32,

    /// Timeout in seconds for a single upstream call.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value = "30")]
    pub upstream_timeout_secs: u64,

    // --- Limits ---
    /// Process-wide cap on /api/chat requests per minute. 0 disables the limiter.
    #[arg(long, env = "CHAT_RATE_PER_MINUTE", default_value = "0")]
    pub chat_rate_per_minute: u32,
}

#[derive(Parser, Debug, Clone)]
pub struct ChatArgs {
    /// Base URL of a running proxy server.
    #[arg(long, env = "CHAT_SERVER_URL", default_value = "http://localhost:3000")]
    pub server_url: String,

    /// File the conversation history is persisted to between sessions.
    #[arg(long, env = "CHAT_HISTORY_FILE", default_value = ".chat_history.json")]
    pub history_file: String,

    /// Keep the conversation in memory only; nothing is read from or written to disk.
    #[arg(long, env = "CHAT_EPHEMERAL", default_value = "false")]
    pub ephemeral: bool,

    /// Persona configuration (system prompt, greeting, quick replies).
    #[arg(long, env = "PERSONA_PATH", default_value = "json/persona.json")]
    pub persona_path: String,

    /// Number of most recent messages sent along with each turn.
    #[arg(long, env = "CHAT_HISTORY_LIMIT", default_value_t = crate::client::DEFAULT_HISTORY_LIMIT)]
    pub history_limit: usize,

    /// Timeout in seconds for a single proxy call.
    #[arg(long, env = "CHAT_TIMEOUT_SECS", default_value = "60")]
    pub timeout_secs: u64,
}
