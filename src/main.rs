use anyhow::{Context, Result};
use dotenvy::dotenv;
use pdf_analyst::backend::GeminiBackend;
use pdf_analyst::bot::handlers::{schema, Command};
use pdf_analyst::bot::{
    AccessGate, Conversation, ConversationSettings, DeliveryGateway, TelegramTransport,
};
use pdf_analyst::config::{Settings, UNAUTHORIZED_CACHE_MAX_SIZE, UNAUTHORIZED_COOLDOWN_SECS};
use pdf_analyst::session::SessionStore;
use pdf_analyst::translate::{GoogleTranslator, Localizer};
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting secrets from log output
struct RedactionPatterns {
    token_url: Regex,
    token_bare: Regex,
    key_param: Regex,
    google_key: Regex,
}

impl RedactionPatterns {
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token_url: Regex::new(r"(https?://[^/]+/(?:file/)?bot)([0-9]+:[A-Za-z0-9_-]+)")?,
            token_bare: Regex::new(r"[0-9]{8,10}:[A-Za-z0-9_-]{35}")?,
            key_param: Regex::new(r"([?&]key=)[^\s&]+")?,
            google_key: Regex::new(r"AIza[0-9A-Za-z_-]{35}")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let output = self.token_url.replace_all(input, "$1[TELEGRAM_TOKEN]");
        let output = self.token_bare.replace_all(&output, "[TELEGRAM_TOKEN]");
        let output = self.key_param.replace_all(&output, "$1[MASKED]");
        self.google_key
            .replace_all(&output, "[GEMINI_KEY]")
            .into_owned()
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        self.inner
            .write_all(self.patterns.redact(&s).as_bytes())?;
        // Report the original length; the redacted text may differ
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: (self.make_inner)(),
            patterns: self.patterns.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);
    init_logging(patterns);

    info!("Starting PDF analysis bot...");
    let settings = init_settings();

    let api_key = settings
        .gemini_api_key
        .clone()
        .context("GEMINI_API_KEY is not set")?;
    let timeout = Duration::from_secs(settings.llm_http_timeout_secs);
    let backend = Arc::new(GeminiBackend::new(
        api_key,
        settings.gemini_model.clone(),
        timeout,
    ));
    info!(model = %settings.gemini_model, "Gemini backend initialized.");

    let bot = Bot::new(settings.telegram_token.clone());
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }

    let conversation = Arc::new(init_conversation(&bot, &settings, backend));
    let gate = init_access_gate(&settings);

    info!("Bot is running...");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![conversation, gate])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.kind);
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter {
        make_inner: io::stderr,
        patterns,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_conversation(bot: &Bot, settings: &Settings, backend: Arc<GeminiBackend>) -> Conversation {
    let transport = Arc::new(TelegramTransport::new(bot.clone()));
    let gateway = DeliveryGateway::new(transport, settings.message_limit);

    let timeout = Duration::from_secs(settings.llm_http_timeout_secs);
    let translator = Arc::new(GoogleTranslator::new(timeout));
    let localizer = Localizer::new(translator, settings.translate_chunk_size);

    let conversation_settings = ConversationSettings {
        keep_messages: settings.keep_messages,
        language_confirm_delay: Duration::from_millis(settings.language_confirm_delay_ms),
    };
    info!(
        message_limit = settings.message_limit,
        keep_messages = settings.keep_messages,
        "Conversation initialized."
    );

    Conversation::new(
        gateway,
        backend,
        localizer,
        Arc::new(SessionStore::new()),
        conversation_settings,
    )
}

fn init_access_gate(settings: &Settings) -> Arc<AccessGate> {
    let allowed = settings.allowed_users();
    if allowed.is_empty() {
        warn!("ALLOWED_USERS is empty, the bot is open to everyone.");
    } else {
        info!(
            "Access limited to {} users (cooldown: {}s, max_size: {})",
            allowed.len(),
            UNAUTHORIZED_COOLDOWN_SECS,
            UNAUTHORIZED_CACHE_MAX_SIZE
        );
    }

    Arc::new(AccessGate::new(
        allowed,
        UNAUTHORIZED_COOLDOWN_SECS,
        UNAUTHORIZED_CACHE_MAX_SIZE,
    ))
}
