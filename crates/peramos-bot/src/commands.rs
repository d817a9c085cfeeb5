//! Inbound command routing and the fixed reply texts.

pub const WELCOME_TEXT: &str = "👋 Welcome to Nea Peramos Weather Bot!\n\n\
    Available commands:\n\
    /weather - Get current weather data\n\
    /status - Check bot status\n\
    /help - Show this help message\n\
    /about - About this bot";

pub const HELP_TEXT: &str = "📚 Help\n\n\
    Simply send any message or use:\n\
    /weather - to get the current weather data\n\
    /status - to check the bot status\n\
    /about - to learn more about this bot";

pub const ABOUT_TEXT: &str = "ℹ️ About\n\n\
    This bot provides real-time weather data from \
    the Nea Peramos weather station.\n\n\
    Data source: penteli.meteo.gr";

pub const FETCHING_TEXT: &str = "🔄 Fetching weather data...";

pub const NON_TEXT_REPLY: &str = "⚠️ Please send a text message to get weather data.";

/// What an inbound text message asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    About,
    Status,
    /// Anything else, including `/weather`
    Weather,
}

impl Command {
    /// Case-insensitive; only the first word counts and an `@botname`
    /// suffix is ignored, so `/Start@PeramosBot now` is [`Command::Start`].
    pub fn parse(text: &str) -> Self {
        let first = text.split_whitespace().next().unwrap_or_default();
        let name = first.split('@').next().unwrap_or_default().to_lowercase();

        match name.as_str() {
            "/start" => Command::Start,
            "/help" => Command::Help,
            "/about" => Command::About,
            "/status" => Command::Status,
            _ => Command::Weather,
        }
    }

    /// Reply for commands whose text never changes.
    pub fn static_reply(&self) -> Option<&'static str> {
        match self {
            Command::Start => Some(WELCOME_TEXT),
            Command::Help => Some(HELP_TEXT),
            Command::About => Some(ABOUT_TEXT),
            Command::Status | Command::Weather => None,
        }
    }
}

/// Body of the /status reply
pub fn status_text(memory_mb: Option<f64>) -> String {
    match memory_mb {
        Some(mb) => format!("🤖 Bot Status\n✅ Running\n📊 Memory: {:.1}MB", mb),
        None => "🤖 Bot Status\n✅ Running".to_string(),
    }
}
