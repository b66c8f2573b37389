use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ChatKind;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use boorubot::config::Config;
use boorubot::searchbot::engine::{EngineSettings, Reply, SearchEngine};
use boorubot::searchbot::gateway::{GatewaySettings, Media, PhilomenaClient};
use boorubot::searchbot::store::{GroupDefaults, GroupStore};
use boorubot::searchbot::telegram::TelegramClient;

struct BotState {
    config: Config,
    telegram: TelegramClient,
    engine: SearchEngine<PhilomenaClient>,
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    /// Search the booru by tags, or by image when one is attached or quoted.
    Search(String),
    /// Configure group search behavior (admins only).
    Configure(String),
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "boorubot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("boorubot.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting boorubot...");
    info!("Loaded config from {config_path}");
    info!("API host: {}", config.api_host);

    let gateway = match PhilomenaClient::new(GatewaySettings {
        host: config.api_host.clone(),
        api_key: config.api_key.clone(),
        filter_id: config.filter_id,
        verbose_errors: config.show_error_log,
        timeout: config.request_timeout,
        proxy: config.proxy.clone(),
    }) {
        Ok(gateway) => gateway,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let store = GroupStore::load_or_new(&config.data_dir.join("groups.db"));
    let engine = SearchEngine::new(
        EngineSettings {
            default_tags: config.default_tags.clone(),
            group_defaults: GroupDefaults {
                enabled: config.enabled_by_default,
                use_global_tags: config.use_global_tags_by_default,
            },
        },
        store,
        gateway,
    );

    let state = Arc::new(BotState {
        telegram: TelegramClient::new(bot.clone()),
        config,
        engine,
    });

    let handler = Update::filter_message()
        .filter_command::<Command>()
        .endpoint(handle_command);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_command(
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    // Search is group-scoped; ignore DMs and channels.
    if !matches!(msg.chat.kind, ChatKind::Public(_)) {
        return Ok(());
    }
    if !state.config.is_group_allowed(msg.chat.id) {
        return Ok(());
    }

    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let chat_id = msg.chat.id.0;
    let user_id = user.id.0 as i64;
    let reply_to = Some(msg.id.0 as i64);

    let reply = match cmd {
        Command::Search(args) => {
            let image_url = match attached_image_url(&state.telegram, &msg).await {
                Ok(url) => url,
                Err(e) => {
                    warn!("Failed to resolve attached image: {e}");
                    None
                }
            };
            state.engine.handle_search(chat_id, &args, image_url.as_deref()).await
        }
        Command::Configure(args) => {
            match state.telegram.is_chat_admin(chat_id, user_id).await {
                Ok(true) => state.engine.handle_configure(chat_id, user_id, &args).await,
                Ok(false) => Reply::text("Only group admins can configure search."),
                Err(e) => {
                    warn!("Admin check failed: {e}");
                    Reply::text("Could not verify admin status, try again.")
                }
            }
        }
    };

    deliver_reply(&state.telegram, chat_id, reply_to, reply).await;
    Ok(())
}

/// Find an image attached to the command message or the message it replies
/// to (the quoted message takes priority), and resolve it to a URL.
async fn attached_image_url(
    telegram: &TelegramClient,
    msg: &Message,
) -> Result<Option<String>, String> {
    let photo = msg
        .reply_to_message()
        .and_then(|reply| reply.photo())
        .or_else(|| msg.photo());

    // Telegram orders photo sizes ascending; take the largest.
    let Some(photo) = photo.and_then(|sizes| sizes.last()) else {
        return Ok(None);
    };

    telegram.file_url(&photo.file.id.0).await.map(Some)
}

async fn deliver_reply(telegram: &TelegramClient, chat_id: i64, reply_to: Option<i64>, reply: Reply) {
    if !reply.text.is_empty() {
        if let Err(e) = telegram.send_message(chat_id, &reply.text, reply_to).await {
            warn!("Failed to deliver reply text: {e}");
        }
    }

    for media in &reply.media {
        let result = match media {
            Media::Still(url) => telegram.send_photo_url(chat_id, url, reply_to).await,
            Media::Video(url) => telegram.send_video_url(chat_id, url, reply_to).await,
        };
        if let Err(e) = result {
            warn!("Failed to deliver media: {e}");
        }
    }
}
