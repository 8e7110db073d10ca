//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments, resolves settings from every
//! configuration layer and runs the selected command.

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args as ClapArgs, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::core::app::{ChatSession, SessionOptions};
use crate::core::card::{CardContent, CardProvider, CardRecord, FileCardStore};
use crate::core::config::{Config, Settings};
use crate::core::i18n::Translator;
use crate::core::keyring;
use crate::core::transport::openai::OpenAiTransport;
use crate::core::transport::ChatTransport;
use crate::ui::terminal::{SharedConsole, TerminalSurface};

#[derive(Parser, Debug)]
#[command(name = "cardchat", version)]
#[command(about = "Chat with an AI model about a flashcard")]
#[command(
    long_about = "cardchat opens a chat about the flashcard you are reviewing. Replies stream \
in as they are generated and the conversation can be appended to the card's back side.\n\n\
Authentication:\n\
  Use 'cardchat auth' to store your API key in the system keyring.\n\n\
Environment Variables:\n\
  OPENAI_API_KEY    API key (overrides the keyring)\n\
  OPENAI_BASE_URL   API base URL or full chat completions endpoint\n\
  OPENAI_MODEL      Model name\n\
  CARDCHAT_LANG     Interface language (en, zh_CN, zh_TW, ja)\n\
  CARDCHAT_LOG      Log filter, e.g. cardchat=debug\n\n\
Chat Commands:\n\
  /save             Append the unsaved conversation to the card\n\
  /clear            Start over from the card\n\
  /quit             Leave the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use, overriding config and environment
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// API base URL, overriding config and environment
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Wait for the full reply instead of streaming it
    #[arg(long, global = true)]
    pub no_stream: bool,

    /// Show replies as plain text
    #[arg(long, global = true)]
    pub plain: bool,

    /// Log debug output to stderr
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,
}

#[derive(ClapArgs, Debug, Default, Clone)]
pub struct CardArgs {
    /// Card file (JSON with id, front and back); enables /save
    #[arg(long, value_name = "PATH", conflicts_with_all = ["front", "back"])]
    pub card: Option<PathBuf>,

    /// Front side of an ad-hoc card
    #[arg(long)]
    pub front: Option<String>,

    /// Back side of an ad-hoc card
    #[arg(long)]
    pub back: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat (default)
    Chat {
        #[command(flatten)]
        card: CardArgs,
        /// Write the transcript as an HTML page on exit
        #[arg(long, value_name = "PATH")]
        transcript: Option<PathBuf>,
    },
    /// Ask a single question and print the reply
    Ask {
        #[command(flatten)]
        card: CardArgs,
        /// The question
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// List chat models offered by the API
    Models,
    /// Check that the API key is accepted
    Check,
    /// Store the API key in the system keyring
    Auth {
        /// Remove the stored key instead
        #[arg(long)]
        remove: bool,
    },
    /// Set a configuration value, or show all values
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

impl Args {
    /// The command-line override layer.
    fn overrides(&self) -> Config {
        Config {
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            streaming: self.no_stream.then_some(false),
            markdown: self.plain.then_some(false),
            debug_mode: self.debug.then_some(true),
            ..Config::default()
        }
    }
}

fn init_logging(debug: bool, console: SharedConsole) {
    let filter = EnvFilter::try_from_env("CARDCHAT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if debug { "cardchat=debug" } else { "warn" })
    });
    // A second initialization (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(console)
        .with_target(false)
        .try_init();
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let overrides = args.overrides();
    let file = Config::load()?;
    let console = SharedConsole::new();
    init_logging(
        overrides.debug_mode.or(file.debug_mode).unwrap_or(false),
        console.clone(),
    );

    match args.command {
        Some(Commands::Auth { remove }) => run_auth(remove),
        Some(Commands::Set { key, value }) => run_set(file, key, value),
        Some(Commands::Unset { key }) => {
            let mut config = file;
            config.unset_value(&key)?;
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
        Some(Commands::Models) => {
            let settings = resolve_settings(&overrides, &file);
            settings.require_credentials()?;
            let transport = OpenAiTransport::new(&settings);
            for id in transport.list_models().await? {
                println!("{id}");
            }
            Ok(())
        }
        Some(Commands::Check) => {
            let settings = resolve_settings(&overrides, &file);
            settings.require_credentials()?;
            OpenAiTransport::new(&settings).validate_api_key().await?;
            println!("✅ API key accepted by {}", settings.base_url);
            Ok(())
        }
        Some(Commands::Ask { card, message }) => {
            let settings = resolve_settings(&overrides, &file);
            run_ask(&settings, &console, &card, &message.join(" ")).await
        }
        Some(Commands::Chat { card, transcript }) => {
            let settings = resolve_settings(&overrides, &file);
            run_chat(&settings, &console, &card, transcript).await
        }
        None => {
            let settings = resolve_settings(&overrides, &file);
            run_chat(&settings, &console, &CardArgs::default(), None).await
        }
    }
}

/// Overrides, then environment, then keyring, then the config file.
fn resolve_settings(overrides: &Config, file: &Config) -> Settings {
    let env = Config::from_env();
    let from_keyring = if env.api_key.is_some() || overrides.api_key.is_some() {
        Config::default()
    } else {
        Config::with_api_key(keyring::api_key_layer())
    };
    Settings::resolve(&[overrides, &env, &from_keyring, file])
}

fn open_card(args: &CardArgs) -> Result<(Option<CardContent>, Option<FileCardStore>), Box<dyn Error>> {
    if let Some(path) = &args.card {
        let store = FileCardStore::new(path);
        let card = store
            .current_card()
            .ok_or_else(|| format!("could not read card at {}", path.display()))?;
        debug!(card_id = card.id, "opened card file");
        return Ok((Some(card), Some(store)));
    }
    if args.front.is_none() && args.back.is_none() {
        return Ok((None, None));
    }
    let record = CardRecord {
        id: 0,
        front: args.front.clone().unwrap_or_default(),
        back: args.back.clone().unwrap_or_default(),
    };
    Ok((Some(record.content()), None))
}

fn new_session(
    settings: &Settings,
    console: &SharedConsole,
    card: Option<CardContent>,
) -> ChatSession<TerminalSurface> {
    let translator = Arc::new(Translator::detect(settings.language.as_deref()));
    let transport: Arc<dyn ChatTransport> = Arc::new(OpenAiTransport::new(settings));
    ChatSession::new(
        TerminalSurface::stdout_sharing(console),
        transport,
        translator,
        card,
        SessionOptions::from(settings),
    )
}

async fn run_ask(
    settings: &Settings,
    console: &SharedConsole,
    card: &CardArgs,
    message: &str,
) -> Result<(), Box<dyn Error>> {
    let (card, _) = open_card(card)?;
    let mut session = new_session(settings, console, card);
    session.ask(message).await?;
    Ok(())
}

async fn run_chat(
    settings: &Settings,
    console: &SharedConsole,
    card: &CardArgs,
    transcript: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let (card, store) = open_card(card)?;
    let mut session = new_session(settings, console, card);
    session.show_card_context();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear_chat();
                session.show_card_context();
            }
            "/save" => match &store {
                Some(store) => {
                    session.save_to_card(store);
                }
                None => eprintln!("⚠️  No card file is open; start with --card <PATH> to save"),
            },
            text => {
                if let Err(err) = session.ask(text).await {
                    debug!(error = %err, "message not sent");
                }
            }
        }
    }

    let summary = session.summary();
    debug!(
        total = summary.total_messages,
        user = summary.user_messages,
        assistant = summary.assistant_messages,
        "chat ended"
    );
    if let Some(path) = transcript {
        let page = session.surface().document().to_page("cardchat transcript");
        std::fs::write(&path, page)?;
        println!("Transcript written to {}", path.display());
    }
    Ok(())
}

fn run_auth(remove: bool) -> Result<(), Box<dyn Error>> {
    if remove {
        if keyring::delete_api_key()? {
            println!("✅ Removed the stored API key");
        } else {
            println!("No API key was stored");
        }
        return Ok(());
    }

    eprint!("API key: ");
    io::stderr().flush()?;
    let mut key = String::new();
    io::stdin().read_line(&mut key)?;
    let key = key.trim();
    if key.is_empty() {
        return Err("no API key entered".into());
    }
    keyring::store_api_key(key)?;
    println!("✅ API key stored in the system keyring");
    Ok(())
}

fn run_set(mut config: Config, key: Option<String>, value: Vec<String>) -> Result<(), Box<dyn Error>> {
    let Some(key) = key.filter(|_| !value.is_empty()) else {
        config.print_all();
        return Ok(());
    };
    let value = value.join(" ");
    config.set_value(&key, &value)?;
    config.save()?;
    println!("✅ Set {key} to: {value}");
    Ok(())
}
