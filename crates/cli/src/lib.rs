pub mod bootstrap;
pub mod commands;
pub mod logging;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use aether_chat::blocks::error_message;
use aether_chat::TerminalPainter;
use aether_core::config::{AppConfig, ConfigOverrides, DialogueEngineKind, LoadOptions};
use clap::{Parser, Subcommand};
use tracing::error;

use crate::commands::recommend::RecommendArgs;
use crate::commands::{CommandResult, EXIT_BAD_INPUT};

#[derive(Debug, Parser)]
#[command(
    name = "aether",
    about = "Aether insurance advisor",
    long_about = "Chat with the Aether insurance assistant, evaluate recommendation rules directly, and inspect configuration.",
    after_help = "Examples:\n  aether chat\n  aether recommend education --child-age 5 --level elementary\n  aether render \"Picks: [{'name': 'A', 'description': 'B'}]\" --json"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Config file (default: aether.toml or config/aether.toml)"
    )]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Dialogue engine: offline, openai or ollama")]
    engine: Option<DialogueEngineKind>,
    #[arg(long, global = true, help = "Model name sent to the dialogue engine")]
    model: Option<String>,
    #[arg(long, global = true, help = "Base URL of an OpenAI-compatible endpoint")]
    base_url: Option<String>,
    #[arg(long, global = true, help = "Session user id")]
    user_id: Option<String>,
    #[arg(long, global = true, help = "Session id")]
    session_id: Option<String>,
    #[arg(long, global = true, help = "Log level written to stderr")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Disable colored terminal output")]
    no_color: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive chat session")]
    Chat,
    #[command(about = "Evaluate one recommendation rule and print its JSON result")]
    Recommend {
        #[command(subcommand)]
        rule: RuleCommand,
    },
    #[command(about = "Render assistant text as narrative and product cards")]
    Render {
        #[arg(help = "Text to render; read from stdin when omitted")]
        text: Option<String>,
        #[arg(long, help = "Emit the rendered blocks as JSON")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "List recommendation tools with their argument schemas")]
    Tools,
}

#[derive(Debug, Subcommand)]
enum RuleCommand {
    Health {
        #[arg(long, help = "individual or family")]
        target: String,
        #[arg(long, help = "Include critical illness cover")]
        critical_illness: bool,
    },
    Education {
        #[arg(long)]
        child_age: u32,
        #[arg(long = "level", help = "elementary, middle, high or university")]
        education_level: String,
    },
    Retirement {
        #[arg(long)]
        current_age: u32,
        #[arg(long = "target-age")]
        target_retirement_age: u32,
    },
    Investment {
        #[arg(long = "risk", help = "conservative, moderate or aggressive")]
        risk_profile: String,
    },
}

impl From<RuleCommand> for RecommendArgs {
    fn from(command: RuleCommand) -> Self {
        match command {
            RuleCommand::Health { target, critical_illness } => {
                Self::Health { target, critical_illness }
            }
            RuleCommand::Education { child_age, education_level } => {
                Self::Education { child_age, education_level }
            }
            RuleCommand::Retirement { current_age, target_retirement_age } => {
                Self::Retirement { current_age, target_retirement_age }
            }
            RuleCommand::Investment { risk_profile } => Self::Investment { risk_profile },
        }
    }
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                dialogue_engine: self.engine,
                dialogue_model: self.model.clone(),
                dialogue_base_url: self.base_url.clone(),
                dialogue_api_key: None,
                session_user_id: self.user_id.clone(),
                session_id: self.session_id.clone(),
                log_level: self.log_level.clone(),
            },
        }
    }

    fn painter(&self) -> TerminalPainter {
        let color = !self.no_color && io::stdout().is_terminal();
        TerminalPainter::with_color(color)
    }
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();
    let painter = cli.painter();

    // Commands that need a valid config report load errors themselves.
    let logging_config = AppConfig::load(options.clone()).unwrap_or_default();
    logging::init(&logging_config);

    let result = match cli.command {
        Command::Chat => return chat(options, painter).await,
        Command::Recommend { rule } => commands::recommend::run(rule.into()),
        Command::Render { text, json } => match text.map(Ok).unwrap_or_else(read_stdin) {
            Ok(text) => commands::render::run(&text, json, &painter),
            Err(error) => {
                CommandResult::failure("render", "io", error.to_string(), EXIT_BAD_INPUT)
            }
        },
        Command::Config => commands::config::run(options),
        Command::Tools => commands::tools::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

async fn chat(options: LoadOptions, painter: TerminalPainter) -> ExitCode {
    let mut app = match bootstrap::bootstrap(options, painter.clone()).await {
        Ok(app) => app,
        Err(error) => {
            error!(
                event_name = "system.bootstrap.failed",
                correlation_id = "bootstrap",
                error = %error,
                "application bootstrap failed"
            );
            let interface = error.into_interface();
            eprint!(
                "{}",
                painter.paint(&error_message(interface.user_message(), interface.correlation_id()))
            );
            return ExitCode::from(EXIT_BAD_INPUT);
        }
    };

    match commands::chat::run(&mut app).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("chat session ended with an error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn read_stdin() -> io::Result<String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}
