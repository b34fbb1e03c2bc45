use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use perch_core::dispatch;
use perch_core::runner::TaskRunner;
use perch_core::session::{SessionController, SubmitOutcome};
use perch_core::transcript::{ChatEntry, ChatRole};

#[derive(Parser)]
#[command(name = "perch")]
#[command(about = "Perch CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory, a default config, and the workspace.
    Init {
        /// Config file path (default: PERCH_CONFIG_PATH or ~/.perch/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// List the tools the agent can call.
    Tools {
        /// Config file path (default: PERCH_CONFIG_PATH or ~/.perch/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// List models available on the configured Ollama server.
    Models {
        /// Config file path (default: PERCH_CONFIG_PATH or ~/.perch/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Send one prompt to the agent and print the answer.
    Ask {
        /// Config file path (default: PERCH_CONFIG_PATH or ~/.perch/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// The prompt.
        prompt: Vec<String>,
    },

    /// Chat with the agent interactively. Type `exit` to quit.
    Chat {
        /// Config file path (default: PERCH_CONFIG_PATH or ~/.perch/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Version) => {
            println!("perch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Init { config }) => run_init(config),
        Some(Commands::Tools { config }) => run_tools(config),
        Some(Commands::Models { config }) => run_models(config),
        Some(Commands::Ask { config, prompt }) => run_ask(config, prompt.join(" ")),
        Some(Commands::Chat { config }) => run_chat(config),
        None => {
            println!("Run with --help for usage");
            Ok(())
        }
    };
    if let Err(e) = result {
        log::error!("{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(perch_core::config::default_config_path);
    let dir = perch_core::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn run_tools(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, path) = perch_core::config::load_config(config_path)?;
    let setup = perch_core::bootstrap::build_agent(&config, &path);
    println!("{}", setup.catalog.render_text());
    Ok(())
}

fn run_models(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, _) = perch_core::config::load_config(config_path)?;
    let client =
        perch_core::llm::OllamaClient::new(perch_core::config::resolve_ollama_url(&config));
    let rt = tokio::runtime::Runtime::new()?;
    let models = rt.block_on(client.list_models())?;
    if models.is_empty() {
        println!("no models found at {}", client.base_url());
    }
    for m in models {
        println!("{}", m.name);
    }
    Ok(())
}

fn new_session(config_path: Option<PathBuf>) -> anyhow::Result<SessionController> {
    let (config, path) = perch_core::config::load_config(config_path)?;
    let setup = perch_core::bootstrap::build_agent(&config, &path);
    // No frame loop here: the CLI blocks on the pending request instead of being woken.
    Ok(SessionController::new(
        setup.agent,
        TaskRunner::new(dispatch::no_wakeup()),
    ))
}

fn run_ask(config_path: Option<PathBuf>, prompt: String) -> anyhow::Result<()> {
    let mut session = new_session(config_path)?;
    match session.submit(&prompt) {
        SubmitOutcome::Started => {}
        SubmitOutcome::Empty => anyhow::bail!("prompt is empty"),
        SubmitOutcome::Exit | SubmitOutcome::Busy => return Ok(()),
    }
    session.wait(None);
    match session.chat().last() {
        Some(ChatEntry {
            role: ChatRole::Agent,
            text,
        }) => {
            println!("{}", text.trim());
            Ok(())
        }
        Some(ChatEntry {
            role: ChatRole::Error,
            text,
        }) => anyhow::bail!("agent failed: {}", text),
        _ => anyhow::bail!("no answer"),
    }
}

fn run_chat(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let mut session = new_session(config_path)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match session.submit(&line) {
            SubmitOutcome::Empty | SubmitOutcome::Busy => continue,
            SubmitOutcome::Exit => {
                if let Some(bye) = session.chat().last() {
                    println!("{}", bye);
                }
                break;
            }
            SubmitOutcome::Started => {}
        }
        session.wait(None);
        if let Some(entry) = session.chat().last() {
            match entry.role {
                ChatRole::Agent => println!("< {}", entry.text.trim()),
                _ => eprintln!("{}", entry),
            }
        }
    }

    Ok(())
}
