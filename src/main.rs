use anyhow::{anyhow, Context, Result};
use clap::Parser;
use env_logger::Env;
use std::io::Write;
use std::path::PathBuf;

mod app;
mod config;
mod error;
mod mail;

use app::{Options, OutputFormat};

/// Inspect an IMAP mailbox from the command line.
#[derive(Parser, Debug)]
#[command(name = "mailpeek", version, about)]
struct Cli {
    /// One of: list, show, folder
    verb: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "json", env = "MAILPEEK_OUTPUT")]
    output: OutputFormat,

    /// Path to the config file (TOML, or JSON when it ends in .json)
    #[arg(long, env = "MAILPEEK_CONFIG")]
    config: Option<PathBuf>,

    /// Folder to list or read from
    #[arg(long, default_value = "INBOX")]
    folder: String,

    /// Id of the mail to show
    #[arg(long, default_value = "")]
    mail: String,

    /// Enable debug output
    #[arg(long, env = "MAILPEEK_DEBUG")]
    debug: bool,
}

impl Cli {
    fn into_options(self) -> Options {
        Options {
            verb: self.verb,
            output: self.output,
            config: self.config,
            folder: self.folder,
            mail: self.mail,
        }
    }
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[MAILPEEK] {} {} {}",
                buf.timestamp(),
                record.level(),
                record.args()
            )
        })
        .init();
}

async fn run(options: Options) -> Result<()> {
    tokio::task::spawn_blocking(move || app::run(&options))
        .await
        .map_err(|e| anyhow!("command aborted: {}", e))?
        .context("mailpeek failed")
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);
    log::debug!("starting mailpeek");

    if let Err(e) = run(cli.into_options()).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
