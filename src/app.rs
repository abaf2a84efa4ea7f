use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;

use tabwriter::TabWriter;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::mail::{self, Connector, Mail, MailData};

const BACKEND: &str = "imap";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

/// Everything the command line decided, fixed for the rest of the run.
#[derive(Clone, Debug)]
pub struct Options {
    pub verb: Option<String>,
    pub output: OutputFormat,
    pub config: Option<PathBuf>,
    pub folder: String,
    pub mail: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    List,
    Show,
    Folder,
}

impl FromStr for Verb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "list" => Ok(Verb::List),
            "show" => Ok(Verb::Show),
            "folder" => Ok(Verb::Folder),
            other => Err(Error::Validation(format!("unknown verb: {:?}", other))),
        }
    }
}

/// A verb together with the parameters it needs, already validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    List { folder: String },
    Show { folder: String, id: String },
    Folder,
}

impl Command {
    pub fn from_options(opts: &Options) -> Result<Self> {
        let verb: Verb = opts
            .verb
            .as_deref()
            .ok_or_else(|| Error::Validation("no verb specified. expected: list, show, folder".into()))?
            .parse()?;

        match verb {
            Verb::List => {
                if opts.folder.is_empty() {
                    return Err(Error::Validation("no folder specified".into()));
                }
                Ok(Command::List { folder: opts.folder.clone() })
            }
            Verb::Show => {
                if opts.mail.is_empty() {
                    return Err(Error::Validation("no mail id specified".into()));
                }
                if opts.folder.is_empty() {
                    return Err(Error::Validation("no folder specified".into()));
                }
                Ok(Command::Show {
                    folder: opts.folder.clone(),
                    id: opts.mail.clone(),
                })
            }
            Verb::Folder => Ok(Command::Folder),
        }
    }
}

/// Validates the command, connects and prints the result to stdout.
pub fn run(opts: &Options) -> Result<()> {
    let command = Command::from_options(opts)?;

    let path = opts
        .config
        .as_deref()
        .ok_or_else(|| Error::Config("no config file specified".into()))?;
    log::debug!("reading config from {}", path.display());
    let cfg = Config::load(path)?;

    let mut connector = mail::new_connector(BACKEND)?;
    connector.initialize(&cfg)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(&command, connector.as_mut(), opts.output, &mut out)?;
    out.flush()?;
    Ok(())
}

pub fn execute(
    command: &Command,
    connector: &mut dyn Connector,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::List { folder } => {
            let mails = connector.list_mails(folder)?;
            match format {
                OutputFormat::Json => write_json(out, &mails),
                OutputFormat::Text => write_mail_rows(out, &mails),
            }
        }
        Command::Show { folder, id } => {
            log::debug!("showing mail {} from {}", id, folder);
            let mail = connector.get_mail(folder, id)?;
            match format {
                OutputFormat::Json => write_json(out, &mail),
                OutputFormat::Text => write_mail(out, &mail),
            }
        }
        Command::Folder => {
            let folders = connector.list_folder()?;
            match format {
                OutputFormat::Json => write_json(out, &folders),
                OutputFormat::Text => {
                    for folder in &folders {
                        writeln!(out, "{}", folder)?;
                    }
                    Ok(())
                }
            }
        }
    }
}

fn write_json<T: serde::Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_mail_rows(out: &mut dyn Write, mails: &[Mail]) -> Result<()> {
    let mut tw = TabWriter::new(out).minwidth(0).padding(1);
    for m in mails {
        writeln!(
            tw,
            "{}\t{}\t{}\t{}",
            m.id,
            m.received.as_deref().unwrap_or_default(),
            m.from,
            m.subject
        )?;
    }
    tw.flush()?;
    Ok(())
}

fn write_mail(out: &mut dyn Write, m: &MailData) -> Result<()> {
    writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}\t{}",
        m.mail.id,
        m.mail.to.join(", "),
        m.mail.cc.join(", "),
        m.mail.received.as_deref().unwrap_or_default(),
        m.mail.from,
        m.mail.subject
    )?;
    write!(out, "{}", m.body)?;
    Ok(())
}
