use native_tls::TlsConnector;
use std::io::{Read, Write};

use crate::config::{Config, ImapConfig};
use crate::error::{Error, Result};

use super::connector::Connector;
use super::{parse, pipeline, Mail, MailData};

const FETCH_QUERY: &str = "(UID BODY.PEEK[])";
const MESSAGE_QUEUE: usize = 1;
const MAILBOX_QUEUE: usize = 10;

/// One FETCH response, copied out of the session's buffers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchedMessage {
    pub uid: Option<u32>,
    pub body: Option<Vec<u8>>,
}

/// The protocol calls the connector needs from an authenticated session.
#[cfg_attr(test, mockall::automock)]
pub trait MailSession {
    /// Selects `folder` read-only and returns its message count.
    fn examine(&mut self, folder: &str) -> Result<u32>;

    fn fetch(&mut self, sequence_set: &str, query: &str) -> Result<Vec<FetchedMessage>>;

    fn uid_fetch(&mut self, uid_set: &str, query: &str) -> Result<Vec<FetchedMessage>>;

    /// Every mailbox name visible to the user, as the server reports them.
    fn list_names(&mut self) -> Result<Vec<String>>;
}

impl<T: Read + Write> MailSession for ::imap::Session<T> {
    fn examine(&mut self, folder: &str) -> Result<u32> {
        Ok(::imap::Session::examine(self, folder)?.exists)
    }

    fn fetch(&mut self, sequence_set: &str, query: &str) -> Result<Vec<FetchedMessage>> {
        let fetches = ::imap::Session::fetch(self, sequence_set, query)?;
        Ok(fetches.iter().map(to_owned_fetch).collect())
    }

    fn uid_fetch(&mut self, uid_set: &str, query: &str) -> Result<Vec<FetchedMessage>> {
        let fetches = ::imap::Session::uid_fetch(self, uid_set, query)?;
        Ok(fetches.iter().map(to_owned_fetch).collect())
    }

    fn list_names(&mut self) -> Result<Vec<String>> {
        let names = self.list(Some(""), Some("*"))?;
        Ok(names.iter().map(|n| n.name().to_string()).collect())
    }
}

fn to_owned_fetch(f: &::imap::types::Fetch) -> FetchedMessage {
    FetchedMessage {
        uid: f.uid,
        body: f.body().map(<[u8]>::to_vec),
    }
}

fn is_localhost(host: &str) -> bool {
    host == "127.0.0.1" || host == "localhost"
}

fn tls_connector_for(cfg: &ImapConfig) -> Result<TlsConnector> {
    let mut b = TlsConnector::builder();

    if is_localhost(&cfg.host) {
        b.danger_accept_invalid_certs(true);
        b.danger_accept_invalid_hostnames(true);
    }

    b.build().map_err(|e| Error::Connection(format!("tls setup failed: {}", e)))
}

fn connect(cfg: &ImapConfig) -> Result<impl MailSession + Send> {
    let tls = tls_connector_for(cfg)?;
    log::debug!("connecting to {}:{} (starttls: {})", cfg.host, cfg.port, cfg.starttls);

    let addr = (cfg.host.as_str(), cfg.port);
    let client = if cfg.starttls {
        ::imap::connect_starttls(addr, &cfg.host, &tls)
    } else {
        ::imap::connect(addr, &cfg.host, &tls)
    }
    .map_err(|e| Error::Connection(format!("cannot reach {}:{}: {}", cfg.host, cfg.port, e)))?;

    let session = client
        .login(&cfg.username, &cfg.password)
        .map_err(|(e, _)| Error::Connection(format!("login as {} failed: {}", cfg.username, e)))?;

    log::debug!("logged in as {}", cfg.username);
    Ok(session)
}

enum State {
    Unconnected,
    Authenticated(Box<dyn MailSession + Send>),
    Failed,
}

/// IMAP backend. Every folder is opened read-only.
pub struct ImapConnector {
    state: State,
}

impl Default for ImapConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl ImapConnector {
    pub fn new() -> Self {
        Self { state: State::Unconnected }
    }

    #[cfg(test)]
    fn with_session(session: impl MailSession + Send + 'static) -> Self {
        Self { state: State::Authenticated(Box::new(session)) }
    }

    fn session(&mut self) -> Result<&mut (dyn MailSession + Send)> {
        match &mut self.state {
            State::Authenticated(session) => Ok(session.as_mut()),
            State::Unconnected => Err(Error::Protocol("connector not initialized".into())),
            State::Failed => Err(Error::Protocol("connector failed to initialize".into())),
        }
    }
}

impl Connector for ImapConnector {
    fn initialize(&mut self, cfg: &Config) -> Result<()> {
        match self.state {
            State::Unconnected => {}
            State::Authenticated(_) => {
                return Err(Error::Connection("connector already initialized".into()))
            }
            State::Failed => {
                return Err(Error::Connection("connector failed to initialize earlier".into()))
            }
        }

        match connect(&cfg.imap) {
            Ok(session) => {
                self.state = State::Authenticated(Box::new(session));
                Ok(())
            }
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    fn list_folder(&mut self) -> Result<Vec<String>> {
        let session = self.session()?;

        let mut folders = vec!["INBOX".to_string()];
        let names = pipeline::drain(
            MAILBOX_QUEUE,
            move |tx| {
                for name in session.list_names()? {
                    if tx.blocking_send(name).is_err() {
                        break;
                    }
                }
                Ok(())
            },
            |name: String| Ok(name),
        )?;
        folders.extend(names);
        Ok(folders)
    }

    fn list_mails(&mut self, folder: &str) -> Result<Vec<Mail>> {
        let session = self.session()?;

        let count = session.examine(folder)?;
        log::debug!("selected {} ({} messages)", folder, count);
        if count == 0 {
            return Ok(Vec::new());
        }

        let range = format!("1:{}", count);
        let mails = pipeline::drain(
            MESSAGE_QUEUE,
            move |tx| {
                for msg in session.fetch(&range, FETCH_QUERY)? {
                    if tx.blocking_send(msg).is_err() {
                        break;
                    }
                }
                Ok(())
            },
            |msg: FetchedMessage| {
                let uid = msg
                    .uid
                    .ok_or_else(|| Error::Protocol("server did not return a message uid".into()))?;
                let body = msg.body.ok_or_else(|| {
                    Error::Protocol(format!("server did not return the body of mail {}", uid))
                })?;
                parse::summary(uid, &body)
            },
        )?;

        log::debug!("fetched {} mails from {}", mails.len(), folder);
        Ok(mails)
    }

    fn get_mail(&mut self, folder: &str, id: &str) -> Result<MailData> {
        let uid: u32 = id
            .trim()
            .parse()
            .map_err(|_| Error::Validation(format!("invalid mail id {:?}", id)))?;
        let session = self.session()?;

        session.examine(folder)?;

        let msg = session
            .uid_fetch(&uid.to_string(), FETCH_QUERY)?
            .into_iter()
            .find(|m| m.uid.map_or(true, |u| u == uid))
            .ok_or_else(|| Error::Protocol(format!("no mail with id {} in {}", uid, folder)))?;

        let body = msg
            .body
            .ok_or_else(|| Error::Protocol(format!("server did not return the body of mail {}", uid)))?;

        parse::full(msg.uid.unwrap_or(uid), &body)
    }
}
