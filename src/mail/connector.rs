use crate::config::Config;
use crate::error::{Error, Result};

use super::imap::ImapConnector;
use super::{Mail, MailData};

/// A mail backend. `initialize` must succeed once before any other call.
#[cfg_attr(test, mockall::automock)]
pub trait Connector {
    fn initialize(&mut self, cfg: &Config) -> Result<()>;

    /// Mailbox names, starting with a synthetic "INBOX".
    fn list_folder(&mut self) -> Result<Vec<String>>;

    fn list_mails(&mut self, folder: &str) -> Result<Vec<Mail>>;

    fn get_mail(&mut self, folder: &str, id: &str) -> Result<MailData>;
}

pub fn new_connector(kind: &str) -> Result<Box<dyn Connector + Send>> {
    match kind {
        "imap" => Ok(Box::new(ImapConnector::new())),
        other => Err(Error::UnsupportedBackend(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imap_is_the_only_backend() {
        assert!(new_connector("imap").is_ok());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        match new_connector("pop3") {
            Err(Error::UnsupportedBackend(kind)) => assert_eq!(kind, "pop3"),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("pop3 should not be supported"),
        }
    }
}
