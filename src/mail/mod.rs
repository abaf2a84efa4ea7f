pub mod connector;
pub mod imap;
mod parse;
mod pipeline;

use serde::{Deserialize, Serialize};

pub use connector::{new_connector, Connector};

/// One row of a folder listing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Mail {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    /// `YYYY-MM-DD HH:MM:SS`, absent when the Date header is missing or unparseable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
}

/// A single mail with its plain-text body and attachment names.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MailData {
    #[serde(flatten)]
    pub mail: Mail,
    #[serde(default)]
    pub body: String,
    // reserved, never filled
    #[serde(default)]
    pub header: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attachment {
    #[serde(default)]
    pub name: String,
}
