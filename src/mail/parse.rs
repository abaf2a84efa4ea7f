//! Turns a fetched `BODY[]` into the local data model.

use chrono::DateTime;
use mailparse::{DispositionType, MailAddr, MailHeader, MailHeaderMap, ParsedMail};

use super::{Attachment, Mail, MailData};
use crate::error::Result;

const RECEIVED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses the header block of a raw message into a summary.
pub fn summary(id: u32, raw: &[u8]) -> Result<Mail> {
    let (headers, _) = mailparse::parse_headers(raw)?;
    Ok(envelope(id, &headers))
}

/// Parses a raw message into a full mail: envelope, plain-text body and attachment names.
pub fn full(id: u32, raw: &[u8]) -> Result<MailData> {
    let parsed = mailparse::parse_mail(raw)?;
    let mut data = MailData {
        mail: envelope(id, &parsed.headers),
        ..MailData::default()
    };
    collect_parts(&parsed, &mut data);
    Ok(data)
}

fn envelope(id: u32, headers: &[MailHeader]) -> Mail {
    Mail {
        id: id.to_string(),
        subject: headers.get_first_value("Subject").unwrap_or_default(),
        from: address_list(headers, "From").into_iter().next().unwrap_or_default(),
        to: address_list(headers, "To"),
        cc: address_list(headers, "Cc"),
        received: headers.get_first_value("Date").and_then(|d| received(&d)),
    }
}

fn address_list(headers: &[MailHeader], key: &str) -> Vec<String> {
    let Some(header) = headers.get_first_header(key) else {
        return Vec::new();
    };
    let Ok(list) = mailparse::addrparse_header(header) else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(list.len());
    for addr in list.iter() {
        match addr {
            MailAddr::Single(info) => out.push(addr_to_string(info.display_name.as_deref(), &info.addr)),
            MailAddr::Group(group) => out.extend(
                group
                    .addrs
                    .iter()
                    .map(|info| addr_to_string(info.display_name.as_deref(), &info.addr)),
            ),
        }
    }
    out
}

fn addr_to_string(name: Option<&str>, addr: &str) -> String {
    // a single that follows a group comes back with the separating comma
    let addr = addr.trim_start_matches(|c: char| c == ',' || c.is_whitespace()).trim_end();
    let name = name.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return format!("<{}>", addr);
    }
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\" <{}>", escaped, addr)
}

/// Renders a Date header in its own offset. Anything that is not a valid
/// RFC 2822 date, after dropping a trailing `(zone)` comment, yields `None`.
fn received(date: &str) -> Option<String> {
    let mut date = date.trim();
    if date.ends_with(')') {
        if let Some(open) = date.rfind('(') {
            date = date[..open].trim_end();
        }
    }
    DateTime::parse_from_rfc2822(date)
        .ok()
        .map(|dt| dt.format(RECEIVED_FORMAT).to_string())
}

fn collect_parts(part: &ParsedMail, data: &mut MailData) {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            collect_parts(sub, data);
        }
        return;
    }

    let disposition = part.get_content_disposition();
    if disposition.disposition == DispositionType::Attachment {
        let name = disposition
            .params
            .get("filename")
            .or_else(|| part.ctype.params.get("name"))
            .cloned()
            .unwrap_or_default();
        data.attachments.push(Attachment { name });
        return;
    }

    if part.ctype.mimetype.eq_ignore_ascii_case("text/plain") {
        match part.get_body() {
            Ok(body) => data.body = body,
            Err(e) => log::warn!("skipping text part of mail {}: {}", data.mail.id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "From: \"Alice Example\" <alice@example.org>\r\n\
To: bob@example.org, \"Carol\" <carol@example.org>, dave@example.org\r\n\
Cc: erin@example.org, Frank <frank@example.org>\r\n\
Subject: =?UTF-8?Q?Gr=C3=BC=C3=9Fe?=\r\n\
Date: Fri, 01 Mar 2024 09:15:00 +0100\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Hello Bob.\r\n";

    const MULTIPART: &str = "From: alice@example.org\r\n\
To: bob@example.org\r\n\
Subject: report\r\n\
Date: Fri, 01 Mar 2024 09:15:00 +0000\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n\
\r\n\
--XYZ\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
numbers inside\r\n\
--XYZ\r\n\
Content-Type: application/pdf\r\n\
Content-Disposition: attachment; filename=\"q1.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0xLjQK\r\n\
--XYZ\r\n\
Content-Type: image/png; name=\"chart.png\"\r\n\
Content-Disposition: attachment\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
iVBORw0KGgo=\r\n\
--XYZ\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>ignored</p>\r\n\
--XYZ--\r\n";

    #[test]
    fn envelope_fields_are_extracted() {
        let mail = summary(7, SIMPLE.as_bytes()).unwrap();
        assert_eq!(mail.id, "7");
        assert_eq!(mail.subject, "Grüße");
        assert_eq!(mail.from, "\"Alice Example\" <alice@example.org>");
        assert_eq!(mail.received.as_deref(), Some("2024-03-01 09:15:00"));
    }

    #[test]
    fn recipients_keep_order_and_count() {
        let mail = summary(1, SIMPLE.as_bytes()).unwrap();
        assert_eq!(
            mail.to,
            vec![
                "<bob@example.org>".to_string(),
                "\"Carol\" <carol@example.org>".to_string(),
                "<dave@example.org>".to_string(),
            ]
        );
    }

    // Cc addresses land in `cc` only; `to` keeps exactly the To header.
    #[test]
    fn cc_is_not_merged_into_recipients() {
        let mail = summary(1, SIMPLE.as_bytes()).unwrap();
        assert_eq!(mail.to.len(), 3);
        assert_eq!(
            mail.cc,
            vec!["<erin@example.org>".to_string(), "\"Frank\" <frank@example.org>".to_string()]
        );
    }

    #[test]
    fn unparseable_date_is_absent() {
        let raw = "From: a@example.org\r\nDate: sometime last week\r\n\r\nbody";
        let mail = summary(1, raw.as_bytes()).unwrap();
        assert_eq!(mail.received, None);

        let raw = "From: a@example.org\r\n\r\nbody";
        assert_eq!(summary(1, raw.as_bytes()).unwrap().received, None);

        for date in ["", "n/a", "unknown", "sometime last week"] {
            assert_eq!(received(date), None, "date {:?}", date);
        }
    }

    #[test]
    fn trailing_zone_comment_is_ignored() {
        assert_eq!(
            received("Tue, 1 Jul 2003 10:52:37 +0200 (CEST)").as_deref(),
            Some("2003-07-01 10:52:37")
        );
    }

    #[test]
    fn missing_headers_give_empty_fields() {
        let mail = summary(3, b"\r\nbody only").unwrap();
        assert_eq!(mail.from, "");
        assert_eq!(mail.subject, "");
        assert!(mail.to.is_empty());
        assert!(mail.cc.is_empty());
    }

    #[test]
    fn group_members_are_flattened() {
        let raw = "To: team: a@example.org, b@example.org;, c@example.org\r\n\r\n";
        let mail = summary(1, raw.as_bytes()).unwrap();
        assert_eq!(mail.to, vec!["<a@example.org>", "<b@example.org>", "<c@example.org>"]);
    }

    #[test]
    fn one_text_part_and_two_attachments() {
        let data = full(9, MULTIPART.as_bytes()).unwrap();
        assert_eq!(data.mail.id, "9");
        assert_eq!(data.body.trim_end(), "numbers inside");
        assert_eq!(
            data.attachments,
            vec![
                Attachment { name: "q1.pdf".into() },
                Attachment { name: "chart.png".into() },
            ]
        );
        assert!(data.header.is_empty());
    }

    #[test]
    fn last_plain_text_part_wins() {
        let raw = "Content-Type: multipart/alternative; boundary=B\r\n\r\n\
--B\r\nContent-Type: text/plain\r\n\r\nfirst\r\n\
--B\r\nContent-Type: text/plain\r\n\r\nsecond\r\n--B--\r\n";
        let data = full(1, raw.as_bytes()).unwrap();
        assert_eq!(data.body.trim_end(), "second");
    }

    #[test]
    fn undecodable_text_part_is_skipped() {
        let raw = "Content-Type: multipart/mixed; boundary=B\r\n\r\n\
--B\r\nContent-Type: text/plain\r\n\r\nfirst\r\n\
--B\r\nContent-Type: text/plain\r\nContent-Transfer-Encoding: base64\r\n\r\n!!not*base64!!\r\n--B--\r\n";
        let data = full(1, raw.as_bytes()).unwrap();
        assert_eq!(data.body.trim_end(), "first");
    }

    #[test]
    fn attachment_without_name_is_empty() {
        let raw = "Content-Type: multipart/mixed; boundary=B\r\n\r\n\
--B\r\nContent-Type: application/octet-stream\r\nContent-Disposition: attachment\r\n\r\nxx\r\n--B--\r\n";
        let data = full(1, raw.as_bytes()).unwrap();
        assert_eq!(data.attachments, vec![Attachment { name: String::new() }]);
        assert_eq!(data.body, "");
    }

    #[test]
    fn single_part_plain_message_is_the_body() {
        let data = full(1, SIMPLE.as_bytes()).unwrap();
        assert_eq!(data.body, "Hello Bob.\r\n");
        assert!(data.attachments.is_empty());
    }
}
