use super::MailError;
use common::model::email::EmailMessage;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use mime_guess::mime;
use std::fs;
use std::path::Path;

/// Assembles a `multipart/mixed` message: a `multipart/alternative` part
/// (plain text first, HTML last so clients prefer it) followed by one part
/// per attachment.
///
/// Every check runs before the message exists, so nothing is sent when the
/// contents are incomplete.
pub fn build_email_message(sender: &str, contents: &EmailMessage) -> Result<Message, MailError> {
    if contents.plain_text_body.is_empty() {
        return Err(MailError::MissingField("a plain text alternative"));
    }
    if contents.html_body.is_empty() {
        return Err(MailError::MissingField("an HTML body"));
    }
    if contents.subject.is_empty() {
        return Err(MailError::MissingField("a subject"));
    }

    let from = parse_mailbox(sender)?;
    let to = parse_mailbox(&contents.destination_email_address)?;

    let mut body = MultiPart::mixed().multipart(MultiPart::alternative_plain_html(
        contents.plain_text_body.clone(),
        contents.html_body.clone(),
    ));
    for path in &contents.attachments {
        body = body.singlepart(attachment_part(path)?);
    }

    Ok(Message::builder()
        .from(from)
        .to(to)
        .subject(contents.subject.as_str())
        .multipart(body)?)
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|source| MailError::Address {
        address: address.to_string(),
        source,
    })
}

/// Reads `path` into an attachment part. The content type is guessed from the
/// extension; `text/*` files are attached as (lossily decoded) UTF-8 text,
/// everything else as base64-encoded bytes.
fn attachment_part(path: &Path) -> Result<SinglePart, MailError> {
    if !path.is_file() {
        return Err(MailError::AttachmentNotFound(path.to_path_buf()));
    }

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let guessed = mime_guess::from_path(path).first_or_octet_stream();
    let content_type = ContentType::parse(guessed.as_ref())?;
    let data = fs::read(path)?;

    let part = if guessed.type_() == mime::TEXT {
        Attachment::new(filename).body(String::from_utf8_lossy(&data).into_owned(), content_type)
    } else {
        Attachment::new(filename).body(data, content_type)
    };
    Ok(part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn contents(attachments: Vec<PathBuf>) -> EmailMessage {
        EmailMessage {
            destination_email_address: "dancer@example.org".to_string(),
            subject: "[Odyssey Management] Today's Attendance".to_string(),
            plain_text_body: "Please see attached.".to_string(),
            html_body: "<html><body><p>Please see attached.</p></body></html>".to_string(),
            attachments,
        }
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn message_has_alternative_bodies_and_attachments() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("attendance_jan06.csv");
        fs::write(&csv, "name,present\nEleni,yes\n").unwrap();
        let png = dir.path().join("QR_20250106-1915.png");
        fs::write(&png, [0x89, b'P', b'N', b'G', 0, 1, 2, 3]).unwrap();

        let message = build_email_message("troupe@example.org", &contents(vec![csv, png])).unwrap();
        let raw = formatted(&message);

        assert!(raw.contains("From: troupe@example.org"));
        assert!(raw.contains("To: dancer@example.org"));
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("Content-Type: text/plain"));
        assert!(raw.contains("Content-Type: text/html"));
        assert!(raw.contains("Content-Type: text/csv"));
        assert!(raw.contains("Content-Type: image/png"));
        assert!(raw.contains("filename=\"attendance_jan06.csv\""));
        assert!(raw.contains("filename=\"QR_20250106-1915.png\""));
        // HTML alternative comes after the plain-text fallback
        let plain = raw.find("Content-Type: text/plain").unwrap();
        let html = raw.find("Content-Type: text/html").unwrap();
        assert!(plain < html);
    }

    #[test]
    fn unknown_extension_falls_back_to_octet_stream() {
        let dir = tempdir().unwrap();
        let blob = dir.path().join("sheet.odyssey");
        fs::write(&blob, [1, 2, 3]).unwrap();

        let message = build_email_message("troupe@example.org", &contents(vec![blob])).unwrap();
        assert!(formatted(&message).contains("Content-Type: application/octet-stream"));
    }

    #[test]
    fn missing_fields_are_rejected() {
        let mut no_plain = contents(vec![]);
        no_plain.plain_text_body.clear();
        let mut no_html = contents(vec![]);
        no_html.html_body.clear();
        let mut no_subject = contents(vec![]);
        no_subject.subject.clear();

        for message in [no_plain, no_html, no_subject] {
            assert!(matches!(
                build_email_message("troupe@example.org", &message),
                Err(MailError::MissingField(_))
            ));
        }
    }

    #[test]
    fn missing_attachment_is_rejected() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("attendance_jan06.xlsx");

        let err = build_email_message("troupe@example.org", &contents(vec![missing.clone()]))
            .unwrap_err();
        assert!(matches!(err, MailError::AttachmentNotFound(path) if path == missing));
    }

    #[test]
    fn invalid_address_is_rejected() {
        let mut message = contents(vec![]);
        message.destination_email_address = "not an address".to_string();

        assert!(matches!(
            build_email_message("troupe@example.org", &message),
            Err(MailError::Address { .. })
        ));
    }
}
