use super::MailError;
use regex::{Captures, Regex};
use std::collections::HashMap;

const PLACEHOLDER_PATTERN: &str = r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}";

/// Prebuilt HTML bodies for automated emails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlEmailTemplate {
    AttendanceAutomatedSend,
}

impl HtmlEmailTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            HtmlEmailTemplate::AttendanceAutomatedSend => {
                "<html>
  <body>
    <p>Hey guys,<br>
    <br>
    Please see attached for the attendance sheet of {{session}}.<br>
    <p>This is an Automated Email Sent from the Odyssey Management Software.</p>
  </body>
</html>
"
            }
        }
    }

    pub fn render(&self, values: &HashMap<String, String>) -> Result<String, MailError> {
        render_placeholders(self.as_str(), values)
    }
}

/// Plain-text fallbacks paired with `HtmlEmailTemplate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlainTextTemplate {
    AttendanceAutomatedSend,
}

impl PlainTextTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlainTextTemplate::AttendanceAutomatedSend => {
                "Hey guys,\n\nPlease see attached for the attendance sheet of {{session}}.\n\n\
                 This is an Automated Email Sent from the Odyssey Management Software.\n"
            }
        }
    }

    pub fn render(&self, values: &HashMap<String, String>) -> Result<String, MailError> {
        render_placeholders(self.as_str(), values)
    }
}

/// Replaces every `{{name}}` in `text` with `values[name]`.
/// Unknown names are replaced with an empty string.
pub fn render_placeholders(
    text: &str,
    values: &HashMap<String, String>,
) -> Result<String, MailError> {
    let re = Regex::new(PLACEHOLDER_PATTERN)?;
    let rendered = re.replace_all(text, |caps: &Captures| {
        values.get(&caps[1]).cloned().unwrap_or_default()
    });
    Ok(rendered.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_substituted() {
        let values = HashMap::from([("session".to_string(), "January 6".to_string())]);

        let html = HtmlEmailTemplate::AttendanceAutomatedSend.render(&values).unwrap();
        let text = PlainTextTemplate::AttendanceAutomatedSend.render(&values).unwrap();

        assert!(html.contains("attendance sheet of January 6.<br>"));
        assert!(text.contains("attendance sheet of January 6."));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn unknown_placeholders_render_empty() {
        let rendered = render_placeholders("Hi {{ name }}, see {{missing}}!", &HashMap::from([(
            "name".to_string(),
            "Eleni".to_string(),
        )]))
        .unwrap();
        assert_eq!(rendered, "Hi Eleni, see !");
    }
}
