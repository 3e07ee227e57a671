//! Turning a captured anchor into a page-creation request for an external
//! notes database (Notion's `v1/pages` endpoint).
//!
//! Only the request is built here. Sending it is up to the host, and the
//! credentials are passed in at call time rather than read from any global.

use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};

use crate::anchor::SelectionAnchor;

pub const NOTION_PAGES_URL: &str = "https://api.notion.com/v1/pages";
pub const NOTION_VERSION: &str = "2022-06-28";

/// Page titles are cut to this many chars of the quote.
const TITLE_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error("cannot export a highlight with an empty quote")]
    EmptyQuote,
}

/// Where to file exported highlights.
#[derive(Clone, PartialEq, Eq)]
pub struct ExportTarget {
    token: String,
    database_id: String,
}

impl ExportTarget {
    /// Dashes in the database id are dropped; the API accepts the bare hex form.
    pub fn new(token: impl Into<String>, database_id: &str) -> Self {
        Self {
            token: token.into(),
            database_id: database_id.replace('-', ""),
        }
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }
}

impl fmt::Debug for ExportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportTarget")
            .field("token", &"<redacted>")
            .field("database_id", &self.database_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRequest {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl ExportRequest {
    /// Copy with the bearer token masked, safe to print or log.
    pub fn redacted(&self) -> Self {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| {
                if name.eq_ignore_ascii_case("authorization") {
                    (name.clone(), "Bearer <redacted>".to_string())
                } else {
                    (name.clone(), value.clone())
                }
            })
            .collect();
        Self {
            headers,
            ..self.clone()
        }
    }
}

pub fn build_page_request(
    anchor: &SelectionAnchor,
    target: &ExportTarget,
) -> Result<ExportRequest, ExportError> {
    if anchor.quote.is_empty() {
        return Err(ExportError::EmptyQuote);
    }

    let title: String = anchor.quote.chars().take(TITLE_CHARS).collect();
    let body = json!({
        "parent": { "database_id": target.database_id },
        "properties": {
            "Name": { "title": [{ "text": { "content": title } }] },
            "Quote": rich_text(&anchor.quote),
            "Source URL": { "url": anchor.page_url },
            "Page Title": rich_text(&anchor.page_title),
            "Color": rich_text(&anchor.color),
            "Created At": { "date": { "start": anchor.created_at } },
        }
    });

    Ok(ExportRequest {
        method: "POST",
        url: NOTION_PAGES_URL.to_string(),
        headers: vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", target.token),
            ),
            ("Notion-Version".to_string(), NOTION_VERSION.to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ],
        body,
    })
}

fn rich_text(content: &str) -> Value {
    json!({ "rich_text": [{ "text": { "content": content } }] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn anchor(quote: &str) -> SelectionAnchor {
        SelectionAnchor {
            quote: quote.to_string(),
            prefix: "before ".to_string(),
            suffix: " after".to_string(),
            page_title: "A Page".to_string(),
            page_url: "https://example.com/page".to_string(),
            color: "#bbdefb".to_string(),
            created_at: "2024-05-01T12:30:00.000Z".to_string(),
        }
    }

    #[test]
    fn builds_a_notion_page_request() {
        let target = ExportTarget::new("secret", "1234-abcd-5678");

        let request = build_page_request(&anchor("a quote"), &target).unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.url, NOTION_PAGES_URL);
        assert_eq!(
            request.headers[0],
            ("Authorization".to_string(), "Bearer secret".to_string())
        );
        assert_eq!(
            request.body,
            json!({
                "parent": { "database_id": "1234abcd5678" },
                "properties": {
                    "Name": { "title": [{ "text": { "content": "a quote" } }] },
                    "Quote": { "rich_text": [{ "text": { "content": "a quote" } }] },
                    "Source URL": { "url": "https://example.com/page" },
                    "Page Title": { "rich_text": [{ "text": { "content": "A Page" } }] },
                    "Color": { "rich_text": [{ "text": { "content": "#bbdefb" } }] },
                    "Created At": { "date": { "start": "2024-05-01T12:30:00.000Z" } },
                }
            })
        );
    }

    #[test]
    fn long_quotes_are_cut_for_the_title_only() {
        let quote = "é".repeat(80);
        let target = ExportTarget::new("t", "db");

        let request = build_page_request(&anchor(&quote), &target).unwrap();

        let title = request.body["properties"]["Name"]["title"][0]["text"]["content"]
            .as_str()
            .unwrap();
        assert_eq!(title.chars().count(), 50);
        assert_eq!(
            request.body["properties"]["Quote"]["rich_text"][0]["text"]["content"],
            quote.as_str()
        );
    }

    #[test]
    fn empty_quote_is_rejected() {
        let target = ExportTarget::new("t", "db");

        assert_eq!(
            build_page_request(&anchor(""), &target),
            Err(ExportError::EmptyQuote)
        );
    }

    #[test]
    fn secrets_stay_out_of_debug_and_redacted_output() {
        let target = ExportTarget::new("very-secret", "db");
        let request = build_page_request(&anchor("q"), &target).unwrap();

        assert!(!format!("{target:?}").contains("very-secret"));
        let redacted = serde_json::to_string(&request.redacted()).unwrap();
        assert!(!redacted.contains("very-secret"));
        assert!(redacted.contains("Notion-Version"));
    }
}
