use crate::fetch::FetchedPage;
use select::document::Document;
use select::node::Node;
use select::predicate::{Attr, Name, Text};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

const NO_TITLE: &str = "No Title";
const NO_DESCRIPTION: &str = "No Description";

/// Structured summary of a page's SEO-relevant attributes.
///
/// Exactly one shape is ever populated: either the full signal set, or the
/// error form when the fetch or parse failed. Never both, never partial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(untagged)]
pub enum PageSignals {
    Extracted(SignalSummary),
    Failed(SignalError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SignalSummary {
    /// URL the signals were extracted from
    pub url: String,
    /// First <title> text, or "No Title"
    pub title: String,
    /// Content of <meta name="description">, or "No Description"
    pub meta_description: String,
    /// Trimmed text of every <h1>, in document order, duplicates retained
    pub h1_tags: Vec<String>,
    /// Count of links resolving to the page's own host
    pub internal_links: usize,
    /// Count of links resolving to any other host
    pub external_links: usize,
    /// Character count of the visible text
    pub text_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SignalError {
    /// URL the fetch was attempted for
    pub url: String,
    /// What went wrong while fetching or parsing
    pub error: String,
}

impl PageSignals {
    pub fn is_error(&self) -> bool {
        matches!(self, PageSignals::Failed(_))
    }
}

/// Derive SEO signals from a fetched page. A failed fetch or an unparseable
/// document yields the error shape; no partial summary is ever produced.
#[tracing::instrument(skip(page), fields(url = %url))]
pub fn extract_signals(url: &str, page: &FetchedPage) -> PageSignals {
    if !page.success {
        let message = page
            .error_message
            .clone()
            .unwrap_or_else(|| "Request error: unknown failure".to_string());
        return PageSignals::Failed(SignalError {
            url: url.to_string(),
            error: message,
        });
    }

    let document = match Document::from_read(page.html.as_bytes()) {
        Ok(d) => d,
        Err(e) => {
            return PageSignals::Failed(SignalError {
                url: url.to_string(),
                error: format!("Parse error: {}", e),
            })
        }
    };

    let title = document
        .find(Name("title"))
        .next()
        .map(|n| n.text().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());

    let meta_description = document
        .find(Attr("name", "description"))
        .next()
        .and_then(|n| n.attr("content"))
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    let h1_tags: Vec<String> = document
        .find(Name("h1"))
        .map(|n| n.text().trim().to_string())
        .collect();

    let (internal_links, external_links) = partition_links(url, &page.links);

    let text_length = extract_text(&page.html).chars().count();

    PageSignals::Extracted(SignalSummary {
        url: url.to_string(),
        title,
        meta_description,
        h1_tags,
        internal_links,
        external_links,
        text_length,
    })
}

/// Resolve raw hrefs against the page URL and split them by host. Hrefs that
/// cannot be resolved are dropped from both counts.
fn partition_links(page_url: &str, hrefs: &[String]) -> (usize, usize) {
    let base = match Url::parse(page_url) {
        Ok(u) => u,
        Err(_) => return (0, 0),
    };

    let mut internal = 0;
    let mut external = 0;
    for href in hrefs {
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        if resolved.host_str() == base.host_str() {
            internal += 1;
        } else {
            external += 1;
        }
    }
    (internal, external)
}

/// Strip an HTML fragment down to its visible text: script and style subtrees
/// removed, remaining text nodes whitespace-collapsed and joined with single
/// spaces. Never fails; an unreadable fragment yields the empty string.
pub fn extract_text(html: &str) -> String {
    let document = match Document::from_read(html.as_bytes()) {
        Ok(d) => d,
        Err(_) => return String::new(),
    };

    let mut parts: Vec<String> = Vec::new();
    for node in document.find(Text) {
        if in_skipped_subtree(&node) {
            continue;
        }
        let collapsed = node
            .text()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if !collapsed.is_empty() {
            parts.push(collapsed);
        }
    }
    parts.join(" ")
}

fn in_skipped_subtree(node: &Node) -> bool {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if matches!(ancestor.name(), Some("script") | Some("style")) {
            return true;
        }
        current = ancestor.parent();
    }
    false
}
