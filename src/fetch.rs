use reqwest_middleware::ClientWithMiddleware;
use select::document::Document;
use select::predicate::Name;
use tracing::{debug, warn};

/// Raw result of fetching a page. Failures are carried as data rather than
/// errors so downstream stages can keep going with a degraded view.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub success: bool,
    pub status_code: u16,
    pub error_message: Option<String>,
    pub html: String,
    /// Raw href values as found in the document, unresolved.
    pub links: Vec<String>,
}

impl FetchedPage {
    fn failed(status_code: u16, message: String) -> Self {
        FetchedPage {
            success: false,
            status_code,
            error_message: Some(message),
            html: String::new(),
            links: Vec::new(),
        }
    }
}

/// Fetch a page and harvest its anchor hrefs. Never returns an error:
/// network and HTTP failures come back as a failed `FetchedPage`.
#[tracing::instrument(skip(client), fields(url = %url))]
pub async fn fetch_page(url: &str, client: &ClientWithMiddleware) -> FetchedPage {
    let response = match client
        .get(url)
        .header("User-Agent", "Mozilla/5.0 (compatible; SeoScope/1.0)")
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            warn!("Failed to fetch {}: {}", url, e);
            return FetchedPage::failed(0, format!("Request error: {}", e));
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!("Fetch of {} returned status {}", url, status);
        return FetchedPage::failed(
            status.as_u16(),
            format!("Request error: HTTP status {}", status),
        );
    }

    let html = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!("Failed to read body from {}: {}", url, e);
            return FetchedPage::failed(status.as_u16(), format!("Request error: {}", e));
        }
    };

    let links = harvest_hrefs(&html);
    debug!("Fetched {} ({} bytes, {} links)", url, html.len(), links.len());

    FetchedPage {
        success: true,
        status_code: status.as_u16(),
        error_message: None,
        html,
        links,
    }
}

fn harvest_hrefs(html: &str) -> Vec<String> {
    let document = match Document::from_read(html.as_bytes()) {
        Ok(d) => d,
        Err(_) => return Vec::new(),
    };

    document
        .find(Name("a"))
        .filter_map(|node| node.attr("href"))
        .filter(|href| !href.is_empty())
        .map(|href| href.to_string())
        .collect()
}
