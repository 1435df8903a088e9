use std::time::Duration;

use log::debug;
use once_cell::sync::Lazy;
use reqwest::{Client, Url};
use scraper::{Html, Selector};

macro_rules! selector {
    ($query:expr) => {{
        static SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse($query).unwrap());
        &SELECTOR
    }};
}

/// Looks up the preview image a linked page advertises. Gives up after `timeout`.
pub async fn fetch_preview_image(client: &Client, url: &Url, timeout: Duration) -> Option<String> {
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let response = match client.get(url.clone()).timeout(timeout).send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            debug!("Preview of {url} answered {}", response.status());
            return None;
        }
        Err(err) => {
            debug!("Preview of {url} failed: {err}");
            return None;
        }
    };

    let html = response.text().await.ok()?;
    extract_preview_image(&html, url)
}

/// `og:image`, falling back to `twitter:image`, resolved against the page URL.
pub fn extract_preview_image(html: &str, page: &Url) -> Option<String> {
    let html = Html::parse_document(html);

    let content = html
        .select(selector!(r#"meta[property="og:image"]"#))
        .chain(html.select(selector!(r#"meta[name="twitter:image"]"#)))
        .find_map(|meta| {
            meta.value()
                .attr("content")
                .map(str::trim)
                .filter(|content| !content.is_empty())
        })?;

    page.join(content).ok().map(String::from)
}
