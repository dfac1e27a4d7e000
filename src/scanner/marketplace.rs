use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{ScanFailure, Scanner};
use crate::monitor::models::RawListing;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// CSS selectors locating the four fields of each listing card.
///
/// The defaults match the marketplace's generated class lists exactly, so a
/// title selector does not also pick up location spans that share its classes.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ListingSelectors {
    pub title: String,
    pub price: String,
    pub location: String,
    pub link: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            title: r#"span[class="x1lliihq x6ikm8r x10wlt62 x1n2onr6"]"#.to_string(),
            price: r#"span[class="x193iq5w xeuugli x13faqbe x1vvkbs x1xmvt09 x1lliihq x1s928wv xhkezso x1gmr53x x1cpjm7i x1fgarty x1943h6x xudqn12 x676frb x1lkfr7t x1lbecb7 x1s688f xzsf02u"]"#.to_string(),
            location: r#"span[class="x1lliihq x6ikm8r x10wlt62 x1n2onr6 xlyipyv xuxw1ft x1j85h84"]"#.to_string(),
            link: r#"a[class="x1i10hfl xjbqb8w x1ejq31n xd10rxx x1sy0etr x17r0tee x972fbf xcfux6l x1qhh985 xm0m39n x9f619 x1ypdohk xt0psk2 xe8uvvx xdj266r x11i5rnm xat24cr x1mh8g0r xexx8yu x4uap5 x18d9i69 xkhd6sd x16tdsg8 x1hl2dhg xggy1nq x1a2a7pz x1heor9g x1lku1pv"]"#.to_string(),
        }
    }
}

struct CompiledSelectors {
    title: Selector,
    price: Selector,
    location: Selector,
    link: Selector,
}

impl CompiledSelectors {
    fn compile(selectors: &ListingSelectors) -> Result<Self, ScanFailure> {
        Ok(Self {
            title: parse_selector(&selectors.title)?,
            price: parse_selector(&selectors.price)?,
            location: parse_selector(&selectors.location)?,
            link: parse_selector(&selectors.link)?,
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ScanFailure> {
    Selector::parse(selector).map_err(|e| ScanFailure::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })
}

/// Scanner that downloads the search page over HTTP and extracts listing cards.
pub struct HttpScanner {
    client: Client,
    selectors: CompiledSelectors,
}

impl HttpScanner {
    pub fn new(timeout: Duration, selectors: &ListingSelectors) -> Result<Self, ScanFailure> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            selectors: CompiledSelectors::compile(selectors)?,
        })
    }
}

#[async_trait]
impl Scanner for HttpScanner {
    async fn scan(&self, url: &str) -> Result<Vec<RawListing>, ScanFailure> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScanFailure::Status(status));
        }
        let body = response.text().await?;
        let listings = extract_listings(&body, &self.selectors)?;
        debug!(url, count = listings.len(), "Extracted listings from search page.");
        Ok(listings)
    }
}

// Login prompts and cookie banners render inside dialogs and reuse the card classes.
fn inside_dialog(element: &ElementRef<'_>) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|el| el.name() == "div" && el.attr("role") == Some("dialog"))
    })
}

fn select_outside_dialogs<'a>(document: &'a Html, selector: &Selector) -> Vec<ElementRef<'a>> {
    document
        .select(selector)
        .filter(|element| !inside_dialog(element))
        .collect()
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn extract_listings(html: &str, selectors: &CompiledSelectors) -> Result<Vec<RawListing>, ScanFailure> {
    let document = Html::parse_document(html);

    let titles = select_outside_dialogs(&document, &selectors.title);
    let prices = select_outside_dialogs(&document, &selectors.price);
    let locations = select_outside_dialogs(&document, &selectors.location);
    let links = select_outside_dialogs(&document, &selectors.link);

    // Fields are paired by position, so a partial render cannot be trusted.
    if titles.len() != prices.len() || titles.len() != locations.len() || titles.len() != links.len() {
        return Err(ScanFailure::InconsistentListing {
            titles: titles.len(),
            prices: prices.len(),
            locations: locations.len(),
            links: links.len(),
        });
    }

    let listings = titles
        .iter()
        .zip(&prices)
        .zip(&locations)
        .zip(&links)
        .map(|(((title, price), location), link)| RawListing {
            name: element_text(title),
            price: element_text(price),
            location: element_text(location),
            link: link.value().attr("href").unwrap_or_default().to_string(),
        })
        .collect();
    Ok(listings)
}
