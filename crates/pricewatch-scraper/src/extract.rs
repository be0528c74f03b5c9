//! Selector-driven field extraction from a rendered listing page.
//!
//! Every field is configured as an ordered chain of candidate CSS selectors;
//! the first candidate that yields a match wins. Candidate nodes missing a
//! name or price are skipped (debug-logged), never fatal.

use chrono::Utc;
use scraper::{ElementRef, Html, Selector};

use pricewatch_core::{PaginationRules, RawProduct, SelectorList, StoreConfig};

use crate::fetch::RenderedPage;

/// Extracts every product listing from a rendered page.
///
/// The result is finite (bounded by matched container nodes) and ordered by
/// document position. Re-extraction requires a fresh page snapshot.
#[must_use]
pub fn extract_products(page: &RenderedPage, store: &StoreConfig) -> Vec<RawProduct> {
    let document = Html::parse_document(&page.html);

    let mut products = Vec::new();
    let mut skipped = 0usize;
    for node in select_containers(&document, &store.selectors.product_container) {
        match extract_one(node, store) {
            Some(product) => products.push(product),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!(
            store = %store.id,
            skipped,
            url = %page.url,
            "skipped product nodes missing name or price"
        );
    }
    products
}

/// Reports whether the rendered page advertises a further listing page:
/// a next-page control that exists and is not disabled.
#[must_use]
pub fn has_next_page(page: &RenderedPage, pagination: &PaginationRules) -> bool {
    let document = Html::parse_document(&page.html);
    for candidate in pagination.next_page.iter() {
        let Ok(selector) = Selector::parse(candidate) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let disabled = element.value().classes().any(|c| c == "disabled")
                || element.value().attr("disabled").is_some();
            return !disabled;
        }
    }
    false
}

fn extract_one(node: ElementRef<'_>, store: &StoreConfig) -> Option<RawProduct> {
    let selectors = &store.selectors;

    let name = first_text(node, &selectors.name)?;
    let price_text = first_text(node, &selectors.price)?;

    let original_price_text = selectors
        .original_price
        .as_ref()
        .and_then(|list| first_text(node, list));

    let image = first_element(node, &selectors.image)
        .and_then(image_source)
        .map(|src| absolute_url(&store.base_url, &src));

    let url = first_element(node, &selectors.link)
        .and_then(|el| el.value().attr("href"))
        .map(|href| absolute_url(&store.base_url, href));

    let brand = selectors
        .brand
        .as_ref()
        .and_then(|list| first_text(node, list));
    let category = selectors
        .category
        .as_ref()
        .and_then(|list| first_text(node, list));

    // Element presence matters here, not just its text: an empty stock badge
    // still means "the page has a stock indicator".
    let stock_text = selectors
        .in_stock
        .as_ref()
        .and_then(|list| first_element(node, list))
        .map(element_text);

    let sizes = selectors
        .sizes
        .as_ref()
        .map(|list| all_texts(node, list))
        .unwrap_or_default();
    let colors = selectors
        .colors
        .as_ref()
        .map(|list| all_texts(node, list))
        .unwrap_or_default();

    Some(RawProduct {
        store: store.id.clone(),
        name,
        price_text,
        original_price_text,
        image,
        url,
        brand,
        category,
        stock_text,
        sizes,
        colors,
        scraped_at: Utc::now(),
    })
}

/// Container nodes for the first candidate selector that matches anything.
fn select_containers<'a>(document: &'a Html, list: &SelectorList) -> Vec<ElementRef<'a>> {
    for candidate in list.iter() {
        let Ok(selector) = Selector::parse(candidate) else {
            tracing::warn!(selector = candidate, "ignoring unparsable CSS selector");
            continue;
        };
        let matches: Vec<ElementRef<'a>> = document.select(&selector).collect();
        if !matches.is_empty() {
            return matches;
        }
    }
    Vec::new()
}

/// First element under `node` matched by the first succeeding candidate.
fn first_element<'a>(node: ElementRef<'a>, list: &SelectorList) -> Option<ElementRef<'a>> {
    for candidate in list.iter() {
        let Ok(selector) = Selector::parse(candidate) else {
            continue;
        };
        if let Some(element) = node.select(&selector).next() {
            return Some(element);
        }
    }
    None
}

/// Text of the first candidate whose first match has non-empty text.
fn first_text(node: ElementRef<'_>, list: &SelectorList) -> Option<String> {
    for candidate in list.iter() {
        let Ok(selector) = Selector::parse(candidate) else {
            continue;
        };
        if let Some(element) = node.select(&selector).next() {
            let text = element_text(element);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Texts of every element matched by the first candidate that matches at all.
fn all_texts(node: ElementRef<'_>, list: &SelectorList) -> Vec<String> {
    for candidate in list.iter() {
        let Ok(selector) = Selector::parse(candidate) else {
            continue;
        };
        let texts: Vec<String> = node.select(&selector).map(element_text).collect();
        if !texts.is_empty() {
            return texts;
        }
    }
    Vec::new()
}

/// Element text with runs of whitespace collapsed to single spaces.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Direct `src` first; lazy-loaded images park the real URL in `data-src`.
fn image_source(element: ElementRef<'_>) -> Option<String> {
    element
        .value()
        .attr("src")
        .filter(|s| !s.is_empty())
        .or_else(|| element.value().attr("data-src"))
        .map(ToOwned::to_owned)
}

fn absolute_url(base_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_owned()
    } else if href.starts_with("//") {
        format!("https:{href}")
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            href.trim_start_matches('/')
        )
    }
}
