//! Minimal microformats2 extraction
//!
//! Scans a fetched page for elements carrying `h-*` root class names and
//! builds the opaque `mf2` mapping stored on the domain record. Stat
//! plugins only rely on `items[].type`, plus `name`/`url` properties when
//! present, so the pass stays deliberately shallow.

use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Value};

/// Extracts microformats items from an HTML document
///
/// # Returns
///
/// A mapping of the shape `{"items": [{"type": ["h-card"], "properties":
/// {...}}]}`; the items list is empty when the page carries no `h-*`
/// markup.
pub fn extract_microformats(html: &str) -> Value {
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    if let Ok(selector) = Selector::parse("[class]") {
        for element in document.select(&selector) {
            let types: Vec<String> = element
                .value()
                .classes()
                .filter(|class| is_root_class(class))
                .map(str::to_string)
                .collect();

            if !types.is_empty() {
                items.push(json!({
                    "type": types,
                    "properties": extract_properties(&element),
                }));
            }
        }
    }

    json!({ "items": items })
}

/// Whether a class name marks a microformats root (`h-` prefix)
fn is_root_class(class: &str) -> bool {
    class.len() > 2 && class.starts_with("h-")
}

/// Pulls the common `p-name` / `u-url` properties out of a root element
fn extract_properties(element: &ElementRef) -> Value {
    let mut properties = serde_json::Map::new();

    if let Ok(selector) = Selector::parse(".p-name") {
        let names: Vec<Value> = element
            .select(&selector)
            .map(|el| Value::String(el.text().collect::<String>().trim().to_string()))
            .collect();
        if !names.is_empty() {
            properties.insert("name".to_string(), Value::Array(names));
        }
    }

    if let Ok(selector) = Selector::parse(".u-url") {
        let urls: Vec<Value> = element
            .select(&selector)
            .filter_map(|el| el.value().attr("href"))
            .map(|href| Value::String(href.to_string()))
            .collect();
        if !urls.is_empty() {
            properties.insert("url".to_string(), Value::Array(urls));
        }
    }

    Value::Object(properties)
}
