//! Utility functions for HTML processing and shared helpers

use crate::errors::MlolError;
use regex::Regex;
use scraper::{ElementRef, Selector};

/// Creates a selector from provided string
///
/// Internal utility function for parsing CSS selectors.
#[inline(always)]
pub(crate) fn make_selector(
    selector: &str,
) -> Result<Selector, scraper::error::SelectorErrorKind<'_>> {
    Selector::parse(selector)
}

/// Macro to create a static LazyLock
#[macro_export]
macro_rules! make_static {
    ($expr:expr) => {{ LazyLock::new(|| $expr) }};
}
/// Macro to select trimmed text from every matching element
#[macro_export]
macro_rules! select_raw_text {
    ($document:expr, $selector:expr) => {
        $document
            .select($selector)
            .map(|elem| elem.text().collect::<String>().trim().to_string())
    };
}
/// Macro to select trimmed text from the first matching element only
#[macro_export]
macro_rules! select_raw_text_next {
    ($document:expr, $selector:expr) => {
        $document
            .select($selector)
            .next()
            .map(|elem| elem.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty())
    };
}
/// Macro to select text from HTML document, returning a Vec of non-empty strings
#[macro_export]
macro_rules! select_text {
    ($document:expr, $selector:expr) => {{
        select_raw_text!($document, $selector)
            .filter(|text| !text.is_empty())
            .collect::<Vec<String>>()
    }};
}

pub(crate) fn safe_static_selector(
    selector: Option<Selector>,
    backup: &str,
) -> Result<Selector, MlolError> {
    selector.map(Ok).unwrap_or_else(|| {
        make_selector(backup)
            .map_err(|_| MlolError::SelectorError(format!("Failed to create CSS selector {backup}")))
    })
}

pub(crate) fn safe_static_regex(
    regex: Option<regex::Regex>,
    backup: &str,
) -> Result<Regex, MlolError> {
    regex.map(Ok).unwrap_or_else(|| {
        Regex::new(backup)
            .map_err(|_| MlolError::RegexError(format!("Failed to compile regex {backup}")))
    })
}

#[macro_export]
macro_rules! define_selector {
    ($name:ident, $name_text:ident, $text:expr) => {
        static $name_text: &str = $text;

        static $name: LazyLock<Option<Selector>> = make_static!(make_selector($text).ok());
    };
}
#[macro_export]
macro_rules! define_regex {
    ($name:ident, $name_text:ident, $text:expr) => {
        static $name_text: &str = $text;

        static $name: LazyLock<std::option::Option<regex::Regex>> =
            make_static!({ Regex::new($text).ok() });
    };
}

/// Splits a `;` separated author line into trimmed names
pub(crate) fn split_authors(line: &str) -> Vec<String> {
    line.split(';')
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}

/// Collapses runs of whitespace inside an element's text
pub(crate) fn element_text(elem: ElementRef<'_>) -> String {
    elem.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
