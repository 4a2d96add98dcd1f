//! # extraction
//!
//! HTML extraction for MLOL catalog pages.
//!
//! Two page kinds are understood: the search results listing
//! (`/media/ricerca.aspx`), which yields shallow [`Book`] records, and the
//! per-item detail page (`/media/scheda.aspx`), which yields [`BookDetails`].
//!
//! ## Usage
//!
//! ```rust
//! use mlol_client::extraction::parse_search_page;
//! let html = r#"<div class="result-item"><a href="/media/scheda.aspx?id=1">
//!   <h4 title="Spillover">Spillover</h4></a>
//!   <p><a class="authorref">David Quammen</a></p></div>"#;
//! let books = parse_search_page(html).unwrap();
//! assert_eq!(books[0].id, "1");
//! ```
use crate::book::{Book, BookDetails, BookStatus, Reservation};
use crate::errors::MlolError;
use crate::utils::{element_text, make_selector, safe_static_regex, safe_static_selector, split_authors};
use crate::{define_regex, define_selector, make_static, select_raw_text, select_raw_text_next, select_text};
use chrono::NaiveDateTime;
use log::{error, warn};
use regex::Regex;
use scraper::{ElementRef, Html, selector::Selector};
use std::sync::LazyLock;

define_regex!(BOOK_ID_REGEX, BOOK_ID_REGEX_TEXT, r"id=(\d+)$");
define_selector!(RESULT_ITEM_SELECTOR, RESULT_ITEM_SELECTOR_TEXT, ".result-item");
define_selector!(HEADING_SELECTOR, HEADING_SELECTOR_TEXT, "h4");
define_selector!(LINK_SELECTOR, LINK_SELECTOR_TEXT, "a");
define_selector!(AUTHOR_REF_SELECTOR, AUTHOR_REF_SELECTOR_TEXT, "p > a.authorref");
define_selector!(
    AUTHOR_PROP_SELECTOR,
    AUTHOR_PROP_SELECTOR_TEXT,
    r#"p[itemprop="author"]"#
);
define_selector!(PRODUCT_AUTHOR_SELECTOR, PRODUCT_AUTHOR_SELECTOR_TEXT, ".product-author");
define_selector!(PAGER_SELECTOR, PAGER_SELECTOR_TEXT, "#pager");
define_selector!(BOOK_TITLE_SELECTOR, BOOK_TITLE_SELECTOR_TEXT, ".book-title");
define_selector!(AUTHORS_TITLE_SELECTOR, AUTHORS_TITLE_SELECTOR_TEXT, ".authors_title");
define_selector!(
    PUBLISHER_SELECTOR,
    PUBLISHER_SELECTOR_TEXT,
    ".publisher_title > span > a"
);
define_selector!(ISBN_SELECTOR, ISBN_SELECTOR_TEXT, r#"[itemprop="isbn"]"#);
define_selector!(STATUS_SELECTOR, STATUS_SELECTOR_TEXT, ".panel-mlol");
define_selector!(
    DESCRIPTION_SELECTOR,
    DESCRIPTION_SELECTOR_TEXT,
    r#"div[itemprop="description"]"#
);
define_selector!(
    KEYWORDS_SELECTOR,
    KEYWORDS_SELECTOR_TEXT,
    r#"span[itemprop="keywords"]"#
);
define_selector!(
    LANGUAGE_SELECTOR,
    LANGUAGE_SELECTOR_TEXT,
    r#"span[itemprop="inLanguage"]"#
);
define_selector!(
    YEAR_SELECTOR,
    YEAR_SELECTOR_TEXT,
    r#"span[itemprop="datePublished"]"#
);
define_selector!(BOLD_SELECTOR, BOLD_SELECTOR_TEXT, "b");
define_selector!(SPAN_SELECTOR, SPAN_SELECTOR_TEXT, "span");
define_selector!(LIBRARY_OPTION_SELECTOR, LIBRARY_OPTION_SELECTOR_TEXT, "#lente > option");
define_selector!(
    RESERVATION_SELECTOR,
    RESERVATION_SELECTOR_TEXT,
    "#mlolreservation div.bottom-buffer"
);
define_selector!(RESERVATION_TITLE_SELECTOR, RESERVATION_TITLE_SELECTOR_TEXT, "div > div > h3");
define_selector!(
    RESERVATION_AUTHOR_SELECTOR,
    RESERVATION_AUTHOR_SELECTOR_TEXT,
    r#"span[itemprop="author"]"#
);
define_selector!(ROW_SELECTOR, ROW_SELECTOR_TEXT, "tr");
define_selector!(RESERVE_OUTCOME_SELECTOR, RESERVE_OUTCOME_SELECTOR_TEXT, "#lblInfo");
define_regex!(CANCEL_ID_REGEX, CANCEL_ID_REGEX_TEXT, r"annullaPr\.aspx\?id=(\d+)$");
define_regex!(DETAIL_ID_REGEX, DETAIL_ID_REGEX_TEXT, r"scheda\.aspx\?id=(\d+)$");
define_regex!(QUEUE_POSITION_REGEX, QUEUE_POSITION_REGEX_TEXT, r"(\d+)°");

/// Reservation timestamps are shown as a date cell and a time cell
const RESERVATION_DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Everything the detail page says about a book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookPage {
    pub title: String,
    pub authors: Vec<String>,
    pub details: BookDetails,
}

impl BookPage {
    pub fn into_book(self, id: impl Into<String>) -> Book {
        Book::new(id, self.title, self.authors).with_details(self.details)
    }
}

/// Extracts the shallow records of one search results page
///
/// # Arguments
/// * `html` - markup of a `/media/ricerca.aspx` response
///
/// # Returns
/// * Records in page order. A page without result items yields an empty Vec;
///   an item whose id or title cannot be read fails the whole page.
pub fn parse_search_page(html: &str) -> Result<Vec<Book>, MlolError> {
    let document = Html::parse_document(html);
    let item_selector = safe_static_selector(RESULT_ITEM_SELECTOR.clone(), RESULT_ITEM_SELECTOR_TEXT)?;

    document
        .select(&item_selector)
        .enumerate()
        .map(|(i, item)| parse_result_item(item, i))
        .collect()
}

fn parse_result_item(item: ElementRef<'_>, index: usize) -> Result<Book, MlolError> {
    let title = item
        .select(&safe_static_selector(HEADING_SELECTOR.clone(), HEADING_SELECTOR_TEXT)?)
        .next()
        .and_then(|h| h.value().attr("title"))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| MlolError::Parse(format!("could not read title of result #{}", index + 1)))?;

    let href = item
        .select(&safe_static_selector(LINK_SELECTOR.clone(), LINK_SELECTOR_TEXT)?)
        .next()
        .and_then(|a| a.value().attr("href"))
        .ok_or_else(|| MlolError::Parse(format!("result #{} has no link", index + 1)))?;

    let id = safe_static_regex(BOOK_ID_REGEX.clone(), BOOK_ID_REGEX_TEXT)?
        .captures(href.trim())
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            MlolError::Parse(format!("could not read id of result #{} from {href}", index + 1))
        })?;

    let authors = match extract_result_authors(item)? {
        Some(line) => split_authors(&line),
        None => {
            warn!("Failed to parse author for book {title}");
            Vec::new()
        }
    };

    Ok(Book::new(id, title, authors))
}

/// Authors appear in one of three layouts depending on the listing template
fn extract_result_authors(item: ElementRef<'_>) -> Result<Option<String>, MlolError> {
    let candidates = [
        (AUTHOR_REF_SELECTOR.clone(), AUTHOR_REF_SELECTOR_TEXT),
        (AUTHOR_PROP_SELECTOR.clone(), AUTHOR_PROP_SELECTOR_TEXT),
        (PRODUCT_AUTHOR_SELECTOR.clone(), PRODUCT_AUTHOR_SELECTOR_TEXT),
    ];
    for (selector, text) in candidates {
        if let Some(line) = select_raw_text_next!(item, &safe_static_selector(selector, text)?) {
            return Ok(Some(line));
        }
    }
    Ok(None)
}

/// Reads the number of result pages from the pager, 1 when there is none
pub fn parse_page_count(html: &str) -> Result<u32, MlolError> {
    let document = Html::parse_document(html);
    let pager = document
        .select(&safe_static_selector(PAGER_SELECTOR.clone(), PAGER_SELECTOR_TEXT)?)
        .next()
        .and_then(|p| p.value().attr("data-pages"));

    Ok(match pager {
        Some(pages) => pages.trim().parse::<u32>().unwrap_or_else(|_| {
            warn!("Unreadable pager value {pages:?}, assuming a single page");
            1
        }),
        None => 1,
    }
    .max(1))
}

/// Reads the library (`lente`) choices offered by the login form
pub fn parse_library_ids(html: &str) -> Result<Vec<String>, MlolError> {
    let document = Html::parse_document(html);
    Ok(document
        .select(&safe_static_selector(
            LIBRARY_OPTION_SELECTOR.clone(),
            LIBRARY_OPTION_SELECTOR_TEXT,
        )?)
        .filter_map(|option| option.value().attr("value"))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect())
}

/// Extracts a book's detail page
///
/// Only the title is mandatory: without it the markup is not a detail page.
/// Every other field falls back to `None` or an empty Vec.
pub fn parse_book_page(html: &str) -> Result<BookPage, MlolError> {
    let document = Html::parse_document(html);

    let title = select_raw_text_next!(
        document,
        &safe_static_selector(BOOK_TITLE_SELECTOR.clone(), BOOK_TITLE_SELECTOR_TEXT)?
    )
    .ok_or_else(|| MlolError::Parse("detail page has no book title".to_string()))?;

    let authors = select_raw_text_next!(
        document,
        &safe_static_selector(AUTHORS_TITLE_SELECTOR.clone(), AUTHORS_TITLE_SELECTOR_TEXT)?
    )
    .map(|line| split_authors(&line))
    .unwrap_or_default();

    let publisher = select_raw_text_next!(
        document,
        &safe_static_selector(PUBLISHER_SELECTOR.clone(), PUBLISHER_SELECTOR_TEXT)?
    );

    let mut isbns: Vec<String> = Vec::new();
    for isbn in select_text!(
        document,
        &safe_static_selector(ISBN_SELECTOR.clone(), ISBN_SELECTOR_TEXT)?
    ) {
        if !isbns.contains(&isbn) {
            isbns.push(isbn);
        }
    }

    let status = select_raw_text_next!(
        document,
        &safe_static_selector(STATUS_SELECTOR.clone(), STATUS_SELECTOR_TEXT)?
    )
    .and_then(|text| {
        let status = BookStatus::from_panel_text(&text);
        if status.is_none() {
            warn!("Unknown status {text:?} for book {title}");
        }
        status
    });

    let description = extract_description(&document)?;
    let categories = extract_categories(&document)?;

    let language = select_raw_text_next!(
        document,
        &safe_static_selector(LANGUAGE_SELECTOR.clone(), LANGUAGE_SELECTOR_TEXT)?
    );

    let year = select_raw_text_next!(
        document,
        &safe_static_selector(YEAR_SELECTOR.clone(), YEAR_SELECTOR_TEXT)?
    )
    .and_then(|text| match text.parse::<i32>() {
        Ok(year) => Some(year),
        Err(_) => {
            warn!("Failed to parse year {text:?} for book {title}");
            None
        }
    });

    let (formats, drm) = match extract_format_line(&document)? {
        Some(line) => {
            let (formats, drm) = parse_format_line(&line);
            (formats, Some(drm))
        }
        None => {
            warn!("Failed to parse formats for book {title}");
            (Vec::new(), None)
        }
    };

    Ok(BookPage {
        title,
        authors,
        details: BookDetails {
            status,
            publisher,
            isbns,
            language,
            description,
            year,
            categories,
            formats,
            drm,
        },
    })
}

/// The description block wraps the text in a child element; fall back to
/// the block's own text when it has none
fn extract_description(document: &Html) -> Result<Option<String>, MlolError> {
    let Some(block) = document
        .select(&safe_static_selector(DESCRIPTION_SELECTOR.clone(), DESCRIPTION_SELECTOR_TEXT)?)
        .next()
    else {
        return Ok(None);
    };

    let text = block
        .children()
        .filter_map(ElementRef::wrap)
        .map(element_text)
        .find(|text| !text.is_empty())
        .unwrap_or_else(|| element_text(block));

    Ok(Some(text).filter(|t| !t.is_empty()))
}

/// Keywords hold one category path per paragraph, e.g. `# in Medicina / Altre branche`
fn extract_categories(document: &Html) -> Result<Vec<Vec<String>>, MlolError> {
    let Some(keywords) = document
        .select(&safe_static_selector(KEYWORDS_SELECTOR.clone(), KEYWORDS_SELECTOR_TEXT)?)
        .next()
    else {
        return Ok(Vec::new());
    };

    let raw = keywords.text().collect::<String>().replace("\r\n", "\n");
    Ok(raw
        .replace("# in ", "")
        .split("\n\n")
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split('/')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect::<Vec<String>>()
        })
        .filter(|path| !path.is_empty())
        .collect())
}

/// Finds the span sitting next to the bold `FORMATO` label
fn extract_format_line(document: &Html) -> Result<Option<String>, MlolError> {
    let span_selector = safe_static_selector(SPAN_SELECTOR.clone(), SPAN_SELECTOR_TEXT)?;
    let line = document
        .select(&safe_static_selector(BOLD_SELECTOR.clone(), BOLD_SELECTOR_TEXT)?)
        .find(|b| b.text().collect::<String>().contains("FORMATO"))
        .and_then(|b| b.ancestors().nth(1))
        .and_then(ElementRef::wrap)
        .and_then(|container| select_raw_text_next!(container, &span_selector));
    Ok(line)
}

/// Splits a line such as `EPUB/PDF con DRM Adobe` into formats and a DRM flag
pub fn parse_format_line(line: &str) -> (Vec<String>, bool) {
    let drm = line.to_lowercase().contains("drm");
    let formats = line
        .split_whitespace()
        .next()
        .map(|first| {
            first
                .split('/')
                .map(|f| f.trim().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect()
        })
        .unwrap_or_default();
    (formats, drm)
}

/// Extracts the reservations listed on the account page (`/user/risorse.aspx`)
///
/// An entry without a cancel link or a book link is skipped with an error
/// logged; the rest of the list is still returned.
pub fn parse_reservations(html: &str) -> Result<Vec<Reservation>, MlolError> {
    let document = Html::parse_document(html);
    let selector = safe_static_selector(RESERVATION_SELECTOR.clone(), RESERVATION_SELECTOR_TEXT)?;

    let mut reservations = Vec::new();
    for (i, item) in document.select(&selector).enumerate() {
        if let Some(reservation) = parse_reservation_item(item, i)? {
            reservations.push(reservation);
        }
    }
    Ok(reservations)
}

/// First link in `item` whose `href` matches `regex`, as its captured id
fn linked_id(item: ElementRef<'_>, regex: &Regex) -> Result<Option<String>, MlolError> {
    let links = safe_static_selector(LINK_SELECTOR.clone(), LINK_SELECTOR_TEXT)?;
    Ok(item
        .select(&links)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| {
            regex
                .captures(href.trim())
                .and_then(|cap| cap.get(1))
                .map(|m| m.as_str().to_string())
        }))
}

fn row_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children().filter_map(ElementRef::wrap).collect()
}

fn parse_reservation_item(item: ElementRef<'_>, index: usize) -> Result<Option<Reservation>, MlolError> {
    let Some(id) = linked_id(item, &safe_static_regex(CANCEL_ID_REGEX.clone(), CANCEL_ID_REGEX_TEXT)?)? else {
        error!("Could not find the id of reservation #{}", index + 1);
        return Ok(None);
    };
    let Some(book_id) = linked_id(item, &safe_static_regex(DETAIL_ID_REGEX.clone(), DETAIL_ID_REGEX_TEXT)?)? else {
        error!("Could not find the book of reservation #{}", index + 1);
        return Ok(None);
    };

    let title = select_raw_text_next!(
        item,
        &safe_static_selector(RESERVATION_TITLE_SELECTOR.clone(), RESERVATION_TITLE_SELECTOR_TEXT)?
    )
    .unwrap_or_default();
    let authors = select_raw_text_next!(
        item,
        &safe_static_selector(RESERVATION_AUTHOR_SELECTOR.clone(), RESERVATION_AUTHOR_SELECTOR_TEXT)?
    )
    .map(|line| split_authors(&line))
    .unwrap_or_default();

    let rows: Vec<ElementRef<'_>> = item
        .select(&safe_static_selector(ROW_SELECTOR.clone(), ROW_SELECTOR_TEXT)?)
        .collect();

    // first row: label, date, time
    let date = match rows.first().map(|row| row_cells(*row)) {
        Some(cells) if cells.len() >= 3 => {
            let raw = format!("{} {}", element_text(cells[1]), element_text(cells[2]));
            match NaiveDateTime::parse_from_str(&raw, RESERVATION_DATE_FORMAT) {
                Ok(date) => Some(date),
                Err(_) => {
                    warn!("Failed to parse date {raw:?} of reservation {id}");
                    None
                }
            }
        }
        _ => None,
    };

    // second row: label, bold status
    let bold = safe_static_selector(BOLD_SELECTOR.clone(), BOLD_SELECTOR_TEXT)?;
    let status = match rows.get(1).map(|row| row_cells(*row)) {
        Some(cells) if cells.len() >= 2 => select_raw_text_next!(cells[1], &bold),
        _ => None,
    };

    Ok(Some(Reservation {
        id,
        book: Book::new(book_id, title, authors),
        date,
        status,
        queue_position: None,
    }))
}

/// Reads the queue position from a `/commons/QueuePos.aspx` answer such as
/// `Sei il 3° utente in coda`
pub fn parse_queue_position(text: &str) -> Result<Option<u32>, MlolError> {
    if !text.contains("in coda") {
        return Ok(None);
    }
    Ok(safe_static_regex(QUEUE_POSITION_REGEX.clone(), QUEUE_POSITION_REGEX_TEXT)?
        .captures(text)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse().ok()))
}

/// The message the reservation form leaves in `#lblInfo`
pub fn parse_reserve_outcome(html: &str) -> Result<Option<String>, MlolError> {
    let document = Html::parse_document(html);
    Ok(select_raw_text_next!(
        document,
        &safe_static_selector(RESERVE_OUTCOME_SELECTOR.clone(), RESERVE_OUTCOME_SELECTOR_TEXT)?
    ))
}
