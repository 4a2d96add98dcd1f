//! Download flow against an in-memory portal.

use mlol_client::download::{download_book, download_by_id};
use mlol_client::{Book, DownloadFormat, MlolError};

mod support;
use support::{FakePortal, book_key, book_page, download_key, init_logging};

const ACSM: &[u8] = b"<fulfillmentToken fulfillmentType=\"loan\" xmlns=\"http://ns.adobe.com/adept\"></fulfillmentToken>";

fn spillover() -> Book {
    Book::new(
        "150208516",
        "Spillover. L'evoluzione delle pandemie",
        vec!["David Quammen".to_string()],
    )
}

fn assert_download_error(err: MlolError, needle: &str) {
    match err {
        MlolError::Download { id, reason } => {
            assert_eq!(id, "150208516");
            assert!(reason.contains(needle), "unexpected reason: {reason}");
        }
        other => panic!("expected a download error, got {other:?}"),
    }
}

fn download_requested(portal: &FakePortal) -> bool {
    portal
        .requested_keys()
        .iter()
        .any(|key| key.starts_with("/media/downloadebadok.aspx"))
}

#[test]
fn test_available_book_downloads_first_supported_format() {
    init_logging();
    let portal = FakePortal::authenticated()
        .page(
            &book_key("150208516"),
            200,
            book_page("Spillover", "David Quammen", "SCARICA", "EPUB con DRM Adobe"),
        )
        .page(&download_key("150208516", "epub"), 200, ACSM);

    let file = download_book(&portal, &spillover()).expect("download should succeed");
    assert_eq!(file.format, DownloadFormat::Epub);
    assert_eq!(file.bytes, ACSM);

    let requests = portal.requests();
    let download = requests.last().unwrap();
    assert!(download.headers.iter().any(|(name, value)| name == "Referer"
        && value.ends_with("/media/downloadebad2.aspx?unid=150208516&form=epub")));
}

#[test]
fn test_pdf_is_used_when_listed_first() {
    let portal = FakePortal::authenticated()
        .page(
            &book_key("150208516"),
            200,
            book_page("Spillover", "David Quammen", "Scarica", "PDF/EPUB con DRM Adobe"),
        )
        .page(&download_key("150208516", "pdf"), 200, ACSM);

    let file = download_by_id(&portal, "150208516").unwrap();
    assert_eq!(file.format, DownloadFormat::Pdf);
    assert!(!file.bytes.is_empty());
}

#[test]
fn test_anonymous_session_cannot_download() {
    let portal = FakePortal::anonymous();
    let err = download_book(&portal, &spillover()).unwrap_err();
    assert_download_error(err, "authenticated");
    assert!(portal.requests().is_empty());
}

#[test]
fn test_taken_book_is_refused_without_requesting_the_file() {
    let portal = FakePortal::authenticated().page(
        &book_key("150208516"),
        200,
        book_page("Spillover", "David Quammen", "Occupato", "EPUB con DRM Adobe"),
    );

    let err = download_book(&portal, &spillover()).unwrap_err();
    assert_download_error(err, "taken");
    assert!(!download_requested(&portal));
}

#[test]
fn test_owned_book_is_refused() {
    let portal = FakePortal::authenticated().page(
        &book_key("150208516"),
        200,
        book_page("Spillover", "David Quammen", "Ripeti download", "EPUB"),
    );

    let err = download_book(&portal, &spillover()).unwrap_err();
    assert!(err.to_string().contains("re-downloading it is not supported"), "{err}");
    assert_download_error(err, "already on loan");
    assert!(!download_requested(&portal));
}

#[test]
fn test_unsupported_formats_only() {
    let portal = FakePortal::authenticated().page(
        &book_key("150208516"),
        200,
        book_page("Spillover", "David Quammen", "Scarica", "MOBI senza DRM"),
    );

    let err = download_book(&portal, &spillover()).unwrap_err();
    assert_download_error(err, "no supported format");
    assert!(!download_requested(&portal));
}

#[test]
fn test_html_answer_is_a_refusal() {
    let portal = FakePortal::authenticated()
        .page(
            &book_key("150208516"),
            200,
            book_page("Spillover", "David Quammen", "Scarica", "EPUB con DRM Adobe"),
        )
        .page(
            &download_key("150208516", "epub"),
            200,
            "<!DOCTYPE html><html><body>Prestiti esauriti</body></html>",
        );

    let err = download_book(&portal, &spillover()).unwrap_err();
    assert_download_error(err, "web page");
}

#[test]
fn test_failed_transfer_is_reported() {
    let portal = FakePortal::authenticated().page(
        &book_key("150208516"),
        200,
        book_page("Spillover", "David Quammen", "Scarica", "EPUB con DRM Adobe"),
    );

    // the download route is not registered, so the fake answers 404
    let err = download_book(&portal, &spillover()).unwrap_err();
    assert_download_error(err, "HTTP 404");
}

#[test]
fn test_detail_failure_becomes_download_error() {
    let portal = FakePortal::authenticated().page(&book_key("150208516"), 503, "busy");
    let err = download_book(&portal, &spillover()).unwrap_err();
    assert_download_error(err, "503");
}
