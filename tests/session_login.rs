//! Session and login behaviour over real HTTP, served by wiremock.
//!
//! The client is blocking, so every client call runs on a blocking thread
//! while the mock server lives on the async runtime. Clients are also dropped
//! on that thread: a blocking reqwest client may not be dropped inside async code.

use mlol_client::{ClientConfig, Fetch, MlolClient, MlolError, PageRequest, Session};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::init_logging;

const QUAMMEN_PAGE: &str = include_str!("fixtures/search_quammen.html");

fn login_redirect(location: &str) -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("Location", location)
}

async fn run_blocking<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    tokio::task::spawn_blocking(f)
        .await
        .expect("blocking task panicked")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_with_known_library() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/login.aspx"))
        .and(body_string_contains("lusername=mario"))
        .and(body_string_contains("lente=413"))
        .respond_with(
            login_redirect("/media/esplora.aspx")
                .insert_header("Set-Cookie", ".ASPXAUTH=0A1B2C; Path=/; HttpOnly"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new()
        .with_domain(server.uri())
        .with_credentials("mario", "segreta")
        .with_library_id("413");
    let (authenticated, username, library_id, has_cookie) = run_blocking(move || {
        let client = MlolClient::new(config).expect("login should succeed");
        let session = client.session();
        (
            client.is_authenticated(),
            session.username().map(str::to_string),
            session.library_id().map(str::to_string),
            session.has_auth_cookie(),
        )
    })
    .await;

    assert!(authenticated);
    assert_eq!(username.as_deref(), Some("mario"));
    assert_eq!(library_id.as_deref(), Some("413"));
    assert!(has_cookie);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_credentials() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/login.aspx"))
        .respond_with(login_redirect("/user/logform.aspx?err=1"))
        .mount(&server)
        .await;

    let config = ClientConfig::new()
        .with_domain(server.uri())
        .with_credentials("mario", "hunter2")
        .with_library_id("413");
    let err = run_blocking(move || MlolClient::new(config))
        .await
        .unwrap_err();

    match err {
        MlolError::Authentication { username, reason } => {
            assert_eq!(username, "mario");
            assert!(reason.contains("rejected"), "{reason}");
        }
        other => panic!("expected an authentication error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_error_on_login_names_the_status() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/login.aspx"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>Errore</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new()
        .with_domain(server.uri())
        .with_credentials("mario", "segreta")
        .with_library_id("413");
    let err = run_blocking(move || MlolClient::new(config))
        .await
        .unwrap_err();

    match err {
        MlolError::Authentication { username, reason } => {
            assert_eq!(username, "mario");
            assert!(reason.contains("HTTP 500"), "{reason}");
            assert!(!reason.contains("rejected"), "{reason}");
        }
        other => panic!("expected an authentication error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_library_is_discovered_from_login_picker() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/home/index.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><select id="lente"><option value="">Scegli</option>
            <option value="11">Biblioteca Uno</option><option value="22">Biblioteca Due</option>
            </select></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/login.aspx"))
        .and(body_string_contains("lente=11"))
        .respond_with(login_redirect("/user/logform.aspx?err=1"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/login.aspx"))
        .and(body_string_contains("lente=22"))
        .respond_with(login_redirect("/media/esplora.aspx"))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new()
        .with_domain(server.uri())
        .with_credentials("mario", "segreta");
    let library_id = run_blocking(move || {
        let client = MlolClient::new(config).expect("second library should accept the login");
        client.session().library_id().map(str::to_string)
    })
    .await;
    assert_eq!(library_id.as_deref(), Some("22"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_portal_without_libraries_rejects_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/home/index.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&server)
        .await;

    let config = ClientConfig::new()
        .with_domain(server.uri())
        .with_credentials("mario", "segreta");
    let err = run_blocking(move || MlolClient::new(config))
        .await
        .unwrap_err();
    assert!(matches!(err, MlolError::Authentication { .. }), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_anonymous_search_over_http() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/ricerca.aspx"))
        .and(query_param("keywords", "Quammen"))
        .and(query_param("seltip", "310"))
        .and(query_param("nris", "48"))
        .respond_with(ResponseTemplate::new(200).set_body_string(QUAMMEN_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new().with_domain(server.uri());
    let titles = run_blocking(move || {
        let client = MlolClient::new(config)?;
        assert!(!client.is_authenticated());
        let pages = client
            .search_books("Quammen", false)
            .collect::<Result<Vec<_>, _>>()?;
        Ok::<_, MlolError>(
            pages
                .into_iter()
                .flatten()
                .map(|b| b.title)
                .collect::<Vec<_>>(),
        )
    })
    .await
    .unwrap();

    assert_eq!(titles.len(), 3);
    assert_eq!(titles[1], "L'albero intricato");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_detail_redirect_to_alert_page_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/scheda.aspx"))
        .and(query_param("id", "999"))
        .respond_with(login_redirect("/commons/alert.aspx?msg=404"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/commons/alert.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Titolo non disponibile</html>"))
        .mount(&server)
        .await;

    let config = ClientConfig::new().with_domain(server.uri());
    let err = run_blocking(move || {
        let session = Session::open(&config)?;
        MlolClient::from_session(session).get_book_by_id("999")
    })
    .await
    .unwrap_err();
    assert!(matches!(err, MlolError::Parse(ref m) if m.contains("not available")), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_redirect_loop_stops_after_the_hop_limit() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/esplora.aspx"))
        .respond_with(login_redirect("/media/esplora.aspx"))
        .expect(6)
        .mount(&server)
        .await;

    let config = ClientConfig::new().with_domain(server.uri());
    let err = run_blocking(move || {
        let session = Session::open(&config)?;
        session.fetch(&PageRequest::new("/media/esplora.aspx"))
    })
    .await
    .unwrap_err();

    match err {
        MlolError::Status { url, status } => {
            assert_eq!(status, 302);
            assert!(url.ends_with("/media/esplora.aspx"), "{url}");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}
