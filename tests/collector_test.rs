// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - BotRecon Collector Tests
 * Tests for artifact collection, script fetching, and fault isolation
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use botrecon::collector::ArtifactCollector;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

#[tokio::test]
async fn collects_forms_handlers_and_scripts() {
    let mock_server = MockServer::start().await;

    let html = r#"
        <!DOCTYPE html>
        <html>
        <body>
            <form action="/ask" method="POST" id="chat-form">
                <input type="text" name="question" />
                <textarea name="context"></textarea>
            </form>
            <button id="send" onclick="submitQuestion()">Send</button>
            <script src="/app.js"></script>
            <script>
                // dead call: fetch("/commented-out")
                function submitQuestion() { fetch("/api/chat"); }
            </script>
        </body>
        </html>
    "#;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/app.js"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("/* helper */ function ask(q) { return fetch('/api/v2/chat'); }"),
        )
        .mount(&mock_server)
        .await;

    let collector = ArtifactCollector::new().unwrap();
    let artifacts = collector.collect(&mock_server.uri()).await.unwrap();

    assert_eq!(artifacts.forms.len(), 1);
    let form = &artifacts.forms[0];
    assert_eq!(form.action, "/ask");
    assert_eq!(form.method, "POST");
    assert_eq!(form.id, "chat-form");
    assert_eq!(form.inputs.len(), 2);

    assert_eq!(artifacts.button_handlers.len(), 1);
    assert_eq!(artifacts.button_handlers[0].handler_name, "submitQuestion");

    assert_eq!(artifacts.inline_scripts.len(), 1);
    assert!(!artifacts.inline_scripts[0].contains("commented-out"));

    assert_eq!(artifacts.external_scripts.len(), 1);
    let external = &artifacts.external_scripts[0];
    assert!(external.error.is_none());
    assert!(external.code.contains("/api/v2/chat"));
    assert!(!external.code.contains("helper"));

    // Inline first, then successfully fetched externals.
    assert_eq!(artifacts.combined_scripts.len(), 2);
    assert_eq!(artifacts.combined_scripts[0].source, "inline-1");
    assert!(artifacts.combined_scripts[1].source.contains("/app.js"));
}

#[tokio::test]
async fn external_script_failure_does_not_abort_collection() {
    let mock_server = MockServer::start().await;

    let html = r#"
        <html><body>
            <script src="/missing.js"></script>
            <script src="/good.js"></script>
        </body></html>
    "#;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing.js"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/good.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fetch('/api/chat');"))
        .mount(&mock_server)
        .await;

    let collector = ArtifactCollector::new().unwrap();
    let artifacts = collector.collect(&mock_server.uri()).await.unwrap();

    assert_eq!(artifacts.external_scripts.len(), 2);
    let missing = artifacts
        .external_scripts
        .iter()
        .find(|s| s.url.contains("missing"))
        .unwrap();
    assert_eq!(missing.error.as_deref(), Some("http-404"));
    assert!(missing.code.is_empty());

    let good = artifacts
        .external_scripts
        .iter()
        .find(|s| s.url.contains("good"))
        .unwrap();
    assert!(good.error.is_none());

    // Failed scripts are excluded from the combined analysis set.
    assert_eq!(artifacts.combined_scripts.len(), 1);
}

#[tokio::test]
async fn page_fetch_failure_propagates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let collector = ArtifactCollector::new().unwrap();
    let error = collector.collect(&mock_server.uri()).await.unwrap_err();
    assert!(error.to_string().contains("fetch-failed"));
    assert!(error.to_string().contains("http-500"));
}

#[tokio::test]
async fn final_page_url_reflects_redirects() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "/app/"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/app/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>ok</body></html>"))
        .mount(&mock_server)
        .await;

    let collector = ArtifactCollector::new().unwrap();
    let artifacts = collector.collect(&mock_server.uri()).await.unwrap();
    assert!(artifacts.final_page_url.ends_with("/app/"));
}
