//! Translation pass-through tests
//!
//! Runs the translator against a stub transport; no network access.

use std::sync::Arc;

use linguify::translate::{MISSING_KEY_REASON, translation_error};
use linguify::{Config, Language, TRANSLATION_ERROR_MARKER, Translator, is_translation_error};

mod common;
use common::StubTransport;

const OK_BODY: &str = r#"{"translations":[{"detected_source_language":"EN","text":"Bonjour"}]}"#;

fn translator(transport: &Arc<StubTransport>, config: &Config) -> Translator {
    Translator::new(Arc::clone(transport) as Arc<dyn linguify::TranslateTransport>, config)
}

#[tokio::test]
async fn test_missing_key_never_touches_transport() {
    let transport = Arc::new(StubTransport::ok(200, OK_BODY));
    let translator = translator(&transport, &Config::default());

    let result = translator.translate("Good morning", Language::French).await;

    assert!(result.contains(TRANSLATION_ERROR_MARKER));
    assert_eq!(result, translation_error(MISSING_KEY_REASON));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_blank_key_counts_as_missing() {
    let transport = Arc::new(StubTransport::ok(200, OK_BODY));
    let config = Config::default().with_deepl_key("   ");
    let translator = translator(&transport, &config);

    let result = translator.translate("Good morning", Language::French).await;

    assert!(is_translation_error(&result));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_success_returns_first_translation() {
    let transport = Arc::new(StubTransport::ok(
        200,
        r#"{"translations":[{"text":"Bonjour"},{"text":"Salut"}]}"#,
    ));
    let config = Config::default().with_deepl_key("secret:fx");
    let translator = translator(&transport, &config);

    let result = translator.translate("Good morning", Language::French).await;

    assert_eq!(result, "Bonjour");
    assert_eq!(transport.calls(), 1);

    let sent = transport.last_request().unwrap();
    assert_eq!(sent.api_key, "secret:fx");
    assert!(sent.form.contains(&("text".to_string(), "Good morning".to_string())));
    assert!(sent.form.contains(&("target_lang".to_string(), "FR".to_string())));
}

#[tokio::test]
async fn test_free_key_uses_free_endpoint() {
    let transport = Arc::new(StubTransport::ok(200, OK_BODY));
    let config = Config::default().with_deepl_key("abc:fx");
    translator(&transport, &config)
        .translate("Hi", Language::German)
        .await;

    let sent = transport.last_request().unwrap();
    assert!(sent.url.starts_with("https://api-free.deepl.com/"), "{}", sent.url);
}

#[tokio::test]
async fn test_pro_key_uses_pro_endpoint() {
    let transport = Arc::new(StubTransport::ok(200, OK_BODY));
    let config = Config::default().with_deepl_key("abc");
    translator(&transport, &config)
        .translate("Hi", Language::Japanese)
        .await;

    let sent = transport.last_request().unwrap();
    assert!(sent.url.starts_with("https://api.deepl.com/"), "{}", sent.url);
    assert!(sent.form.contains(&("target_lang".to_string(), "JA".to_string())));
}

#[tokio::test]
async fn test_endpoint_override() {
    let transport = Arc::new(StubTransport::ok(200, OK_BODY));
    let config = Config::default()
        .with_deepl_key("abc")
        .with_deepl_url("http://127.0.0.1:8080/v2/translate");
    translator(&transport, &config)
        .translate("Hi", Language::Italian)
        .await;

    assert_eq!(
        transport.last_request().unwrap().url,
        "http://127.0.0.1:8080/v2/translate"
    );
}

#[tokio::test]
async fn test_non_success_status_is_sentinel() {
    let transport = Arc::new(StubTransport::ok(403, r#"{"message":"Wrong endpoint"}"#));
    let config = Config::default().with_deepl_key("abc");

    let result = translator(&transport, &config)
        .translate("Hi", Language::Spanish)
        .await;

    assert!(is_translation_error(&result));
    assert!(result.contains("403"), "{result}");
    assert!(result.ends_with(']'));
}

#[tokio::test]
async fn test_malformed_body_is_sentinel() {
    let transport = Arc::new(StubTransport::ok(200, "<html>busy</html>"));
    let config = Config::default().with_deepl_key("abc");

    let result = translator(&transport, &config)
        .translate("Hi", Language::Spanish)
        .await;

    assert!(is_translation_error(&result), "{result}");
}

#[tokio::test]
async fn test_empty_translations_is_sentinel() {
    let transport = Arc::new(StubTransport::ok(200, r#"{"translations":[]}"#));
    let config = Config::default().with_deepl_key("abc");

    let result = translator(&transport, &config)
        .translate("Hi", Language::Spanish)
        .await;

    assert!(is_translation_error(&result), "{result}");
}

#[tokio::test]
async fn test_transport_failure_is_sentinel() {
    let transport = Arc::new(StubTransport::failing("connection refused"));
    let config = Config::default().with_deepl_key("abc");

    let result = translator(&transport, &config)
        .translate("Hi", Language::Spanish)
        .await;

    assert!(is_translation_error(&result));
    assert!(result.contains("connection refused"), "{result}");
    assert_eq!(transport.calls(), 1);
}
