//! Tests for smart balancing across the provider registry
//!
//! These tests verify candidate ordering, credential skipping, fallback on
//! failure and the health bookkeeping the dispatcher performs.

mod common;

use chrono::{Duration, Utc};
use common::{canonical_body, gemini_ok, openai_ok, Scripted, ScriptedTransport};
use relay_core::http::ProviderKeys;
use relay_core::providers::{
    CostTier, Dispatcher, HealthPolicy, Preference, ProviderDescriptor, ProviderKind,
    ProviderRegistry, RelayError,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

fn test_registry(policy: HealthPolicy) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new(policy);
    registry.register(ProviderDescriptor::new(
        ProviderKind::Anthropic,
        "anthropic",
        "https://anthropic.test/v1/messages",
        CostTier::Paid,
    ));
    registry.register(ProviderDescriptor::new(
        ProviderKind::OpenAi,
        "openai",
        "https://openai.test/v1/chat/completions",
        CostTier::Cheap,
    ));
    registry.register(ProviderDescriptor::new(
        ProviderKind::Gemini,
        "gemini",
        "https://gemini.test/models/{model}:generateContent",
        CostTier::Free,
    ));
    registry
}

fn dispatcher(transport: Arc<ScriptedTransport>) -> Dispatcher {
    Dispatcher::new(Arc::new(test_registry(HealthPolicy::default())), transport)
}

fn all_keys() -> ProviderKeys {
    ProviderKeys::default()
        .with_key("gemini", "g-key")
        .with_key("openai", "o-key")
        .with_key("anthropic", "a-key")
}

fn names(dispatcher: &Dispatcher, preference: &Preference) -> Vec<String> {
    dispatcher
        .candidate_order(preference)
        .iter()
        .map(|p| p.name.clone())
        .collect()
}

#[test]
fn test_preference_parsing() {
    assert_eq!(Preference::parse(None), Preference::Auto);
    assert_eq!(Preference::parse(Some("")), Preference::Auto);
    assert_eq!(Preference::parse(Some("AUTO")), Preference::Auto);
    assert_eq!(
        Preference::parse(Some("Gemini")),
        Preference::Named("gemini".into())
    );
    assert_eq!(
        Preference::from_request(Some("qwen"), Some("openai")),
        Preference::Named("qwen".into())
    );
    assert_eq!(
        Preference::from_request(None, Some("openai")),
        Preference::Named("openai".into())
    );
}

#[test]
fn test_auto_orders_by_cost_tier() {
    let dispatcher = dispatcher(Arc::new(ScriptedTransport::new()));
    assert_eq!(
        names(&dispatcher, &Preference::Auto),
        vec!["gemini", "openai", "anthropic"]
    );
}

#[test]
fn test_default_registry_puts_free_and_cheap_first() {
    let dispatcher = Dispatcher::new(
        Arc::new(ProviderRegistry::default()),
        Arc::new(ScriptedTransport::new()),
    );
    assert_eq!(
        names(&dispatcher, &Preference::Auto),
        vec!["anyrouter", "gemini", "qwen", "cerebras", "openai", "anthropic"]
    );
}

#[test]
fn test_named_preference_goes_first() {
    let dispatcher = dispatcher(Arc::new(ScriptedTransport::new()));
    assert_eq!(
        names(&dispatcher, &Preference::Named("openai".into())),
        vec!["openai", "anthropic", "gemini"]
    );
}

#[test]
fn test_unknown_preference_uses_registry_order() {
    let dispatcher = dispatcher(Arc::new(ScriptedTransport::new()));
    assert_eq!(
        names(&dispatcher, &Preference::Named("mistral".into())),
        vec!["anthropic", "openai", "gemini"]
    );
}

#[test]
fn test_unhealthy_excluded_from_auto_but_not_named() {
    let dispatcher = dispatcher(Arc::new(ScriptedTransport::new()));
    for _ in 0..3 {
        dispatcher.registry().mark_failure("gemini");
    }

    assert_eq!(
        names(&dispatcher, &Preference::Auto),
        vec!["openai", "anthropic"]
    );
    assert_eq!(
        names(&dispatcher, &Preference::Named("gemini".into()))[0],
        "gemini"
    );
}

#[test]
fn test_recovery_window_readmits_provider() {
    let policy = HealthPolicy {
        failure_threshold: 1,
        recovery_secs: Some(30),
    };
    let dispatcher = Dispatcher::new(
        Arc::new(test_registry(policy)),
        Arc::new(ScriptedTransport::new()),
    );
    let failed_at = Utc::now();
    dispatcher.registry().mark_failure_at("gemini", failed_at);

    let soon = dispatcher.candidate_order_at(&Preference::Auto, failed_at + Duration::seconds(10));
    assert!(soon.iter().all(|p| p.name != "gemini"));

    let later = dispatcher.candidate_order_at(&Preference::Auto, failed_at + Duration::seconds(31));
    assert_eq!(later[0].name, "gemini");
}

#[tokio::test]
async fn test_first_candidate_success() {
    let transport = Arc::new(
        ScriptedTransport::new().on("gemini.test", vec![Scripted::Json(200, gemini_ok("hello"))]),
    );
    let dispatcher = dispatcher(Arc::clone(&transport));

    let result = dispatcher
        .dispatch(
            &Preference::Auto,
            &all_keys(),
            canonical_body("claude-3-haiku", "hi"),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert_eq!(result.provider_used, "gemini");
    assert!(!result.used_fallback);
    assert_eq!(result.attempts, 1);
    assert!(result.provider_errors.is_empty());

    let response = result.reply.canonical().unwrap();
    assert_eq!(response.text_content(), "hello");
    assert_eq!(response.model, "claude-3-haiku");

    assert_eq!(
        transport.urls(),
        vec!["https://gemini.test/models/gemini-1.5-flash:generateContent"]
    );
    let sent = &transport.requests()[0];
    assert_eq!(sent.headers.get("x-goog-api-key").map(String::as_str), Some("g-key"));
    assert_eq!(sent.body["contents"][0]["parts"][0]["text"], "hi");
}

#[tokio::test]
async fn test_skips_providers_without_key() {
    let transport = Arc::new(
        ScriptedTransport::new().on("openai.test", vec![Scripted::Json(200, openai_ok("yo"))]),
    );
    let dispatcher = dispatcher(Arc::clone(&transport));
    let keys = ProviderKeys::default().with_key("openai", "o-key");

    let result = dispatcher
        .dispatch(
            &Preference::Auto,
            &keys,
            canonical_body("claude-3-haiku", "hi"),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert_eq!(result.provider_used, "openai");
    assert_eq!(result.skipped, vec!["gemini".to_string()]);
    assert_eq!(result.attempts, 1);
    assert_eq!(transport.requests().len(), 1);

    let gemini = dispatcher.registry().get("gemini").unwrap();
    assert_eq!(gemini.health().fail_count, 0);
}

#[tokio::test]
async fn test_server_side_key_used_when_header_missing() {
    let mut registry = ProviderRegistry::new(HealthPolicy::default());
    let mut descriptor = ProviderDescriptor::new(
        ProviderKind::OpenAi,
        "openai",
        "https://openai.test/v1/chat/completions",
        CostTier::Paid,
    );
    descriptor.api_key = Some("configured".into());
    registry.register(descriptor);

    let transport = Arc::new(
        ScriptedTransport::new().on("openai.test", vec![Scripted::Json(200, openai_ok("ok"))]),
    );
    let dispatcher = Dispatcher::new(Arc::new(registry), transport.clone());

    dispatcher
        .dispatch(
            &Preference::Auto,
            &ProviderKeys::default(),
            canonical_body("m", "hi"),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert_eq!(
        transport.requests()[0].headers.get("Authorization").map(String::as_str),
        Some("Bearer configured")
    );
}

#[tokio::test]
async fn test_falls_back_and_marks_failure() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("gemini.test", vec![Scripted::Text(500, "boom")])
            .on("openai.test", vec![Scripted::Json(200, openai_ok("fallback"))]),
    );
    let dispatcher = dispatcher(Arc::clone(&transport));

    let result = dispatcher
        .dispatch(
            &Preference::Auto,
            &all_keys(),
            canonical_body("claude-3-haiku", "hi"),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert_eq!(result.provider_used, "openai");
    assert!(result.used_fallback);
    assert_eq!(result.attempts, 2);
    assert!(result.provider_errors["gemini"].contains("500"));

    let gemini = dispatcher.registry().get("gemini").unwrap().health();
    assert_eq!(gemini.fail_count, 1);
    assert!(gemini.healthy);
}

#[tokio::test]
async fn test_empty_candidates_advance_to_next_provider() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("gemini.test", vec![Scripted::Json(200, json!({"candidates": []}))])
            .on("openai.test", vec![Scripted::Json(200, openai_ok("second"))]),
    );
    let dispatcher = dispatcher(transport);

    let result = dispatcher
        .dispatch(
            &Preference::Auto,
            &all_keys(),
            canonical_body("claude-3-haiku", "hi"),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert_eq!(result.provider_used, "openai");
    assert_eq!(result.reply.canonical().unwrap().text_content(), "second");
}

#[tokio::test]
async fn test_passthrough_provider_returns_raw_body() {
    let transport = Arc::new(ScriptedTransport::new().on(
        "anthropic.test",
        vec![Scripted::Json(200, json!({"id": "msg_1", "type": "message"}))],
    ));
    let dispatcher = dispatcher(Arc::clone(&transport));
    let body = canonical_body("claude-3-haiku", "hi");

    let result = dispatcher
        .dispatch(
            &Preference::Named("anthropic".into()),
            &all_keys(),
            body.clone(),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert!(result.reply.canonical().is_none());
    assert_eq!(transport.requests()[0].body, body);
}

#[tokio::test]
async fn test_all_fail_is_unavailable() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("gemini.test", vec![Scripted::Fail("connection refused")])
            .on("openai.test", vec![Scripted::Text(502, "bad gateway")])
            .on("anthropic.test", vec![Scripted::Text(401, "nope")]),
    );
    let dispatcher = dispatcher(Arc::clone(&transport));

    let err = dispatcher
        .dispatch(
            &Preference::Auto,
            &all_keys(),
            canonical_body("claude-3-haiku", "hi"),
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::AllProvidersUnavailable));
    assert_eq!(err.status_code(), 503);
    assert_eq!(err.to_string(), "All providers unavailable");
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn test_repeated_failures_remove_provider_from_auto() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("gemini.test", vec![Scripted::Text(500, "down")])
            .on("openai.test", vec![Scripted::Json(200, openai_ok("ok"))]),
    );
    let dispatcher = dispatcher(Arc::clone(&transport));

    for _ in 0..3 {
        dispatcher
            .dispatch(
                &Preference::Auto,
                &all_keys(),
                canonical_body("m", "hi"),
                Uuid::new_v4(),
            )
            .await
            .unwrap();
    }
    assert!(!dispatcher.registry().get("gemini").unwrap().is_healthy());

    let result = dispatcher
        .dispatch(
            &Preference::Auto,
            &all_keys(),
            canonical_body("m", "hi"),
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    assert_eq!(result.attempts, 1);
    assert!(!result.used_fallback);
    assert_eq!(transport.requests().len(), 7);
}

#[tokio::test]
async fn test_success_resets_health() {
    let transport = Arc::new(
        ScriptedTransport::new().on(
            "gemini.test",
            vec![
                Scripted::Text(500, "down"),
                Scripted::Json(200, gemini_ok("back")),
            ],
        ),
    );
    let dispatcher = dispatcher(transport);
    let keys = ProviderKeys::default().with_key("gemini", "g-key");

    let first = dispatcher
        .dispatch(
            &Preference::Named("gemini".into()),
            &keys,
            canonical_body("m", "hi"),
            Uuid::new_v4(),
        )
        .await;
    assert!(first.is_err());
    assert_eq!(dispatcher.registry().get("gemini").unwrap().health().fail_count, 1);

    dispatcher
        .dispatch(
            &Preference::Named("gemini".into()),
            &keys,
            canonical_body("m", "hi"),
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    assert_eq!(dispatcher.registry().get("gemini").unwrap().health().fail_count, 0);
}

#[tokio::test]
async fn test_invalid_body_rejected_before_dispatch() {
    let transport = Arc::new(ScriptedTransport::new());
    let dispatcher = dispatcher(Arc::clone(&transport));

    let err = dispatcher
        .dispatch(
            &Preference::Auto,
            &all_keys(),
            json!({"model": "m", "messages": []}),
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
    assert!(transport.requests().is_empty());
}
