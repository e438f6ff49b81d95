mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

use catalog_mirror::clients::Translator;
use catalog_mirror::models::SourceOption;
use catalog_mirror::sync::FixedDelayPacer;

use common::{chat_reply, router, serve, test_config, MockShop};

fn translator(cfg: &catalog_mirror::config::Config) -> Translator {
    Translator::new(cfg, Arc::new(FixedDelayPacer::none())).unwrap()
}

#[tokio::test]
async fn test_malformed_replies_fall_back_to_original_text() {
    let shop = Arc::new(MockShop {
        translation_reply: Some("Sure! Here is the translation: {title: oops".to_string()),
        ..MockShop::default()
    });
    let base = serve(router(shop.clone())).await;
    let mut cfg = test_config(&base);
    cfg.translation_max_retries = 3;

    let out = translator(&cfg).translate("ドリップバッグ", "<p>香り高い</p>", &[]).await;

    assert_eq!(out.title, "ドリップバッグ");
    assert_eq!(out.description_html, "<p>香り高い</p>");
    assert!(out.option_labels.is_empty());
    assert_eq!(shop.count("POST /chat/completions"), 3);
}

#[tokio::test]
async fn test_server_errors_are_retried_up_to_the_ceiling() {
    let shop = Arc::new(MockShop::default());
    let base = serve(router(shop.clone())).await;
    let mut cfg = test_config(&base);
    cfg.translation_max_retries = 2;

    let out = translator(&cfg).translate("マグ", "", &[]).await;

    assert_eq!(out.title, "マグ");
    assert_eq!(shop.count("POST /chat/completions"), 2);
}

#[tokio::test]
async fn test_fenced_reply_is_parsed_with_option_labels() {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let app = Router::new().route(
        "/chat/completions",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let h = h.clone();
            async move {
                h.fetch_add(1, Ordering::SeqCst);
                let authorized = headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer sk-test");
                if !authorized || body["model"] != "gpt-4o-mini" {
                    return (StatusCode::UNAUTHORIZED, "nope").into_response();
                }
                let content = "```json\n{\"title\":\"濾掛咖啡\",\"body_html\":\"<p>香氣濃郁</p>\",\"option_labels\":[\"尺寸\",\"小\",\"大\"]}\n```";
                Json(chat_reply(content)).into_response()
            }
        }),
    );
    let base = serve(app).await;
    let options = vec![SourceOption { name: Some("サイズ".to_string()), values: vec!["S".to_string(), "L".to_string()] }];

    let out = translator(&test_config(&base)).translate("ドリップバッグ", "<p>香り高い</p>", &options).await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(out.title, "濾掛咖啡");
    assert_eq!(out.description_html, "<p>香氣濃郁</p>");
    assert_eq!(out.option_label("サイズ"), "尺寸");
    assert_eq!(out.option_label("S"), "小");
    assert_eq!(out.option_label("L"), "大");
    assert_eq!(out.option_label("M"), "M");
}

#[tokio::test]
async fn test_missing_fields_keep_originals_per_field() {
    let shop = Arc::new(MockShop {
        translation_reply: Some("{\"title\":\"只有標題\",\"option_labels\":[\"尺寸\"]}".to_string()),
        ..MockShop::default()
    });
    let base = serve(router(shop.clone())).await;
    let options = vec![SourceOption { name: Some("サイズ".to_string()), values: vec!["S".to_string()] }];

    let out = translator(&test_config(&base)).translate("タイトル", "<p>説明</p>", &options).await;

    assert_eq!(out.title, "只有標題");
    assert_eq!(out.description_html, "<p>説明</p>");
    // Label count does not match what was sent, so none are applied.
    assert!(out.option_labels.is_empty());
    assert_eq!(shop.count("POST /chat/completions"), 1);
}
