use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::mapping::{DEFAULT_OPTION_NAME, DEFAULT_OPTION_VALUE};
use crate::models::*;
use crate::sync::pacing::{PaceStep, RequestPacer};

/// JSON shape sent for translation and expected back.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct TranslationContent {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    option_labels: Option<Vec<String>>,
}

/// Translates listing text through an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct Translator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    source_language: String,
    target_language: String,
    max_attempts: u32,
    pacer: Arc<dyn RequestPacer>,
}

impl Translator {
    pub fn new(cfg: &Config, pacer: Arc<dyn RequestPacer>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.translation_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", cfg.translation_api_base.trim_end_matches('/')),
            api_key: cfg.translation_api_key.clone(),
            model: cfg.translation_model.clone(),
            source_language: cfg.translation_source_language.clone(),
            target_language: cfg.translation_target_language.clone(),
            max_attempts: cfg.translation_max_retries.max(1),
            pacer,
        })
    }

    /// Never fails: after the last attempt the original text comes back.
    pub async fn translate(&self, title: &str, description_html: &str, options: &[SourceOption]) -> TranslatedText {
        let labels = translatable_labels(options);
        let content = TranslationContent {
            title: Some(title.to_string()),
            body_html: Some(description_html.to_string()),
            option_labels: (!labels.is_empty()).then(|| labels.clone()),
        };

        for attempt in 1..=self.max_attempts {
            match self.request(&content).await {
                Ok(reply) => return merge(title, description_html, &labels, reply),
                Err(e) => {
                    tracing::warn!(attempt, max_attempts = self.max_attempts, error = %e, "Translation attempt failed");
                    if attempt < self.max_attempts {
                        self.pacer.wait(PaceStep::TranslationRetry).await;
                    }
                }
            }
        }

        tracing::warn!(title = %title, attempts = self.max_attempts, "Translation retries exhausted; keeping original text");
        TranslatedText::untranslated(title, description_html)
    }

    async fn request(&self, content: &TranslationContent) -> Result<TranslationContent> {
        let instructions = format!(
            "Translate the values of the following JSON from {src} into {dst}. \
             Keep HTML tags and structure intact and translate only the text. \
             Keep proper nouns such as product line names in their original form. \
             Keep units of weight and volume unchanged. \
             Return only JSON with the same keys and the same number of option_labels entries, without commentary.\n\n{json}",
            src = self.source_language,
            dst = self.target_language,
            json = serde_json::to_string_pretty(content)?,
        );
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You are a professional translator. Reply with JSON only."},
                {"role": "user", "content": instructions},
            ],
            "temperature": 0.3,
            "max_tokens": 4000,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(MirrorError::Api { status: status.as_u16(), body: text });
        }

        let result: Value = response.json().await?;
        let reply = result
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| MirrorError::Translation("response carried no message content".to_string()))?;

        let parsed: TranslationContent = serde_json::from_str(strip_code_fence(reply))?;
        Ok(parsed)
    }
}

/// Option names and values worth translating, without placeholders or repeats.
fn translatable_labels(options: &[SourceOption]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    let mut push = |s: &str| {
        if !s.trim().is_empty() && !labels.iter().any(|l| l == s) {
            labels.push(s.to_string());
        }
    };
    for opt in options {
        if let Some(name) = opt.name.as_deref() {
            if name != DEFAULT_OPTION_NAME {
                push(name);
            }
        }
        for value in &opt.values {
            if value != DEFAULT_OPTION_VALUE {
                push(value);
            }
        }
    }
    labels
}

fn merge(title: &str, description_html: &str, sent_labels: &[String], reply: TranslationContent) -> TranslatedText {
    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let mut translated = TranslatedText {
        title: non_empty(reply.title).unwrap_or_else(|| title.to_string()),
        description_html: non_empty(reply.body_html).unwrap_or_else(|| description_html.to_string()),
        option_labels: Default::default(),
    };
    // Labels pair up by position, so a reply of a different length is ignored.
    if let Some(labels) = reply.option_labels {
        if labels.len() == sent_labels.len() {
            for (original, label) in sent_labels.iter().zip(labels) {
                if !label.trim().is_empty() {
                    translated.option_labels.insert(original.clone(), label);
                }
            }
        } else {
            tracing::debug!(sent = sent_labels.len(), received = labels.len(), "Option label count mismatch; keeping originals");
        }
    }
    translated
}

/// Removes a surrounding ```json ... ``` fence if present.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").or_else(|| rest.strip_prefix("JSON")).unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_stripping() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn sentinel_options_are_not_sent() {
        let options = vec![
            SourceOption { name: Some("Title".into()), values: vec!["Default Title".into()] },
            SourceOption { name: Some("サイズ".into()), values: vec!["S".into(), "M".into(), "S".into()] },
        ];
        assert_eq!(translatable_labels(&options), vec!["サイズ".to_string(), "S".into(), "M".into()]);
    }

    #[test]
    fn merge_falls_back_per_field() {
        let reply = TranslationContent { title: Some("咖啡".into()), body_html: Some("  ".into()), option_labels: Some(vec!["尺寸".into()]) };
        let t = merge("コーヒー", "<p>説明</p>", &["サイズ".to_string()], reply);
        assert_eq!(t.title, "咖啡");
        assert_eq!(t.description_html, "<p>説明</p>");
        assert_eq!(t.option_label("サイズ"), "尺寸");
    }

    #[test]
    fn merge_ignores_mismatched_label_counts() {
        let reply = TranslationContent { title: None, body_html: None, option_labels: Some(vec!["a".into()]) };
        let t = merge("x", "y", &["s".to_string(), "m".to_string()], reply);
        assert!(t.option_labels.is_empty());
        assert_eq!(t.title, "x");
    }
}
