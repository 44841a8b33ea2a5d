//! Display-text translation with a memo cache
//!
//! Presentation helper only: translated text is looked up per
//! `(source text, target language)` and never written back into a task.

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::Error;
use crate::http::{check_status, transport};
use crate::Result;

pub const MYMEMORY_ENDPOINT: &str = "https://api.mymemory.translated.net/get";

/// Language task text is written in
pub const SOURCE_LANGUAGE: &str = "en";

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryResponse {
    response_data: MyMemoryData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryData {
    translated_text: String,
}

/// Client for the public MyMemory translation API
pub struct MyMemoryTranslator {
    client: Client,
    endpoint: String,
}

impl MyMemoryTranslator {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_endpoint(MYMEMORY_ENDPOINT, timeout)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn request_url(&self, text: &str, target_lang: &str) -> String {
        format!(
            "{}?q={}&langpair={}",
            self.endpoint,
            urlencoding::encode(text),
            urlencoding::encode(&format!("{}|{}", SOURCE_LANGUAGE, target_lang))
        )
    }
}

#[async_trait]
impl Translator for MyMemoryTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let resp = self
            .client
            .get(self.request_url(text, target_lang))
            .send()
            .await
            .map_err(|e| transport("Translation", e))?;
        let body: MyMemoryResponse = check_status(resp, "Translation")
            .await?
            .json()
            .await
            .map_err(|e| transport("Reading translation", e))?;
        Ok(body.response_data.translated_text)
    }
}

/// Memoizing front for a [`Translator`]
pub struct TranslationCache<T> {
    translator: T,
    entries: RwLock<HashMap<(String, String), String>>,
}

impl<T: Translator> TranslationCache<T> {
    pub fn new(translator: T) -> Self {
        Self {
            translator,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Translated text, or the input itself when no translation is needed or
    /// the translator fails
    ///
    /// Failures are not cached, so a later call tries again.
    pub async fn translate(&self, text: &str, target_lang: &str) -> String {
        if text.trim().is_empty() || target_lang == SOURCE_LANGUAGE {
            return text.to_string();
        }

        let key = (text.to_string(), target_lang.to_string());
        if let Some(hit) = self.entries.read().await.get(&key) {
            return hit.clone();
        }

        match self.translator.translate(text, target_lang).await {
            Ok(translated) => {
                debug!("Cached translation into {}", target_lang);
                self.entries.write().await.insert(key, translated.clone());
                translated
            }
            Err(e) => {
                warn!("Translation into {} failed, showing source text: {}", target_lang, e);
                text.to_string()
            }
        }
    }

    /// Translate several texts concurrently, keeping their order
    pub async fn translate_all(&self, texts: &[&str], target_lang: &str) -> Vec<String> {
        join_all(texts.iter().map(|text| self.translate(text, target_lang))).await
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Shouting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Translator for Shouting {
        async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text == "fail" {
                return Err(Error::Transport("service down".into()));
            }
            Ok(format!("[{}] {}", target_lang, text.to_uppercase()))
        }
    }

    #[tokio::test]
    async fn test_cache_hits_skip_the_translator() {
        let cache = TranslationCache::new(Shouting::default());
        assert_eq!(cache.translate("buy milk", "hi").await, "[hi] BUY MILK");
        assert_eq!(cache.translate("buy milk", "hi").await, "[hi] BUY MILK");
        assert_eq!(cache.translator.calls.load(Ordering::SeqCst), 1);

        cache.translate("buy milk", "fr").await;
        assert_eq!(cache.translator.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_source_language_and_blank_text_pass_through() {
        let cache = TranslationCache::new(Shouting::default());
        assert_eq!(cache.translate("buy milk", "en").await, "buy milk");
        assert_eq!(cache.translate("  ", "hi").await, "  ");
        assert_eq!(cache.translator.calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_failures_fall_back_and_are_not_cached() {
        let cache = TranslationCache::new(Shouting::default());
        assert_eq!(cache.translate("fail", "hi").await, "fail");
        assert_eq!(cache.translate("fail", "hi").await, "fail");
        assert_eq!(cache.translator.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_translate_all_keeps_order() {
        let cache = TranslationCache::new(Shouting::default());
        let out = cache.translate_all(&["one", "fail", "two"], "hi").await;
        assert_eq!(out, vec!["[hi] ONE", "fail", "[hi] TWO"]);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[test]
    fn test_request_url() {
        let translator =
            MyMemoryTranslator::with_endpoint("https://mt.example.test/get", Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            translator.request_url("buy milk & eggs", "hi"),
            "https://mt.example.test/get?q=buy%20milk%20%26%20eggs&langpair=en%7Chi"
        );
    }
}
