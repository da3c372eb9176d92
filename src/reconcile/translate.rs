//! Machine translation port.
//!
//! The engine depends only on [`Translate`]. [`HttpTranslator`] is the default
//! adapter (LibreTranslate-compatible endpoint); [`CachedTranslator`] wraps any
//! adapter so each distinct input is sent at most once per run.

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

use super::normalize::Script;
use crate::retry::{retry_blocking, HttpStatusError, RetryPolicy};

/// Translate text between the two scripts. Implementations may fail; callers
/// treat any error as "no translation available".
pub trait Translate: Send + Sync {
    fn translate(&self, text: &str, source: Script, target: Script) -> Result<String>;
}

impl<T: Translate + ?Sized> Translate for Box<T> {
    fn translate(&self, text: &str, source: Script, target: Script) -> Result<String> {
        (**self).translate(text, source, target)
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Blocking HTTP adapter with a per-request timeout and bounded retry.
pub struct HttpTranslator {
    client: Client,
    url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl HttpTranslator {
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building translation HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key,
            retry,
        })
    }

    fn request_once(&self, text: &str, source: Script, target: Script) -> Result<String> {
        let body = TranslateRequest {
            q: text,
            source: source.language_code(),
            target: target.language_code(),
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .context("translation request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = resp.text().unwrap_or_default();
            return Err(anyhow::Error::new(HttpStatusError {
                status: status.as_u16(),
                retry_after_secs,
                body,
            }));
        }

        let parsed: TranslateResponse = resp.json().context("decoding translation response")?;
        Ok(parsed.translated_text)
    }
}

impl Translate for HttpTranslator {
    fn translate(&self, text: &str, source: Script, target: Script) -> Result<String> {
        let translated = retry_blocking(&self.retry, "translate", || {
            self.request_once(text, source, target)
        })?;
        let translated = translated.trim();
        if translated.is_empty() {
            bail!("translation endpoint returned empty text for {:?}", text);
        }
        Ok(translated.to_string())
    }
}

/// Memoizing decorator. Failures are memoized too, so an unreachable endpoint
/// costs one attempt per distinct name, not one per fixture.
pub struct CachedTranslator<T> {
    inner: T,
    memo: Mutex<FxHashMap<String, Option<String>>>,
    invocations: AtomicUsize,
}

impl<T: Translate> CachedTranslator<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            memo: Mutex::new(FxHashMap::default()),
            invocations: AtomicUsize::new(0),
        }
    }

    /// Number of calls that reached the wrapped translator
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::Relaxed)
    }

    pub fn cached_len(&self) -> usize {
        self.memo.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl<T: Translate> Translate for CachedTranslator<T> {
    fn translate(&self, text: &str, source: Script, target: Script) -> Result<String> {
        if let Some(hit) = self
            .memo
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(text)
        {
            return hit
                .clone()
                .ok_or_else(|| anyhow!("translation of {:?} failed earlier in this run", text));
        }

        self.invocations.fetch_add(1, Ordering::Relaxed);
        let result = self.inner.translate(text, source, target);
        let stored = match &result {
            Ok(translated) => {
                debug!("translated {:?} ({} -> {}) = {:?}", text, source, target, translated);
                Some(translated.clone())
            }
            Err(e) => {
                warn!("translation failed for {:?} ({} -> {}): {:#}", text, source, target, e);
                None
            }
        };
        self.memo
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(text.to_string(), stored);
        result
    }
}
