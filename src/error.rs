use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

use crate::config::Environment;
use crate::models::MenuData;

/// Classification attached to every operational error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    DataSource,
    Cache,
    Network,
    Validation,
    Component,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::DataSource => "DATA_SOURCE_ERROR",
            ErrorKind::Cache => "CACHE_ERROR",
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Component => "COMPONENT_ERROR",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct MenuError {
    pub kind: ErrorKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub context: HashMap<String, String>,
}

impl MenuError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            context: HashMap::new(),
        }
    }

    pub fn data_source(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataSource, message)
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cache, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn component(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Component, message)
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

impl From<sqlx::Error> for MenuError {
    fn from(err: sqlx::Error) -> Self {
        MenuError::data_source(format!("Data source operation failed: {}", err))
    }
}

/// Wraps fallible operations so their failures degrade instead of propagate.
///
/// In development mode errors are logged immediately; in production they are
/// forwarded to the reporting sink. Either way the caller never crashes.
pub struct ErrorHandler {
    environment: Environment,
}

impl ErrorHandler {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    /// Runs `operation`; on any failure logs the classified error and hands
    /// back `fallback` instead.
    pub async fn with_fallback<T, Fut>(&self, operation: Fut, fallback: T) -> T
    where
        Fut: Future<Output = Result<T, MenuError>>,
    {
        match operation.await {
            Ok(value) => value,
            Err(err) => {
                self.classify_and_log(&err);
                fallback
            }
        }
    }

    /// Consults `cache_read` first; on a miss awaits `source_read`.
    ///
    /// A source failure here means both levels are unavailable, so it is
    /// re-tagged as a fallback failure and propagated. This is the only path
    /// through the handler that surfaces an error.
    pub async fn with_cache_first<T, C, Fut>(
        &self,
        cache_read: C,
        source_read: Fut,
    ) -> Result<T, MenuError>
    where
        C: FnOnce() -> Option<T>,
        Fut: Future<Output = Result<T, MenuError>>,
    {
        if let Some(cached) = cache_read() {
            return Ok(cached);
        }

        source_read.await.map_err(|err| {
            let err = err.with_context("fallback_attempt", "true");
            self.classify_and_log(&err);
            err
        })
    }

    /// Runs `operation` up to `max_retries + 1` times with exponential
    /// backoff (2^attempt seconds) between attempts. Returns `fallback` once
    /// every attempt has failed.
    pub async fn with_retry<T, F, Fut>(&self, operation: F, fallback: T, max_retries: u32) -> T
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, MenuError>>,
    {
        for attempt in 0..=max_retries {
            match operation().await {
                Ok(value) => return value,
                Err(err) => {
                    if attempt < max_retries {
                        let delay = Duration::from_secs(1u64 << attempt);
                        tracing::warn!(
                            attempt = attempt + 1,
                            delay_secs = delay.as_secs(),
                            "Operation failed, retrying: {}",
                            err
                        );
                        sleep(delay).await;
                    } else {
                        let err = err.with_context("attempts", (max_retries + 1).to_string());
                        self.classify_and_log(&err);
                    }
                }
            }
        }

        fallback
    }

    pub fn classify_and_log(&self, error: &MenuError) {
        match self.environment {
            Environment::Development => {
                tracing::error!(
                    kind = %error.kind,
                    timestamp = %error.timestamp,
                    context = ?error.context,
                    "{}",
                    error.message
                );
            }
            Environment::Production => self.send_to_error_service(error),
        }
    }

    /// The single fallback payload used whenever real menu data cannot be
    /// produced.
    pub fn canonical_fallback() -> MenuData {
        MenuData {
            categories: Vec::new(),
            dishes: Vec::new(),
            menu_of_the_day: Vec::new(),
            week_menu: Default::default(),
        }
    }

    // Placeholder until an external reporting sink is wired up.
    fn send_to_error_service(&self, error: &MenuError) {
        tracing::debug!(kind = %error.kind, "Forwarding error to reporting sink: {}", error.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn handler() -> ErrorHandler {
        ErrorHandler::new(Environment::Development)
    }

    #[tokio::test]
    async fn test_with_fallback_passes_through_success() {
        let value = handler().with_fallback(async { Ok(7) }, 0).await;
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_with_fallback_returns_fallback_on_error() {
        let value = handler()
            .with_fallback(
                async { Err::<i32, _>(MenuError::data_source("boom")) },
                42,
            )
            .await;
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_with_cache_first_hit_skips_source() {
        let fetched = Arc::new(AtomicUsize::new(0));
        let fetched_clone = fetched.clone();

        let result = handler()
            .with_cache_first(
                || Some(1),
                async move {
                    fetched_clone.fetch_add(1, Ordering::SeqCst);
                    Ok(2)
                },
            )
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(fetched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_with_cache_first_miss_uses_source() {
        let result = handler()
            .with_cache_first(|| None::<i32>, async { Ok(2) })
            .await;
        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_with_cache_first_propagates_source_failure() {
        let result = handler()
            .with_cache_first(|| None::<i32>, async {
                Err(MenuError::data_source("source down"))
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::DataSource);
        assert_eq!(err.context.get("fallback_attempt").map(String::as_str), Some("true"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_recovers_after_transient_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let value = handler()
            .with_retry(
                move || {
                    let attempts = attempts_clone.clone();
                    async move {
                        if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err(MenuError::network("transient"))
                        } else {
                            Ok(9)
                        }
                    }
                },
                0,
                3,
            )
            .await;

        assert_eq!(value, 9);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_exhaustion_returns_fallback() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let value = handler()
            .with_retry(
                move || {
                    let attempts = attempts_clone.clone();
                    async move {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        Err::<i32, _>(MenuError::network("still down"))
                    }
                },
                -1,
                2,
            )
            .await;

        assert_eq!(value, -1);
        // Total attempts = max_retries + 1.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_canonical_fallback_is_fully_empty() {
        let fallback = ErrorHandler::canonical_fallback();
        assert!(fallback.categories.is_empty());
        assert!(fallback.dishes.is_empty());
        assert!(fallback.menu_of_the_day.is_empty());
        assert!(fallback.week_menu.is_empty());
    }

    #[test]
    fn test_error_display_includes_kind() {
        let err = MenuError::cache("lookup failed");
        assert_eq!(err.to_string(), "CACHE_ERROR: lookup failed");
    }
}
