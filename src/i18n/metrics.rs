//! Routing metrics and observability.
//!
//! Counters for which signal decided the language and how often requests
//! were redirected or rejected.

use crate::i18n::Signal;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Request routing counters, shared by all requests of a host.
#[derive(Debug, Default)]
pub struct RoutingMetrics {
    by_param: AtomicUsize,
    by_referrer: AtomicUsize,
    by_path: AtomicUsize,
    by_cookie: AtomicUsize,
    by_default: AtomicUsize,

    /// Redirects dropping the default language segment
    canonical_redirects: AtomicUsize,

    /// One-time redirects to the browser language
    browser_redirects: AtomicUsize,

    /// Requests for a disabled language
    not_available: AtomicUsize,
}

impl RoutingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record which signal resolved a request.
    pub fn record_resolution(&self, signal: Signal) {
        let counter = match signal {
            Signal::Param => &self.by_param,
            Signal::Referrer => &self.by_referrer,
            Signal::Path => &self.by_path,
            Signal::Cookie => &self.by_cookie,
            Signal::Default => &self.by_default,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_canonical_redirect(&self) {
        self.canonical_redirects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_browser_redirect(&self) {
        self.browser_redirects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_available(&self) {
        self.not_available.fetch_add(1, Ordering::Relaxed);
    }

    pub fn resolutions(&self, signal: Signal) -> usize {
        match signal {
            Signal::Param => &self.by_param,
            Signal::Referrer => &self.by_referrer,
            Signal::Path => &self.by_path,
            Signal::Cookie => &self.by_cookie,
            Signal::Default => &self.by_default,
        }
        .load(Ordering::Relaxed)
    }

    pub fn canonical_redirects(&self) -> usize {
        self.canonical_redirects.load(Ordering::Relaxed)
    }

    pub fn browser_redirects(&self) -> usize {
        self.browser_redirects.load(Ordering::Relaxed)
    }

    pub fn not_available(&self) -> usize {
        self.not_available.load(Ordering::Relaxed)
    }

    /// Total resolved requests.
    pub fn total(&self) -> usize {
        [
            Signal::Param,
            Signal::Referrer,
            Signal::Path,
            Signal::Cookie,
            Signal::Default,
        ]
        .into_iter()
        .map(|signal| self.resolutions(signal))
        .sum()
    }

    /// Snapshot for reporting.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_requests: self.total(),
            resolved_by_param: self.resolutions(Signal::Param),
            resolved_by_referrer: self.resolutions(Signal::Referrer),
            resolved_by_path: self.resolutions(Signal::Path),
            resolved_by_cookie: self.resolutions(Signal::Cookie),
            resolved_by_default: self.resolutions(Signal::Default),
            canonical_redirects: self.canonical_redirects(),
            browser_redirects: self.browser_redirects(),
            not_available: self.not_available(),
        }
    }
}

/// Serializable metrics snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub resolved_by_param: usize,
    pub resolved_by_referrer: usize,
    pub resolved_by_path: usize,
    pub resolved_by_cookie: usize,
    pub resolved_by_default: usize,
    pub canonical_redirects: usize,
    pub browser_redirects: usize,
    pub not_available: usize,
}
