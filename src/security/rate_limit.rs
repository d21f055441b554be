//! Fixed-window rate limiting per client and endpoint category.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use crate::config::{RateLimitConfig, WindowPolicy};
use crate::forward::ForwardError;
use crate::observability::metrics;

/// Which policy a request is counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointCategory {
    Chat,
    Contact,
}

impl EndpointCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointCategory::Chat => "chat",
            EndpointCategory::Contact => "contact",
        }
    }
}

/// Outcome of [`RateLimiter::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept,
    /// Rejected; the window reopens after `retry_after`.
    Reject { retry_after: Duration },
}

/// Counter for one (identifier × category) pair.
#[derive(Debug)]
struct RateLimitWindow {
    count: u32,
    window_start: Instant,
}

/// Process-wide table of fixed-window counters.
///
/// Each (identifier × category) entry is mutated under its DashMap shard
/// lock, so concurrent admissions for one client never lose an update.
pub struct RateLimiter {
    windows: DashMap<(String, EndpointCategory), RateLimitWindow>,
    chat: WindowPolicy,
    contact: WindowPolicy,
}

impl RateLimiter {
    pub fn new(chat: WindowPolicy, contact: WindowPolicy) -> Self {
        Self {
            windows: DashMap::new(),
            chat,
            contact,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.chat, config.contact)
    }

    pub fn policy(&self, category: EndpointCategory) -> WindowPolicy {
        match category {
            EndpointCategory::Chat => self.chat,
            EndpointCategory::Contact => self.contact,
        }
    }

    pub fn admit(&self, identifier: &str, category: EndpointCategory) -> Admission {
        self.admit_at(identifier, category, Instant::now())
    }

    /// Count one request at `now` and decide. The request that crosses the
    /// ceiling is counted too.
    pub fn admit_at(&self, identifier: &str, category: EndpointCategory, now: Instant) -> Admission {
        let policy = self.policy(category);
        let window = policy.window();

        let mut entry = self
            .windows
            .entry((identifier.to_string(), category))
            .or_insert_with(|| RateLimitWindow {
                count: 0,
                window_start: now,
            });

        if now.saturating_duration_since(entry.window_start) >= window {
            entry.window_start = now;
            entry.count = 0;
        }

        entry.count = entry.count.saturating_add(1);

        if entry.count <= policy.max_requests {
            Admission::Accept
        } else {
            let elapsed = now.saturating_duration_since(entry.window_start);
            Admission::Reject {
                retry_after: window.saturating_sub(elapsed),
            }
        }
    }

    /// Drop every window whose period has ended. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|(_, category), window| {
            now.saturating_duration_since(window.window_start) < self.policy(*category).window()
        });
        before.saturating_sub(self.windows.len())
    }

    /// Number of live windows.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    /// Periodically purge expired windows until shutdown.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = interval.as_secs(), "Rate limit sweeper starting");

        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.purge_expired(Instant::now());
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.tracked(), "Purged expired rate limit windows");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// Per-route middleware state.
#[derive(Clone)]
pub struct RateLimitGate {
    pub limiter: Arc<RateLimiter>,
    pub category: EndpointCategory,
    pub enabled: bool,
    /// Trusted proxy hops in `X-Forwarded-For`; `None` keys by peer address.
    pub forwarded_hops: Option<usize>,
}

impl RateLimitGate {
    pub fn new(limiter: Arc<RateLimiter>, category: EndpointCategory, config: &RateLimitConfig) -> Self {
        Self {
            limiter,
            category,
            enabled: config.enabled,
            forwarded_hops: config.trust_forwarded_for.then_some(config.trusted_hops),
        }
    }
}

/// Identify the client: the peer IP, or the `X-Forwarded-For` entry
/// appended by the outermost of `hops` trusted proxies. Proxies append, so
/// entries left of that one are client-controlled. A chain shorter than
/// `hops` did not come through the proxies and falls back to the peer.
pub fn client_identifier(request: &Request<Body>, peer: SocketAddr, hops: Option<usize>) -> String {
    let Some(hops) = hops.filter(|h| *h > 0) else {
        return peer.ip().to_string();
    };

    let entries: Vec<&str> = request
        .headers()
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();

    match entries.len().checked_sub(hops) {
        Some(index) => entries[index].to_string(),
        None => peer.ip().to_string(),
    }
}

/// Middleware function for fixed-window rate limiting.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(gate): State<RateLimitGate>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !gate.enabled {
        return next.run(request).await;
    }

    let key = client_identifier(&request, addr, gate.forwarded_hops);

    match gate.limiter.admit(&key, gate.category) {
        Admission::Accept => next.run(request).await,
        Admission::Reject { retry_after } => {
            tracing::warn!(client = %key, category = gate.category.as_str(), "Rate limit exceeded");
            metrics::record_rate_limited(gate.category.as_str());
            ForwardError::RateLimited { retry_after }
                .at(gate.category)
                .into_response()
        }
    }
}
