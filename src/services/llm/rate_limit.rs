// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;
use tracing::debug;

const REMAINING_TOKENS: &str = "x-ratelimit-remaining-tokens";
const REMAINING_REQUESTS: &str = "x-ratelimit-remaining-requests";
const RESET_TOKENS: &str = "x-ratelimit-reset-tokens";
const RESET_REQUESTS: &str = "x-ratelimit-reset-requests";
const RETRY_AFTER: &str = "retry-after";

/// Point-in-time view of the provider's advertised limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub remaining_tokens: Option<u64>,
    pub remaining_requests: Option<u64>,
    pub reset_tokens_at: Option<Instant>,
    pub reset_requests_at: Option<Instant>,
}

impl RateLimitSnapshot {
    /// How long to hold off before the next request, if a budget is exhausted.
    pub fn wait_at(&self, now: Instant) -> Option<Duration> {
        let exhausted = |remaining: Option<u64>, reset: Option<Instant>| match (remaining, reset) {
            (Some(0), Some(at)) if at > now => Some(at - now),
            _ => None,
        };

        match (
            exhausted(self.remaining_requests, self.reset_requests_at),
            exhausted(self.remaining_tokens, self.reset_tokens_at),
        ) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Budget shared by every caller of one transport. Mutated only by the transport.
#[derive(Debug, Default)]
pub struct RateLimitBudget {
    inner: Mutex<RateLimitSnapshot>,
}

impl RateLimitBudget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn wait_duration(&self) -> Option<Duration> {
        self.snapshot().wait_at(Instant::now())
    }

    pub(super) fn update(&self, headers: &HeaderMap) {
        self.update_at(headers, Instant::now());
    }

    fn update_at(&self, headers: &HeaderMap, now: Instant) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(n) = header_u64(headers, REMAINING_TOKENS) {
            state.remaining_tokens = Some(n);
        }
        if let Some(n) = header_u64(headers, REMAINING_REQUESTS) {
            state.remaining_requests = Some(n);
        }
        if let Some(d) = header_str(headers, RESET_TOKENS).and_then(parse_reset_duration) {
            state.reset_tokens_at = Some(now + d);
        }
        if let Some(d) = header_str(headers, RESET_REQUESTS).and_then(parse_reset_duration) {
            state.reset_requests_at = Some(now + d);
        }

        debug!(
            remaining_tokens = ?state.remaining_tokens,
            remaining_requests = ?state.remaining_requests,
            "rate limit budget updated"
        );
    }
}

/// `Retry-After` in whole seconds.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    header_u64(headers, RETRY_AFTER).map(Duration::from_secs)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    header_str(headers, name).and_then(|s| s.parse().ok())
}

/// Parse reset durations as sent by OpenAI-compatible servers: `1s`, `6m0s`, `20ms`,
/// `1h2m3.5s`. A bare number is taken as seconds.
pub fn parse_reset_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<f64>() {
        return nanos_to_duration(secs * 1e9);
    }

    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return None;
        }
        let value: f64 = rest[..num_len].parse().ok()?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let factor = match &rest[..unit_len] {
            "h" => 3_600e9,
            "m" => 60e9,
            "s" => 1e9,
            "ms" => 1e6,
            "us" | "µs" => 1e3,
            "ns" => 1.0,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total += value * factor;
    }

    nanos_to_duration(total)
}

fn nanos_to_duration(nanos: f64) -> Option<Duration> {
    (nanos.is_finite() && nanos >= 0.0 && nanos < u64::MAX as f64)
        .then(|| Duration::from_nanos(nanos.round() as u64))
}
