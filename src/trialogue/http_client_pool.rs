//! Shared HTTP clients, one per provider base URL.
//!
//! Both adapters talk to a single fixed endpoint each, so keeping one pooled
//! `reqwest::Client` per base URL lets every conversation reuse the same keep-alive
//! connections instead of paying DNS and TLS setup on each turn.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::time::Duration;

/// Pooled clients indexed by base URL.
static CLIENT_POOL: Lazy<DashMap<String, reqwest::Client>> = Lazy::new(DashMap::new);

/// Returns the shared client for `base_url`, building it on first use.
///
/// No overall request timeout is set here: turn deadlines are enforced by the orchestrator so
/// that every backend is bounded by the same configurable limit.
pub fn get_or_create_client(base_url: &str) -> reqwest::Client {
    CLIENT_POOL
        .entry(base_url.to_string())
        .or_insert_with(create_pooled_client)
        .clone()
}

/// Number of distinct base URLs with a pooled client.
pub fn pooled_client_count() -> usize {
    CLIENT_POOL.len()
}

/// Keep-alive tuned client:
/// - up to 16 idle connections per host (two providers, modest fan-out)
/// - idle connections kept for 90 seconds
/// - TCP keepalive probes every 60 seconds
/// - 30 second connect timeout
fn create_pooled_client() -> reqwest::Client {
    match reqwest::ClientBuilder::new()
        .pool_max_idle_per_host(16)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .connect_timeout(Duration::from_secs(30))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            log::error!(
                "http_client_pool::create_pooled_client(): falling back to default client: {}",
                err
            );
            reqwest::Client::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_base_url_shares_one_entry() {
        let url = "https://api.anthropic.com";
        let _first = get_or_create_client(url);
        let _second = get_or_create_client(url);

        assert!(CLIENT_POOL.contains_key(url));
        // other tests add entries concurrently, so only a lower bound is meaningful
        assert!(pooled_client_count() >= 1);
    }

    #[test]
    fn test_each_provider_gets_its_own_client() {
        let anthropic = "https://api.anthropic.com/pool-test";
        let deepseek = "https://api.deepseek.com/pool-test";

        let _a = get_or_create_client(anthropic);
        let _d = get_or_create_client(deepseek);

        assert!(CLIENT_POOL.contains_key(anthropic));
        assert!(CLIENT_POOL.contains_key(deepseek));
        assert!(pooled_client_count() >= 2);
    }
}
