//! Per-IP attempt limiting for challenge issuance and the two login routes.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::state::AppState;

pub const WINDOW: Duration = Duration::from_secs(60);

/// Record an attempt from `ip`. Returns `false` once the address has used up
/// its allowance for the current window.
pub fn check_and_record(state: &AppState, ip: IpAddr) -> bool {
    let now = Instant::now();
    let max = state.config.rate_limit_auth as usize;

    let mut attempts = state.rate_limits.entry(ip).or_default();
    attempts.retain(|t| now.duration_since(*t) < WINDOW);

    if attempts.len() >= max {
        return false;
    }

    attempts.push(now);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::ServerConfig;
    use crate::identity::SqliteIdentityStore;

    #[tokio::test]
    async fn limit_applies_per_address() {
        let mut config = ServerConfig::for_tests();
        config.rate_limit_auth = 2;
        let store = SqliteIdentityStore::connect("sqlite::memory:").await.unwrap();
        let state = AppState::new(config, Arc::new(store));

        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(check_and_record(&state, a));
        assert!(check_and_record(&state, a));
        assert!(!check_and_record(&state, a));
        assert!(check_and_record(&state, b));
    }

    #[tokio::test]
    async fn old_attempts_fall_out_of_the_window() {
        let mut config = ServerConfig::for_tests();
        config.rate_limit_auth = 1;
        let store = SqliteIdentityStore::connect("sqlite::memory:").await.unwrap();
        let state = AppState::new(config, Arc::new(store));

        let ip: IpAddr = "10.0.0.3".parse().unwrap();
        state
            .rate_limits
            .insert(ip, vec![Instant::now() - WINDOW - Duration::from_secs(1)]);

        assert!(check_and_record(&state, ip));
    }
}
