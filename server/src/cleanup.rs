//! Background sweeping of expired in-memory state.

use std::time::{Duration, Instant};

use crate::ratelimit;
use crate::state::{AppState, SharedState};

const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

pub async fn run_cleanup_loop(state: SharedState) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        interval.tick().await;
        sweep(&state);
    }
}

fn sweep(state: &AppState) {
    let now = Instant::now();

    // Consumed challenges go too once their window has passed.
    state.challenges.sweep();

    state.sessions.retain(|_, session| session.expires_at > now);

    state.rate_limits.retain(|_, attempts| {
        attempts.retain(|t| now.duration_since(*t) < ratelimit::WINDOW);
        !attempts.is_empty()
    });

    tracing::trace!(
        challenges = state.challenges.len(),
        sessions = state.sessions.len(),
        "swept expired state"
    );
}
