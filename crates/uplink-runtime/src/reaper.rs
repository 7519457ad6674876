//! Background reclamation of expired and finished sessions.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use uplink_core::SessionState;

use crate::errors::SessionFailure;
use crate::orchestrator::OrchestratorConfig;
use crate::registry::SessionRegistry;

/// Spawn the reaper loop. The task exits when `token` is cancelled.
pub(crate) fn spawn(
    registry: Arc<SessionRegistry>,
    config: OrchestratorConfig,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.reaper_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(interval = ?config.reaper_interval, "reaper started");
        loop {
            tokio::select! {
                () = token.cancelled() => {
                    debug!("reaper stopped");
                    break;
                }
                _ = ticker.tick() => sweep(&registry, &config).await,
            }
        }
    })
}

/// One sweep over the registry. Each session is handled independently so a
/// slow or stuck teardown cannot halt the scan for the rest.
async fn sweep(registry: &SessionRegistry, config: &OrchestratorConfig) {
    for session in registry.snapshot() {
        // Enforce the second-factor window first so the timeout is recorded
        // before the eviction pass below observes a terminal state.
        if session.state() == SessionState::Awaiting2fa
            && session.second_factor_expired(config.second_factor_wait)
            && session.fail(&SessionFailure::SecondFactorTimeout)
        {
            session.release_agent().await;
        }

        if session.state().is_terminal() || session.is_expired(config.session_timeout) {
            info!(
                session_id = %session.id(),
                state = %session.state(),
                "evicting session"
            );
            // Teardown strictly before removal: a session is either fully
            // resourced and registered, or gone.
            session.teardown().await;
            let _ = registry.remove(session.id());
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::session::Session;

    fn config(session_timeout: Duration, second_factor_wait: Duration) -> OrchestratorConfig {
        OrchestratorConfig {
            max_concurrent_sessions: 10,
            session_timeout,
            second_factor_wait,
            reaper_interval: Duration::from_millis(10),
        }
    }

    fn registry_with(session: Session) -> (Arc<SessionRegistry>, Arc<Session>) {
        let registry = Arc::new(SessionRegistry::new(10));
        let session = Arc::new(session);
        registry.insert(Arc::clone(&session)).unwrap();
        (registry, session)
    }

    #[tokio::test]
    async fn live_session_survives_sweep() {
        let (registry, session) = registry_with(Session::new("u", Vec::new(), None));
        assert!(session.transition(SessionState::Login));
        sweep(&registry, &config(Duration::from_secs(600), Duration::from_secs(90))).await;
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn terminal_session_evicted() {
        let (registry, session) = registry_with(Session::new("u", Vec::new(), None));
        assert!(session.mark_cancelled());
        sweep(&registry, &config(Duration::from_secs(600), Duration::from_secs(90))).await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn expired_session_evicted() {
        let (registry, _session) = registry_with(Session::new("u", Vec::new(), None));
        sweep(&registry, &config(Duration::ZERO, Duration::from_secs(90))).await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn overdue_second_factor_becomes_error_and_is_evicted() {
        let (registry, session) = registry_with(Session::new("u", Vec::new(), None));
        assert!(session.transition(SessionState::Login));
        assert!(session.transition(SessionState::Awaiting2fa));

        sweep(&registry, &config(Duration::from_secs(600), Duration::ZERO)).await;

        // Failed with the timeout recorded, then evicted in the same sweep.
        assert_eq!(session.state(), SessionState::Error);
        assert!(registry.is_empty());
        let view = session.snapshot(Duration::from_secs(600));
        assert_eq!(view.error.as_deref(), Some("second factor window expired"));
    }

    #[tokio::test]
    async fn fresh_second_factor_wait_not_reaped() {
        let (registry, session) = registry_with(Session::new("u", Vec::new(), None));
        assert!(session.transition(SessionState::Login));
        assert!(session.transition(SessionState::Awaiting2fa));

        sweep(
            &registry,
            &config(Duration::from_secs(600), Duration::from_secs(90)),
        )
        .await;

        assert_eq!(session.state(), SessionState::Awaiting2fa);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn spawned_reaper_stops_on_cancel() {
        let registry = Arc::new(SessionRegistry::new(10));
        let token = CancellationToken::new();
        let handle = spawn(
            Arc::clone(&registry),
            config(Duration::from_secs(600), Duration::from_secs(90)),
            token.clone(),
        );
        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn spawned_reaper_evicts_on_tick() {
        let (registry, session) = registry_with(Session::new("u", Vec::new(), None));
        assert!(session.mark_cancelled());

        let token = CancellationToken::new();
        let handle = spawn(
            Arc::clone(&registry),
            config(Duration::from_secs(600), Duration::from_secs(90)),
            token.clone(),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(registry.is_empty());
        token.cancel();
        handle.await.unwrap();
    }
}
