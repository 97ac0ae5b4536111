//! Drives a run to a terminal status

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::agents::domain::{AgentService, Run};
use crate::agents::error::{AgentError, AgentResult};
use crate::config::PollSettings;

/// Interval schedule and wait budget for one run
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    pub max_wait: Duration,
}

impl PollPolicy {
    pub fn from_settings(settings: &PollSettings) -> Self {
        Self {
            initial_interval: Duration::from_millis(settings.initial_interval_ms),
            multiplier: settings.multiplier,
            max_interval: Duration::from_millis(settings.max_interval_ms),
            max_wait: Duration::from_secs(settings.max_wait_secs),
        }
    }

    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_randomization_factor(0.0)
            .with_multiplier(self.multiplier)
            .with_max_interval(self.max_interval)
            .with_max_elapsed_time(Some(self.max_wait))
            .build()
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            multiplier: 1.0,
            max_interval: Duration::from_secs(1),
            max_wait: Duration::from_secs(300),
        }
    }
}

/// A run in a terminal status and how many fetches it took to get there
#[derive(Debug, Clone)]
pub struct PolledRun {
    pub run: Run,
    pub polls: u32,
}

/// Sleep, re-fetch, repeat while the run is pending.
///
/// A run that is already terminal is returned without any fetch. Once the
/// wait budget is spent the last observed status is reported in
/// [`AgentError::RunTimeout`].
pub async fn poll_until_terminal(
    service: &dyn AgentService,
    run: Run,
    policy: &PollPolicy,
) -> AgentResult<PolledRun> {
    let started = Instant::now();
    let mut schedule = policy.schedule();
    let mut current = run;
    let mut polls = 0u32;

    while current.status.is_pending() {
        let Some(delay) = schedule.next_backoff() else {
            return Err(AgentError::RunTimeout {
                run_id: current.id,
                status: current.status.to_string(),
                waited_secs: started.elapsed().as_secs(),
            });
        };

        tokio::time::sleep(delay).await;
        current = service.get_run(&current.thread_id, &current.id).await?;
        polls += 1;

        debug!(
            run_id = %current.id,
            status = %current.status,
            poll = polls,
            "Polled run"
        );
    }

    Ok(PolledRun { run: current, polls })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::domain::RunStatus;
    use crate::agents::testing::ScriptedService;

    fn fast_policy(max_wait: Duration) -> PollPolicy {
        PollPolicy {
            initial_interval: Duration::from_millis(1),
            multiplier: 1.0,
            max_interval: Duration::from_millis(1),
            max_wait,
        }
    }

    #[tokio::test]
    async fn test_two_polls_from_queued_to_completed() {
        let service = ScriptedService::new()
            .with_run_statuses(vec![RunStatus::InProgress, RunStatus::Completed]);
        let run = Run::new("run_1", "thread_1", "asst_1", RunStatus::Queued);

        let polled = poll_until_terminal(&service, run, &fast_policy(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(polled.run.status, RunStatus::Completed);
        assert_eq!(polled.polls, 2);
        assert_eq!(service.run_fetches(), 2);
    }

    #[tokio::test]
    async fn test_terminal_run_is_not_fetched() {
        let service = ScriptedService::new();
        let run = Run::new("run_1", "thread_1", "asst_1", RunStatus::Failed);

        let polled = poll_until_terminal(&service, run, &PollPolicy::default())
            .await
            .unwrap();

        assert_eq!(polled.polls, 0);
        assert_eq!(service.run_fetches(), 0);
    }

    #[tokio::test]
    async fn test_gives_up_when_run_never_finishes() {
        let service = ScriptedService::new().with_run_statuses(vec![RunStatus::InProgress]);
        let run = Run::new("run_1", "thread_1", "asst_1", RunStatus::Queued);

        let err = poll_until_terminal(&service, run, &fast_policy(Duration::from_millis(50)))
            .await
            .unwrap_err();

        match err {
            AgentError::RunTimeout { run_id, status, .. } => {
                assert_eq!(run_id, "run_1");
                assert_eq!(status, "in_progress");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(service.run_fetches() >= 1);
    }

    #[test]
    fn test_policy_from_settings() {
        let policy = PollPolicy::from_settings(&PollSettings {
            initial_interval_ms: 500,
            multiplier: 2.0,
            max_interval_ms: 4000,
            max_wait_secs: 60,
        });
        let mut schedule = policy.schedule();
        assert_eq!(schedule.next_backoff(), Some(Duration::from_millis(500)));
        assert_eq!(schedule.next_backoff(), Some(Duration::from_millis(1000)));
        assert_eq!(schedule.next_backoff(), Some(Duration::from_millis(2000)));
        assert_eq!(schedule.next_backoff(), Some(Duration::from_millis(4000)));
        assert_eq!(schedule.next_backoff(), Some(Duration::from_millis(4000)));
    }
}
