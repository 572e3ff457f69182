use std::{future::Future, time::Duration};

/// Bounded retry across a list of equivalent endpoints.
///
/// One round tries every endpoint once, in order. Only after a whole round fails do we sleep,
/// doubling the delay each round up to `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub rounds: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            rounds: 3,
            base_delay: Duration::from_millis(400),
            max_delay: Duration::from_secs(4),
            jitter_max_ms: 250,
        }
    }
}

impl RetryPolicy {
    pub const fn immediate(rounds: usize) -> Self {
        Self {
            rounds,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_max_ms: 0,
        }
    }

    fn delay_after(&self, round: usize) -> Duration {
        let shift = u32::try_from(round.min(16)).unwrap_or(16);
        let factor = 1_u32.checked_shl(shift).unwrap_or(u32::MAX);
        let backoff = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter_ms = match self.jitter_max_ms {
            0 => 0,
            j => rand::random::<u64>() % j.saturating_add(1),
        };
        backoff.saturating_add(Duration::from_millis(jitter_ms))
    }
}

/// Return the first `Ok` from `op` over `endpoints`, retrying whole rounds per `policy`.
pub async fn first_success<E, T, Fut>(
    endpoints: &[E],
    policy: &RetryPolicy,
    label: &'static str,
    mut op: impl FnMut(&E) -> Fut + Send,
) -> eyre::Result<T>
where
    E: Sync,
    Fut: Future<Output = eyre::Result<T>> + Send,
{
    if endpoints.is_empty() {
        eyre::bail!("{label}: no endpoints configured");
    }
    if policy.rounds == 0 {
        eyre::bail!("{label}: retry policy allows zero rounds");
    }

    let mut last_err = None;
    for round in 0..policy.rounds {
        for endpoint in endpoints {
            match op(endpoint).await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    tracing::debug!(
                        label,
                        round,
                        error = %format!("{e:#}"),
                        "endpoint attempt failed"
                    );
                    last_err = Some(e);
                }
            }
        }
        if round + 1 < policy.rounds {
            tokio::time::sleep(policy.delay_after(round)).await;
        }
    }

    Err(last_err
        .unwrap_or_else(|| eyre::eyre!("no attempt made"))
        .wrap_err(label))
}
