//! Retry policies for the connectivity supervisor.
//!
//! A policy answers one question: after failed attempt `n`, how long to
//! sleep before the next one, or `None` when the policy is exhausted.

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failure.
    Fixed(u32),
    /// `initial_ms`, doubled after each failure, capped at `max_ms`.
    Exponential { initial_ms: u32, max_ms: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` = retry forever.
    pub max_attempts: Option<u32>,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Unlimited attempts, constant delay.
    pub const fn forever_fixed(delay_ms: u32) -> Self {
        Self {
            max_attempts: None,
            backoff: Backoff::Fixed(delay_ms),
        }
    }

    /// Bounded attempts, constant delay.
    pub const fn bounded_fixed(max_attempts: u32, delay_ms: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            backoff: Backoff::Fixed(delay_ms),
        }
    }

    /// Delay to sleep after failed attempt number `attempt` (1-based), or
    /// `None` when no further attempt is allowed.
    pub fn delay_after(&self, attempt: u32) -> Option<u32> {
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }
        Some(match self.backoff {
            Backoff::Fixed(ms) => ms,
            Backoff::Exponential { initial_ms, max_ms } => {
                let shift = attempt.saturating_sub(1).min(31);
                initial_ms.saturating_mul(1u32 << shift).min(max_ms)
            }
        })
    }
}
