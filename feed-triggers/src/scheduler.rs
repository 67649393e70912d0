use crate::types::{Result, TriggerError};
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Decides when the next check happens.
pub trait Cadence: Send + Sync + fmt::Debug {
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>>;

    fn describe(&self) -> String;
}

/// Cron-expression cadence. Accepts the classic 5-field form as well as the
/// 6/7-field form with seconds (and year) that the `cron` crate speaks.
pub struct CronCadence {
    expression: String,
    schedule: Schedule,
}

impl CronCadence {
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let normalized = match trimmed.split_whitespace().count() {
            5 => format!("0 {}", trimmed),
            6 | 7 => trimmed.to_string(),
            n => {
                return Err(TriggerError::InvalidSchedule {
                    expression: expression.to_string(),
                    reason: format!("expected 5 to 7 fields, found {}", n),
                })
            }
        };
        let schedule = Schedule::from_str(&normalized).map_err(|e| TriggerError::InvalidSchedule {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            expression: trimmed.to_string(),
            schedule,
        })
    }
}

impl fmt::Debug for CronCadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CronCadence").field("expression", &self.expression).finish()
    }
}

impl Cadence for CronCadence {
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    fn describe(&self) -> String {
        format!("cron '{}'", self.expression)
    }
}

/// Fires every `period`, measured from the previous fire.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval(pub Duration);

impl Cadence for FixedInterval {
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        chrono::Duration::from_std(self.0).ok().map(|period| after + period)
    }

    fn describe(&self) -> String {
        format!("every {:?}", self.0)
    }
}

/// Running schedule. Cancelling (or dropping) it prevents future ticks; a
/// tick that is already running is left to finish.
pub struct ScheduleHandle {
    token: CancellationToken,
    next_fire: Arc<Mutex<Option<DateTime<Utc>>>>,
    task: JoinHandle<()>,
}

impl ScheduleHandle {
    pub fn spawn<F, Fut>(cadence: Arc<dyn Cadence>, label: String, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let next_fire = Arc::new(Mutex::new(cadence.next_after(Utc::now())));

        let loop_token = token.clone();
        let loop_next = next_fire.clone();
        let task = tokio::spawn(async move {
            debug!("Schedule {} armed ({})", label, cadence.describe());
            loop {
                let now = Utc::now();
                let Some(next) = cadence.next_after(now) else {
                    warn!("Schedule {} has no upcoming fire time ({})", label, cadence.describe());
                    break;
                };
                set_next(&loop_next, Some(next));

                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                tokio::select! {
                    _ = loop_token.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
                if loop_token.is_cancelled() {
                    break;
                }
                tick().await;
            }
            set_next(&loop_next, None);
            debug!("Schedule {} finished", label);
        });

        Self { token, next_fire, task }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token that is cancelled together with this schedule.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn next_fire(&self) -> Option<DateTime<Utc>> {
        if self.token.is_cancelled() || self.task.is_finished() {
            return None;
        }
        *self.next_fire.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn set_next(slot: &Mutex<Option<DateTime<Utc>>>, value: Option<DateTime<Utc>>) {
    *slot.lock().unwrap_or_else(PoisonError::into_inner) = value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn five_field_expressions_get_a_seconds_field() {
        let cadence = CronCadence::parse("*/15 * * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 10, 7, 30).unwrap();
        let next = cadence.next_after(after).unwrap();
        assert_eq!((next.hour(), next.minute(), next.second()), (10, 15, 0));
    }

    #[test]
    fn six_field_expressions_pass_through() {
        let cadence = CronCadence::parse("30 0 * * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 10, 7, 30).unwrap();
        let next = cadence.next_after(after).unwrap();
        assert_eq!((next.hour(), next.minute(), next.second()), (11, 0, 30));
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        assert!(matches!(
            CronCadence::parse("every hour"),
            Err(TriggerError::InvalidSchedule { .. })
        ));
        assert!(CronCadence::parse("61 * * * *").is_err());
    }

    #[test]
    fn fixed_interval_adds_period() {
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let next = FixedInterval(Duration::from_secs(90)).next_after(after).unwrap();
        assert_eq!(next - after, chrono::Duration::seconds(90));
    }
}
