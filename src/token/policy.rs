use std::time::Duration;

use jiff::{SignedDuration, Timestamp};

use crate::errors::Error;

pub const DEFAULT_SAFETY_BUFFER: SignedDuration = SignedDuration::from_secs(60);
pub const DEFAULT_REFRESH_LEAD: SignedDuration = SignedDuration::from_secs(5 * 60);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(23 * 60 * 60);

/// Timing rules for token validity, proactive refresh and persistence.
#[derive(Clone, Debug)]
pub struct RefreshPolicy {
    /// Margin before expiry from which a token is no longer handed out.
    pub safety_buffer: SignedDuration,
    /// How long before expiry the background refresh fires.
    pub refresh_lead: SignedDuration,
    /// TTL for the persisted copy; independent of the token's own expiry.
    pub cache_ttl: Duration,
    pub auto_refresh: bool,
}

impl RefreshPolicy {
    pub fn new(
        safety_buffer: SignedDuration,
        refresh_lead: SignedDuration,
        cache_ttl: Duration,
        auto_refresh: bool,
    ) -> Result<Self, Error> {
        if safety_buffer.is_negative() {
            return Err(Error::Config("Safety buffer must not be negative".into()));
        }
        if !refresh_lead.is_positive() {
            return Err(Error::Config("Refresh lead must be > 0".into()));
        }
        if cache_ttl.is_zero() {
            return Err(Error::Config("Cache TTL must be > 0".into()));
        }
        Ok(Self {
            safety_buffer,
            refresh_lead,
            cache_ttl,
            auto_refresh,
        })
    }

    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    /// Delay until the background refresh for a token expiring at
    /// `expires_at`; `None` when that moment has already passed.
    pub fn schedule_delay(&self, expires_at: Timestamp, now: Timestamp) -> Option<Duration> {
        let delay = expires_at
            .duration_since(now)
            .checked_sub(self.refresh_lead)?;
        if !delay.is_positive() {
            return None;
        }
        Duration::try_from(delay).ok()
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            safety_buffer: DEFAULT_SAFETY_BUFFER,
            refresh_lead: DEFAULT_REFRESH_LEAD,
            cache_ttl: DEFAULT_CACHE_TTL,
            auto_refresh: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_expiry_minus_lead() {
        let policy = RefreshPolicy::default();
        let now = Timestamp::now();
        let expires_at = now + SignedDuration::from_mins(65);
        assert_eq!(
            policy.schedule_delay(expires_at, now),
            Some(Duration::from_secs(60 * 60))
        );
    }

    #[test]
    fn no_delay_inside_lead_window() {
        let policy = RefreshPolicy::default();
        let now = Timestamp::now();
        assert_eq!(
            policy.schedule_delay(now + SignedDuration::from_mins(5), now),
            None
        );
        assert_eq!(
            policy.schedule_delay(now + SignedDuration::from_mins(2), now),
            None
        );
        assert_eq!(policy.schedule_delay(Timestamp::UNIX_EPOCH, now), None);
    }

    #[test]
    fn rejects_invalid_policy() {
        assert!(
            RefreshPolicy::new(
                SignedDuration::from_secs(-1),
                DEFAULT_REFRESH_LEAD,
                DEFAULT_CACHE_TTL,
                true
            )
            .is_err()
        );
        assert!(
            RefreshPolicy::new(
                DEFAULT_SAFETY_BUFFER,
                SignedDuration::ZERO,
                DEFAULT_CACHE_TTL,
                true
            )
            .is_err()
        );
        assert!(
            RefreshPolicy::new(
                DEFAULT_SAFETY_BUFFER,
                DEFAULT_REFRESH_LEAD,
                Duration::ZERO,
                true
            )
            .is_err()
        );
    }
}
