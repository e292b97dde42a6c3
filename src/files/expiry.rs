//! Deletion scheduling rules

use chrono::{DateTime, Duration, Utc};

/// A user-set deletion time must be at least this far in the future
pub fn minimum_delete_lead() -> Duration {
    Duration::hours(3)
}

/// Lifetime of anonymous uploads
pub fn anonymous_ttl() -> Duration {
    Duration::hours(24)
}

/// Result of enforcing the minimum lead time on a requested deletion time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryAdjustment {
    pub value: DateTime<Utc>,
    /// Set when the request was moved forward to the floor
    pub warning: bool,
}

/// Clamp `requested` to no earlier than `now + 3h`
pub fn clamp_delete_at(requested: DateTime<Utc>, now: DateTime<Utc>) -> ExpiryAdjustment {
    let floor = now + minimum_delete_lead();
    if requested < floor {
        ExpiryAdjustment {
            value: floor,
            warning: true,
        }
    } else {
        ExpiryAdjustment {
            value: requested,
            warning: false,
        }
    }
}

pub fn anonymous_delete_at(now: DateTime<Utc>) -> DateTime<Utc> {
    now + anonymous_ttl()
}

/// How soon a file goes away, as shown on its detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    Permanent,
    Expired,
    ExpiresWithinHour,
    ExpiresInHours(i64),
    Scheduled(DateTime<Utc>),
}

impl ExpiryStatus {
    pub fn of(delete_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let Some(at) = delete_at else {
            return Self::Permanent;
        };

        if at < now {
            return Self::Expired;
        }

        match (at - now).num_hours() {
            0 => Self::ExpiresWithinHour,
            hours if hours < 24 => Self::ExpiresInHours(hours),
            _ => Self::Scheduled(at),
        }
    }

    /// Warnings are shown for anything expiring within a day
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::Expired | Self::ExpiresWithinHour | Self::ExpiresInHours(_)
        )
    }
}
