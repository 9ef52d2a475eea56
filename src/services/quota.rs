use crate::db;
use crate::models;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaStatus {
    /// Admins are never limited.
    Unlimited,
    Allowed { used: i64, limit: i64 },
    Exceeded { used: i64, limit: i64 },
}

impl QuotaStatus {
    pub fn is_exceeded(&self) -> bool {
        matches!(self, QuotaStatus::Exceeded { .. })
    }

    fn evaluate(used: i64, limit: i64) -> Self {
        if used >= limit {
            QuotaStatus::Exceeded { used, limit }
        } else {
            QuotaStatus::Allowed { used, limit }
        }
    }
}

/// 00:00:00 UTC of the day `now` falls on.
pub fn start_of_utc_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Checks the daily quota and records the request when it is allowed, as one
/// step. An exceeded quota records nothing. Admins are always recorded.
#[tracing::instrument(name = "Consume daily quota.", skip(pool, user), fields(user_id = %user.id))]
pub async fn consume(
    pool: &PgPool,
    user: &models::User,
    limit: i64,
    now: DateTime<Utc>,
) -> Result<QuotaStatus, String> {
    if user.is_admin {
        db::user_request::insert(pool, &user.id).await?;
        return Ok(QuotaStatus::Unlimited);
    }

    let (used, recorded) =
        db::user_request::insert_below_limit(pool, &user.id, start_of_utc_day(now), limit).await?;
    let status = QuotaStatus::evaluate(used, limit);
    match recorded {
        Some(request) => tracing::debug!(request_id = %request.id, used, limit, "Request recorded"),
        None => tracing::info!(used, limit, "Daily request quota exhausted"),
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_starts_at_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 23, 59, 59).unwrap();
        assert_eq!(
            start_of_utc_day(now),
            Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn midnight_is_its_own_start() {
        let midnight = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(start_of_utc_day(midnight), midnight);
    }

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(QuotaStatus::evaluate(49, 50), QuotaStatus::Allowed { used: 49, limit: 50 });
        assert!(QuotaStatus::evaluate(50, 50).is_exceeded());
        assert!(QuotaStatus::evaluate(51, 50).is_exceeded());
        assert!(QuotaStatus::evaluate(0, 0).is_exceeded());
    }
}
