use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::models::{
    DashboardStats, EarningsStats, Payment, PaymentSortKey, Session, SessionStatus, SessionTab,
    Trend,
};

pub const MONTHLY_SESSION_GOAL: usize = 20;

/// Calendar month as `(year, month)`, month being 1-based.
pub type MonthBucket = (i32, u32);

pub fn calculate_dashboard_stats(payments: &[Payment], sessions: &[Session]) -> DashboardStats {
    dashboard_stats_at(payments, sessions, Utc::now())
}

pub fn calculate_earnings_stats(payments: &[Payment]) -> EarningsStats {
    earnings_stats_at(payments, Utc::now())
}

pub fn dashboard_stats_at(
    payments: &[Payment],
    sessions: &[Session],
    now: DateTime<Utc>,
) -> DashboardStats {
    let this_month = month_bucket(now, 0);
    let last_month = month_bucket(now, 1);

    let completed: Vec<&Payment> = payments
        .iter()
        .filter(|p| p.payment_status == "completed")
        .collect();
    let total_earnings: f64 = completed.iter().map(|p| p.amount).sum();
    let this_month_earnings = sum_in_month(&completed, this_month);
    let last_month_earnings = sum_in_month(&completed, last_month);

    let earnings_trend = if last_month_earnings == 0.0 {
        0.0
    } else {
        (this_month_earnings - last_month_earnings) / last_month_earnings * 100.0
    };

    let active_students = sessions
        .iter()
        .map(|s| s.user_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    let this_month_students = students_in_month(sessions, this_month);
    let last_month_students = students_in_month(sessions, last_month);
    let students_trend = if last_month_students == 0 {
        0.0
    } else {
        (this_month_students as f64 - last_month_students as f64) / last_month_students as f64
            * 100.0
    };

    let upcoming_sessions = upcoming_sessions(sessions, now).len();
    let completed_sessions = sessions
        .iter()
        .filter(|s| s.has_status(SessionStatus::Completed))
        .count();

    let completed_this_month = sessions
        .iter()
        .filter(|s| s.has_status(SessionStatus::Completed))
        .filter(|s| in_month(&s.session_date, this_month))
        .count();
    let progress = completed_this_month as f64 / MONTHLY_SESSION_GOAL as f64 * 100.0;

    DashboardStats {
        total_earnings,
        active_students,
        upcoming_sessions,
        completed_sessions,
        students_trend,
        earnings_trend,
        monthly_goal_progress: progress.min(100.0),
    }
}

/// Earnings breakdown for the earnings page.
///
/// With no completed earnings last month the trend reads as +100%, unlike
/// the dashboard figure which reads 0 under the same condition. Failed
/// amounts are taken from the processor `status` field, not `payment_status`.
pub fn earnings_stats_at(payments: &[Payment], now: DateTime<Utc>) -> EarningsStats {
    let this_month = month_bucket(now, 0);
    let last_month = month_bucket(now, 1);

    let completed: Vec<&Payment> = payments
        .iter()
        .filter(|p| p.payment_status == "completed")
        .collect();
    let pending_amount: f64 = payments
        .iter()
        .filter(|p| p.payment_status == "pending")
        .map(|p| p.amount)
        .sum();
    let failed_amount: f64 = payments
        .iter()
        .filter(|p| p.status == "failed")
        .map(|p| p.amount)
        .sum();

    let total_earnings: f64 = completed.iter().map(|p| p.amount).sum();
    let this_month_earnings = sum_in_month(&completed, this_month);
    let last_month_earnings = sum_in_month(&completed, last_month);

    let trend = if last_month_earnings == 0.0 {
        100.0
    } else {
        (this_month_earnings - last_month_earnings) / last_month_earnings * 100.0
    };

    EarningsStats {
        total_earnings,
        pending_amount,
        failed_amount,
        this_month_earnings,
        last_month_earnings,
        earnings_trend: Trend {
            value: trend.abs(),
            is_positive: trend >= 0.0,
        },
    }
}

/// Scheduled sessions dated after `now`, soonest first.
pub fn upcoming_sessions(sessions: &[Session], now: DateTime<Utc>) -> Vec<&Session> {
    let mut upcoming: Vec<(DateTime<Utc>, &Session)> = sessions
        .iter()
        .filter(|s| s.has_status(SessionStatus::Scheduled))
        .filter_map(|s| parse_timestamp(&s.session_date).map(|at| (at, s)))
        .filter(|(at, _)| *at > now)
        .collect();
    upcoming.sort_by_key(|(at, _)| *at);
    upcoming.into_iter().map(|(_, s)| s).collect()
}

/// Sessions shown under `tab`.
///
/// Scheduled sessions whose start has passed count as past. A scheduled
/// session with an unreadable date stays upcoming so it remains visible.
/// Upcoming is ordered soonest first, past most recent first.
pub fn sessions_in_tab(sessions: &[Session], tab: SessionTab, now: DateTime<Utc>) -> Vec<&Session> {
    let mut listed: Vec<&Session> = sessions
        .iter()
        .filter(|s| {
            let started = parse_timestamp(&s.session_date).is_some_and(|at| at < now);
            let scheduled = s.has_status(SessionStatus::Scheduled);
            match tab {
                SessionTab::Upcoming => scheduled && !started,
                SessionTab::Past => s.has_status(SessionStatus::Completed) || (scheduled && started),
                SessionTab::Cancelled => s.has_status(SessionStatus::Cancelled),
            }
        })
        .collect();

    match tab {
        SessionTab::Upcoming => listed.sort_by_key(|s| {
            parse_timestamp(&s.session_date).unwrap_or(DateTime::<Utc>::MAX_UTC)
        }),
        SessionTab::Past => listed.sort_by_key(|s| Reverse(parse_timestamp(&s.session_date))),
        SessionTab::Cancelled => {}
    }
    listed
}

/// Completed earnings for each month of `year`, January first.
pub fn monthly_earnings(payments: &[Payment], year: i32) -> [f64; 12] {
    let mut months = [0.0; 12];
    for payment in payments.iter().filter(|p| p.payment_status == "completed") {
        match parse_timestamp(&payment.payment_date) {
            Some(at) if at.year() == year => months[at.month0() as usize] += payment.amount,
            Some(_) => {}
            None => debug!(date = %payment.payment_date, "skipping payment with unparseable date"),
        }
    }
    months
}

/// Payments ordered by `key`. Dates compare as stored ISO strings; ties keep
/// their fetched order.
pub fn sort_payments(payments: &[Payment], key: PaymentSortKey, descending: bool) -> Vec<&Payment> {
    let mut sorted: Vec<&Payment> = payments.iter().collect();
    sorted.sort_by(|a, b| {
        let ordering = match key {
            PaymentSortKey::Date => a.payment_date.cmp(&b.payment_date),
            PaymentSortKey::Amount => a.amount.partial_cmp(&b.amount).unwrap_or(Ordering::Equal),
            PaymentSortKey::Status => a.payment_status.cmp(&b.payment_status),
        };
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    sorted
}

/// The calendar month `months_back` months before the one containing `now`.
pub fn month_bucket(now: DateTime<Utc>, months_back: u32) -> MonthBucket {
    let index = now.year() * 12 + now.month0() as i32 - months_back as i32;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// Accepts RFC 3339, naive ISO date-times and plain dates. Naive values are
/// read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(parsed.and_utc());
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return parsed.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

fn in_month(value: &str, bucket: MonthBucket) -> bool {
    match parse_timestamp(value) {
        Some(at) => (at.year(), at.month()) == bucket,
        None => {
            debug!(date = value, "skipping record with unparseable date");
            false
        }
    }
}

fn sum_in_month(payments: &[&Payment], bucket: MonthBucket) -> f64 {
    payments
        .iter()
        .filter(|p| in_month(&p.payment_date, bucket))
        .map(|p| p.amount)
        .sum()
}

fn students_in_month(sessions: &[Session], bucket: MonthBucket) -> usize {
    sessions
        .iter()
        .filter(|s| in_month(&s.session_date, bucket))
        .map(|s| s.user_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}
