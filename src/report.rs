use std::fmt::Write;

use crate::format::{format_currency, format_session_date, format_trend};
use crate::models::{DashboardStats, EarningsStats, Session};
use crate::settings::Preferences;

/// Amounts are in `source_currency` and shown in the preferred currency.
pub fn build_report(
    counselor_id: &str,
    stats: &DashboardStats,
    earnings: &EarningsStats,
    upcoming: &[&Session],
    source_currency: &str,
    preferences: &Preferences,
) -> String {
    let money = |amount: f64| format_currency(amount, &preferences.currency, source_currency);
    let mut output = String::new();

    let _ = writeln!(output, "# Counselor Dashboard Report");
    let _ = writeln!(output, "Generated for counselor {}", counselor_id);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(
        output,
        "- Total earnings: {} ({} vs last month)",
        money(stats.total_earnings),
        format_trend(stats.earnings_trend)
    );
    let _ = writeln!(
        output,
        "- Active students: {} ({} vs last month)",
        stats.active_students,
        format_trend(stats.students_trend)
    );
    let _ = writeln!(output, "- Upcoming sessions: {}", stats.upcoming_sessions);
    let _ = writeln!(output, "- Completed sessions: {}", stats.completed_sessions);
    let _ = writeln!(
        output,
        "- Monthly goal progress: {:.0}%",
        stats.monthly_goal_progress
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Earnings");
    let _ = writeln!(output, "- This month: {}", money(earnings.this_month_earnings));
    let _ = writeln!(output, "- Last month: {}", money(earnings.last_month_earnings));
    let sign = if earnings.earnings_trend.is_positive { "+" } else { "-" };
    let _ = writeln!(
        output,
        "- Trend: {}{:.1}%",
        sign, earnings.earnings_trend.value
    );
    let _ = writeln!(output, "- Pending: {}", money(earnings.pending_amount));
    let _ = writeln!(output, "- Failed: {}", money(earnings.failed_amount));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Upcoming Sessions");

    if upcoming.is_empty() {
        let _ = writeln!(output, "No upcoming sessions scheduled.");
    } else {
        for session in upcoming.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} ({}) on {} for {} min",
                session.user_name,
                session.user_email,
                format_session_date(&session.session_date),
                session.duration
            );
        }
    }

    output
}
