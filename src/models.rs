use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payment {
    pub payment_id: String,
    pub amount: f64,
    pub amount_paid: f64,
    pub currency: String,
    pub channel: String,
    pub counselor_id: String,
    pub counselor_name: String,
    pub user_id: String,
    pub email: String,
    pub payment_date: String,
    pub payment_status: String,
    /// Processor-level status. Only this field marks a payment as failed.
    pub status: String,
    pub reference: String,
    pub session_id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub counselor_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
    pub user_bio: String,
    pub session_date: String,
    pub duration: i32,
    pub status: String,
    pub concerns: Vec<String>,
    pub goals: Vec<String>,
    pub notes: String,
    pub profile_picture: Option<String>,
}

impl Session {
    pub fn has_status(&self, status: SessionStatus) -> bool {
        self.status.eq_ignore_ascii_case(status.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

/// Session list views: upcoming, past (completed or overdue) and cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SessionTab {
    Upcoming,
    Past,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PaymentSortKey {
    Date,
    Amount,
    Status,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub counselor_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
    pub session_date: String,
    pub duration: i32,
    pub concerns: Vec<String>,
    pub goals: Vec<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone_country_code: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    pub bio: String,
    pub concerns: Vec<String>,
    pub goals: Vec<String>,
    pub phone: String,
    pub phone_country_code: String,
    pub emergency_contact: EmergencyContact,
    pub created_at: String,
    pub profile_completion_percentage: i32,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn label(self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub read: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// A notification before the store assigns its id, timestamp and read flag.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_earnings: f64,
    pub active_students: usize,
    pub upcoming_sessions: usize,
    pub completed_sessions: usize,
    pub students_trend: f64,
    pub earnings_trend: f64,
    pub monthly_goal_progress: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    pub value: f64,
    pub is_positive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EarningsStats {
    pub total_earnings: f64,
    pub pending_amount: f64,
    pub failed_amount: f64,
    pub this_month_earnings: f64,
    pub last_month_earnings: f64,
    pub earnings_trend: Trend,
}
