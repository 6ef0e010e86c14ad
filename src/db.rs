use anyhow::Context;
use chrono::{Duration, SecondsFormat, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{EmergencyContact, NewSession, Payment, Session, SessionStatus, Student};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// A session row as stored; any column may be missing.
#[derive(Debug, Default, Clone)]
pub struct RawSession {
    pub session_id: String,
    pub counselor_id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_phone: Option<String>,
    pub user_bio: Option<String>,
    pub session_date: Option<String>,
    pub duration: Option<i32>,
    pub status: Option<String>,
    pub concerns: Option<Vec<String>>,
    pub goals: Option<Vec<String>>,
    pub notes: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct RawPayment {
    pub payment_id: String,
    pub amount: Option<f64>,
    pub amount_paid: Option<f64>,
    pub currency: Option<String>,
    pub channel: Option<String>,
    pub counselor_id: Option<String>,
    pub counselor_name: Option<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub payment_date: Option<String>,
    pub payment_status: Option<String>,
    pub status: Option<String>,
    pub reference: Option<String>,
    pub session_id: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct RawStudent {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub concerns: Option<Vec<String>>,
    pub goals: Option<Vec<String>>,
    pub phone: Option<String>,
    pub phone_country_code: Option<String>,
    pub emergency_name: Option<String>,
    pub emergency_relationship: Option<String>,
    pub emergency_phone_country_code: Option<String>,
    pub emergency_phone_number: Option<String>,
    pub profile_completion_percentage: Option<i32>,
    pub profile_picture: Option<String>,
    pub created_at: Option<String>,
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Fills every missing field with an empty value so callers never see gaps.
pub fn parse_session(raw: RawSession) -> Session {
    Session {
        session_id: raw.session_id,
        counselor_id: raw.counselor_id.unwrap_or_default(),
        user_id: raw.user_id.unwrap_or_default(),
        user_name: raw.user_name.unwrap_or_default(),
        user_email: raw.user_email.unwrap_or_default(),
        user_phone: raw.user_phone.unwrap_or_default(),
        user_bio: raw.user_bio.unwrap_or_default(),
        session_date: raw
            .session_date
            .filter(|d| !d.is_empty())
            .unwrap_or_else(now_iso),
        duration: raw.duration.unwrap_or_default(),
        status: raw
            .status
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| SessionStatus::Scheduled.as_str().to_string()),
        concerns: raw.concerns.unwrap_or_default(),
        goals: raw.goals.unwrap_or_default(),
        notes: raw.notes.unwrap_or_default(),
        profile_picture: raw.profile_picture.filter(|p| !p.is_empty()),
    }
}

pub fn parse_payment(raw: RawPayment) -> Payment {
    Payment {
        payment_id: raw.payment_id,
        amount: raw.amount.unwrap_or_default(),
        amount_paid: raw.amount_paid.unwrap_or_default(),
        currency: raw.currency.unwrap_or_default(),
        channel: raw.channel.unwrap_or_default(),
        counselor_id: raw.counselor_id.unwrap_or_default(),
        counselor_name: raw.counselor_name.unwrap_or_default(),
        user_id: raw.user_id.unwrap_or_default(),
        email: raw.email.unwrap_or_default(),
        payment_date: raw.payment_date.unwrap_or_default(),
        payment_status: raw.payment_status.unwrap_or_default(),
        status: raw.status.unwrap_or_default(),
        reference: raw.reference.unwrap_or_default(),
        session_id: raw.session_id.unwrap_or_default(),
        timestamp: raw.timestamp.unwrap_or_default(),
    }
}

/// Roster entries need a real name and email; anything else is skipped.
pub fn parse_student(raw: RawStudent) -> Option<Student> {
    let name = raw.name.filter(|n| !n.is_empty() && n != "Unknown")?;
    let email = raw.email.filter(|e| !e.is_empty())?;
    let bio = raw.bio.unwrap_or_default();
    Some(Student {
        id: raw.id,
        name,
        email,
        bio,
        concerns: raw.concerns.unwrap_or_default(),
        goals: raw.goals.unwrap_or_default(),
        phone: raw.phone.unwrap_or_default(),
        phone_country_code: raw.phone_country_code.unwrap_or_default(),
        emergency_contact: EmergencyContact {
            name: raw.emergency_name.unwrap_or_default(),
            relationship: raw.emergency_relationship.unwrap_or_default(),
            phone_country_code: raw.emergency_phone_country_code.unwrap_or_default(),
            phone_number: raw.emergency_phone_number.unwrap_or_default(),
        },
        created_at: raw.created_at.unwrap_or_else(now_iso),
        profile_completion_percentage: raw.profile_completion_percentage.unwrap_or_default(),
        profile_picture: raw.profile_picture.filter(|p| !p.is_empty()),
    })
}

/// Roster search. An empty field matches everything.
#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub search: String,
    pub concerns: Vec<String>,
    pub goals: Vec<String>,
}

/// Name or email contains the search text (ignoring case), and the student
/// lists at least one of the requested concerns and one of the requested goals.
pub fn filter_students<'a>(students: &'a [Student], filter: &StudentFilter) -> Vec<&'a Student> {
    let needle = filter.search.trim().to_lowercase();
    students
        .iter()
        .filter(|student| {
            needle.is_empty()
                || student.name.to_lowercase().contains(&needle)
                || student.email.to_lowercase().contains(&needle)
        })
        .filter(|student| {
            filter.concerns.is_empty() || filter.concerns.iter().any(|c| student.concerns.contains(c))
        })
        .filter(|student| {
            filter.goals.is_empty() || filter.goals.iter().any(|g| student.goals.contains(g))
        })
        .collect()
}

fn raw_session(row: &PgRow) -> RawSession {
    RawSession {
        session_id: row.get("session_id"),
        counselor_id: row.get("counselor_id"),
        user_id: row.get("user_id"),
        user_name: row.get("user_name"),
        user_email: row.get("user_email"),
        user_phone: row.get("user_phone"),
        user_bio: row.get("user_bio"),
        session_date: row.get("session_date"),
        duration: row.get("duration"),
        status: row.get("status"),
        concerns: row.get("concerns"),
        goals: row.get("goals"),
        notes: row.get("notes"),
        profile_picture: row.get("profile_picture"),
    }
}

const SESSION_SELECT: &str = "s.session_id, s.counselor_id, s.user_id, s.user_name, \
     s.user_email, s.user_phone, s.user_bio, s.session_date, s.duration, s.status, \
     s.concerns, s.goals, s.notes, st.profile_picture \
     FROM counselor_dashboard.sessions s \
     LEFT JOIN counselor_dashboard.students st ON st.id = s.user_id";

pub async fn fetch_counselor_sessions(
    pool: &PgPool,
    counselor_id: &str,
) -> anyhow::Result<Vec<Session>> {
    let query = format!("SELECT {SESSION_SELECT} WHERE s.counselor_id = $1");
    let rows = sqlx::query(&query)
        .bind(counselor_id)
        .fetch_all(pool)
        .await
        .context("failed to fetch sessions")?;

    let sessions: Vec<Session> = rows.iter().map(|row| parse_session(raw_session(row))).collect();
    info!(counselor = counselor_id, count = sessions.len(), "fetched sessions");
    Ok(sessions)
}

pub async fn get_session_by_id(pool: &PgPool, session_id: &str) -> anyhow::Result<Option<Session>> {
    let query = format!("SELECT {SESSION_SELECT} WHERE s.session_id = $1");
    let row = sqlx::query(&query)
        .bind(session_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch session")?;
    Ok(row.map(|row| parse_session(raw_session(&row))))
}

pub async fn create_session(pool: &PgPool, new: NewSession) -> anyhow::Result<Session> {
    let session_id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO counselor_dashboard.sessions
        (session_id, counselor_id, user_id, user_name, user_email, user_phone,
         session_date, duration, status, concerns, goals, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(&session_id)
    .bind(&new.counselor_id)
    .bind(&new.user_id)
    .bind(&new.user_name)
    .bind(&new.user_email)
    .bind(&new.user_phone)
    .bind(&new.session_date)
    .bind(new.duration)
    .bind(SessionStatus::Scheduled.as_str())
    .bind(&new.concerns)
    .bind(&new.goals)
    .bind(&new.notes)
    .execute(pool)
    .await
    .context("failed to create session")?;

    info!(session = %session_id, counselor = %new.counselor_id, "session created");
    Ok(Session {
        session_id,
        counselor_id: new.counselor_id,
        user_id: new.user_id,
        user_name: new.user_name,
        user_email: new.user_email,
        user_phone: new.user_phone,
        user_bio: String::new(),
        session_date: new.session_date,
        duration: new.duration,
        status: SessionStatus::Scheduled.as_str().to_string(),
        concerns: new.concerns,
        goals: new.goals,
        notes: new.notes,
        profile_picture: None,
    })
}

/// Returns false when no session has that id.
pub async fn update_session_status(
    pool: &PgPool,
    session_id: &str,
    status: SessionStatus,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE counselor_dashboard.sessions SET status = $2 WHERE session_id = $1",
    )
    .bind(session_id)
    .bind(status.as_str())
    .execute(pool)
    .await
    .context("failed to update session status")?;

    info!(session = session_id, status = status.as_str(), "session status updated");
    Ok(result.rows_affected() > 0)
}

pub async fn delete_session(pool: &PgPool, session_id: &str) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM counselor_dashboard.sessions WHERE session_id = $1")
        .bind(session_id)
        .execute(pool)
        .await
        .context("failed to delete session")?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_counselor_payments(
    pool: &PgPool,
    counselor_id: &str,
) -> anyhow::Result<Vec<Payment>> {
    let rows = sqlx::query(
        r#"
        SELECT payment_id, amount, amount_paid, currency, channel, counselor_id,
               counselor_name, user_id, email, payment_date, payment_status, status,
               reference, session_id, timestamp
        FROM counselor_dashboard.payments
        WHERE counselor_id = $1
        ORDER BY payment_date DESC
        "#,
    )
    .bind(counselor_id)
    .fetch_all(pool)
    .await
    .context("failed to fetch payments")?;

    let mut payments = Vec::new();
    for row in rows {
        payments.push(parse_payment(RawPayment {
            payment_id: row.get("payment_id"),
            amount: row.get("amount"),
            amount_paid: row.get("amount_paid"),
            currency: row.get("currency"),
            channel: row.get("channel"),
            counselor_id: row.get("counselor_id"),
            counselor_name: row.get("counselor_name"),
            user_id: row.get("user_id"),
            email: row.get("email"),
            payment_date: row.get("payment_date"),
            payment_status: row.get("payment_status"),
            status: row.get("status"),
            reference: row.get("reference"),
            session_id: row.get("session_id"),
            timestamp: row.get("timestamp"),
        }));
    }

    info!(counselor = counselor_id, count = payments.len(), "fetched payments");
    Ok(payments)
}

/// Students the counselor has at least one session with.
pub async fn fetch_counselor_students(
    pool: &PgPool,
    counselor_id: &str,
) -> anyhow::Result<Vec<Student>> {
    let rows = sqlx::query(
        r#"
        SELECT st.id, st.name, st.email, st.bio, st.concerns, st.goals, st.phone,
               st.phone_country_code, st.emergency_name, st.emergency_relationship,
               st.emergency_phone_country_code, st.emergency_phone_number,
               st.profile_completion_percentage, st.profile_picture, st.created_at
        FROM counselor_dashboard.students st
        WHERE st.id IN (
            SELECT DISTINCT user_id FROM counselor_dashboard.sessions WHERE counselor_id = $1
        )
        ORDER BY st.name
        "#,
    )
    .bind(counselor_id)
    .fetch_all(pool)
    .await
    .context("failed to fetch students")?;

    let mut students = Vec::new();
    for row in rows {
        let raw = RawStudent {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            bio: row.get("bio"),
            concerns: row.get("concerns"),
            goals: row.get("goals"),
            phone: row.get("phone"),
            phone_country_code: row.get("phone_country_code"),
            emergency_name: row.get("emergency_name"),
            emergency_relationship: row.get("emergency_relationship"),
            emergency_phone_country_code: row.get("emergency_phone_country_code"),
            emergency_phone_number: row.get("emergency_phone_number"),
            profile_completion_percentage: row.get("profile_completion_percentage"),
            profile_picture: row.get("profile_picture"),
            created_at: row.get("created_at"),
        };
        let id = raw.id.clone();
        match parse_student(raw) {
            Some(student) => students.push(student),
            None => debug!(student = %id, "skipping incomplete student profile"),
        }
    }

    info!(counselor = counselor_id, count = students.len(), "fetched students");
    Ok(students)
}

pub async fn seed(pool: &PgPool, counselor_id: &str) -> anyhow::Result<()> {
    let students = vec![
        ("student-ama", "Ama Mensah", "ama.mensah@example.com", vec!["anxiety"], vec!["sleep better"]),
        ("student-kofi", "Kofi Boateng", "kofi.boateng@example.com", vec!["career"], vec!["choose a major"]),
        ("student-efua", "Efua Asante", "efua.asante@example.com", vec!["grief"], vec!["process loss"]),
    ];

    for (id, name, email, concerns, goals) in &students {
        sqlx::query(
            r#"
            INSERT INTO counselor_dashboard.students
            (id, name, email, concerns, goals, profile_completion_percentage, created_at)
            VALUES ($1, $2, $3, $4, $5, 80, $6)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, email = EXCLUDED.email
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(concerns)
        .bind(goals)
        .bind(now_iso())
        .execute(pool)
        .await?;
    }

    let now = Utc::now();
    let iso = |offset: Duration| (now + offset).to_rfc3339_opts(SecondsFormat::Millis, true);
    let sessions = vec![
        ("seed-session-001", 0, iso(Duration::days(-40)), SessionStatus::Completed),
        ("seed-session-002", 1, iso(Duration::days(-35)), SessionStatus::Completed),
        ("seed-session-003", 0, iso(Duration::days(-2)), SessionStatus::Completed),
        ("seed-session-004", 2, iso(Duration::days(-1)), SessionStatus::Cancelled),
        ("seed-session-005", 1, iso(Duration::days(3)), SessionStatus::Scheduled),
        ("seed-session-006", 2, iso(Duration::days(6)), SessionStatus::Scheduled),
    ];

    for (session_id, student, session_date, status) in &sessions {
        let (user_id, user_name, user_email, concerns, goals) = &students[*student];
        sqlx::query(
            r#"
            INSERT INTO counselor_dashboard.sessions
            (session_id, counselor_id, user_id, user_name, user_email, session_date,
             duration, status, concerns, goals)
            VALUES ($1, $2, $3, $4, $5, $6, 60, $7, $8, $9)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(counselor_id)
        .bind(user_id)
        .bind(user_name)
        .bind(user_email)
        .bind(session_date)
        .bind(status.as_str())
        .bind(concerns)
        .bind(goals)
        .execute(pool)
        .await?;
    }

    let payments = vec![
        ("seed-pay-001", "seed-session-001", 120.0, "completed", "success", iso(Duration::days(-40))),
        ("seed-pay-002", "seed-session-002", 120.0, "completed", "success", iso(Duration::days(-35))),
        ("seed-pay-003", "seed-session-003", 150.0, "completed", "success", iso(Duration::days(-2))),
        ("seed-pay-004", "seed-session-005", 150.0, "pending", "pending", iso(Duration::days(-1))),
        ("seed-pay-005", "seed-session-006", 150.0, "failed", "failed", iso(Duration::hours(-6))),
    ];

    for (payment_id, session_id, amount, payment_status, status, payment_date) in &payments {
        sqlx::query(
            r#"
            INSERT INTO counselor_dashboard.payments
            (payment_id, amount, amount_paid, currency, channel, counselor_id, payment_date,
             payment_status, status, reference, session_id, timestamp)
            VALUES ($1, $2, $2, 'GHS', 'mobile_money', $3, $4, $5, $6, $7, $8, $4)
            ON CONFLICT (payment_id) DO NOTHING
            "#,
        )
        .bind(payment_id)
        .bind(amount)
        .bind(counselor_id)
        .bind(payment_date)
        .bind(payment_status)
        .bind(status)
        .bind(format!("ref-{payment_id}"))
        .bind(session_id)
        .execute(pool)
        .await?;
    }

    info!(counselor = counselor_id, "seed data inserted");
    Ok(())
}

pub async fn import_payments_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        payment_id: Option<String>,
        amount: f64,
        amount_paid: Option<f64>,
        currency: String,
        channel: Option<String>,
        counselor_id: String,
        counselor_name: Option<String>,
        user_id: String,
        email: Option<String>,
        payment_date: String,
        payment_status: String,
        status: Option<String>,
        reference: Option<String>,
        session_id: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let payment_id = row
            .payment_id
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO counselor_dashboard.payments
            (payment_id, amount, amount_paid, currency, channel, counselor_id, counselor_name,
             user_id, email, payment_date, payment_status, status, reference, session_id,
             timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (payment_id) DO NOTHING
            "#,
        )
        .bind(&payment_id)
        .bind(row.amount)
        .bind(row.amount_paid.unwrap_or(row.amount))
        .bind(&row.currency)
        .bind(&row.channel)
        .bind(&row.counselor_id)
        .bind(&row.counselor_name)
        .bind(&row.user_id)
        .bind(&row.email)
        .bind(&row.payment_date)
        .bind(&row.payment_status)
        .bind(&row.status)
        .bind(&row.reference)
        .bind(&row.session_id)
        .bind(now_iso())
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    info!(inserted, path = %csv_path.display(), "payments imported");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_defaults_fill_missing_fields() {
        let session = parse_session(RawSession {
            session_id: "s-1".to_string(),
            user_id: Some("u-1".to_string()),
            ..RawSession::default()
        });
        assert_eq!(session.session_id, "s-1");
        assert_eq!(session.user_id, "u-1");
        assert_eq!(session.user_name, "");
        assert_eq!(session.status, "scheduled");
        assert_eq!(session.duration, 0);
        assert!(session.concerns.is_empty());
        assert!(session.profile_picture.is_none());
        assert!(crate::stats::parse_timestamp(&session.session_date).is_some());
    }

    #[test]
    fn session_keeps_stored_values() {
        let session = parse_session(RawSession {
            session_id: "s-2".to_string(),
            session_date: Some("2025-03-01T10:00:00Z".to_string()),
            status: Some("Completed".to_string()),
            duration: Some(45),
            goals: Some(vec!["focus".to_string()]),
            ..RawSession::default()
        });
        assert_eq!(session.session_date, "2025-03-01T10:00:00Z");
        assert!(session.has_status(SessionStatus::Completed));
        assert_eq!(session.duration, 45);
        assert_eq!(session.goals, vec!["focus".to_string()]);
    }

    #[test]
    fn payment_defaults_to_zero_amounts() {
        let payment = parse_payment(RawPayment {
            payment_id: "p-1".to_string(),
            payment_status: Some("completed".to_string()),
            ..RawPayment::default()
        });
        assert_eq!(payment.amount, 0.0);
        assert_eq!(payment.status, "");
        assert_eq!(payment.payment_status, "completed");
    }

    #[test]
    fn incomplete_students_are_skipped() {
        let complete = RawStudent {
            id: "u-1".to_string(),
            name: Some("Ama Mensah".to_string()),
            email: Some("ama@example.com".to_string()),
            ..RawStudent::default()
        };
        assert!(parse_student(complete.clone()).is_some());

        let unknown = RawStudent {
            name: Some("Unknown".to_string()),
            ..complete.clone()
        };
        assert!(parse_student(unknown).is_none());

        let no_email = RawStudent {
            email: None,
            ..complete
        };
        assert!(parse_student(no_email).is_none());
    }

    fn roster() -> Vec<Student> {
        vec![
            Student {
                id: "u-1".to_string(),
                name: "Ama Mensah".to_string(),
                email: "ama.mensah@example.com".to_string(),
                concerns: vec!["anxiety".to_string(), "sleep".to_string()],
                goals: vec!["sleep better".to_string()],
                ..Student::default()
            },
            Student {
                id: "u-2".to_string(),
                name: "Kofi Boateng".to_string(),
                email: "kb@school.edu".to_string(),
                concerns: vec!["career".to_string()],
                goals: vec!["choose a major".to_string()],
                ..Student::default()
            },
        ]
    }

    fn ids(students: Vec<&Student>) -> Vec<&str> {
        students.into_iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn empty_filter_keeps_whole_roster() {
        let students = roster();
        assert_eq!(ids(filter_students(&students, &StudentFilter::default())), vec!["u-1", "u-2"]);
    }

    #[test]
    fn search_matches_name_or_email_ignoring_case() {
        let students = roster();
        let by_name = StudentFilter {
            search: "MENSAH".to_string(),
            ..StudentFilter::default()
        };
        assert_eq!(ids(filter_students(&students, &by_name)), vec!["u-1"]);

        let by_email = StudentFilter {
            search: "school.edu".to_string(),
            ..StudentFilter::default()
        };
        assert_eq!(ids(filter_students(&students, &by_email)), vec!["u-2"]);
    }

    #[test]
    fn concern_and_goal_filters_match_any_listed_value() {
        let students = roster();
        let concerns = StudentFilter {
            concerns: vec!["career".to_string(), "grief".to_string()],
            ..StudentFilter::default()
        };
        assert_eq!(ids(filter_students(&students, &concerns)), vec!["u-2"]);

        let mismatched = StudentFilter {
            concerns: vec!["career".to_string()],
            goals: vec!["sleep better".to_string()],
            ..StudentFilter::default()
        };
        assert!(filter_students(&students, &mismatched).is_empty());
    }
}
