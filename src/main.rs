use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod db;
mod format;
mod models;
mod notifications;
mod report;
mod resources;
mod settings;
mod stats;
mod storage;

use models::{NewSession, PaymentSortKey, SessionStatus, SessionTab};
use resources::ResourceCategory;
use notifications::NotificationStore;
use settings::Settings;
use storage::SlotStore;

#[derive(Parser)]
#[command(name = "counselor-dashboard")]
#[command(about = "Sessions, students, earnings and notifications for counselors", long_about = None)]
struct Cli {
    /// Directory holding local state (notifications, preferences)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data for a counselor
    Seed {
        #[arg(long)]
        counselor: String,
    },
    /// Import payments from a processor CSV export
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show dashboard statistics
    Dashboard {
        #[arg(long)]
        counselor: String,
    },
    /// Show the earnings breakdown and a month-by-month chart
    Earnings {
        #[arg(long)]
        counselor: String,
        /// Chart year, defaults to the current year
        #[arg(long)]
        year: Option<i32>,
    },
    /// List payment history
    Payments {
        #[arg(long)]
        counselor: String,
        #[arg(long, value_enum, default_value = "date")]
        sort: PaymentSortKey,
        /// Sort descending
        #[arg(long)]
        desc: bool,
    },
    /// List sessions
    Sessions {
        #[arg(long)]
        counselor: String,
        /// Upcoming, past or cancelled; all sessions when omitted
        #[arg(long, value_enum)]
        tab: Option<SessionTab>,
    },
    /// Book a session and raise a booking notification
    Book {
        #[arg(long)]
        counselor: String,
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        student_name: String,
        #[arg(long, default_value = "")]
        student_email: String,
        #[arg(long, default_value = "")]
        student_phone: String,
        /// ISO 8601 start time
        #[arg(long)]
        date: String,
        #[arg(long, default_value_t = 60)]
        duration: i32,
        #[arg(long = "concern")]
        concerns: Vec<String>,
        #[arg(long = "goal")]
        goals: Vec<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Mark a session completed
    Complete { session_id: String },
    /// Cancel a session
    Cancel { session_id: String },
    /// Delete a session
    DeleteSession { session_id: String },
    /// List the counselor's students
    Students {
        #[arg(long)]
        counselor: String,
        /// Match against name or email
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long = "concern")]
        concerns: Vec<String>,
        #[arg(long = "goal")]
        goals: Vec<String>,
    },
    /// Browse the resource library
    Resources {
        #[arg(long, value_enum)]
        category: Option<ResourceCategory>,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Write a markdown dashboard report
    Report {
        #[arg(long)]
        counselor: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Manage local notifications
    Notifications {
        #[command(subcommand)]
        action: NotificationAction,
    },
    /// Manage display preferences
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum NotificationAction {
    /// List notifications, newest first
    List,
    /// Mark one notification read
    Read { id: Uuid },
    /// Mark every notification read
    ReadAll,
    /// Delete one notification
    Delete { id: Uuid },
    /// Delete every notification
    Clear,
    /// Add the demo notifications
    Seed {
        /// Delay between insertions in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Currency { code: String },
    DarkMode,
    Language { language: String },
    Timezone { timezone: String },
}

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn data_dir(cli_value: Option<PathBuf>) -> PathBuf {
    cli_value
        .or_else(|| std::env::var_os("COUNSELOR_DASHBOARD_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(".counselor-dashboard"))
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("counselor_dashboard=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("counselor_dashboard=info,warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let slots = SlotStore::new(data_dir(cli.data_dir));

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { counselor } => {
            let pool = connect().await?;
            db::seed(&pool, &counselor).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let inserted = db::import_payments_csv(&pool, &csv).await?;
            println!("Inserted {inserted} payments from {}.", csv.display());
        }
        Commands::Dashboard { counselor } => {
            let pool = connect().await?;
            let settings = Settings::open(slots)?;
            let currency = &settings.preferences().currency;
            let payments = db::fetch_counselor_payments(&pool, &counselor).await?;
            let sessions = db::fetch_counselor_sessions(&pool, &counselor).await?;
            let stats = stats::calculate_dashboard_stats(&payments, &sessions);
            let source = format::payments_currency(&payments);

            println!(
                "Total earnings:     {} ({})",
                format::format_currency(stats.total_earnings, currency, source),
                format::format_trend(stats.earnings_trend)
            );
            println!(
                "Active students:    {} ({})",
                stats.active_students,
                format::format_trend(stats.students_trend)
            );
            println!("Upcoming sessions:  {}", stats.upcoming_sessions);
            println!("Completed sessions: {}", stats.completed_sessions);
            println!("Monthly goal:       {:.0}%", stats.monthly_goal_progress);
        }
        Commands::Earnings { counselor, year } => {
            let pool = connect().await?;
            let settings = Settings::open(slots)?;
            let currency = &settings.preferences().currency;
            let payments = db::fetch_counselor_payments(&pool, &counselor).await?;
            let earnings = stats::calculate_earnings_stats(&payments);
            let source = format::payments_currency(&payments);
            let money = |amount: f64| format::format_currency(amount, currency, source);

            println!("Total earnings: {}", money(earnings.total_earnings));
            println!("This month:     {}", money(earnings.this_month_earnings));
            println!("Last month:     {}", money(earnings.last_month_earnings));
            println!(
                "Trend:          {}{:.1}%",
                if earnings.earnings_trend.is_positive { "+" } else { "-" },
                earnings.earnings_trend.value
            );
            println!("Pending:        {}", money(earnings.pending_amount));
            println!("Failed:         {}", money(earnings.failed_amount));

            let year = year.unwrap_or_else(|| chrono::Utc::now().year());
            println!();
            println!("Monthly earnings {year}");
            for (month, amount) in stats::monthly_earnings(&payments, year).iter().enumerate() {
                println!("  {:<4} {}", MONTHS[month], money(*amount));
            }
        }
        Commands::Payments {
            counselor,
            sort,
            desc,
        } => {
            let pool = connect().await?;
            let settings = Settings::open(slots)?;
            let currency = &settings.preferences().currency;
            let payments = db::fetch_counselor_payments(&pool, &counselor).await?;
            if payments.is_empty() {
                println!("No payments found.");
                return Ok(());
            }
            for payment in stats::sort_payments(&payments, sort, desc) {
                println!(
                    "- {} {} [{}] {} via {}",
                    payment.payment_date,
                    format::format_currency(
                        payment.amount,
                        currency,
                        format::payment_currency(payment)
                    ),
                    payment.payment_status,
                    payment.reference,
                    payment.channel
                );
            }
        }
        Commands::Sessions { counselor, tab } => {
            let pool = connect().await?;
            let sessions = db::fetch_counselor_sessions(&pool, &counselor).await?;
            let listed: Vec<&models::Session> = match tab {
                Some(tab) => stats::sessions_in_tab(&sessions, tab, chrono::Utc::now()),
                None => sessions.iter().collect(),
            };

            if listed.is_empty() {
                println!("No sessions found.");
                return Ok(());
            }
            for session in listed {
                println!(
                    "- [{}] {} with {} on {} ({} min)",
                    session.status,
                    session.session_id,
                    session.user_name,
                    format::format_session_date(&session.session_date),
                    session.duration
                );
            }
        }
        Commands::Book {
            counselor,
            student_id,
            student_name,
            student_email,
            student_phone,
            date,
            duration,
            concerns,
            goals,
            notes,
        } => {
            if stats::parse_timestamp(&date).is_none() {
                bail!("--date must be an ISO 8601 date or date-time, got {date:?}");
            }
            let pool = connect().await?;
            let mut notifications = NotificationStore::open(slots)?;
            let session = db::create_session(
                &pool,
                NewSession {
                    counselor_id: counselor,
                    user_id: student_id,
                    user_name: student_name,
                    user_email: student_email,
                    user_phone: student_phone,
                    session_date: date,
                    duration,
                    concerns,
                    goals,
                    notes,
                },
            )
            .await?;
            notifications.add_session_booking_notification(&session)?;
            println!("Booked session {}.", session.session_id);
        }
        Commands::Complete { session_id } => {
            let pool = connect().await?;
            set_status(&pool, &session_id, SessionStatus::Completed).await?;
        }
        Commands::Cancel { session_id } => {
            let pool = connect().await?;
            set_status(&pool, &session_id, SessionStatus::Cancelled).await?;
        }
        Commands::DeleteSession { session_id } => {
            let pool = connect().await?;
            if !db::delete_session(&pool, &session_id).await? {
                bail!("session {session_id} not found");
            }
            println!("Deleted session {session_id}.");
        }
        Commands::Students {
            counselor,
            search,
            concerns,
            goals,
        } => {
            let pool = connect().await?;
            let roster = db::fetch_counselor_students(&pool, &counselor).await?;
            let filter = db::StudentFilter {
                search,
                concerns,
                goals,
            };
            let students = db::filter_students(&roster, &filter);
            if students.is_empty() {
                println!("No students found.");
                return Ok(());
            }
            for student in students {
                println!(
                    "- {} ({}) profile {}% complete, concerns: {}",
                    student.name,
                    student.email,
                    student.profile_completion_percentage,
                    if student.concerns.is_empty() {
                        "none".to_string()
                    } else {
                        student.concerns.join(", ")
                    }
                );
            }
        }
        Commands::Resources { category, search } => {
            let found = resources::filter_resources(category, &search);
            if found.is_empty() {
                println!("No resources found.");
                return Ok(());
            }
            for resource in found {
                println!(
                    "- [{}] {} ({}, {}): {}",
                    resource.category.label(),
                    resource.title,
                    resource.file_type.label(),
                    resource.file_url,
                    resource.description
                );
            }
        }
        Commands::Report { counselor, out } => {
            let pool = connect().await?;
            let settings = Settings::open(slots)?;
            let payments = db::fetch_counselor_payments(&pool, &counselor).await?;
            let sessions = db::fetch_counselor_sessions(&pool, &counselor).await?;
            let now = chrono::Utc::now();
            let dashboard = stats::dashboard_stats_at(&payments, &sessions, now);
            let earnings = stats::earnings_stats_at(&payments, now);
            let upcoming = stats::upcoming_sessions(&sessions, now);
            let report = report::build_report(
                &counselor,
                &dashboard,
                &earnings,
                &upcoming,
                format::payments_currency(&payments),
                settings.preferences(),
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Notifications { action } => {
            let mut store = NotificationStore::open(slots)?;
            run_notification_action(&mut store, action).await?;
        }
        Commands::Settings { action } => {
            let mut settings = Settings::open(slots)?;
            match action {
                SettingsAction::Show => {}
                SettingsAction::Currency { code } => settings.set_currency(&code)?,
                SettingsAction::DarkMode => {
                    settings.toggle_dark_mode()?;
                }
                SettingsAction::Language { language } => settings.set_language(&language)?,
                SettingsAction::Timezone { timezone } => settings.set_timezone(&timezone)?,
            }
            let preferences = settings.preferences();
            println!("Currency:  {}", preferences.currency);
            println!("Dark mode: {}", if preferences.is_dark_mode { "on" } else { "off" });
            println!("Language:  {}", preferences.language);
            println!("Timezone:  {}", preferences.timezone);
        }
    }

    Ok(())
}

async fn set_status(pool: &PgPool, session_id: &str, status: SessionStatus) -> anyhow::Result<()> {
    let Some(session) = db::get_session_by_id(pool, session_id).await? else {
        bail!("session {session_id} not found");
    };
    let updated = db::update_session_status(pool, session_id, status).await?;
    ensure_updated(updated, session_id)?;
    println!(
        "Session with {} on {} marked {}.",
        session.user_name,
        format::format_session_date(&session.session_date),
        status.as_str()
    );
    Ok(())
}

/// The row can vanish between the lookup and the update.
fn ensure_updated(updated: bool, session_id: &str) -> anyhow::Result<()> {
    if !updated {
        bail!("session {session_id} was not updated");
    }
    Ok(())
}

async fn run_notification_action(
    store: &mut NotificationStore,
    action: NotificationAction,
) -> anyhow::Result<()> {
    match action {
        NotificationAction::List => {
            if store.notifications().is_empty() {
                println!("No notifications.");
                return Ok(());
            }
            println!("{} unread", store.unread_count());
            for notification in store.notifications() {
                let created = chrono::DateTime::from_timestamp_millis(notification.created_at)
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{} {} [{}] {}: {} ({})",
                    if notification.read { " " } else { "*" },
                    notification.id,
                    notification.kind.label(),
                    notification.title,
                    notification.message,
                    created
                );
            }
        }
        NotificationAction::Read { id } => {
            if store.get(id).is_none() {
                bail!("notification {id} not found");
            }
            store.mark_as_read(id)?;
            println!("{} unread", store.unread_count());
        }
        NotificationAction::ReadAll => {
            store.mark_all_as_read()?;
            println!("All notifications marked read.");
        }
        NotificationAction::Delete { id } => {
            if !store.delete_notification(id)? {
                bail!("notification {id} not found");
            }
            println!("{} unread", store.unread_count());
        }
        NotificationAction::Clear => {
            store.clear_all()?;
            println!("Notifications cleared.");
        }
        NotificationAction::Seed { interval_ms } => {
            let added = store
                .initialize_test_notifications(std::time::Duration::from_millis(interval_ms))
                .await?;
            println!("Added {added} demo notifications.");
        }
    }
    Ok(())
}
