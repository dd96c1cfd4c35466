use std::{env, fs, path::Path};

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    error::ApiError,
    models::{UserProfile, UserRow, ROLE_ADMIN, ROLE_NONE},
};

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Creates the parent directory of a file-backed SQLite URL so the first
/// connect does not fail on a missing path. Non-SQLite and in-memory URLs
/// pass through untouched.
pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let Some(target) = sqlite_file_path(db_url) else {
        return Ok(());
    };
    if let Some(parent) = Path::new(target).parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn sqlite_file_path(db_url: &str) -> Option<&str> {
    let raw = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))?;
    let file = raw.split('?').next().unwrap_or(raw);
    let file = file.strip_prefix("file:").unwrap_or(file);
    if file.is_empty() || file == ":memory:" {
        return None;
    }
    Some(file)
}

pub async fn seed_defaults(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    seed_services(pool).await?;
    seed_admin(pool).await?;
    Ok(())
}

/// Insert-or-replace of the profile keyed by email; the role survives so an
/// admin re-issuing a token is not demoted by their own upsert.
pub async fn upsert_user(
    pool: &SqlitePool,
    email: &str,
    profile: &UserProfile,
) -> Result<UserRow, ApiError> {
    sqlx::query(
        r#"INSERT INTO users (email, name, role, updated_at) VALUES (?, ?, ?, ?)
           ON CONFLICT(email) DO UPDATE SET
             name = excluded.name,
             updated_at = excluded.updated_at"#,
    )
    .bind(email)
    .bind(&profile.name)
    .bind(ROLE_NONE)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    fetch_user(pool, email)
        .await?
        .ok_or(ApiError::Unavailable)
}

pub async fn fetch_user(pool: &SqlitePool, email: &str) -> Result<Option<UserRow>, ApiError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT email, name, role, updated_at FROM users WHERE email = ? LIMIT 1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn promote_user(pool: &SqlitePool, email: &str) -> Result<(), ApiError> {
    let result = sqlx::query("UPDATE users SET role = ? WHERE email = ?")
        .bind(ROLE_ADMIN)
        .bind(email)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(())
}

async fn seed_services(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let catalog: Vec<(&str, f64, Vec<&str>)> = vec![
        ("Teeth Cleaning", 30.0, standard_slots()),
        ("Cavity Protection", 40.0, standard_slots()),
        ("Teeth Whitening", 80.0, standard_slots()),
        ("Oral Surgery", 300.0, vec!["10:00 AM - 11:00 AM", "2:00 PM - 3:00 PM"]),
        ("Cosmetic Dentistry", 120.0, standard_slots()),
    ];

    for (name, price, slots) in catalog {
        let exists = sqlx::query_as::<_, (String,)>("SELECT id FROM services WHERE name = ? LIMIT 1")
            .bind(name)
            .fetch_optional(pool)
            .await?;
        if exists.is_some() {
            continue;
        }
        let slots_json = serde_json::to_string(&slots)
            .map_err(|_| sqlx::Error::Protocol("slot catalog encode failed".into()))?;
        sqlx::query("INSERT INTO services (id, name, price, slots) VALUES (?, ?, ?, ?)")
            .bind(new_id())
            .bind(name)
            .bind(price)
            .bind(slots_json)
            .execute(pool)
            .await?;
    }

    Ok(())
}

fn standard_slots() -> Vec<&'static str> {
    vec![
        "8:00 AM - 8:30 AM",
        "8:30 AM - 9:00 AM",
        "9:00 AM - 9:30 AM",
        "9:30 AM - 10:00 AM",
        "10:00 AM - 10:30 AM",
        "10:30 AM - 11:00 AM",
        "11:00 AM - 11:30 AM",
        "2:00 PM - 2:30 PM",
        "2:30 PM - 3:00 PM",
        "3:00 PM - 3:30 PM",
    ]
}

async fn seed_admin(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_as::<_, (String,)>("SELECT email FROM users WHERE role = ? LIMIT 1")
        .bind(ROLE_ADMIN)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    let Ok(email) = env::var("ADMIN_EMAIL") else {
        log::warn!("ADMIN_EMAIL not set. No admin account seeded; promotion requires an existing admin.");
        return Ok(());
    };

    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO users (email, name, role, updated_at) VALUES (?, NULL, ?, ?)
           ON CONFLICT(email) DO UPDATE SET role = excluded.role"#,
    )
    .bind(email)
    .bind(ROLE_ADMIN)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}
