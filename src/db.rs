use anyhow::Context;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{CheckIn, QuestionResponse, User};
use crate::snapshot;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn upsert_user(pool: &PgPool, display_name: &str, email: &str) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO coaching_insights.users (id, display_name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
        SET display_name = EXCLUDED.display_name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(display_name)
    .bind(email)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

async fn upsert_checkin(
    pool: &PgPool,
    user_id: Uuid,
    checkin: &CheckIn,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO coaching_insights.checkins
        (id, user_id, checkin_date, mood_score, stress_level, energy_level)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id, checkin_date) DO UPDATE
        SET mood_score = EXCLUDED.mood_score,
            stress_level = EXCLUDED.stress_level,
            energy_level = EXCLUDED.energy_level
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(checkin.date)
    .bind(checkin.mood_score)
    .bind(checkin.stress_level)
    .bind(checkin.energy_level)
    .execute(pool)
    .await?;

    Ok(())
}

async fn insert_response(
    pool: &PgPool,
    user_id: Uuid,
    score: i32,
    category: &str,
    created_at: DateTime<Utc>,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO coaching_insights.question_responses
        (id, user_id, response_score, category, created_at, source_key)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(score)
    .bind(category)
    .bind(created_at)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool, offset: &FixedOffset) -> anyhow::Result<()> {
    let users = vec![
        ("Maya Chen", "maya.chen@example.com", 21_i64),
        ("Tomas Okafor", "tomas.okafor@example.com", 5),
    ];
    let categories = ["self_awareness", "communication", "resilience", "focus"];
    let today = snapshot::local_today(offset);

    for (name, email, days) in users {
        let user_id = upsert_user(pool, name, email).await?;

        for days_ago in 0..days {
            let date = today - Duration::days(days_ago);
            let wave = (days_ago % 5) as i32;
            let checkin = CheckIn {
                date,
                mood_score: Some(2 + (wave + 1) % 4),
                stress_level: Some(1 + (4 - wave) % 5),
                energy_level: if days_ago % 3 == 0 { None } else { Some(3) },
            };
            upsert_checkin(pool, user_id, &checkin).await?;

            for (slot, category) in categories.iter().enumerate() {
                let hour = 8 + slot as u32 * 3;
                let created_at = local_to_utc(
                    date.and_hms_opt(hour, 15, 0).context("invalid seed time")?,
                    offset,
                );
                let score = 1 + (days_ago as i32 + slot as i32 * 2) % 5;
                let source_key = format!("seed-{email}-{days_ago}-{category}");
                insert_response(pool, user_id, score, category, created_at, &source_key).await?;
            }
        }
    }

    Ok(())
}

pub async fn find_user(pool: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, display_name, email FROM coaching_insights.users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| User {
        id: row.get("id"),
        display_name: row.get("display_name"),
        email: row.get("email"),
    }))
}

pub async fn fetch_checkins(
    pool: &PgPool,
    user_id: Uuid,
    since_date: NaiveDate,
    until_date: NaiveDate,
) -> anyhow::Result<Vec<CheckIn>> {
    let rows = sqlx::query(
        "SELECT checkin_date, mood_score, stress_level, energy_level \
         FROM coaching_insights.checkins \
         WHERE user_id = $1 AND checkin_date >= $2 AND checkin_date <= $3 \
         ORDER BY checkin_date DESC",
    )
    .bind(user_id)
    .bind(since_date)
    .bind(until_date)
    .fetch_all(pool)
    .await?;

    let mut checkins = Vec::with_capacity(rows.len());
    for row in rows {
        checkins.push(CheckIn {
            date: row.try_get("checkin_date")?,
            mood_score: row.try_get("mood_score")?,
            stress_level: row.try_get("stress_level")?,
            energy_level: row.try_get("energy_level")?,
        });
    }

    Ok(checkins)
}

pub async fn fetch_responses(
    pool: &PgPool,
    user_id: Uuid,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> anyhow::Result<Vec<QuestionResponse>> {
    let rows = sqlx::query(
        "SELECT id, created_at, response_score, category \
         FROM coaching_insights.question_responses \
         WHERE user_id = $1 AND created_at >= $2 AND created_at < $3 \
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .bind(since)
    .bind(until)
    .fetch_all(pool)
    .await?;

    let mut responses = Vec::with_capacity(rows.len());
    for row in rows {
        responses.push(QuestionResponse {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            response_score: row.try_get("response_score")?,
            category: row.try_get("category")?,
        });
    }

    Ok(responses)
}

/// Reads `local` as wall-clock time at `offset`.
pub fn local_to_utc(local: NaiveDateTime, offset: &FixedOffset) -> DateTime<Utc> {
    offset
        .from_local_datetime(&local)
        .single()
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_else(|| local.and_utc())
}

/// Half-open UTC range from local midnight of `since_date` to the local
/// midnight that ends `today`.
pub fn window_bounds(
    since_date: NaiveDate,
    today: NaiveDate,
    offset: &FixedOffset,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_to_utc(since_date.and_time(NaiveTime::MIN), offset);
    let end_day = today.succ_opt().unwrap_or(today);
    let end = local_to_utc(end_day.and_time(NaiveTime::MIN), offset);
    (start, end)
}

#[derive(Debug, Clone, Default)]
pub struct ActivityData {
    pub checkins: Vec<CheckIn>,
    pub responses: Vec<QuestionResponse>,
}

/// Loads `since_date..=today` for aggregation. A failed fetch is logged
/// and replaced by an empty collection; the aggregator only sees full sets.
pub async fn fetch_window(
    pool: &PgPool,
    user_id: Uuid,
    since_date: NaiveDate,
    today: NaiveDate,
    offset: &FixedOffset,
) -> ActivityData {
    let checkins = fetch_checkins(pool, user_id, since_date, today)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(%user_id, error = %err, "failed to fetch check-ins");
            Vec::new()
        });

    let (start, end) = window_bounds(since_date, today, offset);
    let responses = fetch_responses(pool, user_id, start, end)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(%user_id, error = %err, "failed to fetch question responses");
            Vec::new()
        });

    tracing::debug!(
        %user_id,
        checkins = checkins.len(),
        responses = responses.len(),
        "activity window loaded"
    );

    ActivityData {
        checkins,
        responses,
    }
}

pub async fn import_checkins_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        display_name: String,
        email: String,
        checkin_date: NaiveDate,
        mood_score: Option<i32>,
        stress_level: Option<i32>,
        energy_level: Option<i32>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut upserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let user_id = upsert_user(pool, &row.display_name, &row.email).await?;
        let checkin = CheckIn {
            date: row.checkin_date,
            mood_score: row.mood_score,
            stress_level: row.stress_level,
            energy_level: row.energy_level,
        };
        upsert_checkin(pool, user_id, &checkin).await?;
        upserted += 1;
    }

    Ok(upserted)
}

pub async fn import_responses_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        display_name: String,
        email: String,
        response_score: i32,
        category: String,
        created_at: DateTime<Utc>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let user_id = upsert_user(pool, &row.display_name, &row.email).await?;
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_response(
            pool,
            user_id,
            row.response_score,
            &row.category,
            row.created_at,
            &source_key,
        )
        .await?
        {
            inserted += 1;
        }
    }

    Ok(inserted)
}
