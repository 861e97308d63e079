use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::{error, info};
use anyhow::anyhow;
use reqwest::Client;

const RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

pub const TABLE_NAMES: [&str; 3] = ["users", "api_tokens", "diagnoses"];

pub async fn get_pg_connection_pool(pg_url: &str, num_attempts: u32) -> Result<PgPool, anyhow::Error> {
    info!("Trying to establish a PostgreSQL connection pool");

    let mut attempts = 0;
    let mut err: Option<anyhow::Error> = None;

    while attempts < num_attempts {
        info!("Attempt to connect to PostgreSQL {} of {}", attempts + 1, num_attempts);
        match PgPoolOptions::new()
            .max_connections(10)
            .connect(pg_url)
            .await
        {
            Ok(pg_con_pool) => {
                info!("PostgreSQL connection successful \u{2705}");
                return Ok(pg_con_pool)
            },
            Err(e) => {
                error!("Failed to connect to PostgreSQL. Attempt {} of {}: {}", attempts + 1, num_attempts, e);
                err = Some(anyhow!(e));
            }
        }
        attempts += 1;
        if attempts < num_attempts {
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }
    Err(err.unwrap_or_else(|| anyhow!("Failed to connect to PostgreSQL")))
}

/// Probe the AI service health endpoint. Any HTTP answer counts as reachable.
pub async fn check_ai_service_connection(ai_base_url: &str, num_attempts: u32) -> Result<bool, anyhow::Error> {
    info!("Attempting to connect to the AI service");

    let mut attempts = 0;
    let mut err: Option<anyhow::Error> = None;
    let client = Client::new();

    while attempts < num_attempts {
        info!("Attempt to connect to the AI service {} of {}", attempts + 1, num_attempts);
        match client.get(format!("{}/api/health", ai_base_url)).send().await {
            Ok(res) => {
                info!("AI service connection successful ({}) \u{2705}", res.status());
                return Ok(true)
            },
            Err(e) => {
                error!("Failed to connect to the AI service. Attempt {} of {}: {}", attempts + 1, num_attempts, e);
                err = Some(anyhow!(e));
            }
        }
        attempts += 1;
        if attempts < num_attempts {
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }
    Err(err.unwrap_or_else(|| anyhow!("Failed to connect to the AI service")))
}

pub async fn pred_tables_exist(pg_con_pool: &PgPool, table_names: &[&str]) -> Result<bool, anyhow::Error> {
    info!("Checking whether PostgreSQL tables exist");

    let table_query: &str = r#"select table_name from information_schema.tables where table_schema = current_schema();"#;

    let rows = sqlx::query(table_query)
        .fetch_all(pg_con_pool)
        .await
        .map_err(|err| {
            error!("Failed to execute query: {}", err);
            anyhow::Error::new(err)
        })?;

    let pg_table_names: Vec<String> = rows.into_iter().map(|row| row.get(0)).collect();
    let all_tables_exist = table_names.iter().all(|table_name| pg_table_names.iter().any(|t| t == table_name));

    Ok(all_tables_exist)
}

pub async fn create_tables(pg_con_pool: &PgPool) -> Result<(), anyhow::Error> {
    info!("Creating PostgreSQL tables");

    let create_tables_queries = vec![
        "CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            is_guest BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        "CREATE TABLE IF NOT EXISTS api_tokens (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            token_hash BYTEA NOT NULL UNIQUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            last_used_at TIMESTAMPTZ
        )",
        "CREATE TABLE IF NOT EXISTS diagnoses (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT REFERENCES users(id) ON DELETE CASCADE,
            type TEXT NOT NULL CHECK (type IN ('image', 'symptoms', 'combined')),
            disease TEXT NOT NULL,
            confidence DOUBLE PRECISION NOT NULL CHECK (confidence >= 0 AND confidence <= 1),
            severity TEXT,
            description TEXT,
            explanation TEXT NOT NULL,
            recommendations JSONB NOT NULL,
            alternative_diagnoses JSONB,
            image_path TEXT,
            heatmap_path TEXT,
            symptoms_data JSONB,
            analysis_method TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    ];

    for query in create_tables_queries {
        sqlx::query(query)
            .execute(pg_con_pool)
            .await?;
    }

    create_indexes(pg_con_pool).await
}

/// Emails are unique regardless of case, matching how they are looked up.
pub async fn create_indexes(pg_con_pool: &PgPool) -> Result<(), anyhow::Error> {
    let create_index_queries = [
        "CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_unique ON users (lower(email))",
        "CREATE INDEX IF NOT EXISTS diagnoses_user_id_created_at_index ON diagnoses (user_id, created_at)",
        "CREATE INDEX IF NOT EXISTS diagnoses_type_index ON diagnoses (type)",
    ];

    for query in create_index_queries {
        sqlx::query(query)
            .execute(pg_con_pool)
            .await?;
    }

    Ok(())
}

/// Make sure the schema is in place before serving requests.
pub async fn ensure_schema(pg_con_pool: &PgPool) -> Result<(), anyhow::Error> {
    if pred_tables_exist(pg_con_pool, &TABLE_NAMES).await? {
        info!("All tables found as expected");
        create_indexes(pg_con_pool).await
    } else {
        create_tables(pg_con_pool).await
    }
}
