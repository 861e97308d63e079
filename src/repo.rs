use sqlx::PgPool;

use crate::models::{Diagnosis, NewDiagnosis, Paginated, User};

pub const HISTORY_PER_PAGE: i64 = 10;

const DIAGNOSIS_COLUMNS: &str = "id, user_id, type, disease, confidence, severity, description, \
     explanation, recommendations, alternative_diagnoses, image_path, heatmap_path, \
     symptoms_data, analysis_method, created_at, updated_at";

const USER_COLUMNS: &str = "users.id, users.name, users.email, users.password_hash, users.is_guest, users.created_at";

pub async fn insert_diagnosis(pg_con_pool: &PgPool, new: &NewDiagnosis) -> Result<Diagnosis, sqlx::Error> {
    let query = format!(
        "INSERT INTO diagnoses
            (user_id, type, disease, confidence, severity, description, explanation,
             recommendations, alternative_diagnoses, image_path, heatmap_path,
             symptoms_data, analysis_method)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
         RETURNING {}",
        DIAGNOSIS_COLUMNS
    );

    sqlx::query_as::<_, Diagnosis>(&query)
        .bind(new.user_id)
        .bind(new.diagnosis_type.as_str())
        .bind(&new.disease)
        .bind(new.confidence)
        .bind(&new.severity)
        .bind(&new.description)
        .bind(&new.explanation)
        .bind(&new.recommendations)
        .bind(&new.alternative_diagnoses)
        .bind(&new.image_path)
        .bind(&new.heatmap_path)
        .bind(&new.symptoms_data)
        .bind(&new.analysis_method)
        .fetch_one(pg_con_pool)
        .await
}

/// Newest-first history for one user.
pub async fn diagnosis_history(pg_con_pool: &PgPool, user_id: i64, page: i64) -> Result<Paginated<Diagnosis>, sqlx::Error> {
    let page = page.max(1);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM diagnoses WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pg_con_pool)
        .await?;

    let query = format!(
        "SELECT {} FROM diagnoses WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        DIAGNOSIS_COLUMNS
    );
    let rows = sqlx::query_as::<_, Diagnosis>(&query)
        .bind(user_id)
        .bind(HISTORY_PER_PAGE)
        .bind(page_offset(page))
        .fetch_all(pg_con_pool)
        .await?;

    Ok(Paginated::new(rows, page, HISTORY_PER_PAGE, total))
}

/// Row offset of `page`, saturating so far-out pages read as empty.
fn page_offset(page: i64) -> i64 {
    page.saturating_sub(1).saturating_mul(HISTORY_PER_PAGE)
}

pub async fn find_diagnosis(pg_con_pool: &PgPool, user_id: i64, id: i64) -> Result<Option<Diagnosis>, sqlx::Error> {
    let query = format!("SELECT {} FROM diagnoses WHERE id = $1 AND user_id = $2", DIAGNOSIS_COLUMNS);
    sqlx::query_as::<_, Diagnosis>(&query)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pg_con_pool)
        .await
}

pub async fn create_user(
    pg_con_pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
    is_guest: bool,
) -> Result<User, sqlx::Error> {
    let query = format!(
        "INSERT INTO users (name, email, password_hash, is_guest) VALUES ($1, $2, $3, $4) RETURNING {}",
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&query)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(is_guest)
        .fetch_one(pg_con_pool)
        .await
}

pub async fn find_user_by_email(pg_con_pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    let query = format!("SELECT {} FROM users WHERE lower(email) = lower($1)", USER_COLUMNS);
    sqlx::query_as::<_, User>(&query)
        .bind(email)
        .fetch_optional(pg_con_pool)
        .await
}

pub async fn email_taken(pg_con_pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1))")
        .bind(email)
        .fetch_one(pg_con_pool)
        .await
}

pub async fn insert_token(pg_con_pool: &PgPool, user_id: i64, token_hash: &[u8; 32]) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("INSERT INTO api_tokens (user_id, token_hash) VALUES ($1, $2) RETURNING id")
        .bind(user_id)
        .bind(&token_hash[..])
        .fetch_one(pg_con_pool)
        .await
}

/// Resolve a token hash to its owner, returning the token row id alongside.
pub async fn find_user_by_token(pg_con_pool: &PgPool, token_hash: &[u8; 32]) -> Result<Option<(i64, User)>, sqlx::Error> {
    let token_id: Option<(i64, i64)> = sqlx::query_as(
        "UPDATE api_tokens SET last_used_at = CURRENT_TIMESTAMP WHERE token_hash = $1 RETURNING id, user_id",
    )
    .bind(&token_hash[..])
    .fetch_optional(pg_con_pool)
    .await?;

    let Some((token_id, user_id)) = token_id else {
        return Ok(None);
    };

    let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&query)
        .bind(user_id)
        .fetch_optional(pg_con_pool)
        .await?;

    Ok(user.map(|user| (token_id, user)))
}

pub async fn delete_token(pg_con_pool: &PgPool, token_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM api_tokens WHERE id = $1")
        .bind(token_id)
        .execute(pg_con_pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::auth::{generate_token, hash_token};
    use crate::models::DiagnosisType;
    use crate::test_support::{test_pool, test_user, unique_email};

    fn ai_result(disease: &str) -> serde_json::Value {
        json!({
            "disease": disease,
            "confidence": 0.64,
            "recommendations": ["Monitor the area"],
            "matched_symptoms": {"itching": "yes"}
        })
    }

    #[test]
    fn page_offset_saturates() {
        assert_eq!(page_offset(1), 0);
        assert_eq!(page_offset(3), 20);
        assert_eq!(page_offset(i64::MAX), i64::MAX);
    }

    #[tokio::test]
    async fn stored_diagnosis_is_only_visible_to_its_owner() {
        let Some(pool) = test_pool().await else { return };
        let owner = test_user(&pool).await;
        let stranger = test_user(&pool).await;

        let row = NewDiagnosis::from_ai_result(owner.id, DiagnosisType::Symptoms, &ai_result("Eczema"));
        let saved = insert_diagnosis(&pool, &row).await.unwrap();
        assert_eq!(saved.user_id, Some(owner.id));
        assert_eq!(saved.diagnosis_type, DiagnosisType::Symptoms);
        assert_eq!(saved.disease, "Eczema");
        assert_eq!(saved.confidence, 0.64);
        assert_eq!(saved.symptoms_data, Some(json!({"itching": "yes"})));

        let found = find_diagnosis(&pool, owner.id, saved.id).await.unwrap().unwrap();
        assert_eq!(found.id, saved.id);
        assert!(find_diagnosis(&pool, stranger.id, saved.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn history_is_newest_first_and_paginated() {
        let Some(pool) = test_pool().await else { return };
        let user = test_user(&pool).await;

        let mut ids = Vec::new();
        for n in 0..12 {
            let row = NewDiagnosis::from_ai_result(user.id, DiagnosisType::Image, &ai_result(&format!("Case {n}")));
            ids.push(insert_diagnosis(&pool, &row).await.unwrap().id);
        }
        ids.reverse();

        let first = diagnosis_history(&pool, user.id, 1).await.unwrap();
        assert_eq!(first.total, 12);
        assert_eq!(first.last_page, 2);
        assert_eq!(first.data.iter().map(|d| d.id).collect::<Vec<_>>(), ids[..10]);

        let second = diagnosis_history(&pool, user.id, 2).await.unwrap();
        assert_eq!(second.data.iter().map(|d| d.id).collect::<Vec<_>>(), ids[10..]);

        let far = diagnosis_history(&pool, user.id, i64::MAX).await.unwrap();
        assert!(far.data.is_empty());
        assert_eq!(far.total, 12);
        assert_eq!(far.current_page, i64::MAX);
    }

    #[tokio::test]
    async fn tokens_resolve_to_their_user_until_deleted() {
        let Some(pool) = test_pool().await else { return };
        let user = test_user(&pool).await;
        let token_hash = hash_token(&generate_token());

        let token_id = insert_token(&pool, user.id, &token_hash).await.unwrap();
        let (found_id, found_user) = find_user_by_token(&pool, &token_hash).await.unwrap().unwrap();
        assert_eq!(found_id, token_id);
        assert_eq!(found_user.id, user.id);

        delete_token(&pool, token_id).await.unwrap();
        assert!(find_user_by_token(&pool, &token_hash).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn emails_are_unique_regardless_of_case() {
        let Some(pool) = test_pool().await else { return };
        let email = unique_email("ada");
        let user = create_user(&pool, "Ada", &email, "!test", false).await.unwrap();

        let shouted = email.to_uppercase();
        assert!(email_taken(&pool, &shouted).await.unwrap());
        assert_eq!(find_user_by_email(&pool, &shouted).await.unwrap().map(|u| u.id), Some(user.id));

        match create_user(&pool, "Ada again", &shouted, "!test", false).await {
            Err(sqlx::Error::Database(e)) => assert!(e.is_unique_violation()),
            other => panic!("expected a unique violation, got {other:?}"),
        }
    }
}
