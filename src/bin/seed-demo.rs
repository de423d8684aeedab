//! Demo data seed script
//!
//! Seeds a demo family for manual testing and app-store review sessions:
//! - Parent account: demo@antbox.app
//! - Family group with the fixed invite code A1B2C3
//! - 1 already-linked child (사과, 🦊) on the roster
//! - 1 pending link request (토토, 🐼) waiting on the approval screen
//!
//! Usage:
//!   DATABASE_URL=... DEMO_PASSWORD=Demo2024! ./seed-demo
//!
//! Environment variables:
//!   DATABASE_URL   — PostgreSQL connection string (required)
//!   DEMO_PASSWORD  — Password for the demo account (default: Demo2024!)

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::env;
use uuid::Uuid;

const DEMO_EMAIL: &str = "demo@antbox.app";
const DEMO_CODE: &str = "A1B2C3";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL required")?;
    let demo_password = env::var("DEMO_PASSWORD").unwrap_or_else(|_| "Demo2024!".to_string());

    println!("=== Seed Demo Family ===");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    antbox_api::db::run_migrations(&pool).await?;

    // 1. Clean any previous demo data, leaves first.
    println!("Cleaning existing demo data...");
    sqlx::query("DELETE FROM link_requests WHERE family_code = $1")
        .bind(DEMO_CODE)
        .execute(&pool)
        .await?;
    sqlx::query("DELETE FROM group_children WHERE family_code = $1")
        .bind(DEMO_CODE)
        .execute(&pool)
        .await?;
    sqlx::query("DELETE FROM children WHERE family_code = $1")
        .bind(DEMO_CODE)
        .execute(&pool)
        .await?;
    sqlx::query("DELETE FROM groups WHERE invite_code = $1")
        .bind(DEMO_CODE)
        .execute(&pool)
        .await?;
    sqlx::query("DELETE FROM parents WHERE email = $1")
        .bind(DEMO_EMAIL)
        .execute(&pool)
        .await?;

    // 2. Parent account
    println!("Creating demo parent ({DEMO_EMAIL})...");
    let password_hash = bcrypt::hash(&demo_password, 12)?;
    let parent_id: Uuid = sqlx::query_scalar(
        "INSERT INTO parents (email, password_hash, display_name, group_code,
                              phone_verified, onboarding_completed)
         VALUES ($1, $2, $3, $4, TRUE, TRUE)
         RETURNING id",
    )
    .bind(DEMO_EMAIL)
    .bind(&password_hash)
    .bind("데모 보호자")
    .bind(DEMO_CODE)
    .fetch_one(&pool)
    .await?;

    // 3. Family group with the fixed demo code
    println!("Creating family group {DEMO_CODE}...");
    sqlx::query("INSERT INTO groups (invite_code, owner_id) VALUES ($1, $2)")
        .bind(DEMO_CODE)
        .bind(parent_id)
        .execute(&pool)
        .await?;

    // 4. One already-linked child on the roster
    println!("Creating linked child 사과...");
    let child_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO children (id, family_code, parent_id, nickname, avatar, age)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(child_id)
    .bind(DEMO_CODE)
    .bind(parent_id)
    .bind("사과")
    .bind("🦊")
    .bind(7)
    .execute(&pool)
    .await?;
    sqlx::query("INSERT INTO group_children (family_code, child_id) VALUES ($1, $2)")
        .bind(DEMO_CODE)
        .bind(child_id)
        .execute(&pool)
        .await?;

    // 5. One pending link request for the approval screen
    println!("Creating pending link request 토토...");
    sqlx::query(
        "INSERT INTO link_requests (family_code, child_nickname, child_avatar, child_age)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(DEMO_CODE)
    .bind("토토")
    .bind("🐼")
    .bind(5)
    .execute(&pool)
    .await?;

    println!("Done.");
    println!("  login:    {DEMO_EMAIL} / {demo_password}");
    println!("  family:   {DEMO_CODE}");

    Ok(())
}
