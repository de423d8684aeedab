/// Delete one family's data by invite code (support tooling for account
/// deletion requests).
///
/// Usage: purge-family --code A1B2C3 [--delete-owner]
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use antbox_api::services::family::FamilyService;

#[derive(Parser)]
#[command(name = "purge-family", about = "Purge one family's data from the antbox database")]
struct Args {
    /// Family invite code to purge
    #[arg(long)]
    code: String,

    /// Also delete the owning parent account (and its refresh tokens)
    #[arg(long, default_value_t = false)]
    delete_owner: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let code = FamilyService::normalize_code(&args.code);

    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL environment variable not set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let owner_id: Option<uuid::Uuid> =
        sqlx::query_scalar("SELECT owner_id FROM groups WHERE invite_code = $1")
            .bind(&code)
            .fetch_optional(&pool)
            .await?;

    let Some(owner_id) = owner_id else {
        tracing::warn!("no group found for code {code}, nothing to purge");
        return Ok(());
    };

    tracing::info!("Purging family {code} (owner {owner_id})...");

    let mut tx = pool.begin().await?;

    let requests = sqlx::query("DELETE FROM link_requests WHERE family_code = $1")
        .bind(&code)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    sqlx::query("DELETE FROM group_children WHERE family_code = $1")
        .bind(&code)
        .execute(&mut *tx)
        .await?;
    let children = sqlx::query("DELETE FROM children WHERE family_code = $1")
        .bind(&code)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    sqlx::query("DELETE FROM groups WHERE invite_code = $1")
        .bind(&code)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE parents SET group_code = NULL WHERE group_code = $1")
        .bind(&code)
        .execute(&mut *tx)
        .await?;

    if args.delete_owner {
        sqlx::query("DELETE FROM refresh_tokens WHERE parent_id = $1")
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM parents WHERE id = $1")
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
        tracing::info!("Deleted owner account {owner_id}");
    }

    tx.commit().await?;

    tracing::info!(
        "Purge complete: {requests} link requests, {children} children removed for {code}"
    );

    Ok(())
}
