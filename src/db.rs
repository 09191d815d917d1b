use sqlx::{postgres::PgPoolOptions, PgPool};

const CREATE_LEADS_TABLE: &str = include_str!("../migrations/001_create_leads.sql");

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::query(CREATE_LEADS_TABLE).execute(&pool).await?;

        Ok(Self { pool })
    }
}
