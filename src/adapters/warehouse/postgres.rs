use crate::config::env::DatabaseSettings;
use crate::core::Warehouse;
use crate::utils::error::Result;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolCopyExt, PgPoolOptions};

/// Staging target backed by Postgres.
///
/// Statements run in autocommit mode, one per call. The pool holds a single
/// connection since the pipeline never issues statements concurrently.
#[derive(Debug, Clone)]
pub struct PostgresWarehouse {
    pool: PgPool,
}

impl PostgresWarehouse {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .database(&settings.database)
            .username(&settings.user)
            .password(&settings.password);

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        tracing::debug!(
            "Connected to postgres at {}:{}/{}",
            settings.host,
            settings.port,
            settings.database
        );
        Ok(Self::new(pool))
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        tracing::debug!("SQL: {}", statement);
        sqlx::query(statement).execute(&self.pool).await?;
        Ok(())
    }
}

impl Warehouse for PostgresWarehouse {
    async fn ensure_schema(&self, schema: &str) -> Result<()> {
        self.execute(&create_schema_sql(schema)).await
    }

    async fn drop_table(&self, schema: &str, table: &str) -> Result<()> {
        self.execute(&drop_table_sql(schema, table)).await
    }

    async fn create_text_table(&self, schema: &str, table: &str, columns: &[String]) -> Result<()> {
        self.execute(&create_text_table_sql(schema, table, columns))
            .await
    }

    async fn copy_csv(
        &self,
        schema: &str,
        table: &str,
        columns: &[String],
        body: &[u8],
    ) -> Result<u64> {
        let statement = copy_csv_sql(schema, table, columns);
        tracing::debug!("SQL: {}", statement);

        let mut copy = self.pool.copy_in_raw(&statement).await?;
        let sent = copy.send(body).await.map(|_| ());
        if let Err(e) = sent {
            let _ = copy.abort(e.to_string()).await;
            return Err(e.into());
        }
        Ok(copy.finish().await?)
    }
}

/// Double-quotes an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn create_schema_sql(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema))
}

pub fn drop_table_sql(schema: &str, table: &str) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE", qualified(schema, table))
}

pub fn create_text_table_sql(schema: &str, table: &str, columns: &[String]) -> String {
    let definitions = columns
        .iter()
        .map(|c| format!("{} text", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", qualified(schema, table), definitions)
}

pub fn copy_csv_sql(schema: &str, table: &str, columns: &[String]) -> String {
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv, HEADER true)",
        qualified(schema, table),
        column_list(columns)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("orders"), "\"orders\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_statements() {
        assert_eq!(
            create_schema_sql("stage"),
            "CREATE SCHEMA IF NOT EXISTS \"stage\""
        );
        assert_eq!(
            drop_table_sql("stage", "order_items"),
            "DROP TABLE IF EXISTS \"stage\".\"order_items\" CASCADE"
        );
        assert_eq!(
            create_text_table_sql("stage", "customers", &columns(&["customer_id", "customer_city"])),
            "CREATE TABLE \"stage\".\"customers\" (\"customer_id\" text, \"customer_city\" text)"
        );
        assert_eq!(
            copy_csv_sql("stage", "customers", &columns(&["customer_id", "customer_city"])),
            "COPY \"stage\".\"customers\" (\"customer_id\", \"customer_city\") FROM STDIN WITH (FORMAT csv, HEADER true)"
        );
    }
}
