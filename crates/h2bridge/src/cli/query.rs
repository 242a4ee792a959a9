//! `h2bridge query`: one-shot SQL against a temporary server.

use super::ServerArgs;
use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use h2bridge_server::{ConnectionInfo, H2Server};
use futures::TryStreamExt;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Row, TypeInfo};

pub fn run(args: ServerArgs, sql: &str, limit: Option<usize>) -> Result<()> {
    let mut server = H2Server::new(args.into_options()).context("Invalid server configuration")?;

    let (columns, rows) = server.scoped(|server| -> Result<_> {
        let conn = server.connection_info()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build async runtime")?;
        runtime.block_on(fetch_rows(&conn, sql, limit))
    })?;

    if columns.is_empty() {
        println!("(no rows)");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(columns);
    for row in &rows {
        table.add_row(row.clone());
    }
    println!("{table}");
    println!("({} row{})", rows.len(), if rows.len() == 1 { "" } else { "s" });
    Ok(())
}

async fn fetch_rows(
    conn: &ConnectionInfo,
    sql: &str,
    limit: Option<usize>,
) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let pool = conn
        .connect_pool(1)
        .await
        .with_context(|| format!("Failed to connect to {}:{}", conn.host, conn.port))?;

    let fetched = collect_rows(&pool, sql, limit.unwrap_or(usize::MAX)).await;
    pool.close().await;
    fetched
}

/// Stream the result set, stopping once `limit` rows have been read.
async fn collect_rows(
    pool: &PgPool,
    sql: &str,
    limit: usize,
) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut stream = sqlx::query(sql).fetch(pool);
    let mut columns = Vec::new();
    let mut rows = Vec::new();

    while rows.len() < limit {
        let Some(row) = stream.try_next().await.context("Query failed")? else {
            break;
        };
        if columns.is_empty() {
            columns = row.columns().iter().map(|c| c.name().to_string()).collect();
        }
        rows.push((0..row.len()).map(|idx| render_cell(&row, idx)).collect());
    }

    Ok((columns, rows))
}

/// Render one cell as text, trying the decodings H2's PG server commonly produces.
fn render_cell(row: &PgRow, idx: usize) -> String {
    fn show<T: ToString>(value: Option<T>) -> String {
        value.map_or_else(|| "NULL".to_string(), |v| v.to_string())
    }

    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return show(v);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return show(v);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return show(v);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
        return show(v);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return show(v);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return show(v);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return show(v);
    }
    format!("<{}>", row.columns()[idx].type_info().name())
}
