// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Barrel-generated schema migrations, run through refinery.
//!
//! Each module here exports a `migration()` function returning the raw SQL
//! for one versioned step; [`embed_migrations`] scans this directory at
//! compile time and builds the runner used by [`migrate_from_url`].
use anyhow::{Context, Result};
use refinery::{embed_migrations, Report};
use refinery_core::tokio_postgres::{Config, NoTls};
use tokio::sync::oneshot;
use tracing::Instrument;

#[allow(non_snake_case)]
pub mod V1__initial;

embed_migrations!("./src/db/migrations");

#[tracing::instrument(skip(config))]
async fn migrate(config: Config) -> Result<Report> {
    let (mut client, conn) = config
        .connect(NoTls)
        .await
        .context("unable to connect to database")?;

    let (tx, rx) = oneshot::channel();

    tokio::spawn(
        async move {
            if let Err(e) = conn.await {
                log::error!("migration connection error: {}", e);
            }
            let _ = tx.send(());
        }
        .instrument(tracing::Span::current()),
    );

    let report = migrations::runner().run_async(&mut client).await?;

    drop(client);
    let _ = rx.await;

    Ok(report)
}

/// Runs all pending migrations against the given database url.
pub async fn migrate_from_url(url: &str) -> Result<Report> {
    let config = url.parse::<Config>()?;
    migrate(config).await
}
