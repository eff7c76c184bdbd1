//! Migration CLI over the full schema (`users` and `email_notifications`).
//!
//! `cargo run -p migration -- up`; connection settings come from `DATABASE_URL`.

use migration::Migrator;
use sea_orm_migration::cli;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
