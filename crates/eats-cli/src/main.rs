use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use eats_db::PgStore;

#[derive(Parser)]
#[command(name = "eats")]
#[command(about = "Eats backend operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Restaurant promotion maintenance
    Promotions {
        #[command(subcommand)]
        cmd: PromotionsCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations. Guardrail: refuses while undelivered orders exist unless --yes is provided.
    Migrate {
        /// Acknowledge you are migrating a DB with orders in flight.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum PromotionsCmd {
    /// Clear every promotion whose window has ended, once.
    Sweep,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = eats_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = eats_db::status(&pool).await?;
                    println!("db_ok={} has_orders_table={}", s.ok, s.has_orders_table);
                }
                DbCmd::Migrate { yes } => {
                    let s = eats_db::status(&pool).await?;
                    if s.has_orders_table {
                        let n = eats_db::count_open_orders(&pool).await?;
                        if n > 0 && !yes {
                            anyhow::bail!(
                                "REFUSING MIGRATE: detected {} undelivered order(s). Re-run with: `eats db migrate --yes`",
                                n
                            );
                        }
                    }

                    eats_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = eats_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Promotions { cmd } => match cmd {
            PromotionsCmd::Sweep => {
                let pool = eats_db::connect_from_env().await?;
                let store = PgStore::new(pool);
                let cleared = eats_service::sweep_promotions(&store, Utc::now())
                    .await
                    .context("promotion sweep failed")?;
                println!("promotions_cleared={}", cleared);
            }
        },
    }

    Ok(())
}

/// Logs go to stderr so stdout stays `key=value` parseable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
