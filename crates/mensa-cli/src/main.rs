use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mensa")]
#[command(about = "mensa admin CLI", long_about = None)]
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

    /// Compute the layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> override)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity + schema presence check
    Status,

    /// Apply SQL migrations
    Migrate,

    /// Populate the static tables (roles, ratings, both status ladders).
    /// Idempotent: tables that already have rows are left untouched.
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => match cmd {
            DbCmd::Status => {
                let pool = mensa_db::connect_from_env(2).await?;
                let st = mensa_db::status(&pool).await?;
                println!("ok: {}", st.ok);
                println!("has_orders_table: {}", st.has_orders_table);
            }
            DbCmd::Migrate => {
                let pool = mensa_db::connect_from_env(2).await?;
                mensa_db::migrate(&pool).await?;
                println!("migrations applied");
            }
            DbCmd::Seed => {
                let pool = mensa_db::connect_from_env(2).await?;
                mensa_db::migrate(&pool).await?;
                let outcome = mensa_db::seed::seed_static_tables(&pool).await?;
                if outcome.inserted_anything() {
                    println!("seeded: {outcome:?}");
                } else {
                    println!("already seeded; nothing to do");
                }
            }
        },

        Commands::ConfigHash { paths } => {
            let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = mensa_config::load_layered_yaml(&refs)?;
            println!("config_hash: {}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}
