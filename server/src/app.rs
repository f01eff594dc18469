//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::core::cli::{self, Commands};
use crate::core::config::{AppConfig, DatabaseBackend};
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG, ENV_LOG_FORMAT};
use crate::core::shutdown::ShutdownService;
use crate::data::filters::CasePolicy;
use crate::data::{MemoryRowStore, RowStore, SqliteRowStore, SqliteService, StoreColumn};
use crate::domain::{ApplyOptions, PredicateApplier, Table, TableCatalog, orders};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub catalog: Arc<TableCatalog>,
    database: Option<Arc<SqliteService>>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let config = AppConfig::load(&cli_config)?;

        match command {
            Some(Commands::Seed) => return Self::seed(&config).await,
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(config).await?;
        Self::start_server(app).await
    }

    async fn init(config: AppConfig) -> Result<Self> {
        let registry = Arc::new(orders::registry().context("Invalid orders columns")?);
        let columns = StoreColumn::from_registry(&registry);

        let (store, database): (Arc<dyn RowStore>, Option<Arc<SqliteService>>) =
            match config.database.backend {
                DatabaseBackend::Sqlite => {
                    let database = Arc::new(
                        SqliteService::open(&config.database.path)
                            .await
                            .with_context(|| {
                                format!(
                                    "Failed to open database: {}",
                                    config.database.path.display()
                                )
                            })?,
                    );
                    orders::seed_sqlite(database.pool(), config.database.seed_rows).await?;
                    let store =
                        SqliteRowStore::new(database.pool().clone(), orders::TABLE_NAME, columns);
                    (Arc::new(store), Some(database))
                }
                DatabaseBackend::Memory => {
                    let store = MemoryRowStore::new(columns);
                    orders::seed_memory(&store, config.database.seed_rows);
                    (Arc::new(store), None)
                }
            };

        tracing::debug!(backend = store.backend_name(), "Row store initialized");

        let options = ApplyOptions {
            max_page_size: config.query.max_page_size,
            timeout: config.query.timeout(),
            case: CasePolicy::from_sensitive(config.query.case_sensitive),
        };
        let applier = PredicateApplier::new(store, orders::order_key(), options);

        let mut catalog = TableCatalog::new();
        catalog.register(Table::new(
            orders::TABLE_NAME,
            registry,
            applier,
            config.query.default_page_size,
        ))?;

        let shutdown = ShutdownService::new(database.clone());

        Ok(Self {
            shutdown,
            config,
            catalog: Arc::new(catalog),
            database,
        })
    }

    /// Create and fill the SQLite database without starting the server
    async fn seed(config: &AppConfig) -> Result<()> {
        if config.database.backend != DatabaseBackend::Sqlite {
            anyhow::bail!(
                "The seed command needs the sqlite backend (configured: {})",
                config.database.backend
            );
        }

        let database = SqliteService::open(&config.database.path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open database: {}",
                    config.database.path.display()
                )
            })?;
        let inserted = orders::seed_sqlite(database.pool(), config.database.seed_rows).await?;
        database.checkpoint().await?;
        database.close().await;

        println!(
            "Seeded {} rows into {}",
            inserted,
            config.database.path.display()
        );
        Ok(())
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        let json = std::env::var(ENV_LOG_FORMAT).is_ok_and(|f| f.eq_ignore_ascii_case("json"));

        if json {
            tracing_subscriber::fmt()
                .json()
                .with_target(false)
                .with_env_filter(filter)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_thread_ids(false)
                .with_level(true)
                .with_ansi(true)
                .compact()
                .with_env_filter(filter)
                .init();
        }
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        app.start_background_tasks().await;

        tracing::info!(
            host = %app.config.server.host,
            port = app.config.server.port,
            backend = %app.config.database.backend,
            tables = ?app.catalog.names().collect::<Vec<_>>(),
            "Gridline server starting"
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }

    async fn start_background_tasks(&self) {
        if let Some(database) = &self.database {
            self.shutdown
                .register(database.start_checkpoint_task(self.shutdown.subscribe()))
                .await;
        }

        tracing::debug!("Background tasks started");
    }
}
