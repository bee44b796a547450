//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::api::ApiServer;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::{AppConfig, is_all_interfaces};
use crate::core::constants::{APP_NAME, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::RecorderService;
use crate::domain::statistics::{GroupingLevel, StatisticsGenerator, StatisticsView, TrendOptions};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub recorder: Arc<RecorderService>,
}

/// Arguments of the `report` command
struct ReportRequest {
    date: NaiveDate,
    by_entity: bool,
    by_sub_entity: bool,
    entity: Option<String>,
    options: TrendOptions,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let app = Self::init(&cli_config).await?;

        match command {
            Some(Commands::Report {
                date,
                by_entity,
                by_sub_entity,
                entity,
                minutes,
                attribute,
            }) => {
                let request = ReportRequest {
                    date,
                    by_entity,
                    by_sub_entity,
                    entity,
                    options: TrendOptions {
                        target_attribute: attribute,
                        minute_bucket_size: minutes,
                    },
                };
                let result = app.report(&request).await;
                app.recorder.close().await;
                let json = result?;
                println!("{}", json);
                Ok(())
            }
            Some(Commands::Serve) | None => Self::start_server(app).await,
        }
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let recorder = RecorderService::open(config.database.backend, &config.database.path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open recorder database: {}",
                    config.database.path.display()
                )
            })?;
        let recorder = Arc::new(recorder);
        tracing::debug!(backend = %recorder.backend(), "Recorder opened");

        let shutdown = ShutdownService::new(recorder.clone());

        Ok(Self {
            shutdown,
            config,
            recorder,
        })
    }

    /// Compute one day's statistics and render every view as pretty JSON
    async fn report(&self, request: &ReportRequest) -> Result<String> {
        let schema = &self.config.schema;
        let generator = StatisticsGenerator::new(self.recorder.executor(), schema);

        let records = match &request.entity {
            Some(entity) => {
                generator
                    .sub_entity_values(entity, request.date, &request.options)
                    .await?
            }
            None => {
                let level = GroupingLevel::from_flags(request.by_entity, request.by_sub_entity)?;
                generator
                    .overall_trend(request.date, level, &request.options)
                    .await?
            }
        };
        tracing::debug!(records = records.len(), date = %request.date, "Report computed");

        let view =
            StatisticsView::new(records).with_sub_entity_prefix(schema.sub_entity_prefix.clone());
        Ok(serde_json::to_string_pretty(&view.snapshot())?)
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", env!("CARGO_CRATE_NAME"));

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        let host = &app.config.server.host;
        let display_host = if is_all_interfaces(host) {
            "localhost"
        } else {
            host.as_str()
        };
        tracing::info!(
            "{} listening on http://{}:{} ({} recorder at {})",
            APP_NAME,
            display_host,
            app.config.server.port,
            app.recorder.backend(),
            app.config.database.path.display()
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }
}
