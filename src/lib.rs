pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod settings;
pub mod stats;
pub mod timer;
pub mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, trace};

use config::AppConfig;
use db::Database;
use settings::SettingsStore;
use stats::format_hours_minutes;
use timer::PomodoroController;

pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub settings: Arc<SettingsStore>,
    pub timer: PomodoroController,
}

impl AppState {
    /// Opens the data directory and wires the engine together. Needs a tokio
    /// runtime.
    pub fn initialize(config: AppConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("failed to create data dir {}", config.data_dir.display())
        })?;

        let db = Database::new(config.database_path())?;
        let settings = Arc::new(SettingsStore::new(config.settings_path())?);
        let timer = PomodoroController::new(&config, settings.clone(), db.clone())?;

        Ok(Self {
            config,
            db,
            settings,
            timer,
        })
    }

    async fn log_summary(&self) -> Result<()> {
        let records = self.db.list_durations().await?;
        let summary = stats::daily_summary(&records, utils::time::today());
        info!(
            "Today: {} rounds, {} focus ({:+} rounds vs yesterday); lifetime {} focus over {} rounds",
            summary.today_rounds,
            format_hours_minutes(summary.today_focus_minutes),
            summary.rounds_vs_yesterday,
            format_hours_minutes(summary.total_focus_minutes),
            summary.total_rounds
        );
        Ok(())
    }

    fn install_hooks(&self) {
        self.timer.set_on_finish_focus(|| info!("Focus finished, time for a break"));
        self.timer.set_on_tick_rest(|| trace!("Rest tick"));
        self.timer.set_on_finish_rest(|| info!("Break over, back to focus"));
    }
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Pomodoro starting up...");

    let config = AppConfig::from_env();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async move {
        let state = AppState::initialize(config)?;
        info!(
            "Data dir {}, tick {:?}, {} min per slider step",
            state.config.data_dir.display(),
            state.config.tick_interval,
            state.config.minutes_per_step
        );
        if let Err(err) = state.log_summary().await {
            error!("Failed to summarize ledger: {err:#}");
        }

        state.install_hooks();
        let mut phase_rx = state.timer.signals().phase();
        tokio::spawn(async move {
            while phase_rx.changed().await.is_ok() {
                let phase = *phase_rx.borrow_and_update();
                info!("Phase is now {}", phase.as_str());
            }
        });

        state.timer.start_focus();

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for ctrl-c")?;
        info!("Shutting down");
        state.timer.shutdown().await;
        state.log_summary().await
    })
}
