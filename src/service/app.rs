//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the matchmaking
//! core to the health server and owns the background tasks.

use crate::config::AppConfig;
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector, MetricsService};
use crate::service::health::HealthCheck;
use crate::service::matchmaker::Matchmaker;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Interval of the service health metrics task
const HEALTH_METRICS_INTERVAL: Duration = Duration::from_secs(15);

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Core matchmaking components
    matchmaker: Arc<Matchmaker>,

    /// Shared Prometheus collector
    metrics_collector: Arc<MetricsCollector>,

    /// Health and metrics endpoints, present while the service runs
    metrics_service: RwLock<Option<Arc<MetricsService>>>,

    /// Background task handles
    background_tasks: Mutex<Vec<JoinHandle<()>>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    started_at: Instant,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing scrim-room matchmaking service");
        info!(
            "Configuration: service={}, queue_capacity={}, acceptance_window={}ms",
            config.service.name,
            config.matchmaking.queue_capacity,
            config.matchmaking.acceptance_window_ms
        );

        crate::config::validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let matchmaker = Arc::new(Matchmaker::with_tracing(
            config.matchmaking.clone(),
            metrics_collector.clone(),
        ));

        Ok(Self {
            config,
            matchmaker,
            metrics_collector,
            metrics_service: RwLock::new(None),
            background_tasks: Mutex::new(Vec::new()),
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        })
    }

    /// Start the health endpoints and background tasks
    pub async fn start(self: &Arc<Self>) -> Result<(), ServiceError> {
        info!("Starting scrim-room matchmaking service");

        // Mark as running
        self.set_running(true).await;

        // Start metrics service first
        self.start_metrics_service().await?;

        // Start background tasks
        self.start_background_tasks().await?;

        info!("✅ Scrim-room matchmaking service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of scrim-room service");

        // Mark as not running
        self.set_running(false).await;

        // Stop background tasks (including metrics service task)
        self.stop_background_tasks().await;

        // Dropping the service releases the health server's handle on us
        if let Some(metrics_service) = self.metrics_service.write().await.take() {
            info!("Stopping metrics service...");
            if let Err(e) = metrics_service.stop().await {
                warn!("Failed to stop metrics service: {}", e);
            } else {
                info!("✅ Metrics service stopped");
            }
        }

        let final_stats = self
            .matchmaker
            .stats()
            .map_err(|e| ServiceError::BackgroundTask {
                message: format!("Failed to get final stats: {}", e),
            })?;

        info!("Final service statistics: {:?}", final_stats);
        info!("✅ Scrim-room service shutdown completed");

        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub(crate) async fn set_running(&self, running: bool) {
        *self.is_running.write().await = running;
    }

    /// Get the matchmaking core
    pub fn matchmaker(&self) -> Arc<Matchmaker> {
        self.matchmaker.clone()
    }

    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    /// Time since the state was built
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Start metrics service
    async fn start_metrics_service(self: &Arc<Self>) -> Result<(), ServiceError> {
        let port = self.config.service.health_port;
        info!("Starting metrics and health endpoints on port {}", port);

        let health_config = HealthServerConfig {
            port,
            host: "0.0.0.0".to_string(),
        };
        let health_server = Arc::new(
            HealthServer::new(health_config, self.metrics_collector.clone())
                .with_app_state(self.clone()),
        );
        let metrics_service = Arc::new(MetricsService::new(
            self.metrics_collector.clone(),
            health_server,
        ));
        *self.metrics_service.write().await = Some(metrics_service.clone());

        // Spawn the metrics service as a background task
        let metrics_handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("Metrics service failed: {}", e);
            } else {
                info!("Metrics service task completed");
            }
        });

        self.background_tasks.lock().await.push(metrics_handle);

        // Give the server a moment to start up
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        info!("✅ Metrics service started on port {}", port);
        Ok(())
    }

    /// Start background maintenance tasks
    async fn start_background_tasks(self: &Arc<Self>) -> Result<(), ServiceError> {
        info!("Starting background maintenance tasks...");
        let mut tasks = self.background_tasks.lock().await;
        let mut task_count = 0;

        // Expiry sweep and terminal room cleanup
        if let Some(sweep_task) = self.matchmaker.start_expiry_sweep() {
            tasks.push(sweep_task);
            task_count += 1;
        }

        // Service health metrics task
        info!(
            "Starting health metrics task ({}s interval)...",
            HEALTH_METRICS_INTERVAL.as_secs()
        );
        let health_metrics_task = {
            let app_state = Arc::downgrade(self);
            let metrics_collector = self.metrics_collector.clone();
            let is_running = self.is_running.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(HEALTH_METRICS_INTERVAL);
                info!("Health metrics task started");

                while *is_running.read().await {
                    interval.tick().await;

                    let Some(app_state) = app_state.upgrade() else {
                        break;
                    };

                    metrics_collector
                        .service()
                        .uptime_seconds
                        .set(app_state.uptime().as_secs() as i64);

                    match HealthCheck::check(app_state.clone()).await {
                        Ok(health) => {
                            metrics_collector.update_health_status(health.status.as_gauge());
                            for check in &health.checks {
                                metrics_collector.update_component_health(
                                    &check.name,
                                    check.status == crate::service::health::HealthStatus::Healthy,
                                );
                            }
                            metrics_collector.set_active_rooms(health.stats.active_rooms);
                            metrics_collector.set_players_waiting(health.stats.players_waiting);
                            debug!(
                                "Updated service health metrics - status: {}, rooms: {}, waiting: {}",
                                health.status,
                                health.stats.active_rooms,
                                health.stats.players_waiting
                            );
                        }
                        Err(e) => {
                            warn!("Health metrics update failed: {}", e);
                        }
                    }
                }

                info!("Health metrics task stopped");
            })
        };
        tasks.push(health_metrics_task);
        task_count += 1;

        info!(
            "{} background maintenance tasks started successfully",
            task_count
        );
        Ok(())
    }

    /// Stop all background tasks
    async fn stop_background_tasks(&self) {
        let mut tasks = self.background_tasks.lock().await;
        let task_count = tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);

        for (i, task) in tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }

        info!("✅ All {} background tasks stopped", task_count);
    }
}
