//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the scrim-room matchmaking
//! core using Prometheus metrics.

use crate::config::TeamBalancing;
use crate::types::{CancelReason, CaptainSelectionMethod};
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Queue-related metrics
    queue_metrics: QueueMetrics,

    /// Room lifecycle metrics
    room_metrics: RoomMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Queue-related metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Join attempts by outcome
    pub joins_total: IntCounterVec,

    /// Players currently waiting
    pub players_waiting: IntGauge,

    /// Time spent in the queue before being placed into a room
    pub queue_wait_time_seconds: Histogram,
}

/// Room lifecycle metrics
#[derive(Clone)]
pub struct RoomMetrics {
    pub rooms_created_total: IntCounter,
    pub rooms_ready_total: IntCounter,

    /// Cancelled rooms by reason (declined, expired)
    pub rooms_cancelled_total: IntCounterVec,

    /// Rooms that are neither cancelled nor completed
    pub active_rooms: IntGauge,

    /// Players returned to the queue after a cancellation, by outcome
    pub players_returned_total: IntCounterVec,

    pub captains_selected_total: IntCounterVec,
    pub teams_formed_total: IntCounterVec,
    pub rooms_cleaned_total: IntCounter,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Durations of core operations
    pub operation_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let queue_metrics = QueueMetrics::new(&registry)?;
        let room_metrics = RoomMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            queue_metrics,
            room_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    pub fn room(&self) -> &RoomMetrics {
        &self.room_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a join attempt; `outcome` is "joined" or the rejection kind
    pub fn record_join(&self, outcome: &str, queue_size: usize) {
        self.queue_metrics
            .joins_total
            .with_label_values(&[outcome])
            .inc();
        self.queue_metrics.players_waiting.set(queue_size as i64);
    }

    pub fn set_players_waiting(&self, queue_size: usize) {
        self.queue_metrics.players_waiting.set(queue_size as i64);
    }

    /// Record a room being created from the queue
    pub fn record_room_created(&self, wait_times: &[Duration], queue_size: usize) {
        self.room_metrics.rooms_created_total.inc();
        self.room_metrics.active_rooms.inc();
        for wait in wait_times {
            self.queue_metrics
                .queue_wait_time_seconds
                .observe(wait.as_secs_f64());
        }
        self.queue_metrics.players_waiting.set(queue_size as i64);
    }

    pub fn record_room_ready(&self) {
        self.room_metrics.rooms_ready_total.inc();
    }

    /// Record a cancellation and how the roster fared going back to the queue
    pub fn record_room_cancelled(&self, reason: CancelReason, returned: usize, failed: usize) {
        let reason_str = match reason {
            CancelReason::Declined => "declined",
            CancelReason::Expired => "expired",
        };

        self.room_metrics
            .rooms_cancelled_total
            .with_label_values(&[reason_str])
            .inc();
        self.room_metrics.active_rooms.dec();
        self.room_metrics
            .players_returned_total
            .with_label_values(&["returned"])
            .inc_by(returned as u64);
        self.room_metrics
            .players_returned_total
            .with_label_values(&["failed"])
            .inc_by(failed as u64);
    }

    pub fn record_captains_selected(&self, method: CaptainSelectionMethod) {
        let method_str = match method {
            CaptainSelectionMethod::Random => "random",
            CaptainSelectionMethod::Voting => "voting",
        };

        self.room_metrics
            .captains_selected_total
            .with_label_values(&[method_str])
            .inc();
    }

    pub fn record_teams_formed(&self, strategy: TeamBalancing) {
        let strategy_str = match strategy {
            TeamBalancing::CaptainDraft => "captain_draft",
            TeamBalancing::SkillBalanced => "skill_balanced",
        };

        self.room_metrics
            .teams_formed_total
            .with_label_values(&[strategy_str])
            .inc();
    }

    pub fn record_rooms_cleaned(&self, count: usize) {
        self.room_metrics.rooms_cleaned_total.inc_by(count as u64);
    }

    pub fn set_active_rooms(&self, count: usize) {
        self.room_metrics.active_rooms.set(count as i64);
    }

    /// Record a core operation duration
    pub fn record_operation(&self, operation: &str, duration: Duration) {
        self.performance_metrics
            .operation_duration
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("scrim_room_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "scrim_room_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("scrim_room_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            component_health,
        })
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let joins_total = IntCounterVec::new(
            Opts::new("scrim_room_queue_joins_total", "Queue join attempts"),
            &["outcome"],
        )?;
        registry.register(Box::new(joins_total.clone()))?;

        let players_waiting = IntGauge::new(
            "scrim_room_players_waiting",
            "Players currently waiting in the queue",
        )?;
        registry.register(Box::new(players_waiting.clone()))?;

        let queue_wait_time_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "scrim_room_queue_wait_time_seconds",
                "Time spent in the queue before a room was found",
            )
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        )?;
        registry.register(Box::new(queue_wait_time_seconds.clone()))?;

        Ok(Self {
            joins_total,
            players_waiting,
            queue_wait_time_seconds,
        })
    }
}

impl RoomMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let rooms_created_total =
            IntCounter::new("scrim_room_rooms_created_total", "Match rooms created")?;
        registry.register(Box::new(rooms_created_total.clone()))?;

        let rooms_ready_total = IntCounter::new(
            "scrim_room_rooms_ready_total",
            "Match rooms where every player accepted",
        )?;
        registry.register(Box::new(rooms_ready_total.clone()))?;

        let rooms_cancelled_total = IntCounterVec::new(
            Opts::new("scrim_room_rooms_cancelled_total", "Match rooms cancelled"),
            &["reason"],
        )?;
        registry.register(Box::new(rooms_cancelled_total.clone()))?;

        let active_rooms = IntGauge::new("scrim_room_active_rooms", "Active match rooms")?;
        registry.register(Box::new(active_rooms.clone()))?;

        let players_returned_total = IntCounterVec::new(
            Opts::new(
                "scrim_room_players_returned_total",
                "Players returned to the queue after a cancellation",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(players_returned_total.clone()))?;

        let captains_selected_total = IntCounterVec::new(
            Opts::new(
                "scrim_room_captains_selected_total",
                "Captain pairs selected",
            ),
            &["method"],
        )?;
        registry.register(Box::new(captains_selected_total.clone()))?;

        let teams_formed_total = IntCounterVec::new(
            Opts::new("scrim_room_teams_formed_total", "Rooms with complete teams"),
            &["strategy"],
        )?;
        registry.register(Box::new(teams_formed_total.clone()))?;

        let rooms_cleaned_total = IntCounter::new(
            "scrim_room_rooms_cleaned_total",
            "Terminal rooms garbage-collected",
        )?;
        registry.register(Box::new(rooms_cleaned_total.clone()))?;

        Ok(Self {
            rooms_created_total,
            rooms_ready_total,
            rooms_cancelled_total,
            active_rooms,
            players_returned_total,
            captains_selected_total,
            teams_formed_total,
            rooms_cleaned_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "scrim_room_operation_duration_seconds",
                "Duration of matchmaking operations",
            )
            .buckets(vec![0.00001, 0.0001, 0.001, 0.01, 0.1, 1.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self { operation_duration })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric_names(collector: &MetricsCollector) -> Vec<String> {
        collector
            .registry()
            .gather()
            .iter()
            .map(|mf| mf.get_name().to_string())
            .collect()
    }

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let _service = collector.service();
        let _queue = collector.queue();
        let _room = collector.room();
        let _performance = collector.performance();
    }

    #[test]
    fn test_room_lifecycle_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_room_created(&[Duration::from_secs(3), Duration::from_secs(9)], 0);
        collector.record_room_cancelled(CancelReason::Declined, 2, 0);
        collector.record_room_created(&[Duration::from_secs(1)], 0);
        collector.record_room_ready();

        assert_eq!(collector.room().rooms_created_total.get(), 2);
        assert_eq!(collector.room().rooms_ready_total.get(), 1);
        assert_eq!(collector.room().active_rooms.get(), 1);
        assert_eq!(
            collector
                .room()
                .rooms_cancelled_total
                .with_label_values(&["declined"])
                .get(),
            1
        );
        assert_eq!(
            collector
                .room()
                .players_returned_total
                .with_label_values(&["returned"])
                .get(),
            2
        );
    }

    #[test]
    fn test_join_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_join("joined", 1);
        collector.record_join("joined", 2);
        collector.record_join("queue_full", 2);

        assert_eq!(
            collector
                .queue()
                .joins_total
                .with_label_values(&["joined"])
                .get(),
            2
        );
        assert_eq!(collector.queue().players_waiting.get(), 2);

        let names = metric_names(&collector);
        assert!(names.iter().any(|n| n == "scrim_room_queue_joins_total"));
    }

    #[test]
    fn test_selection_and_team_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_captains_selected(CaptainSelectionMethod::Voting);
        collector.record_teams_formed(TeamBalancing::SkillBalanced);
        collector.record_rooms_cleaned(3);
        collector.record_operation("create_room", Duration::from_micros(40));

        assert_eq!(collector.room().rooms_cleaned_total.get(), 3);
        assert_eq!(
            collector
                .room()
                .captains_selected_total
                .with_label_values(&["voting"])
                .get(),
            1
        );
    }

    #[test]
    fn test_health_status_updates() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.update_health_status(2);
        collector.update_component_health("room_manager", true);
        collector.update_component_health("queue", false);
        assert_eq!(collector.service().health_status.get(), 2);
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.elapsed();
        assert!(duration >= Duration::from_millis(10));

        let final_duration = timer.stop();
        assert!(final_duration >= Duration::from_millis(10));
    }
}
