//! Run controller
//!
//! The StockMonitor is responsible for one scheduled pass:
//! - Probing every product in catalog order, pausing between probes
//! - Applying the notification latch to the observations
//! - Sending "back in stock" messages or the daily report
//! - Persisting the notification state
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ StockProber │─── Observation ─────┐
//! └─────────────┘                     │
//!                                     ▼
//!                            ┌──────────────┐
//!                            │ StockMonitor │
//!                            └──────────────┘
//!                                     │
//!         ┌───────────────────────────┼───────────────────────────┐
//!         │                           │                           │
//!         ▼                           ▼                           ▼
//! ┌─────────────┐           ┌──────────────┐           ┌─────────────┐
//! │ StateStore  │           │  Notifiers   │           │   Events    │
//! │ (load/save) │           │  (deliver)   │           │  (observe)  │
//! └─────────────┘           └──────────────┘           └─────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Probe all products (sequentially, fixed delay in between)
//! 2. Daily report: render digest, deliver, done (state untouched)
//! 3. Otherwise load state, apply [`transition::apply_observations`]
//! 4. Deliver one message per rising edge
//! 5. Save state, whatever the delivery outcome
//!
//! Messages go out before the state is saved. A crash between the two
//! re-sends the notification on the next run.

pub mod transition;

use crate::config::{MonitorConfig, Product};
use crate::error::Result;
use crate::report;
use crate::traits::{
    Message, MessageKind, NotificationState, Notifier, Observation, StateStore, StockProber,
    StockStatus,
};
use chrono::{DateTime, FixedOffset, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub use transition::{Transition, TransitionOutcome, apply_observations};

/// What a run does after probing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Notify on rising edges and persist state
    #[default]
    Transitions,
    /// Send the full digest; state is neither read nor written
    DailyReport,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Transitions => f.write_str("transitions"),
            RunMode::DailyReport => f.write_str("daily-report"),
        }
    }
}

/// Events emitted by the StockMonitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Run started
    RunStarted {
        mode: RunMode,
        products_count: usize,
    },

    /// A product was probed
    ProductChecked {
        product_id: u32,
        status: StockStatus,
    },

    /// Rising edge: the product was announced
    NotificationTriggered {
        product_id: u32,
    },

    /// Still in stock, already announced for this streak
    NotificationSuppressed {
        product_id: u32,
    },

    /// Out of stock again; the next in-stock observation will notify
    StreakReset {
        product_id: u32,
    },

    /// A channel failed to deliver a message
    DeliveryFailed {
        channel: String,
        kind: MessageKind,
        error: String,
    },

    /// Daily report handed to the channels
    ReportSent {
        deliveries: usize,
    },

    /// Notification state could not be persisted
    StateSaveFailed {
        error: String,
    },

    /// Run finished
    RunFinished {
        summary: RunSummary,
    },
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Mode the run executed in
    pub mode: RunMode,
    /// Products observed in stock
    pub in_stock: usize,
    /// Products observed out of stock
    pub out_of_stock: usize,
    /// Products whose check failed
    pub unknown: usize,
    /// Rising edges announced
    pub notifications: usize,
    /// Successful channel deliveries
    pub deliveries: usize,
    /// Failed channel deliveries
    pub delivery_failures: usize,
    /// Whether the notification state was written
    pub state_saved: bool,
}

impl RunSummary {
    fn new(mode: RunMode, observations: &[Observation]) -> Self {
        let count = |status: StockStatus| {
            observations
                .iter()
                .filter(|observation| observation.status == status)
                .count()
        };

        Self {
            mode,
            in_stock: count(StockStatus::InStock),
            out_of_stock: count(StockStatus::OutOfStock),
            unknown: count(StockStatus::Unknown),
            notifications: 0,
            deliveries: 0,
            delivery_failures: 0,
            state_saved: false,
        }
    }
}

/// Core run controller
///
/// One `run` call is one scheduled invocation. The monitor itself is
/// stateless between runs; everything durable lives in the [`StateStore`].
///
/// ## Failure Handling
///
/// Nothing fails a run. Probe failures become [`StockStatus::Unknown`],
/// delivery failures are logged per channel, and state load/save failures
/// are logged and degrade to empty state or a skipped write.
pub struct StockMonitor {
    /// Prober for order pages
    prober: Box<dyn StockProber>,

    /// Configured channels
    notifiers: Vec<Box<dyn Notifier>>,

    /// State store for notification flags
    state_store: Box<dyn StateStore>,

    /// Products to check
    products: Vec<Product>,

    /// URL template linked from messages
    order_url_template: String,

    /// Pause between consecutive probes
    probe_delay: Duration,

    /// Time zone for timestamps
    offset: FixedOffset,

    /// Time source
    clock: fn() -> DateTime<Utc>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<MonitorEvent>,
}

impl StockMonitor {
    /// Create a new monitor
    ///
    /// # Returns
    ///
    /// A tuple of (monitor, event_receiver) where event_receiver yields monitor events
    pub fn new(
        prober: Box<dyn StockProber>,
        notifiers: Vec<Box<dyn Notifier>>,
        state_store: Box<dyn StateStore>,
        config: MonitorConfig,
    ) -> Result<(Self, mpsc::Receiver<MonitorEvent>)> {
        config.validate()?;

        let offset = config.report.offset()?;
        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let monitor = Self {
            prober,
            notifiers,
            state_store,
            products: config.products,
            order_url_template: config.probe.order_url_template,
            probe_delay: Duration::from_millis(config.probe.delay_ms),
            offset,
            clock: Utc::now,
            event_tx: tx,
        };

        Ok((monitor, rx))
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Names of the configured channels
    pub fn channel_names(&self) -> Vec<&'static str> {
        self.notifiers.iter().map(|n| n.channel_name()).collect()
    }

    /// Current time, formatted in the report time zone
    pub fn timestamp(&self) -> String {
        report::format_timestamp((self.clock)(), self.offset)
    }

    /// Execute one run
    pub async fn run(&self, mode: RunMode) -> RunSummary {
        info!(
            "Stock check ({}) started at {} using {}",
            mode,
            self.timestamp(),
            self.prober.prober_name()
        );
        self.emit_event(MonitorEvent::RunStarted {
            mode,
            products_count: self.products.len(),
        });

        let observations = self.check_all().await;
        let timestamp = self.timestamp();
        let mut summary = RunSummary::new(mode, &observations);

        match mode {
            RunMode::DailyReport => {
                let message =
                    report::daily_report(&observations, &self.order_url_template, &timestamp);
                let delivered = self.dispatch(&message, &mut summary).await;
                self.emit_event(MonitorEvent::ReportSent {
                    deliveries: delivered,
                });
                info!("Daily report sent at {}", timestamp);
            }
            RunMode::Transitions => {
                self.run_transitions(&observations, &timestamp, &mut summary)
                    .await;
            }
        }

        info!(
            "Run finished: {} in stock, {} out of stock, {} unknown, {} notification(s)",
            summary.in_stock, summary.out_of_stock, summary.unknown, summary.notifications
        );
        self.emit_event(MonitorEvent::RunFinished {
            summary: summary.clone(),
        });

        summary
    }

    /// Probe every product in catalog order
    pub async fn check_all(&self) -> Vec<Observation> {
        let mut observations = Vec::with_capacity(self.products.len());

        for (index, product) in self.products.iter().enumerate() {
            if index > 0 && !self.probe_delay.is_zero() {
                tokio::time::sleep(self.probe_delay).await;
            }

            debug!("Checking PID {} ({})", product.id, product.name);
            let status = self.prober.probe(product).await;

            match status {
                StockStatus::InStock => {
                    info!("PID {} ({}): in stock, ${}/year", product.id, product.name, product.price)
                }
                StockStatus::OutOfStock => {
                    info!("PID {} ({}): out of stock", product.id, product.name)
                }
                StockStatus::Unknown => {
                    warn!("PID {} ({}): check failed", product.id, product.name)
                }
            }

            self.emit_event(MonitorEvent::ProductChecked {
                product_id: product.id,
                status,
            });
            observations.push(Observation::new(product.clone(), status));
        }

        observations
    }

    /// Apply the latch, notify rising edges and persist state
    async fn run_transitions(
        &self,
        observations: &[Observation],
        timestamp: &str,
        summary: &mut RunSummary,
    ) {
        let state = match self.state_store.load().await {
            Ok(state) => state,
            Err(e) => {
                warn!("Could not load notification state: {}. Starting with empty state.", e);
                NotificationState::new()
            }
        };

        let outcome = apply_observations(state, observations, timestamp);

        for (product_id, transition) in &outcome.transitions {
            match transition {
                Transition::Suppressed => {
                    debug!("PID {} already notified for this streak", product_id);
                    self.emit_event(MonitorEvent::NotificationSuppressed {
                        product_id: *product_id,
                    });
                }
                Transition::Reset => {
                    debug!("PID {} out of stock, notification re-armed", product_id);
                    self.emit_event(MonitorEvent::StreakReset {
                        product_id: *product_id,
                    });
                }
                Transition::Fired | Transition::Unchanged => {}
            }
        }

        if summary.in_stock == 0 {
            info!("No stock available");
        }

        for product in &outcome.notifications {
            let message = report::back_in_stock(product, &self.order_url_template);
            self.dispatch(&message, summary).await;
            summary.notifications += 1;
            self.emit_event(MonitorEvent::NotificationTriggered {
                product_id: product.id,
            });
            info!("Stock notification sent: {} (PID {})", product.name, product.id);
        }

        match self.state_store.save(&outcome.state).await {
            Ok(()) => summary.state_saved = true,
            Err(e) => {
                error!("Could not save notification state: {}", e);
                self.emit_event(MonitorEvent::StateSaveFailed {
                    error: e.to_string(),
                });
            }
        }
    }

    /// Deliver a message to every channel that takes its kind
    ///
    /// Returns the number of successful deliveries.
    async fn dispatch(&self, message: &Message, summary: &mut RunSummary) -> usize {
        let mut delivered = 0;

        if self.notifiers.is_empty() {
            info!("No notification channels configured, message not sent");
            return delivered;
        }

        for notifier in &self.notifiers {
            let channel = notifier.channel_name();
            if !notifier.accepts(message.kind) {
                debug!("Channel {} skips {:?} messages", channel, message.kind);
                continue;
            }

            match notifier.send(message).await {
                Ok(()) => {
                    info!("{} notification sent", channel);
                    delivered += 1;
                }
                Err(e) => {
                    warn!("{} notification failed: {}", channel, e);
                    summary.delivery_failures += 1;
                    self.emit_event(MonitorEvent::DeliveryFailed {
                        channel: channel.to_string(),
                        kind: message.kind,
                        error: e.to_string(),
                    });
                }
            }
        }

        summary.deliveries += delivered;
        delivered
    }

    /// Emit a monitor event
    fn emit_event(&self, event: MonitorEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!("Event channel full, dropping event: {:?}", event);
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
