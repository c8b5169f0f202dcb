//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that record how the run
//! controller drives its ports.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use stockwatch_core::config::{MonitorConfig, Product};
use stockwatch_core::engine::MonitorEvent;
use stockwatch_core::error::{Error, Result};
use stockwatch_core::traits::{
    Message, MessageKind, NotificationState, Notifier, StateStore, StockProber, StockStatus,
};
use stockwatch_core::MemoryStateStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A prober whose answers are set by the test
///
/// Products without a scripted status report `Unknown`.
#[derive(Clone, Default)]
pub struct ScriptedProber {
    statuses: Arc<Mutex<HashMap<u32, StockStatus>>>,
    probed: Arc<Mutex<Vec<u32>>>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status returned for a product from now on
    pub fn set(&self, product_id: u32, status: StockStatus) {
        self.statuses.lock().unwrap().insert(product_id, status);
    }

    /// Product ids in the order they were probed
    pub fn probed(&self) -> Vec<u32> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl StockProber for ScriptedProber {
    async fn probe(&self, product: &Product) -> StockStatus {
        self.probed.lock().unwrap().push(product.id);
        self.statuses
            .lock()
            .unwrap()
            .get(&product.id)
            .copied()
            .unwrap_or(StockStatus::Unknown)
    }

    fn prober_name(&self) -> &'static str {
        "scripted"
    }
}

/// A notifier that records every message it is asked to send
#[derive(Clone)]
pub struct RecordingNotifier {
    name: &'static str,
    accepted: Vec<MessageKind>,
    failing: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<Message>>>,
    attempts: Arc<AtomicUsize>,
}

impl RecordingNotifier {
    /// A channel taking every kind of message
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            accepted: vec![MessageKind::BackInStock, MessageKind::DailyReport],
            failing: Arc::new(AtomicBool::new(false)),
            sent: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A channel that only takes "back in stock" messages, like Bark
    pub fn back_in_stock_only(name: &'static str) -> Self {
        Self {
            accepted: vec![MessageKind::BackInStock],
            ..Self::new(name)
        }
    }

    /// Make every send fail
    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    /// Messages delivered successfully
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of send attempts, successful or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn boxed(&self) -> Box<dyn Notifier> {
        Box::new(self.clone())
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &Message) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::notify(self.name, "simulated outage"));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn accepts(&self, kind: MessageKind) -> bool {
        self.accepted.contains(&kind)
    }

    fn channel_name(&self) -> &'static str {
        self.name
    }
}

/// A state store that counts calls and can be told to fail
#[derive(Clone, Default)]
pub struct RecordingStateStore {
    inner: MemoryStateStore,
    load_count: Arc<AtomicUsize>,
    save_count: Arc<AtomicUsize>,
    fail_load: Arc<AtomicBool>,
    fail_save: Arc<AtomicBool>,
}

impl RecordingStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: NotificationState) -> Self {
        Self {
            inner: MemoryStateStore::with_state(state),
            ..Self::default()
        }
    }

    pub fn fail_load(self) -> Self {
        self.fail_load.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_save(self) -> Self {
        self.fail_save.store(true, Ordering::SeqCst);
        self
    }

    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> NotificationState {
        self.inner.snapshot().await
    }

    pub fn boxed(&self) -> Box<dyn StateStore> {
        Box::new(self.clone())
    }
}

#[async_trait::async_trait]
impl StateStore for RecordingStateStore {
    async fn load(&self) -> Result<NotificationState> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(Error::state_store("simulated read failure"));
        }
        self.inner.load().await
    }

    async fn save(&self, state: &NotificationState) -> Result<()> {
        self.save_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(Error::state_store("simulated write failure"));
        }
        self.inner.save(state).await
    }
}

/// The three products used throughout the contract tests
pub fn products() -> Vec<Product> {
    vec![
        Product::new(94, "CN2 GIA-E 10G", "49.99", "10G SSD / 0.5G RAM / 1Gbps"),
        Product::new(105, "CN2 GIA-E 20G", "89.99", "20G SSD / 1G RAM / 1Gbps"),
        Product::new(132, "CN2 GIA-E 20G", "89.90", "20G SSD / 1G RAM / 2.5Gbps"),
    ]
}

/// Helper to create a MonitorConfig for testing (no delay between probes)
pub fn test_config() -> MonitorConfig {
    let mut config = MonitorConfig::new().with_products(products());
    config.probe.delay_ms = 0;
    config
}

/// Fixed time source: 2025-01-09 12:00:00 UTC (20:00:00 Beijing)
pub fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 9, 12, 0, 0).unwrap()
}

/// Drain every event emitted so far
pub fn drain_events(rx: &mut mpsc::Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
