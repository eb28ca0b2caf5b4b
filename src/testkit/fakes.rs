//! In-memory collaborators with scripted progress.
//!
//! - [`FakeSubscriptions`] — app subscriptions of a single subaccount.
//!   Best for: orchestrator and tracker behavior around subscriptions.
//!
//! - [`FakeBackend`] — service instances of one target environment.
//!   Best for: creation, status polling and failure handling.
//!
//! Both count calls with shared counters and can fail the first `n` calls of
//! an operation with a transient command error.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::domain::{
    AccountContext, ResourceDefinition, ServiceStatus, SubscriptionRecord, SubscriptionState,
    TargetEnvironment,
};
use crate::error::{ProvisionError, Result};
use crate::port::{EnvironmentBackend, SubscriptionService};

/// Current value plus the values it moves through on later observations.
#[derive(Debug)]
struct Scripted<T> {
    current: Option<T>,
    upcoming: VecDeque<T>,
}

impl<T> Default for Scripted<T> {
    fn default() -> Self {
        Self {
            current: None,
            upcoming: VecDeque::new(),
        }
    }
}

impl<T: Clone> Scripted<T> {
    /// Replace the current value with the next scripted one, or `fallback`.
    fn start(&mut self, fallback: T) {
        self.current = Some(self.upcoming.pop_front().unwrap_or(fallback));
    }

    /// Move to the next scripted value once something has been observed.
    fn step(&mut self) {
        if self.current.is_some() {
            if let Some(next) = self.upcoming.pop_front() {
                self.current = Some(next);
            }
        }
    }
}

/// Take one from `budget` if any is left.
fn take_failure(budget: &AtomicU32) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn transient(program: &str) -> crate::error::Error {
    ProvisionError::Command {
        program: program.to_string(),
        reason: "exited with status 1: temporarily unavailable".to_string(),
    }
    .into()
}

// ---------------------------------------------------------------------------
// FakeSubscriptions
// ---------------------------------------------------------------------------

/// App subscriptions held in memory.
///
/// `subscribe_app` moves an app to its next scripted state, `SUBSCRIBED` by
/// default. Every `list_subscriptions` call returns the current states and
/// then advances each scripted app by one step.
pub struct FakeSubscriptions {
    apps: Mutex<BTreeMap<String, Scripted<SubscriptionState>>>,
    subscribed: Mutex<Vec<String>>,
    subscribe_failures: AtomicU32,
    list_failures: AtomicU32,
    subscribe_count: Arc<AtomicU32>,
    list_count: Arc<AtomicU32>,
}

impl FakeSubscriptions {
    pub fn new() -> Self {
        Self {
            apps: Mutex::new(BTreeMap::new()),
            subscribed: Mutex::new(Vec::new()),
            subscribe_failures: AtomicU32::new(0),
            list_failures: AtomicU32::new(0),
            subscribe_count: Arc::new(AtomicU32::new(0)),
            list_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// An app that is already in `state` before the run starts.
    pub fn with_existing(self, app: &str, state: SubscriptionState) -> Self {
        self.apps.lock().entry(app.to_string()).or_default().current = Some(state);
        self
    }

    /// States `app` moves through after subscribing or being listed.
    pub fn with_progress(
        self,
        app: &str,
        states: impl IntoIterator<Item = SubscriptionState>,
    ) -> Self {
        self.apps
            .lock()
            .entry(app.to_string())
            .or_default()
            .upcoming
            .extend(states);
        self
    }

    /// Fail the first `n` subscribe calls.
    pub fn with_subscribe_failures(self, n: u32) -> Self {
        self.subscribe_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the first `n` list calls.
    pub fn with_list_failures(self, n: u32) -> Self {
        self.list_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Subscribe calls so far, failed ones included.
    pub fn subscribe_count(&self) -> u32 {
        self.subscribe_count.load(Ordering::SeqCst)
    }

    pub fn list_count(&self) -> u32 {
        self.list_count.load(Ordering::SeqCst)
    }

    /// Apps successfully subscribed, in call order.
    pub fn subscribed(&self) -> Vec<String> {
        self.subscribed.lock().clone()
    }

    fn state(&self, app: &str) -> Option<SubscriptionState> {
        self.apps.lock().get(app).and_then(|s| s.current.clone())
    }
}

impl Default for FakeSubscriptions {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionService for FakeSubscriptions {
    async fn subscribe_app(&self, _ctx: &AccountContext, app: &ResourceDefinition) -> Result<()> {
        self.subscribe_count.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.subscribe_failures) {
            return Err(transient("btp"));
        }
        self.apps
            .lock()
            .entry(app.name.clone())
            .or_default()
            .start(SubscriptionState::Subscribed);
        self.subscribed.lock().push(app.name.clone());
        Ok(())
    }

    async fn is_app_subscribed(
        &self,
        _ctx: &AccountContext,
        app_name: &str,
        _plan: Option<&str>,
    ) -> Result<bool> {
        Ok(self.state(app_name) == Some(SubscriptionState::Subscribed))
    }

    async fn list_subscriptions(&self, _ctx: &AccountContext) -> Result<Vec<SubscriptionRecord>> {
        self.list_count.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.list_failures) {
            return Err(transient("btp"));
        }
        let mut apps = self.apps.lock();
        let records = apps
            .iter()
            .filter_map(|(name, scripted)| {
                let state = scripted.current.clone()?;
                let tenant_id = format!("tenant-{name}");
                Some(SubscriptionRecord {
                    app_name: name.clone(),
                    plan_name: None,
                    raw: json!({
                        "appName": name,
                        "state": state.as_str(),
                        "tenantId": tenant_id,
                    }),
                    state,
                    tenant_id: Some(tenant_id),
                })
            })
            .collect();
        apps.values_mut().for_each(Scripted::step);
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// FakeBackend
// ---------------------------------------------------------------------------

/// Service instances of one environment held in memory.
///
/// `create_instance` moves an instance to its next scripted status, create
/// succeeded by default. Every `instance_status` call returns the current
/// status (not found if never created) and then advances it by one step.
pub struct FakeBackend {
    environment: TargetEnvironment,
    instances: Mutex<BTreeMap<String, Scripted<ServiceStatus>>>,
    created: Mutex<Vec<String>>,
    create_failures: AtomicU32,
    status_failures: AtomicU32,
    create_count: Arc<AtomicU32>,
    status_count: Arc<AtomicU32>,
}

impl FakeBackend {
    pub fn new(environment: TargetEnvironment) -> Self {
        Self {
            environment,
            instances: Mutex::new(BTreeMap::new()),
            created: Mutex::new(Vec::new()),
            create_failures: AtomicU32::new(0),
            status_failures: AtomicU32::new(0),
            create_count: Arc::new(AtomicU32::new(0)),
            status_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// An instance that already exists with `status` before the run starts.
    pub fn with_existing(self, instance: &str, status: ServiceStatus) -> Self {
        self.instances
            .lock()
            .entry(instance.to_string())
            .or_default()
            .current = Some(status);
        self
    }

    /// Statuses `instance` moves through after creation or being polled.
    pub fn with_progress(
        self,
        instance: &str,
        statuses: impl IntoIterator<Item = ServiceStatus>,
    ) -> Self {
        self.instances
            .lock()
            .entry(instance.to_string())
            .or_default()
            .upcoming
            .extend(statuses);
        self
    }

    /// Fail the first `n` create calls.
    pub fn with_create_failures(self, n: u32) -> Self {
        self.create_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the first `n` status calls.
    pub fn with_status_failures(self, n: u32) -> Self {
        self.status_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Create calls so far, failed ones included.
    pub fn create_count(&self) -> u32 {
        self.create_count.load(Ordering::SeqCst)
    }

    pub fn status_count(&self) -> u32 {
        self.status_count.load(Ordering::SeqCst)
    }

    /// Instances successfully created, in call order.
    pub fn created(&self) -> Vec<String> {
        self.created.lock().clone()
    }
}

#[async_trait]
impl EnvironmentBackend for FakeBackend {
    fn environment(&self) -> TargetEnvironment {
        self.environment
    }

    async fn create_instance(
        &self,
        _ctx: &AccountContext,
        service: &ResourceDefinition,
    ) -> Result<()> {
        self.create_count.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.create_failures) {
            return Err(transient(self.environment.as_str()));
        }
        let name = service.instance_name().to_string();
        self.instances
            .lock()
            .entry(name.clone())
            .or_default()
            .start(ServiceStatus::succeeded(None));
        self.created.lock().push(name);
        Ok(())
    }

    async fn instance_status(
        &self,
        _ctx: &AccountContext,
        service: &ResourceDefinition,
    ) -> Result<ServiceStatus> {
        self.status_count.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.status_failures) {
            return Err(transient(self.environment.as_str()));
        }
        let mut instances = self.instances.lock();
        let Some(scripted) = instances.get_mut(service.instance_name()) else {
            return Ok(ServiceStatus::not_found());
        };
        let status = scripted.current.clone().unwrap_or_else(ServiceStatus::not_found);
        scripted.step();
        Ok(status)
    }
}
