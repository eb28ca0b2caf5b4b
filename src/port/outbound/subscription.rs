//! Subscription port for multitenant applications.
//!
//! This module defines the trait the orchestrator and tracker use to
//! subscribe a subaccount to applications and to read the subscription list
//! back.

use async_trait::async_trait;

use crate::domain::{AccountContext, ResourceDefinition, SubscriptionRecord};
use crate::error::Result;

/// Access to the app subscriptions of a subaccount.
#[async_trait]
pub trait SubscriptionService: Send + Sync {
    /// Trigger a subscription to `app` with its plan and parameters.
    ///
    /// Not guaranteed to be idempotent; callers check
    /// [`is_app_subscribed`](Self::is_app_subscribed) first.
    async fn subscribe_app(&self, ctx: &AccountContext, app: &ResourceDefinition) -> Result<()>;

    /// True if the subaccount reports the app (and plan) as subscribed.
    async fn is_app_subscribed(
        &self,
        ctx: &AccountContext,
        app_name: &str,
        plan: Option<&str>,
    ) -> Result<bool>;

    /// Every subscription entry the subaccount reports.
    async fn list_subscriptions(&self, ctx: &AccountContext) -> Result<Vec<SubscriptionRecord>>;
}
