//! Outboxes for workflow side effects.
//!
//! Actions only record what should happen: a notification row, a queued
//! manager email, a purchase request. Delivery happens elsewhere.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use glowdesk_core::{StoreId, TenantId};
use glowdesk_inventory::InventoryItemId;
use glowdesk_workflows::ExecutionId;

use crate::realtime::ChangeFeed;

/// Row type stored in an outbox.
pub trait OutboxRecord: Clone + Serialize + Send + Sync + 'static {
    /// Table name used on the realtime feed.
    const TABLE: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Staff,
    Manager,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: Uuid,
    pub tenant_id: TenantId,
    pub audience: Audience,
    pub title: String,
    pub message: String,
    pub item_id: Option<InventoryItemId>,
    pub execution_id: Option<ExecutionId>,
    pub created_at: DateTime<Utc>,
}

impl OutboxRecord for Notification {
    const TABLE: &'static str = "notifications";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerEmail {
    pub email_id: Uuid,
    pub tenant_id: TenantId,
    pub subject: String,
    pub body: String,
    pub execution_id: ExecutionId,
    pub queued_at: DateTime<Utc>,
}

impl OutboxRecord for ManagerEmail {
    const TABLE: &'static str = "manager_emails";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub request_id: Uuid,
    pub tenant_id: TenantId,
    pub item_id: InventoryItemId,
    pub store_id: StoreId,
    pub item_name: String,
    pub quantity: i64,
    pub execution_id: ExecutionId,
    pub created_at: DateTime<Utc>,
}

impl OutboxRecord for PurchaseRequest {
    const TABLE: &'static str = "purchase_requests";
}

/// Units to reorder: enough to reach twice the threshold, at least one.
/// Saturates at `i64::MAX`.
pub fn reorder_quantity(quantity_on_hand: i64, low_stock_threshold: i64) -> i64 {
    low_stock_threshold
        .saturating_mul(2)
        .saturating_sub(quantity_on_hand)
        .max(1)
}

/// Records kept per business in each outbox; older ones are dropped first.
pub const OUTBOX_RETENTION: usize = 1_000;

/// Bounded list of records per business.
#[derive(Debug)]
pub struct TenantOutbox<T> {
    rows: RwLock<HashMap<TenantId, VecDeque<T>>>,
    feed: Option<ChangeFeed>,
    retention: usize,
}

impl<T: OutboxRecord> TenantOutbox<T> {
    pub fn new(feed: Option<ChangeFeed>) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            feed,
            retention: OUTBOX_RETENTION,
        }
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    /// Returns false when the outbox lock is poisoned.
    pub fn push(&self, tenant_id: TenantId, record: T) -> bool {
        let Ok(mut rows) = self.rows.write() else {
            return false;
        };
        if let Some(feed) = &self.feed {
            feed.emit_row(tenant_id, T::TABLE, false, &record);
        }
        let rows = rows.entry(tenant_id).or_default();
        rows.push_back(record);
        while rows.len() > self.retention {
            rows.pop_front();
        }
        true
    }

    /// Newest first.
    pub fn list(&self, tenant_id: TenantId) -> Vec<T> {
        let Ok(rows) = self.rows.read() else {
            return vec![];
        };
        rows.get(&tenant_id)
            .map(|r| r.iter().rev().cloned().collect())
            .unwrap_or_default()
    }
}

/// All workflow outboxes of the process.
#[derive(Debug)]
pub struct Outboxes {
    pub notifications: TenantOutbox<Notification>,
    pub emails: TenantOutbox<ManagerEmail>,
    pub purchase_requests: TenantOutbox<PurchaseRequest>,
}

impl Outboxes {
    pub fn new(feed: Option<ChangeFeed>) -> Self {
        Self {
            notifications: TenantOutbox::new(feed.clone()),
            emails: TenantOutbox::new(feed.clone()),
            purchase_requests: TenantOutbox::new(feed),
        }
    }
}

impl Default for Outboxes {
    fn default() -> Self {
        Self::new(None)
    }
}
