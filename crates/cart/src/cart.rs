use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trolley_core::{CartId, Entity};

/// A shopper's in-progress cart.
///
/// `total_price` is derived — callers never set it directly; the mutation
/// engine recomputes it from the stored items at the end of every operation.
/// `abandoned_at` doubles as the lifecycle marker: `None` means live,
/// `Some(t)` means the sweeper marked the cart abandoned at `t`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    id: CartId,
    /// Derived sum of line totals, in smallest currency unit.
    total_price: u64,
    last_interaction_at: DateTime<Utc>,
    abandoned_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl Cart {
    /// Create a fresh, empty cart.
    pub fn new(id: CartId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            total_price: 0,
            last_interaction_at: now,
            abandoned_at: None,
            created_at: now,
        }
    }

    /// Rehydrate a cart from stored fields.
    pub fn from_parts(
        id: CartId,
        total_price: u64,
        last_interaction_at: DateTime<Utc>,
        abandoned_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            total_price,
            last_interaction_at,
            abandoned_at,
            created_at,
        }
    }

    pub fn id_typed(&self) -> CartId {
        self.id
    }

    pub fn total_price(&self) -> u64 {
        self.total_price
    }

    pub fn last_interaction_at(&self) -> DateTime<Utc> {
        self.last_interaction_at
    }

    pub fn abandoned_at(&self) -> Option<DateTime<Utc>> {
        self.abandoned_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Record a shopper interaction. Every mutating operation calls this;
    /// an interaction also revives an abandoned-but-not-yet-purged cart.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_interaction_at = now;
        self.abandoned_at = None;
    }

    /// Replace the derived total (mutation engine only).
    pub fn set_total_price(&mut self, total: u64) {
        self.total_price = total;
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned_at.is_some()
    }

    /// Sweep phase 1 predicate: not yet abandoned and idle since `cutoff`
    /// (inclusive).
    pub fn is_inactive(&self, cutoff: DateTime<Utc>) -> bool {
        self.abandoned_at.is_none() && self.last_interaction_at <= cutoff
    }

    /// Sweep phase 2 predicate: abandoned at or before `cutoff` (inclusive).
    pub fn should_purge(&self, cutoff: DateTime<Utc>) -> bool {
        matches!(self.abandoned_at, Some(at) if at <= cutoff)
    }

    pub fn mark_abandoned(&mut self, now: DateTime<Utc>) {
        self.abandoned_at = Some(now);
    }
}

impl Entity for Cart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
