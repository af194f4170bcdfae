use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::{MerchantId, OrderId, RiderId};
use domain::{DeliveryStatus, DeliveryTransition, Money, OrderNumber, ParseStatusError};
use serde::{Deserialize, Serialize};

/// Whether a rider is taking orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RiderStatus {
    Online,
    #[default]
    Offline,
}

impl RiderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiderStatus::Online => "Online",
            RiderStatus::Offline => "Offline",
        }
    }
}

impl std::fmt::Display for RiderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RiderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Online" => Ok(RiderStatus::Online),
            "Offline" => Ok(RiderStatus::Offline),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A rider as held by the rider directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rider {
    pub id: RiderId,
    pub name: String,
    pub status: RiderStatus,
    /// Claimed orders, incremented best-effort.
    pub order_count: u64,
}

impl Rider {
    pub fn is_online(&self) -> bool {
        self.status == RiderStatus::Online
    }

    /// Operator string recorded on status changes made by this rider.
    pub fn operator(&self) -> String {
        format!("rider_{}", self.id)
    }
}

/// The rider-side record of one order's delivery.
///
/// Created unassigned when a rider first tries to claim the order. `rider_id`
/// is set exactly once by a successful claim; `status` then moves forward
/// alongside the order status (see [`DeliveryStatus::order_status`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAssignment {
    pub id: i64,
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub rider_id: Option<RiderId>,
    pub merchant_id: MerchantId,
    pub merchant_name: String,
    pub address: String,
    pub total: Money,
    pub status: DeliveryStatus,
    pub accepted_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryAssignment {
    pub fn is_claimed(&self) -> bool {
        self.rider_id.is_some()
    }

    pub fn is_held_by(&self, rider_id: RiderId) -> bool {
        self.rider_id == Some(rider_id)
    }

    /// Records a claim by `rider_id`.
    pub fn claim(&mut self, rider_id: RiderId, at: DateTime<Utc>) {
        self.rider_id = Some(rider_id);
        self.status = DeliveryStatus::AwaitingPickup;
        self.accepted_at = Some(at);
        self.updated_at = at;
    }

    /// Drops the claim, returning the assignment to the unassigned pool.
    pub fn release(&mut self, at: DateTime<Utc>) {
        self.rider_id = None;
        self.status = DeliveryStatus::AwaitingPickup;
        self.accepted_at = None;
        self.updated_at = at;
    }

    /// Applies a checked transition or its rewind.
    ///
    /// Moving forward stamps the milestone of the new status; moving back
    /// clears the milestone of the status being left.
    pub fn apply(&mut self, transition: DeliveryTransition, at: DateTime<Utc>) {
        let forward = transition.from().next() == Some(transition.to());
        if forward {
            match transition.to() {
                DeliveryStatus::InTransit => self.picked_up_at = Some(at),
                DeliveryStatus::Delivered => self.delivered_at = Some(at),
                DeliveryStatus::AwaitingPickup => {}
            }
        } else {
            match transition.from() {
                DeliveryStatus::InTransit => self.picked_up_at = None,
                DeliveryStatus::Delivered => self.delivered_at = None,
                DeliveryStatus::AwaitingPickup => {}
            }
        }
        self.status = transition.to();
        self.updated_at = at;
    }
}
