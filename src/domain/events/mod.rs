//! Domain events
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::FulfillmentStatus;

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Coupon(CouponEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouponEvent {
    Created { coupon_id: Uuid, code: String },
    Redeemed { coupon_id: Uuid, code: String, current_uses: i32, order_id: Option<Uuid> },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: Uuid, order_number: String, total: Decimal },
    StatusChanged { order_id: Uuid, status: FulfillmentStatus },
    PaymentChanged { order_id: Uuid, is_paid: bool, paid_at: Option<DateTime<Utc>> },
    DeliveryChanged { order_id: Uuid, is_delivered: bool, delivered_at: Option<DateTime<Utc>> },
    Deleted { order_id: Uuid },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Coupon(CouponEvent::Created { .. }) => "storefront.coupons.created",
            Self::Coupon(CouponEvent::Redeemed { .. }) => "storefront.coupons.redeemed",
            Self::Order(OrderEvent::Created { .. }) => "storefront.orders.created",
            Self::Order(OrderEvent::StatusChanged { .. }) => "storefront.orders.status_changed",
            Self::Order(OrderEvent::PaymentChanged { .. }) => "storefront.orders.payment_changed",
            Self::Order(OrderEvent::DeliveryChanged { .. }) => "storefront.orders.delivery_changed",
            Self::Order(OrderEvent::Deleted { .. }) => "storefront.orders.deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_is_tagged() {
        let event = DomainEvent::Order(OrderEvent::Deleted { order_id: Uuid::nil() });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "deleted");
        assert_eq!(event.subject(), "storefront.orders.deleted");
    }
}
