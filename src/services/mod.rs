//! Application services binding the domain rules to storage.
pub mod coupons;
pub mod events;
pub mod orders;
pub mod payments;

pub use coupons::{CouponQuote, CouponService};
pub use events::EventPublisher;
pub use orders::{BulkDeleteResult, Checkout, OrderService};
pub use payments::{GatewayEvent, PaymentService, WebhookOutcome};
