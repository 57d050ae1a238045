//! Aggregates module
pub mod coupon;
pub mod order;

pub use coupon::{CartContext, CartLine, Coupon, CouponDraft, CouponStatus, DiscountType};
pub use order::{
    AppliedCoupon, DeliveryKey, DeliveryKeyChange, DeliveryState, FulfillmentStatus, Order, OrderDraft,
    OrderItem, OrderPricing, PaymentState, ShippingAddress, VariantSelection,
};
