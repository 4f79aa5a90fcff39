//! Aggregates module
pub mod booking;
pub mod payment;
pub mod promo;
pub mod provider;
pub mod review;

pub use booking::{Booking, BookingAction, BookingError, BookingStatus, Cancellation, NewBooking, ProgressNote, ProgressStep};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use promo::{DiscountType, PromoCode, PromoRedemption, PromoRejection, PromoUsage, RedemptionContext};
pub use provider::{Payout, PayoutStatus, ProviderError, ServiceProvider};
pub use review::{Review, ReviewError};
