//! Application command services over collaborator ports
pub mod bookings;
pub mod error;
pub mod payments;
pub mod payouts;
pub mod ports;
pub mod promos;
pub mod reviews;
