pub mod announcements;
pub mod auth;
pub mod bookings;
pub mod clock;
pub mod export;
pub mod metrics;
pub mod quantities;
pub mod stats;
pub mod summary;
pub mod users;
pub mod week;
