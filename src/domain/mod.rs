//! Domain layer - Core business entities and logic
//!
//! Entities and value objects independent of infrastructure concerns.

pub mod event;
pub mod otp;
pub mod password;
pub mod user;

pub use event::{
    validate_schedule, Event, EventChanges, EventDetails, EventFilter, EventResponse, NewEvent,
    OrganizerSummary,
};
pub use otp::OneTimeCode;
pub use password::Password;
pub use user::{
    Actor, AuthProvider, NewUser, OAuthProfile, User, UserChanges, UserResponse, UserRole,
};
