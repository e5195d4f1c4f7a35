//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on abstractions (traits) for
//! dependency inversion, and reach repositories through the Unit of Work.

mod auth_service;
pub mod container;
mod event_service;
mod user_service;

#[cfg(test)]
mod test_support;

// Service Container
pub use container::{parallel, ServiceContainer, Services};

// Service traits and implementations
pub use auth_service::{
    normalize_email, AuthService, AuthenticatedSession, Authenticator, Claims, LoginOutcome,
    PendingProfile, SessionToken,
};
pub use event_service::{EventManager, EventService};
pub use user_service::{AccountUpdate, UserManager, UserService};

#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
