//! Event domain entity, inputs and filters.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

use super::User;

/// Event domain entity
#[derive(Debug, Clone)]
pub struct Event {
    pub id: i32,
    pub public_id: Uuid,
    pub title: String,
    pub description: String,
    pub long_description: Option<String>,
    pub category: String,
    pub date: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub venue: String,
    pub poster_url: Option<String>,
    pub price: i32,
    pub prize_pool: Option<i32>,
    pub prize_description: Option<String>,
    pub capacity: Option<i32>,
    pub organizer_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Event {
    /// The organizer and admins may modify an event
    pub fn can_be_managed_by(&self, user_id: Uuid, is_admin: bool) -> bool {
        is_admin || self.organizer_id == user_id
    }

    /// Apply changes in place, then re-check the schedule.
    pub fn apply(&mut self, changes: &EventChanges) -> AppResult<()> {
        if let Some(v) = &changes.description {
            self.description = v.clone();
        }
        if let Some(v) = &changes.long_description {
            self.long_description = Some(v.clone());
        }
        if let Some(v) = &changes.category {
            self.category = v.clone();
        }
        if let Some(v) = changes.date {
            self.date = v;
        }
        if let Some(v) = changes.start_time {
            self.start_time = v;
        }
        if let Some(v) = changes.end_time {
            self.end_time = v;
        }
        if let Some(v) = &changes.venue {
            self.venue = v.clone();
        }
        if let Some(v) = &changes.poster_url {
            self.poster_url = Some(v.clone());
        }
        if let Some(v) = &changes.prize_description {
            self.prize_description = Some(v.clone());
        }
        if let Some(v) = changes.capacity {
            self.capacity = Some(v);
        }
        validate_schedule(self.start_time, self.end_time)
    }
}

/// Reject schedules that end before they start.
pub fn validate_schedule(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<()> {
    if end <= start {
        return Err(AppError::validation("End time must be after start time"));
    }
    Ok(())
}

/// Data for a new event; the organizer comes from the authenticated caller.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub long_description: Option<String>,
    pub category: String,
    pub date: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub venue: String,
    pub poster_url: Option<String>,
    pub price: i32,
    pub prize_pool: Option<i32>,
    pub prize_description: Option<String>,
    pub capacity: Option<i32>,
    pub organizer_id: Uuid,
}

/// Mutable event fields. Title, price and prize pool are fixed once published.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub category: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub poster_url: Option<String>,
    pub prize_description: Option<String>,
    pub capacity: Option<i32>,
}

/// Listing filters after placeholder values have been discarded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub venue: Option<String>,
    pub date: Option<NaiveDate>,
    /// When set, only events starting at or after this instant, soonest first
    pub starting_after: Option<DateTime<Utc>>,
}

/// Event together with its organizer, as returned by the detail endpoint
#[derive(Debug, Clone)]
pub struct EventDetails {
    pub event: Event,
    pub organizer: Option<User>,
}

/// Public organizer fields embedded in event responses
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrganizerSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
}

impl From<User> for OrganizerSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

/// Event response (safe to return to client)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    /// Public identifier used in URLs
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub public_id: Uuid,
    #[schema(example = "Hack Night")]
    pub title: String,
    pub description: String,
    pub long_description: Option<String>,
    #[schema(example = "Hackathon")]
    pub category: String,
    pub date: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[schema(example = "Main Auditorium")]
    pub venue: String,
    pub poster_url: Option<String>,
    pub price: i32,
    pub prize_pool: Option<i32>,
    pub prize_description: Option<String>,
    pub capacity: Option<i32>,
    pub organizer_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer: Option<OrganizerSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            public_id: event.public_id,
            title: event.title,
            description: event.description,
            long_description: event.long_description,
            category: event.category,
            date: event.date,
            start_time: event.start_time,
            end_time: event.end_time,
            venue: event.venue,
            poster_url: event.poster_url,
            price: event.price,
            prize_pool: event.prize_pool,
            prize_description: event.prize_description,
            capacity: event.capacity,
            organizer_id: event.organizer_id,
            organizer: None,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

impl From<EventDetails> for EventResponse {
    fn from(details: EventDetails) -> Self {
        let mut response = EventResponse::from(details.event);
        response.organizer = details.organizer.map(OrganizerSummary::from);
        response
    }
}
