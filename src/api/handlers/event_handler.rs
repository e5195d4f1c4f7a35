//! Event handlers. Reads are public; writes need a full session token.

use axum::{
    extract::{Path, Query, State},
    middleware,
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{auth_middleware, CurrentUser};
use crate::api::AppState;
use crate::config::{CATEGORY_PLACEHOLDER, VENUE_PLACEHOLDER};
use crate::domain::{EventChanges, EventFilter, EventResponse, NewEvent};
use crate::errors::{AppError, AppResult};
use crate::types::{Created, MessageResponse, PaginationMeta, PaginationParams};

/// New event request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    #[schema(example = "Hack Night")]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub long_description: Option<String>,
    #[validate(length(min = 1, message = "Category is required"))]
    #[schema(example = "Hackathon")]
    pub category: String,
    pub date: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[validate(length(min = 1, message = "Venue is required"))]
    #[schema(example = "Main Auditorium")]
    pub venue: String,
    #[validate(url(message = "Poster URL must be a valid URL"))]
    pub poster_url: Option<String>,
    /// Defaults to 0 (free)
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: Option<i32>,
    #[validate(range(min = 0, message = "Prize pool cannot be negative"))]
    pub prize_pool: Option<i32>,
    pub prize_description: Option<String>,
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: Option<i32>,
}

impl CreateEventRequest {
    fn into_new_event(self) -> NewEvent {
        NewEvent {
            title: self.title.trim().to_string(),
            description: self.description,
            long_description: self.long_description,
            category: self.category,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            venue: self.venue,
            poster_url: self.poster_url,
            price: self.price.unwrap_or(0),
            prize_pool: self.prize_pool,
            prize_description: self.prize_description,
            capacity: self.capacity,
            // Set by the service from the caller
            organizer_id: Uuid::nil(),
        }
    }
}

/// Partial event update; title, price and prize pool cannot change
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: Option<String>,
    pub long_description: Option<String>,
    #[validate(length(min = 1, message = "Category cannot be empty"))]
    pub category: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(length(min = 1, message = "Venue cannot be empty"))]
    pub venue: Option<String>,
    #[validate(url(message = "Poster URL must be a valid URL"))]
    pub poster_url: Option<String>,
    pub prize_description: Option<String>,
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: Option<i32>,
}

impl From<UpdateEventRequest> for EventChanges {
    fn from(req: UpdateEventRequest) -> Self {
        Self {
            description: req.description,
            long_description: req.long_description,
            category: req.category,
            date: req.date,
            start_time: req.start_time,
            end_time: req.end_time,
            venue: req.venue,
            poster_url: req.poster_url,
            prize_description: req.prize_description,
            capacity: req.capacity,
        }
    }
}

/// Listing query. Values are kept as strings so bad paging input falls back
/// to defaults instead of failing the request.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListEventsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// Case-insensitive match on title or description
    pub search: Option<String>,
    pub category: Option<String>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    pub venue: Option<String>,
    /// `true` keeps only events that have not started, soonest first
    pub upcoming: Option<String>,
}

/// Drop blanks and the client's unselected-dropdown placeholder.
fn meaningful(value: Option<String>, placeholder: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && Some(v.as_str()) != placeholder)
}

impl ListEventsQuery {
    fn into_parts(self, now: DateTime<Utc>) -> AppResult<(EventFilter, PaginationParams)> {
        let params = PaginationParams::from_query(self.page.as_deref(), self.limit.as_deref());

        let date = match meaningful(self.date, None) {
            Some(raw) => Some(NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                AppError::bad_request("Invalid date format, expected YYYY-MM-DD")
            })?),
            None => None,
        };

        let upcoming = self
            .upcoming
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

        let filter = EventFilter {
            search: meaningful(self.search, None),
            category: meaningful(self.category, Some(CATEGORY_PLACEHOLDER)),
            venue: meaningful(self.venue, Some(VENUE_PLACEHOLDER)),
            date,
            starting_after: upcoming.then_some(now),
        };

        Ok((filter, params))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventListResponse {
    pub events: Vec<EventResponse>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventEnvelope {
    pub event: EventResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventMessageResponse {
    #[schema(example = "Event updated successfully")]
    pub message: String,
    pub event: EventResponse,
}

/// Create event routes
pub fn event_routes(state: AppState) -> Router<AppState> {
    let auth = middleware::from_fn_with_state(state, auth_middleware);

    Router::new()
        .route(
            "/",
            get(list_events).merge(post(create_event).route_layer(auth.clone())),
        )
        .route(
            "/:public_id",
            get(get_event).merge(put(update_event).delete(delete_event).route_layer(auth)),
        )
}

/// Unparseable ids cannot name an event
fn parse_public_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found("Event"))
}

/// Publish an event (organizers and admins)
#[utoipa::path(
    post,
    path = "/events",
    tag = "Events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventMessageResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Only organizers and admins may publish")
    ),
    security(("cookie_auth" = []), ("bearer_auth" = []))
)]
pub async fn create_event(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<CreateEventRequest>,
) -> AppResult<Created<EventMessageResponse>> {
    let event = state
        .event_service
        .create_event(&current_user.actor(), payload.into_new_event())
        .await?;

    Ok(Created(EventMessageResponse {
        message: "Event Created".to_string(),
        event: EventResponse::from(event),
    }))
}

/// Search and page through events
#[utoipa::path(
    get,
    path = "/events",
    tag = "Events",
    params(ListEventsQuery),
    responses(
        (status = 200, description = "One page of events", body = EventListResponse),
        (status = 400, description = "Malformed date")
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> AppResult<Json<EventListResponse>> {
    let (filter, params) = query.into_parts(Utc::now())?;
    let page = state.event_service.list_events(filter, params).await?;

    Ok(Json(EventListResponse {
        events: page.items.into_iter().map(EventResponse::from).collect(),
        pagination: page.meta,
    }))
}

/// Event details with organizer
#[utoipa::path(
    get,
    path = "/events/{public_id}",
    tag = "Events",
    params(("public_id" = Uuid, Path, description = "Event public id")),
    responses(
        (status = 200, description = "Event found", body = EventEnvelope),
        (status = 404, description = "Event not found")
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> AppResult<Json<EventEnvelope>> {
    let details = state
        .event_service
        .get_event(parse_public_id(&public_id)?)
        .await?;

    Ok(Json(EventEnvelope {
        event: EventResponse::from(details),
    }))
}

/// Update an event (owner or admin)
#[utoipa::path(
    put,
    path = "/events/{public_id}",
    tag = "Events",
    params(("public_id" = Uuid, Path, description = "Event public id")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = EventMessageResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Event not found")
    ),
    security(("cookie_auth" = []), ("bearer_auth" = []))
)]
pub async fn update_event(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(public_id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateEventRequest>,
) -> AppResult<Json<EventMessageResponse>> {
    let event = state
        .event_service
        .update_event(
            &current_user.actor(),
            parse_public_id(&public_id)?,
            EventChanges::from(payload),
        )
        .await?;

    Ok(Json(EventMessageResponse {
        message: "Event updated successfully".to_string(),
        event: EventResponse::from(event),
    }))
}

/// Soft delete an event (owner or admin)
#[utoipa::path(
    delete,
    path = "/events/{public_id}",
    tag = "Events",
    params(("public_id" = Uuid, Path, description = "Event public id")),
    responses(
        (status = 200, description = "Event deleted", body = MessageResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Event not found")
    ),
    security(("cookie_auth" = []), ("bearer_auth" = []))
)]
pub async fn delete_event(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(public_id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state
        .event_service
        .delete_event(&current_user.actor(), parse_public_id(&public_id)?)
        .await?;

    Ok(Json(MessageResponse::new("Event deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> ListEventsQuery {
        ListEventsQuery::default()
    }

    #[test]
    fn test_placeholders_are_ignored() {
        let q = ListEventsQuery {
            category: Some("Category".to_string()),
            venue: Some("Location".to_string()),
            search: Some("   ".to_string()),
            ..query()
        };
        let (filter, _) = q.into_parts(Utc::now()).unwrap();
        assert_eq!(filter, EventFilter::default());
    }

    #[test]
    fn test_real_filters_are_kept() {
        let q = ListEventsQuery {
            category: Some("Music".to_string()),
            venue: Some("Hall A".to_string()),
            search: Some(" jazz ".to_string()),
            date: Some("2025-06-01".to_string()),
            ..query()
        };
        let (filter, _) = q.into_parts(Utc::now()).unwrap();
        assert_eq!(filter.category.as_deref(), Some("Music"));
        assert_eq!(filter.venue.as_deref(), Some("Hall A"));
        assert_eq!(filter.search.as_deref(), Some("jazz"));
        assert_eq!(filter.date, NaiveDate::from_ymd_opt(2025, 6, 1));
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let q = ListEventsQuery {
            date: Some("06/01/2025".to_string()),
            ..query()
        };
        assert!(matches!(
            q.into_parts(Utc::now()),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_upcoming_sets_cutoff() {
        let now = Utc::now();
        let q = ListEventsQuery {
            upcoming: Some("true".to_string()),
            ..query()
        };
        let (filter, _) = q.into_parts(now).unwrap();
        assert_eq!(filter.starting_after, Some(now));

        let q = ListEventsQuery {
            upcoming: Some("false".to_string()),
            ..query()
        };
        let (filter, _) = q.into_parts(now).unwrap();
        assert!(filter.starting_after.is_none());
    }

    #[test]
    fn test_paging_falls_back() {
        let q = ListEventsQuery {
            page: Some("x".to_string()),
            limit: Some("500".to_string()),
            ..query()
        };
        let (_, params) = q.into_parts(Utc::now()).unwrap();
        assert_eq!(params, PaginationParams { page: 1, limit: 100 });
    }

    #[test]
    fn test_create_request_defaults_price() {
        let json = serde_json::json!({
            "title": " Hack Night ",
            "description": "Build things",
            "category": "Hackathon",
            "date": "2025-06-01T00:00:00Z",
            "startTime": "2025-06-01T18:00:00Z",
            "endTime": "2025-06-01T23:00:00Z",
            "venue": "Hall A"
        });
        let req: CreateEventRequest = serde_json::from_value(json).unwrap();
        assert!(req.validate().is_ok());
        let new_event = req.into_new_event();
        assert_eq!(new_event.price, 0);
        assert_eq!(new_event.title, "Hack Night");
    }

    #[test]
    fn test_create_request_rejects_zero_capacity() {
        let json = serde_json::json!({
            "title": "Hack Night",
            "description": "Build things",
            "category": "Hackathon",
            "date": "2025-06-01T00:00:00Z",
            "startTime": "2025-06-01T18:00:00Z",
            "endTime": "2025-06-01T23:00:00Z",
            "venue": "Hall A",
            "capacity": 0
        });
        let req: CreateEventRequest = serde_json::from_value(json).unwrap();
        assert!(req.validate().is_err());
    }
}
