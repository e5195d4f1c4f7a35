//! Event repository: filtered listing, lookups by public id, soft delete.

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::entities::event::{self, ActiveModel, Entity as EventEntity};
use super::entities::user::Entity as UserEntity;
use crate::domain::{Event, EventChanges, EventDetails, EventFilter, NewEvent, User};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Event repository trait for dependency injection.
///
/// Soft-deleted events are never returned.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Find an event by its public identifier
    async fn find_by_public_id(&self, public_id: Uuid) -> AppResult<Option<Event>>;

    /// Find an event and load its organizer
    async fn find_with_organizer(&self, public_id: Uuid) -> AppResult<Option<EventDetails>>;

    /// One page of events matching `filter`
    async fn list(&self, filter: EventFilter, params: PaginationParams) -> AppResult<Vec<Event>>;

    /// Number of events matching `filter`
    async fn count(&self, filter: EventFilter) -> AppResult<u64>;

    async fn create(&self, new_event: NewEvent) -> AppResult<Event>;

    /// Apply a partial update to an event
    async fn update(&self, public_id: Uuid, changes: EventChanges) -> AppResult<Event>;

    /// Soft delete an event
    async fn delete(&self, public_id: Uuid) -> AppResult<()>;
}

/// SeaORM-backed event repository
pub struct EventStore {
    db: DatabaseConnection,
}

impl EventStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, public_id: Uuid) -> AppResult<Option<event::Model>> {
        EventEntity::find()
            .filter(event::Column::PublicId.eq(public_id))
            .filter(event::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(AppError::from)
    }
}

/// Escape character for `LIKE` patterns built from user input
const LIKE_ESCAPE: char = '!';

/// `%needle%` with the needle's own wildcards matched literally.
fn contains_pattern(needle: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape(LIKE_ESCAPE)
}

/// Translate listing filters into a WHERE clause.
fn filter_condition(filter: &EventFilter) -> Condition {
    let mut condition = Condition::all().add(event::Column::DeletedAt.is_null());

    if let Some(search) = &filter.search {
        condition = condition.add(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col(event::Column::Title)))
                        .like(contains_pattern(search)),
                )
                .add(
                    Expr::expr(Func::lower(Expr::col(event::Column::Description)))
                        .like(contains_pattern(search)),
                ),
        );
    }

    if let Some(category) = &filter.category {
        condition = condition.add(event::Column::Category.eq(category.clone()));
    }

    if let Some(venue) = &filter.venue {
        condition = condition.add(event::Column::Venue.eq(venue.clone()));
    }

    if let Some(day) = filter.date {
        if let (Some(start), Some(next)) = (day.and_hms_opt(0, 0, 0), day.succ_opt()) {
            if let Some(end) = next.and_hms_opt(0, 0, 0) {
                condition = condition
                    .add(event::Column::Date.gte(start.and_utc()))
                    .add(event::Column::Date.lt(end.and_utc()));
            }
        }
    }

    if let Some(after) = filter.starting_after {
        condition = condition.add(event::Column::StartTime.gte(after));
    }

    condition
}

#[async_trait]
impl EventRepository for EventStore {
    async fn find_by_public_id(&self, public_id: Uuid) -> AppResult<Option<Event>> {
        Ok(self.find_model(public_id).await?.map(Event::from))
    }

    async fn find_with_organizer(&self, public_id: Uuid) -> AppResult<Option<EventDetails>> {
        let result = EventEntity::find()
            .filter(event::Column::PublicId.eq(public_id))
            .filter(event::Column::DeletedAt.is_null())
            .find_also_related(UserEntity)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(|(event, organizer)| EventDetails {
            event: Event::from(event),
            organizer: organizer.map(User::from),
        }))
    }

    async fn list(&self, filter: EventFilter, params: PaginationParams) -> AppResult<Vec<Event>> {
        let mut query = EventEntity::find().filter(filter_condition(&filter));

        query = if filter.starting_after.is_some() {
            query.order_by_asc(event::Column::StartTime)
        } else {
            query.order_by_desc(event::Column::CreatedAt)
        };

        let models = query
            .offset(params.offset())
            .limit(params.limit)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Event::from).collect())
    }

    async fn count(&self, filter: EventFilter) -> AppResult<u64> {
        EventEntity::find()
            .filter(filter_condition(&filter))
            .count(&self.db)
            .await
            .map_err(AppError::from)
    }

    async fn create(&self, new_event: NewEvent) -> AppResult<Event> {
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            public_id: Set(Uuid::new_v4()),
            title: Set(new_event.title),
            description: Set(new_event.description),
            long_description: Set(new_event.long_description),
            category: Set(new_event.category),
            date: Set(new_event.date),
            start_time: Set(new_event.start_time),
            end_time: Set(new_event.end_time),
            venue: Set(new_event.venue),
            poster_url: Set(new_event.poster_url),
            price: Set(new_event.price),
            prize_pool: Set(new_event.prize_pool),
            prize_description: Set(new_event.prize_description),
            capacity: Set(new_event.capacity),
            organizer_id: Set(new_event.organizer_id),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        };

        let model = active_model.insert(&self.db).await.map_err(AppError::from)?;
        Ok(Event::from(model))
    }

    async fn update(&self, public_id: Uuid, changes: EventChanges) -> AppResult<Event> {
        let model = self
            .find_model(public_id)
            .await?
            .ok_or_else(|| AppError::not_found("Event"))?;

        let mut active: ActiveModel = model.into();
        if let Some(v) = changes.description {
            active.description = Set(v);
        }
        if let Some(v) = changes.long_description {
            active.long_description = Set(Some(v));
        }
        if let Some(v) = changes.category {
            active.category = Set(v);
        }
        if let Some(v) = changes.date {
            active.date = Set(v);
        }
        if let Some(v) = changes.start_time {
            active.start_time = Set(v);
        }
        if let Some(v) = changes.end_time {
            active.end_time = Set(v);
        }
        if let Some(v) = changes.venue {
            active.venue = Set(v);
        }
        if let Some(v) = changes.poster_url {
            active.poster_url = Set(Some(v));
        }
        if let Some(v) = changes.prize_description {
            active.prize_description = Set(Some(v));
        }
        if let Some(v) = changes.capacity {
            active.capacity = Set(Some(v));
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(Event::from(model))
    }

    async fn delete(&self, public_id: Uuid) -> AppResult<()> {
        let model = self
            .find_model(public_id)
            .await?
            .ok_or_else(|| AppError::not_found("Event"))?;

        let mut active: ActiveModel = model.into();
        let now = chrono::Utc::now();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);

        active.update(&self.db).await.map_err(AppError::from)?;
        Ok(())
    }
}
