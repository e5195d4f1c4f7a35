//! Event service - publishing, listing and managing events.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    validate_schedule, Actor, Event, EventChanges, EventDetails, EventFilter, NewEvent,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;
use crate::types::{Page, PaginationParams};

use super::container::parallel;

/// Event service trait for dependency injection.
#[async_trait]
pub trait EventService: Send + Sync {
    /// Publish an event; the organizer is the caller.
    async fn create_event(&self, actor: &Actor, new_event: NewEvent) -> AppResult<Event>;

    /// Filtered, paginated listing. Count and page load run concurrently.
    async fn list_events(
        &self,
        filter: EventFilter,
        params: PaginationParams,
    ) -> AppResult<Page<Event>>;

    /// Event with its organizer
    async fn get_event(&self, public_id: Uuid) -> AppResult<EventDetails>;

    async fn update_event(
        &self,
        actor: &Actor,
        public_id: Uuid,
        changes: EventChanges,
    ) -> AppResult<Event>;

    async fn delete_event(&self, actor: &Actor, public_id: Uuid) -> AppResult<()>;
}

/// Concrete implementation of EventService using Unit of Work.
pub struct EventManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> EventManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    /// Reload the caller's account. A deleted account is unauthenticated and
    /// the stored role takes precedence over the one in the token.
    async fn current_actor(&self, actor: &Actor) -> AppResult<Actor> {
        let user = self
            .uow
            .users()
            .find_by_id(actor.id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(Actor {
            id: user.id,
            email: user.email,
            role: user.role,
        })
    }

    /// Load an event the actor may manage.
    async fn managed_event(&self, actor: &Actor, public_id: Uuid) -> AppResult<Event> {
        let event = self
            .uow
            .events()
            .find_by_public_id(public_id)
            .await?
            .ok_or_not_found("Event")?;

        if !event.can_be_managed_by(actor.id, actor.is_admin()) {
            return Err(AppError::Forbidden);
        }
        Ok(event)
    }
}

#[async_trait]
impl<U: UnitOfWork> EventService for EventManager<U> {
    async fn create_event(&self, actor: &Actor, mut new_event: NewEvent) -> AppResult<Event> {
        let actor = self.current_actor(actor).await?;
        if !actor.role.can_publish_events() {
            return Err(AppError::Forbidden);
        }
        validate_schedule(new_event.start_time, new_event.end_time)?;

        new_event.organizer_id = actor.id;
        let event = self.uow.events().create(new_event).await?;

        tracing::info!(event_id = %event.public_id, organizer_id = %actor.id, "Event created");
        Ok(event)
    }

    async fn list_events(
        &self,
        filter: EventFilter,
        params: PaginationParams,
    ) -> AppResult<Page<Event>> {
        let events = self.uow.events();

        let (total, items) = parallel::join2(
            events.count(filter.clone()),
            events.list(filter, params),
        )
        .await?;

        Ok(Page::new(items, params, total))
    }

    async fn get_event(&self, public_id: Uuid) -> AppResult<EventDetails> {
        self.uow
            .events()
            .find_with_organizer(public_id)
            .await?
            .ok_or_not_found("Event")
    }

    async fn update_event(
        &self,
        actor: &Actor,
        public_id: Uuid,
        changes: EventChanges,
    ) -> AppResult<Event> {
        let actor = self.current_actor(actor).await?;
        let mut event = self.managed_event(&actor, public_id).await?;

        // Checks the merged schedule before anything is written
        event.apply(&changes)?;

        let updated = self.uow.events().update(public_id, changes).await?;
        tracing::info!(event_id = %public_id, actor_id = %actor.id, "Event updated");
        Ok(updated)
    }

    async fn delete_event(&self, actor: &Actor, public_id: Uuid) -> AppResult<()> {
        let actor = self.current_actor(actor).await?;
        self.managed_event(&actor, public_id).await?;
        self.uow.events().delete(public_id).await?;

        tracing::info!(event_id = %public_id, actor_id = %actor.id, "Event deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;
    use crate::infra::{MockEventRepository, MockUserRepository};
    use crate::services::test_support::{event, user, MockUow};
    use chrono::{Duration, Utc};

    fn actor(role: UserRole) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            email: "actor@example.com".to_string(),
            role,
        }
    }

    /// Service whose user store still holds `actor` with `stored_role`.
    fn service_for(
        actor: &Actor,
        stored_role: UserRole,
        events: MockEventRepository,
    ) -> EventManager<MockUow> {
        let id = actor.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| {
            let mut u = user("actor@example.com", None);
            u.id = id;
            u.role = stored_role;
            Ok(Some(u))
        });
        EventManager::new(MockUow::new(users, events))
    }

    fn service(actor: &Actor, events: MockEventRepository) -> EventManager<MockUow> {
        service_for(actor, actor.role, events)
    }

    fn new_event() -> NewEvent {
        let start = Utc::now() + Duration::days(1);
        NewEvent {
            title: "Meetup".to_string(),
            description: "Monthly meetup".to_string(),
            long_description: None,
            category: "Tech".to_string(),
            date: start,
            start_time: start,
            end_time: start + Duration::hours(2),
            venue: "Hall B".to_string(),
            poster_url: None,
            price: 0,
            prize_pool: None,
            prize_description: None,
            capacity: None,
            organizer_id: Uuid::nil(),
        }
    }

    #[tokio::test]
    async fn test_attendee_cannot_create_event() {
        let attendee = actor(UserRole::Attendee);
        let service = service(&attendee, MockEventRepository::new());
        let result = service.create_event(&attendee, new_event()).await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_deleted_account_cannot_create_event() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));
        let mut events = MockEventRepository::new();
        events.expect_create().never();

        let service = EventManager::new(MockUow::new(users, events));
        let result = service
            .create_event(&actor(UserRole::Organizer), new_event())
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_deleted_account_cannot_delete_own_event() {
        let owner = actor(UserRole::Organizer);
        let owner_id = owner.id;

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));
        let mut events = MockEventRepository::new();
        events
            .expect_find_by_public_id()
            .returning(move |_| Ok(Some(event(owner_id))));
        events.expect_delete().never();

        let service = EventManager::new(MockUow::new(users, events));
        let result = service.delete_event(&owner, Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_demoted_organizer_cannot_create_event() {
        let stale = actor(UserRole::Organizer);
        let mut events = MockEventRepository::new();
        events.expect_create().never();

        let service = service_for(&stale, UserRole::Attendee, events);
        let result = service.create_event(&stale, new_event()).await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_create_sets_organizer_to_caller() {
        let organizer = actor(UserRole::Organizer);
        let organizer_id = organizer.id;

        let mut events = MockEventRepository::new();
        events
            .expect_create()
            .withf(move |e| e.organizer_id == organizer_id)
            .times(1)
            .returning(|e| Ok(event(e.organizer_id)));

        let service = service(&organizer, events);
        let created = service.create_event(&organizer, new_event()).await.unwrap();
        assert_eq!(created.organizer_id, organizer_id);
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_schedule() {
        let mut input = new_event();
        input.end_time = input.start_time - Duration::hours(1);

        let organizer = actor(UserRole::Organizer);
        let service = service(&organizer, MockEventRepository::new());
        let result = service.create_event(&organizer, input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_builds_pagination_meta() {
        let mut events = MockEventRepository::new();
        events.expect_count().returning(|_| Ok(25));
        events
            .expect_list()
            .withf(|_, params| params.page == 3 && params.limit == 10)
            .returning(|_, _| Ok(vec![event(Uuid::new_v4()); 5]));

        let service = EventManager::new(MockUow::with_events(events));
        let page = service
            .list_events(
                EventFilter::default(),
                PaginationParams { page: 3, limit: 10 },
            )
            .await
            .unwrap();

        assert_eq!(page.items.len(), 5);
        assert_eq!(page.meta.total_pages, 3);
        assert_eq!(page.meta.total_count, 25);
        assert!(!page.meta.has_next_page);
        assert!(page.meta.has_prev_page);
    }

    #[tokio::test]
    async fn test_get_missing_event() {
        let mut events = MockEventRepository::new();
        events.expect_find_with_organizer().returning(|_| Ok(None));

        let service = EventManager::new(MockUow::with_events(events));
        let result = service.get_event(Uuid::new_v4()).await;
        match result {
            Err(e) => assert_eq!(e.to_string(), "Event not found"),
            Ok(_) => panic!("expected not found"),
        }
    }

    #[tokio::test]
    async fn test_update_by_stranger_is_forbidden() {
        let mut events = MockEventRepository::new();
        events
            .expect_find_by_public_id()
            .returning(|_| Ok(Some(event(Uuid::new_v4()))));
        events.expect_update().never();

        let stranger = actor(UserRole::Organizer);
        let service = service(&stranger, events);
        let result = service
            .update_event(&stranger, Uuid::new_v4(), EventChanges::default())
            .await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_update_rejects_end_before_existing_start() {
        let owner = actor(UserRole::Organizer);
        let owner_id = owner.id;

        let mut events = MockEventRepository::new();
        events
            .expect_find_by_public_id()
            .returning(move |_| Ok(Some(event(owner_id))));
        events.expect_update().never();

        let service = service(&owner, events);
        let changes = EventChanges {
            end_time: Some(Utc::now()),
            ..Default::default()
        };
        let result = service.update_event(&owner, Uuid::new_v4(), changes).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_admin_deletes_any_event() {
        let mut events = MockEventRepository::new();
        events
            .expect_find_by_public_id()
            .returning(|_| Ok(Some(event(Uuid::new_v4()))));
        events.expect_delete().times(1).returning(|_| Ok(()));

        let admin = actor(UserRole::Admin);
        let service = service(&admin, events);
        let result = service.delete_event(&admin, Uuid::new_v4()).await;
        assert!(result.is_ok());
    }
}
