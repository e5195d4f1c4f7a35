//! Event database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::Event;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub public_id: Uuid,
    pub title: String,
    pub description: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub long_description: Option<String>,
    pub category: String,
    pub date: DateTimeUtc,
    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,
    pub venue: String,
    pub poster_url: Option<String>,
    pub price: i32,
    pub prize_pool: Option<i32>,
    pub prize_description: Option<String>,
    pub capacity: Option<i32>,
    pub organizer_id: Uuid,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OrganizerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Organizer,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Event {
    fn from(model: Model) -> Self {
        Event {
            id: model.id,
            public_id: model.public_id,
            title: model.title,
            description: model.description,
            long_description: model.long_description,
            category: model.category,
            date: model.date,
            start_time: model.start_time,
            end_time: model.end_time,
            venue: model.venue,
            poster_url: model.poster_url,
            price: model.price,
            prize_pool: model.prize_pool,
            prize_description: model.prize_description,
            capacity: model.capacity,
            organizer_id: model.organizer_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        }
    }
}
