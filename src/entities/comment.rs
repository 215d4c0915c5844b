use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::entities::product::Entity as Product;
use crate::entities::user::Entity as User;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;
pub const MAX_TEXT_LEN: u64 = 400;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: i32,
    #[sea_orm(nullable)]
    pub user_id: Option<i32>,
    #[sea_orm(default_value = "")]
    pub guest_name: String,
    #[sea_orm(default_value = "")]
    pub guest_email: String,
    pub rating: i32,
    #[sea_orm(column_type = "Text", default_value = "")]
    pub text: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }

    /// Who wrote the comment, as shown next to it.
    pub fn author(&self, username: Option<&str>) -> String {
        match username {
            Some(name) => name.to_owned(),
            None if !self.guest_name.is_empty() => self.guest_name.clone(),
            None => "Guest".to_owned(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Product",
        from = "crate::entities::comment::Column::ProductId",
        to = "crate::entities::product::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade",
    )]
    Product,
    #[sea_orm(
        belongs_to = "User",
        from = "crate::entities::comment::Column::UserId",
        to = "crate::entities::user::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull",
    )]
    User,
}

impl Related<crate::entities::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<crate::entities::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
