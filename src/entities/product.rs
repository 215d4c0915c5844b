use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::entities::category::Entity as Category;

/// Largest storable price, mirroring a 6-digit, 2-decimal column.
pub const MAX_PRICE_CENTS: i64 = 999_999;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    // Stored in cents so SQLite never rounds through a float.
    pub price_cents: i64,
    #[sea_orm(nullable, indexed)]
    pub category_id: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn price(&self) -> Decimal {
        Decimal::new(self.price_cents, 2)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Category",
        from = "crate::entities::product::Column::CategoryId",
        to = "crate::entities::category::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull",
    )]
    Category,
    #[sea_orm(has_many = "crate::entities::comment::Entity")]
    Comment,
}

impl Related<crate::entities::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<crate::entities::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Converts a decimal price into cents. Rejects negatives, more than two
/// decimal places and values past [`MAX_PRICE_CENTS`].
pub fn price_to_cents(price: Decimal) -> Option<i64> {
    if price.is_sign_negative() || price.normalize().scale() > 2 {
        return None;
    }
    let cents = (price * Decimal::ONE_HUNDRED).trunc();
    let cents: i64 = cents.try_into().ok()?;
    (cents <= MAX_PRICE_CENTS).then_some(cents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn converts_two_decimal_prices() {
        assert_eq!(price_to_cents(Decimal::from_str("19.99").unwrap()), Some(1999));
        assert_eq!(price_to_cents(Decimal::from_str("5").unwrap()), Some(500));
        assert_eq!(price_to_cents(Decimal::from_str("0.00").unwrap()), Some(0));
        assert_eq!(price_to_cents(Decimal::from_str("7.50").unwrap()), Some(750));
    }

    #[test]
    fn rejects_bad_prices() {
        assert_eq!(price_to_cents(Decimal::from_str("-1.00").unwrap()), None);
        assert_eq!(price_to_cents(Decimal::from_str("1.999").unwrap()), None);
        assert_eq!(price_to_cents(Decimal::from_str("10000.00").unwrap()), None);
    }

    #[test]
    fn price_round_trips_through_cents() {
        let product = Model {
            id: 1,
            name: "Blue Rattle".into(),
            description: None,
            price_cents: 999,
            category_id: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        assert_eq!(product.price().to_string(), "9.99");
    }
}
