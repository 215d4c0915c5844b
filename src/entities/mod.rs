pub mod category;
pub mod comment;
pub mod product;
pub mod user;

use sea_orm::{
    sea_query::{Expr, Index},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Schema, Set,
};
use tracing::info;

use crate::entities::{
    category::Entity as Category, comment::Entity as Comment, product::Entity as Product,
    user::Entity as User,
};

/// Creates every table and index the catalog needs. Safe to run on an
/// already initialised database.
pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut create_comment_table = schema.create_table_from_entity(Comment);
    create_comment_table.check(
        Expr::col(comment::Column::Rating).between(comment::MIN_RATING, comment::MAX_RATING),
    );

    let tables = [
        schema.create_table_from_entity(Category),
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Product),
        create_comment_table,
    ];
    for mut table in tables {
        table.if_not_exists();
        db.execute(backend.build(&table)).await?;
    }

    for mut index in schema.create_index_from_entity(Product) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    // NULL user ids never collide, so guest comments stay unconstrained.
    let unique_user_comment = Index::create()
        .name("idx_comment_product_user")
        .table(Comment)
        .col(comment::Column::ProductId)
        .col(comment::Column::UserId)
        .unique()
        .if_not_exists()
        .to_owned();
    let comment_by_date = Index::create()
        .name("idx_comment_product_created")
        .table(Comment)
        .col(comment::Column::ProductId)
        .col(comment::Column::CreatedAt)
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&unique_user_comment)).await?;
    db.execute(backend.build(&comment_by_date)).await?;

    Ok(())
}

/// Makes sure an admin account with the given credentials exists.
pub async fn seed_admin(db: &DatabaseConnection, username: &str, password: &str) -> Result<(), DbErr> {
    let existing = User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let password_hash =
        user::hash_password(password).map_err(|err| DbErr::Custom(err.to_string()))?;
    user::ActiveModel {
        username: Set(username.to_owned()),
        password: Set(password_hash),
        role: Set(user::Role::Admin),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(username, "Seeded admin account");
    Ok(())
}
