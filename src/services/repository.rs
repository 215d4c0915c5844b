use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::{Expr, Func, OnConflict, SimpleExpr},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    FromQueryResult, JoinType, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Select, Set,
};
use std::sync::Arc;

use crate::entities::{
    category::{self, Entity as CategoryEntity},
    comment::{self, Entity as CommentEntity},
    product::{self, Entity as ProductEntity},
    user::{self, Entity as UserEntity},
};
use crate::services::comments::GuestIdentity;

/// A product together with the rating aggregate computed from its comments.
#[derive(Clone, Debug, PartialEq)]
pub struct RatedProduct {
    pub product: product::Model,
    /// Mean rating, `0.0` when the product has no comments.
    pub avg_rating: f64,
    pub total_ratings: i64,
}

#[derive(Debug, FromQueryResult)]
struct RatedProductRow {
    id: i32,
    name: String,
    description: Option<String>,
    price_cents: i64,
    category_id: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    avg_rating: Option<f64>,
    total_ratings: i64,
}

impl From<RatedProductRow> for RatedProduct {
    fn from(row: RatedProductRow) -> Self {
        RatedProduct {
            product: product::Model {
                id: row.id,
                name: row.name,
                description: row.description,
                price_cents: row.price_cents,
                category_id: row.category_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            avg_rating: row.avg_rating.unwrap_or(0.0),
            total_ratings: row.total_ratings,
        }
    }
}

/// A comment joined with the username of its author, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct CommentWithAuthor {
    pub comment: comment::Model,
    pub username: Option<String>,
}

impl CommentWithAuthor {
    pub fn author(&self) -> String {
        self.comment.author(self.username.as_deref())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    pub category_slug: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct CommentFilter {
    pub rating: Option<i32>,
    pub search: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
}

#[derive(Clone, Debug)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub category_id: Option<i32>,
}

#[derive(Clone, Debug, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price_cents: Option<i64>,
    pub category_id: Option<Option<i32>>,
}

/// Owns every query the catalog runs against the store.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    db: Arc<DatabaseConnection>,
}

impl CatalogRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    // Categories

    pub async fn categories(&self) -> Result<Vec<category::Model>, DbErr> {
        CategoryEntity::find()
            .order_by_asc(category::Column::Name)
            .all(self.db())
            .await
    }

    pub async fn category_by_slug(&self, slug: &str) -> Result<Option<category::Model>, DbErr> {
        CategoryEntity::find()
            .filter(category::Column::Slug.eq(slug))
            .one(self.db())
            .await
    }

    pub async fn category_by_id(&self, id: i32) -> Result<Option<category::Model>, DbErr> {
        CategoryEntity::find_by_id(id).one(self.db()).await
    }

    pub async fn create_category(&self, new: NewCategory) -> Result<category::Model, DbErr> {
        let now = Utc::now();
        category::ActiveModel {
            name: Set(new.name),
            slug: Set(new.slug),
            description: Set(new.description),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db())
        .await
    }

    pub async fn update_category(
        &self,
        id: i32,
        changes: CategoryChanges,
    ) -> Result<Option<category::Model>, DbErr> {
        let Some(existing) = self.category_by_id(id).await? else {
            return Ok(None);
        };

        let mut model: category::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            model.name = Set(name);
        }
        if let Some(slug) = changes.slug {
            model.slug = Set(slug);
        }
        if let Some(description) = changes.description {
            model.description = Set(description);
        }
        model.updated_at = Set(Utc::now());

        model.update(self.db()).await.map(Some)
    }

    /// Deletes a category; its products stay, with no category.
    pub async fn delete_category(&self, id: i32) -> Result<bool, DbErr> {
        let result = CategoryEntity::delete_by_id(id).exec(self.db()).await?;
        Ok(result.rows_affected > 0)
    }

    // Products and rating aggregates

    /// Products joined with `AVG(rating)` and `COUNT(comments)`, one row per product.
    fn rated_products_query() -> Select<ProductEntity> {
        let avg_rating: SimpleExpr =
            Func::avg(Expr::col((CommentEntity, comment::Column::Rating))).into();
        let total_ratings: SimpleExpr =
            Func::count(Expr::col((CommentEntity, comment::Column::Id))).into();

        ProductEntity::find()
            .select_only()
            .columns([
                product::Column::Id,
                product::Column::Name,
                product::Column::Description,
                product::Column::PriceCents,
                product::Column::CategoryId,
                product::Column::CreatedAt,
                product::Column::UpdatedAt,
            ])
            .column_as(avg_rating, "avg_rating")
            .column_as(total_ratings, "total_ratings")
            .join(JoinType::LeftJoin, product::Relation::Comment.def())
            .group_by(product::Column::Id)
    }

    async fn fetch_rated(&self, query: Select<ProductEntity>) -> Result<Vec<RatedProduct>, DbErr> {
        let rows = query.into_model::<RatedProductRow>().all(self.db()).await?;
        Ok(rows.into_iter().map(RatedProduct::from).collect())
    }

    pub async fn rated_products(&self, filter: &ProductFilter) -> Result<Vec<RatedProduct>, DbErr> {
        let mut query = Self::rated_products_query();
        if let Some(slug) = &filter.category_slug {
            query = query
                .join(JoinType::InnerJoin, product::Relation::Category.def())
                .filter(category::Column::Slug.eq(slug.as_str()));
        }

        self.fetch_rated(
            query
                .order_by_asc(product::Column::Name)
                .order_by_asc(product::Column::Id),
        )
        .await
    }

    /// Every product, newest first, for the admin listing.
    pub async fn rated_products_newest(&self) -> Result<Vec<RatedProduct>, DbErr> {
        self.fetch_rated(
            Self::rated_products_query()
                .order_by_desc(product::Column::CreatedAt)
                .order_by_desc(product::Column::Id),
        )
        .await
    }

    /// One product, only when it sits in the category with the given slug.
    pub async fn rated_product_in_category(
        &self,
        category_slug: &str,
        id: i32,
    ) -> Result<Option<RatedProduct>, DbErr> {
        let query = Self::rated_products_query()
            .join(JoinType::InnerJoin, product::Relation::Category.def())
            .filter(category::Column::Slug.eq(category_slug))
            .filter(product::Column::Id.eq(id));

        Ok(self.fetch_rated(query).await?.into_iter().next())
    }

    pub async fn rated_product(&self, id: i32) -> Result<Option<RatedProduct>, DbErr> {
        let query = Self::rated_products_query().filter(product::Column::Id.eq(id));
        Ok(self.fetch_rated(query).await?.into_iter().next())
    }

    /// Every product in `category_id` except `exclude_id`, aggregates included.
    pub async fn rated_siblings(
        &self,
        category_id: i32,
        exclude_id: i32,
    ) -> Result<Vec<RatedProduct>, DbErr> {
        let query = Self::rated_products_query()
            .filter(product::Column::CategoryId.eq(category_id))
            .filter(product::Column::Id.ne(exclude_id));
        self.fetch_rated(query).await
    }

    pub async fn find_product(&self, id: i32) -> Result<Option<product::Model>, DbErr> {
        ProductEntity::find_by_id(id).one(self.db()).await
    }

    pub async fn create_product(&self, new: NewProduct) -> Result<product::Model, DbErr> {
        let now = Utc::now();
        product::ActiveModel {
            name: Set(new.name),
            description: Set(new.description),
            price_cents: Set(new.price_cents),
            category_id: Set(new.category_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db())
        .await
    }

    pub async fn update_product(
        &self,
        id: i32,
        changes: ProductChanges,
    ) -> Result<Option<product::Model>, DbErr> {
        let Some(existing) = self.find_product(id).await? else {
            return Ok(None);
        };

        let mut model: product::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            model.name = Set(name);
        }
        if let Some(description) = changes.description {
            model.description = Set(description);
        }
        if let Some(price_cents) = changes.price_cents {
            model.price_cents = Set(price_cents);
        }
        if let Some(category_id) = changes.category_id {
            model.category_id = Set(category_id);
        }
        model.updated_at = Set(Utc::now());

        model.update(self.db()).await.map(Some)
    }

    /// Deletes a product; its comments go with it.
    pub async fn delete_product(&self, id: i32) -> Result<bool, DbErr> {
        let result = ProductEntity::delete_by_id(id).exec(self.db()).await?;
        Ok(result.rows_affected > 0)
    }

    // Comments

    /// Comments on a product, newest first.
    pub async fn comments_for(&self, product_id: i32) -> Result<Vec<CommentWithAuthor>, DbErr> {
        let rows = CommentEntity::find()
            .filter(comment::Column::ProductId.eq(product_id))
            .find_also_related(UserEntity)
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .all(self.db())
            .await?;

        Ok(rows.into_iter().map(with_author).collect())
    }

    pub async fn comment_for_user(
        &self,
        product_id: i32,
        user_id: i32,
    ) -> Result<Option<comment::Model>, DbErr> {
        CommentEntity::find()
            .filter(comment::Column::ProductId.eq(product_id))
            .filter(comment::Column::UserId.eq(user_id))
            .one(self.db())
            .await
    }

    pub async fn count_comments(&self, product_id: i32) -> Result<u64, DbErr> {
        CommentEntity::find()
            .filter(comment::Column::ProductId.eq(product_id))
            .count(self.db())
            .await
    }

    /// Writes the user's comment on a product in one statement, relying on
    /// the unique (product_id, user_id) index to merge with an existing row.
    /// Returns the stored comment and whether no row existed beforehand.
    pub async fn upsert_user_comment(
        &self,
        product_id: i32,
        user_id: i32,
        rating: i32,
        text: String,
    ) -> Result<(comment::Model, bool), DbErr> {
        let existed = self.comment_for_user(product_id, user_id).await?.is_some();

        let now = Utc::now();
        let model = comment::ActiveModel {
            product_id: Set(product_id),
            user_id: Set(Some(user_id)),
            guest_name: Set(String::new()),
            guest_email: Set(String::new()),
            rating: Set(rating),
            text: Set(text),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        CommentEntity::insert(model)
            .on_conflict(
                OnConflict::columns([comment::Column::ProductId, comment::Column::UserId])
                    .update_columns([
                        comment::Column::Rating,
                        comment::Column::Text,
                        comment::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db())
            .await?;

        let stored = self
            .comment_for_user(product_id, user_id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("upserted comment".to_owned()))?;

        Ok((stored, !existed))
    }

    pub async fn insert_guest_comment(
        &self,
        product_id: i32,
        guest: GuestIdentity,
        rating: i32,
        text: String,
    ) -> Result<comment::Model, DbErr> {
        let now = Utc::now();
        comment::ActiveModel {
            product_id: Set(product_id),
            user_id: Set(None),
            guest_name: Set(guest.name),
            guest_email: Set(guest.email),
            rating: Set(rating),
            text: Set(text),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db())
        .await
    }

    /// Comments across the catalog, newest first, narrowed by rating and by a
    /// search over guest name, guest email, text and username.
    pub async fn search_comments(
        &self,
        filter: &CommentFilter,
    ) -> Result<Vec<CommentWithAuthor>, DbErr> {
        let mut query = CommentEntity::find().find_also_related(UserEntity);

        if let Some(rating) = filter.rating {
            query = query.filter(comment::Column::Rating.eq(rating));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(comment::Column::GuestName.contains(search))
                    .add(comment::Column::GuestEmail.contains(search))
                    .add(comment::Column::Text.contains(search))
                    .add(user::Column::Username.contains(search)),
            );
        }

        let rows = query
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .all(self.db())
            .await?;

        Ok(rows.into_iter().map(with_author).collect())
    }

    pub async fn delete_comment(&self, id: i32) -> Result<bool, DbErr> {
        let result = CommentEntity::delete_by_id(id).exec(self.db()).await?;
        Ok(result.rows_affected > 0)
    }

    // Users

    pub async fn users(&self) -> Result<Vec<user::Model>, DbErr> {
        UserEntity::find()
            .order_by_asc(user::Column::Username)
            .all(self.db())
            .await
    }

    pub async fn find_user_by_name(&self, username: &str) -> Result<Option<user::Model>, DbErr> {
        UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(self.db())
            .await
    }

    pub async fn create_user(
        &self,
        username: String,
        password_hash: String,
        role: user::Role,
    ) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            username: Set(username),
            password: Set(password_hash),
            role: Set(role),
            ..Default::default()
        }
        .insert(self.db())
        .await
    }

    /// Deletes a user; their comments stay, anonymized.
    pub async fn delete_user(&self, id: i32) -> Result<bool, DbErr> {
        match UserEntity::find_by_id(id).one(self.db()).await? {
            Some(user) => {
                user.delete(self.db()).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn with_author((comment, user): (comment::Model, Option<user::Model>)) -> CommentWithAuthor {
    CommentWithAuthor {
        comment,
        username: user.map(|user| user.username),
    }
}
