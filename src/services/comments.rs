use std::sync::Arc;
use tracing::info;

use crate::entities::comment;
use crate::services::{
    repository::CatalogRepository,
    validation::{validate_submission, CommentSubmission, ValidSubmission},
    ServiceError,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuestIdentity {
    pub name: String,
    pub email: String,
}

/// Who is rating: a signed-in user or an unverified guest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Actor {
    User(i32),
    Guest(GuestIdentity),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

#[derive(Clone, Debug)]
pub struct Submitted {
    pub comment: comment::Model,
    pub outcome: UpsertOutcome,
}

impl Submitted {
    /// The confirmation shown to whoever submitted the rating.
    pub fn message(&self) -> &'static str {
        match (self.comment.is_guest(), self.outcome) {
            (true, _) => "Thank you for your rating.",
            (false, UpsertOutcome::Created) => "Your rating was submitted.",
            (false, UpsertOutcome::Updated) => "Your rating was updated.",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommentService {
    repo: Arc<CatalogRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<CatalogRepository>) -> Self {
        Self { repo }
    }

    /// Validates a raw submission and records it. `user_id` is `None` for
    /// guests. Nothing is written when validation fails.
    pub async fn submit(
        &self,
        product_id: i32,
        user_id: Option<i32>,
        input: &CommentSubmission,
    ) -> Result<Submitted, ServiceError> {
        let valid = validate_submission(input, user_id).map_err(ServiceError::Invalid)?;
        self.upsert(product_id, valid).await
    }

    /// Records a validated submission. A user's comment on a product is
    /// created once and overwritten afterwards; every guest submission
    /// inserts a new comment.
    pub async fn upsert(
        &self,
        product_id: i32,
        submission: ValidSubmission,
    ) -> Result<Submitted, ServiceError> {
        if self.repo.find_product(product_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Product {product_id}")));
        }

        let ValidSubmission {
            actor,
            rating,
            text,
        } = submission;

        let submitted = match actor {
            Actor::User(user_id) => {
                let (comment, created) = self
                    .repo
                    .upsert_user_comment(product_id, user_id, rating, text)
                    .await?;
                Submitted {
                    comment,
                    outcome: if created {
                        UpsertOutcome::Created
                    } else {
                        UpsertOutcome::Updated
                    },
                }
            }
            Actor::Guest(guest) => {
                let comment = self
                    .repo
                    .insert_guest_comment(product_id, guest, rating, text)
                    .await?;
                Submitted {
                    comment,
                    outcome: UpsertOutcome::Created,
                }
            }
        };

        info!(
            product_id,
            comment_id = submitted.comment.id,
            user_id = ?submitted.comment.user_id,
            rating = submitted.comment.rating,
            outcome = ?submitted.outcome,
            "Recorded rating"
        );

        Ok(submitted)
    }
}
