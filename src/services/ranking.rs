use std::{cmp::Ordering, sync::Arc};

use crate::services::{
    repository::{CatalogRepository, RatedProduct},
    ServiceError,
};

pub const RELATED_LIMIT: usize = 8;

/// Best rated first, then most rated, then by name.
pub fn compare_by_rating(a: &RatedProduct, b: &RatedProduct) -> Ordering {
    b.avg_rating
        .total_cmp(&a.avg_rating)
        .then_with(|| b.total_ratings.cmp(&a.total_ratings))
        .then_with(|| a.product.name.cmp(&b.product.name))
        .then_with(|| a.product.id.cmp(&b.product.id))
}

/// Orders `candidates` with [`compare_by_rating`], drops `exclude_id` and
/// keeps at most `limit` entries.
pub fn rank_related(
    candidates: Vec<RatedProduct>,
    exclude_id: i32,
    limit: usize,
) -> Vec<RatedProduct> {
    let mut ranked: Vec<RatedProduct> = candidates
        .into_iter()
        .filter(|candidate| candidate.product.id != exclude_id)
        .collect();
    ranked.sort_by(compare_by_rating);
    ranked.truncate(limit);
    ranked
}

#[derive(Debug, Clone)]
pub struct RelatedRanker {
    repo: Arc<CatalogRepository>,
}

impl RelatedRanker {
    pub fn new(repo: Arc<CatalogRepository>) -> Self {
        Self { repo }
    }

    /// Other products in the same category, best rated first. Aggregates
    /// are read fresh on every call.
    pub async fn related_to(
        &self,
        product: &RatedProduct,
    ) -> Result<Vec<RatedProduct>, ServiceError> {
        let Some(category_id) = product.product.category_id else {
            return Ok(Vec::new());
        };

        let siblings = self
            .repo
            .rated_siblings(category_id, product.product.id)
            .await?;

        Ok(rank_related(siblings, product.product.id, RELATED_LIMIT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::product;
    use chrono::Utc;

    fn rated(id: i32, name: &str, avg_rating: f64, total_ratings: i64) -> RatedProduct {
        RatedProduct {
            product: product::Model {
                id,
                name: name.into(),
                description: None,
                price_cents: 100,
                category_id: Some(1),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            avg_rating,
            total_ratings,
        }
    }

    fn names(ranked: &[RatedProduct]) -> Vec<&str> {
        ranked.iter().map(|r| r.product.name.as_str()).collect()
    }

    #[test]
    fn higher_count_breaks_average_ties() {
        let ranked = rank_related(
            vec![rated(2, "Red Rattle", 5.0, 1), rated(3, "Amber Rattle", 5.0, 2)],
            1,
            RELATED_LIMIT,
        );
        assert_eq!(names(&ranked), vec!["Amber Rattle", "Red Rattle"]);
    }

    #[test]
    fn unrated_products_sort_last() {
        let ranked = rank_related(
            vec![
                rated(2, "Alpha", 0.0, 0),
                rated(3, "Beta", 1.0, 1),
                rated(4, "Gamma", 4.5, 2),
            ],
            1,
            RELATED_LIMIT,
        );
        assert_eq!(names(&ranked), vec!["Gamma", "Beta", "Alpha"]);
    }

    #[test]
    fn name_breaks_full_ties() {
        let ranked = rank_related(
            vec![rated(2, "Zebra", 3.0, 2), rated(3, "Apple", 3.0, 2)],
            1,
            RELATED_LIMIT,
        );
        assert_eq!(names(&ranked), vec!["Apple", "Zebra"]);
    }

    #[test]
    fn excludes_source_and_caps_results() {
        let candidates = (1..=12)
            .map(|id| rated(id, &format!("Extra {id:02}"), 5.0, 1))
            .collect();
        let ranked = rank_related(candidates, 1, RELATED_LIMIT);
        assert_eq!(ranked.len(), RELATED_LIMIT);
        assert!(ranked.iter().all(|r| r.product.id != 1));
    }
}
