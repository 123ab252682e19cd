//! Read-side queries over the `pois` table
//!
//! Writes go through the importer's storage gateway; this module only serves
//! lookups and the `list` view.

use crate::db::models::StoredPoi;
use crate::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Columns selected for a [`StoredPoi`]
pub const POI_COLUMNS: &str =
    "id, external_id, name, category, latitude, longitude, avg_rating, created_at, updated_at";

/// Filter for listing stored records
#[derive(Debug, Clone, Default)]
pub struct PoiFilter {
    /// Exact category match
    pub category: Option<String>,
    /// Substring match against id, external id and name
    pub search: Option<String>,
    /// Maximum number of rows returned
    pub limit: Option<u32>,
}

/// Load one stored record by external identifier
pub async fn get_poi_by_external_id(
    pool: &SqlitePool,
    external_id: &str,
) -> Result<Option<StoredPoi>> {
    let sql = format!("SELECT {} FROM pois WHERE external_id = ?", POI_COLUMNS);
    let poi = sqlx::query_as::<_, StoredPoi>(&sql)
        .bind(external_id)
        .fetch_optional(pool)
        .await?;
    Ok(poi)
}

/// Count all stored records
pub async fn count_pois(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pois")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// List stored records ordered by id
pub async fn list_pois(pool: &SqlitePool, filter: &PoiFilter) -> Result<Vec<StoredPoi>> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM pois WHERE 1 = 1", POI_COLUMNS));

    if let Some(category) = &filter.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }

    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        builder
            .push(" AND (CAST(id AS TEXT) = ")
            .push_bind(search.clone())
            .push(" OR external_id LIKE ")
            .push_bind(pattern.clone())
            .push(" OR name LIKE ")
            .push_bind(pattern)
            .push(")");
    }

    builder.push(" ORDER BY id");

    if let Some(limit) = filter.limit {
        builder.push(" LIMIT ").push_bind(i64::from(limit));
    }

    let pois = builder
        .build_query_as::<StoredPoi>()
        .fetch_all(pool)
        .await?;
    Ok(pois)
}
