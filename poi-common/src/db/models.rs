//! Database models

use chrono::NaiveDateTime;
use serde::Serialize;

/// Mutable columns of a stored point of interest
///
/// `external_id` is not listed: it is never rewritten once a row exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoiField {
    Name,
    Category,
    Latitude,
    Longitude,
    AvgRating,
}

impl PoiField {
    /// Every field reconciliation is allowed to change
    pub const UPDATABLE: [PoiField; 5] = [
        PoiField::Name,
        PoiField::Category,
        PoiField::Latitude,
        PoiField::Longitude,
        PoiField::AvgRating,
    ];

    /// Column name in the `pois` table
    pub fn column(self) -> &'static str {
        match self {
            PoiField::Name => "name",
            PoiField::Category => "category",
            PoiField::Latitude => "latitude",
            PoiField::Longitude => "longitude",
            PoiField::AvgRating => "avg_rating",
        }
    }
}

/// Persisted point of interest, uniquely keyed by `external_id`
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct StoredPoi {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub category: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub avg_rating: Option<f64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updatable_columns() {
        let columns: Vec<_> = PoiField::UPDATABLE.iter().map(|f| f.column()).collect();
        assert_eq!(columns, vec!["name", "category", "latitude", "longitude", "avg_rating"]);
    }
}
