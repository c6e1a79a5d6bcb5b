//! Image query filters.

use rusqlite::types::Value;

/// Enumerated predicates for [`Catalog::query_images`](crate::Catalog::query_images).
///
/// Every field participates in the generated query; contradictory
/// combinations (an empty source set, `min_aspect > max_aspect`) yield an
/// empty result rather than silently dropping predicates.
#[derive(Debug, Clone, Default)]
pub struct ImageFilter {
    /// Restrict to these sources. `Some(vec![])` matches nothing.
    pub source_ids: Option<Vec<String>>,
    /// Only favorite images.
    pub favorites_only: bool,
    /// Minimum aspect ratio (inclusive). Images with unknown dimensions
    /// are excluded when set.
    pub min_aspect: Option<f64>,
    /// Maximum aspect ratio (inclusive). Images with unknown dimensions
    /// are excluded when set.
    pub max_aspect: Option<f64>,
    /// Exclude images shown within the last N seconds.
    pub exclude_shown_within: Option<i64>,
    /// Cap on the number of returned rows.
    pub limit: Option<u32>,
}

impl ImageFilter {
    /// Compiles the filter to a WHERE/LIMIT suffix and its parameters.
    pub(crate) fn to_sql(&self, now: i64) -> (String, Vec<Value>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(source_ids) = &self.source_ids {
            if source_ids.is_empty() {
                clauses.push(String::from("0"));
            } else {
                let placeholders = vec!["?"; source_ids.len()].join(", ");
                clauses.push(format!("source_id IN ({placeholders})"));
                params.extend(source_ids.iter().cloned().map(Value::Text));
            }
        }

        if self.favorites_only {
            clauses.push(String::from("is_favorite = 1"));
        }

        if let Some(min_aspect) = self.min_aspect {
            clauses.push(String::from("aspect_ratio >= ?"));
            params.push(Value::Real(min_aspect));
        }

        if let Some(max_aspect) = self.max_aspect {
            clauses.push(String::from("aspect_ratio <= ?"));
            params.push(Value::Real(max_aspect));
        }

        if let Some(window) = self.exclude_shown_within {
            clauses.push(String::from(
                "(last_shown_at IS NULL OR last_shown_at <= ?)",
            ));
            params.push(Value::Integer(now.saturating_sub(window.max(0))));
        }

        let mut sql = String::new();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY filepath");

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(i64::from(limit)));
        }

        (sql, params)
    }
}
