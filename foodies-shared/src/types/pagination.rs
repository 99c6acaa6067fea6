use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 12;
pub const MAX_LIMIT: i64 = 100;

/// Raw `?page=&limit=` query values. Unparsable or zero values count as absent.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 1-based page number.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub page: Option<i64>,
    /// Page size, clamped to 1..=100.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub limit: Option<i64>,
}

impl PaginationParams {
    pub fn paginate(&self) -> Pagination {
        paginate(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Page defaults to 1 (min 1), limit defaults to 12 (clamped to 1..=100).
pub fn paginate(page: Option<i64>, limit: Option<i64>) -> Pagination {
    let page = page.filter(|p| *p != 0).unwrap_or(DEFAULT_PAGE).max(1);
    let limit = limit
        .filter(|l| *l != 0)
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT);
    Pagination {
        page,
        limit,
        // Huge pages saturate into an empty page instead of overflowing.
        offset: (page - 1).saturating_mul(limit),
    }
}

/// Pagination block returned next to a page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl PageMeta {
    pub fn new(total: i64, pagination: &Pagination) -> Self {
        let pages = if total <= 0 {
            0
        } else {
            (total + pagination.limit - 1) / pagination.limit
        };
        Self {
            total,
            page: pagination.page,
            limit: pagination.limit,
            pages,
        }
    }
}

pub fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse::<i64>().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_absent() {
        assert_eq!(paginate(None, None), Pagination { page: 1, limit: 12, offset: 0 });
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(paginate(Some(-2), Some(500)), Pagination { page: 1, limit: 100, offset: 0 });
    }

    #[test]
    fn computes_offset() {
        assert_eq!(paginate(Some(3), Some(20)), Pagination { page: 3, limit: 20, offset: 40 });
    }

    #[test]
    fn zero_values_fall_back_to_defaults() {
        assert_eq!(paginate(Some(0), Some(0)), Pagination { page: 1, limit: 12, offset: 0 });
        assert_eq!(paginate(Some(2), Some(-5)), Pagination { page: 2, limit: 1, offset: 1 });
    }

    #[test]
    fn huge_page_saturates_offset() {
        let p = paginate(Some(i64::MAX), Some(MAX_LIMIT));
        assert_eq!(p.page, i64::MAX);
        assert_eq!(p.limit, MAX_LIMIT);
        assert_eq!(p.offset, i64::MAX);

        let p = paginate(Some(i64::MAX / 2), Some(3));
        assert_eq!(p.offset, i64::MAX);
        assert!(PageMeta::new(5, &p).pages < p.page);
    }

    #[test]
    fn page_count_rounds_up() {
        let p = paginate(Some(1), Some(12));
        assert_eq!(PageMeta::new(25, &p).pages, 3);
        assert_eq!(PageMeta::new(24, &p).pages, 2);
        assert_eq!(PageMeta::new(0, &p).pages, 0);
    }

    #[test]
    fn params_parse_leniently() {
        let params: PaginationParams = serde_json::from_value(serde_json::json!({
            "page": "2",
            "limit": "abc"
        }))
        .unwrap();
        assert_eq!(params.paginate(), Pagination { page: 2, limit: 12, offset: 12 });

        let empty: PaginationParams = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(empty.paginate(), paginate(None, None));
    }
}
