use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Page request sent as `pageIndex`/`pageSize`/`sort`/`filter` query parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    pub page_index: u32,
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
            sort: None,
            filter: None,
        }
    }
}

impl PaginationQuery {
    pub fn page(page_index: u32, page_size: u32) -> Self {
        Self {
            page_index,
            page_size,
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Query-string pairs in a stable order
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("pageIndex".to_string(), self.page_index.to_string()),
            ("pageSize".to_string(), self.page_size.to_string()),
        ];
        if let Some(sort) = &self.sort {
            params.push(("sort".to_string(), sort.clone()));
        }
        if let Some(filter) = &self.filter {
            params.push(("filter".to_string(), filter.clone()));
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLink {
    pub page: String,
    pub page_index: u32,
}

/// Envelope returned by every `/search` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub page_index: u32,
    pub total_page: u32,
    pub page_size: u32,
    pub total_size: u64,
    #[serde(default)]
    pub pages: Vec<PageLink>,
}

impl<T> PaginatedResult<T> {
    pub fn is_last_page(&self) -> bool {
        self.page_index + 1 >= self.total_page
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            data: self.data.into_iter().map(f).collect(),
            page_index: self.page_index,
            total_page: self.total_page,
            page_size: self.page_size,
            total_size: self.total_size,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_uses_camel_case() {
        let json = serde_json::json!({
            "data": [1, 2, 3],
            "pageIndex": 1,
            "totalPage": 4,
            "pageSize": 3,
            "totalSize": 12,
            "pages": [{ "page": "?pageIndex=0", "pageIndex": 0 }]
        });

        let page: PaginatedResult<u32> = serde_json::from_value(json).unwrap();
        assert_eq!(page.data, vec![1, 2, 3]);
        assert_eq!(page.total_page, 4);
        assert_eq!(page.total_size, 12);
        assert_eq!(page.pages[0].page_index, 0);
        assert!(!page.is_last_page());
    }

    #[test]
    fn test_missing_pages_defaults_to_empty() {
        let json = serde_json::json!({
            "data": [],
            "pageIndex": 0,
            "totalPage": 1,
            "pageSize": 10,
            "totalSize": 0
        });

        let page: PaginatedResult<u32> = serde_json::from_value(json).unwrap();
        assert!(page.pages.is_empty());
        assert!(page.is_last_page());
    }

    #[test]
    fn test_query_params_order() {
        let query = PaginationQuery::page(2, 25).with_sort("name:asc");
        assert_eq!(
            query.to_params(),
            vec![
                ("pageIndex".to_string(), "2".to_string()),
                ("pageSize".to_string(), "25".to_string()),
                ("sort".to_string(), "name:asc".to_string()),
            ]
        );
    }
}
