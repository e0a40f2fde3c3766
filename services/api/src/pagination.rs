//! Page-number pagination with `page` and `limit` query parameters

use axum::http::Uri;
use serde::{Deserialize, Serialize};

/// Pagination query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    /// Page number (1-based)
    pub page: Option<u32>,
    /// Number of items per page
    pub limit: Option<u32>,
}

/// A normalized page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32, max_limit: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, max_limit.max(1)),
        }
    }

    pub fn from_query(query: &PageQuery, default_limit: u32, max_limit: u32) -> Self {
        Self::new(query.page, query.limit, default_limit, max_limit)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

/// Paginated response envelope
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Wrap one page of results, building links from the request URI
    pub fn new(results: Vec<T>, count: i64, request: PageRequest, base_url: &str, uri: &Uri) -> Self {
        let has_next = request.offset() + i64::from(request.limit) < count;
        let next = has_next.then(|| page_link(base_url, uri, Some(request.page + 1)));

        let previous = (request.page > 1).then(|| {
            let target = request.page - 1;
            page_link(base_url, uri, (target > 1).then_some(target))
        });

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

/// Rebuild the request URL with `page` replaced, or removed for the first page
fn page_link(base_url: &str, uri: &Uri, page: Option<u32>) -> String {
    let mut params: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty() && *pair != "page" && !pair.starts_with("page="))
        .map(str::to_string)
        .collect();

    if let Some(page) = page {
        params.push(format!("page={}", page));
    }

    let mut link = format!("{}{}", base_url, uri.path());
    if !params.is_empty() {
        link.push('?');
        link.push_str(&params.join("&"));
    }
    link
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:3001";

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn normalizes_page_request() {
        let request = PageRequest::new(None, None, 6, 100);
        assert_eq!(request, PageRequest { page: 1, limit: 6 });
        assert_eq!(request.offset(), 0);

        let request = PageRequest::new(Some(0), Some(0), 6, 100);
        assert_eq!(request, PageRequest { page: 1, limit: 1 });

        let request = PageRequest::new(Some(3), Some(500), 6, 100);
        assert_eq!(request.limit(), 100);
        assert_eq!(request.offset(), 200);
    }

    #[test]
    fn first_page_links_only_forward() {
        let request = PageRequest::new(None, Some(2), 6, 100);
        let page = Page::new(vec![1, 2], 5, request, BASE, &uri("/api/recipes?limit=2"));

        assert_eq!(page.count, 5);
        assert_eq!(
            page.next.as_deref(),
            Some("http://localhost:3001/api/recipes?limit=2&page=2")
        );
        assert_eq!(page.previous, None);
    }

    #[test]
    fn middle_page_keeps_filters() {
        let request = PageRequest::new(Some(3), Some(2), 6, 100);
        let page = Page::new(
            vec![5, 6],
            10,
            request,
            BASE,
            &uri("/api/recipes?tags=lunch&page=3&limit=2"),
        );

        assert_eq!(
            page.next.as_deref(),
            Some("http://localhost:3001/api/recipes?tags=lunch&limit=2&page=4")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("http://localhost:3001/api/recipes?tags=lunch&limit=2&page=2")
        );
    }

    #[test]
    fn second_page_links_back_without_page_param() {
        let request = PageRequest::new(Some(2), Some(2), 6, 100);
        let page = Page::new(vec![3, 4], 4, request, BASE, &uri("/api/users?page=2&limit=2"));

        assert_eq!(page.next, None);
        assert_eq!(
            page.previous.as_deref(),
            Some("http://localhost:3001/api/users?limit=2")
        );
    }

    #[test]
    fn empty_result_has_no_links() {
        let request = PageRequest::new(None, None, 6, 100);
        let page: Page<i32> = Page::new(vec![], 0, request, BASE, &uri("/api/users"));

        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
    }
}
