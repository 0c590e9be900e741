use bookclub_dal::{ListingParams, Order};
use garde::Validate;
use serde::{Deserialize, Serialize};
use url::Url;

/// Query parameters shared by every paginated listing, on both surfaces.
#[derive(Debug, Clone, Validate, Deserialize)]
#[garde(allow_unvalidated)]
pub struct Paging {
    page: Option<u32>,
    #[garde(range(min = 1, max = 1000))]
    page_size: Option<u32>,
    #[garde(length(max = 255))]
    q: Option<String>,
}

impl Paging {
    pub fn page_size(&self, default_page_size: u32) -> u32 {
        self.page_size.unwrap_or(default_page_size)
    }

    pub fn query(&self) -> Option<&str> {
        self.q.as_deref().filter(|q| !q.is_empty())
    }

    /// Requested page clamped to the valid range, out of range never errors.
    pub fn clamped_page(&self, total: u64, page_size: u32) -> u32 {
        let pager = Pager::new(self.page.unwrap_or(1), page_size, total);
        pager.page
    }
}

/// Page arithmetic used by both the HTML listings and the JSON envelope.
#[derive(Debug, Clone, Copy)]
pub struct Pager {
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total: u64,
}

impl Pager {
    pub fn new(requested_page: u32, page_size: u32, total: u64) -> Self {
        let total_pages = total
            .div_ceil(page_size.max(1) as u64)
            .max(1)
            .try_into()
            .unwrap_or(u32::MAX);
        Self {
            page: requested_page.clamp(1, total_pages),
            page_size,
            total_pages,
            total,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

pub fn listing_params(page: u32, page_size: u32, order: Vec<Order>) -> ListingParams {
    let offset = (page - 1) as i64 * page_size as i64;
    ListingParams::new(offset, page_size as i64).with_order(order)
}

/// Paginated envelope returned by list endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(
        pager: Pager,
        results: Vec<T>,
        endpoint: &Url,
        query: Option<&str>,
    ) -> Self {
        let link = |target_page: u32| {
            let mut url = endpoint.clone();
            {
                let mut pairs = url.query_pairs_mut();
                pairs.clear();
                if let Some(q) = query {
                    pairs.append_pair("q", q);
                }
                pairs.append_pair("page", &target_page.to_string());
                pairs.append_pair("page_size", &pager.page_size.to_string());
            }
            url.to_string()
        };
        Page {
            count: pager.total,
            next: pager.has_next().then(|| link(pager.page + 1)),
            previous: pager.has_previous().then(|| link(pager.page - 1)),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pager_clamps() {
        let pager = Pager::new(99, 2, 5);
        assert_eq!(pager.page, 3);
        assert_eq!(pager.total_pages, 3);
        assert!(!pager.has_next());
        assert!(pager.has_previous());

        let pager = Pager::new(0, 2, 5);
        assert_eq!(pager.page, 1);

        // empty result set still has one (empty) page
        let pager = Pager::new(4, 2, 0);
        assert_eq!(pager.page, 1);
        assert_eq!(pager.total_pages, 1);
        assert!(!pager.has_next());
        assert!(!pager.has_previous());
    }

    #[test]
    fn test_page_links() {
        let endpoint: Url = "http://localhost:3000/api/reviews".parse().unwrap();
        let page = Page::new(Pager::new(2, 2, 5), vec![1, 2], &endpoint, None);
        assert_eq!(page.count, 5);
        assert_eq!(
            page.next.as_deref(),
            Some("http://localhost:3000/api/reviews?page=3&page_size=2")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("http://localhost:3000/api/reviews?page=1&page_size=2")
        );

        let page = Page::new(Pager::new(1, 10, 5), vec![1], &endpoint, Some("sport"));
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
        assert_eq!(page.count, 5);
    }

    #[test]
    fn test_listing_params_offset() {
        let params = listing_params(3, 10, vec![]);
        assert_eq!(params.offset, 20);
        assert_eq!(params.limit, 10);
    }
}
