use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const MAX_PAGE_SIZE: i64 = 100;

/// Upper bound for `?offset=`; anything past it is an empty page anyway.
pub const MAX_OFFSET: i64 = i64::MAX / 2;

/// `?page=&limit=` pagination used by the recipe list.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// `?limit=&offset=` pagination used by user listings.
#[derive(Debug, Default, Deserialize)]
pub struct LimitOffsetParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl Window {
    /// Offset just past this window.
    pub fn end(&self) -> i64 {
        self.offset.saturating_add(self.limit)
    }
}

fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
    match limit {
        Some(l) if l > 0 => l.min(MAX_PAGE_SIZE),
        _ => default,
    }
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    pub fn window(&self, default_size: i64) -> Result<Window, AppError> {
        let page = self.page();
        if page < 1 {
            return Err(AppError::NotFound);
        }
        let limit = clamp_limit(self.limit, default_size);
        // a page this far out cannot exist
        let offset = (page - 1).checked_mul(limit).ok_or(AppError::NotFound)?;
        Ok(Window { limit, offset })
    }

    /// Wraps one page of results, building absolute `next`/`previous` links
    /// from `base_url` + `path` while keeping the caller's other query params.
    pub fn paginate<T>(
        &self,
        window: Window,
        count: i64,
        results: Vec<T>,
        base_url: &str,
        path: &str,
        query: Option<&str>,
    ) -> Result<Paginated<T>, AppError> {
        let page = self.page();
        if page > 1 && window.offset >= count {
            return Err(AppError::NotFound);
        }
        let link = |target: i64| {
            let mut params = vec![("limit", window.limit.to_string())];
            if target > 1 {
                params.push(("page", target.to_string()));
            }
            build_link(base_url, path, query, &["page", "limit"], &params)
        };
        Ok(Paginated {
            count,
            next: (window.end() < count).then(|| link(page + 1)),
            previous: (page > 1).then(|| link(page - 1)),
            results,
        })
    }
}

impl LimitOffsetParams {
    pub fn window(&self, default_size: i64) -> Window {
        Window {
            limit: clamp_limit(self.limit, default_size),
            offset: self.offset.unwrap_or(0).clamp(0, MAX_OFFSET),
        }
    }

    pub fn paginate<T>(
        window: Window,
        count: i64,
        results: Vec<T>,
        base_url: &str,
        path: &str,
        query: Option<&str>,
    ) -> Paginated<T> {
        let link = |offset: i64| {
            let mut params = vec![("limit", window.limit.to_string())];
            if offset > 0 {
                params.push(("offset", offset.to_string()));
            }
            build_link(base_url, path, query, &["limit", "offset"], &params)
        };
        Paginated {
            count,
            next: (window.end() < count).then(|| link(window.end())),
            previous: (window.offset > 0).then(|| link((window.offset - window.limit).max(0))),
            results,
        }
    }
}

fn build_link(
    base_url: &str,
    path: &str,
    query: Option<&str>,
    replaced: &[&str],
    params: &[(&str, String)],
) -> String {
    let mut pairs: Vec<String> = query
        .unwrap_or_default()
        .split('&')
        .filter(|p| !p.is_empty())
        .filter(|p| {
            let key = p.split('=').next().unwrap_or_default();
            !replaced.contains(&key)
        })
        .map(str::to_string)
        .collect();
    pairs.extend(params.iter().map(|(k, v)| format!("{k}={v}")));
    format!("{base_url}{path}?{}", pairs.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window_defaults_and_caps() {
        let p = PageParams::default();
        assert_eq!(p.window(10).unwrap(), Window { limit: 10, offset: 0 });

        let p = PageParams { page: Some(3), limit: Some(500) };
        assert_eq!(p.window(10).unwrap(), Window { limit: 100, offset: 200 });

        let p = PageParams { page: Some(0), limit: None };
        assert!(matches!(p.window(10), Err(AppError::NotFound)));
    }

    #[test]
    fn page_links_keep_filters() {
        let p = PageParams { page: Some(2), limit: Some(2) };
        let w = p.window(10).unwrap();
        let page = p
            .paginate(
                w,
                5,
                vec![1, 2],
                "http://h",
                "/api/v1/recipes",
                Some("is_favorited=1&page=2&limit=2"),
            )
            .unwrap();
        assert_eq!(
            page.next.as_deref(),
            Some("http://h/api/v1/recipes?is_favorited=1&limit=2&page=3")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("http://h/api/v1/recipes?is_favorited=1&limit=2")
        );
    }

    #[test]
    fn page_past_the_end_is_not_found() {
        let p = PageParams { page: Some(4), limit: Some(2) };
        let w = p.window(10).unwrap();
        let res = p.paginate::<i32>(w, 5, vec![], "http://h", "/r", None);
        assert!(matches!(res, Err(AppError::NotFound)));
    }

    #[test]
    fn huge_page_number_is_not_found() {
        let p = PageParams { page: Some(i64::MAX), limit: Some(10) };
        assert!(matches!(p.window(10), Err(AppError::NotFound)));

        let p = PageParams { page: Some(i64::MAX / 100 + 2), limit: Some(100) };
        assert!(matches!(p.window(10), Err(AppError::NotFound)));
    }

    #[test]
    fn huge_offset_is_clamped_and_has_no_next_link() {
        let params = LimitOffsetParams { limit: Some(10), offset: Some(i64::MAX) };
        let w = params.window(10);
        assert_eq!(w.offset, MAX_OFFSET);

        let page = LimitOffsetParams::paginate::<u8>(w, 5, vec![], "http://h", "/u", None);
        assert!(page.next.is_none());
        assert!(page.previous.is_some());
    }

    #[test]
    fn window_end_saturates() {
        let w = Window { limit: 100, offset: i64::MAX - 1 };
        assert_eq!(w.end(), i64::MAX);
    }

    #[test]
    fn limit_offset_links() {
        let params = LimitOffsetParams { limit: Some(2), offset: Some(2) };
        let w = params.window(10);
        let page = LimitOffsetParams::paginate(w, 5, vec!['a', 'b'], "http://h", "/u", None);
        assert_eq!(page.next.as_deref(), Some("http://h/u?limit=2&offset=4"));
        assert_eq!(page.previous.as_deref(), Some("http://h/u?limit=2"));

        let last = LimitOffsetParams::paginate(
            Window { limit: 2, offset: 4 },
            5,
            vec!['e'],
            "http://h",
            "/u",
            None,
        );
        assert!(last.next.is_none());
    }
}
