use serde::Deserialize;
use utoipa::IntoParams;

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (1-100)
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Page {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + self.per_page as i64 - 1) / self.per_page as i64
        }
    }
}

impl From<PageParams> for Page {
    fn from(params: PageParams) -> Self {
        Page::new(params.page, params.per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let page = Page::from(PageParams::default());
        assert_eq!(page, Page { page: 1, per_page: 10 });

        let page = Page::from(PageParams {
            page: Some(0),
            per_page: Some(1000),
        });
        assert_eq!(page, Page { page: 1, per_page: 100 });
    }

    #[test]
    fn offset_and_pages() {
        let page = Page { page: 3, per_page: 20 };
        assert_eq!(page.offset(), 40);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(41), 3);
        assert_eq!(page.total_pages(60), 3);
    }
}
