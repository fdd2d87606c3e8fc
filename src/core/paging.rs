use serde::Serialize;

/// One-based page selection, validated by the transport before reaching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_number: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number: page_number.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> usize {
        let page_index = usize::try_from(self.page_number.saturating_sub(1)).unwrap_or(usize::MAX);
        page_index.saturating_mul(self.limit())
    }

    pub fn limit(&self) -> usize {
        usize::try_from(self.page_size).unwrap_or(usize::MAX)
    }
}

/// A page of items plus the soft-delete-filtered total.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, page: PageRequest, total_count: u64) -> Self {
        let total_pages = if total_count == 0 {
            0
        } else {
            u32::try_from(total_count.div_ceil(u64::from(page.page_size))).unwrap_or(u32::MAX)
        };

        Self {
            items,
            page_number: page.page_number,
            page_size: page.page_size,
            total_count,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_one_based() {
        assert_eq!(PageRequest::new(1, 10).offset(), 0);
        assert_eq!(PageRequest::new(3, 10).offset(), 20);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = PagedResult::new(vec![1, 2, 3, 4, 5], PageRequest::new(3, 10), 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_count, 25);

        let empty: PagedResult<i32> = PagedResult::new(Vec::new(), PageRequest::new(1, 10), 0);
        assert_eq!(empty.total_pages, 0);
    }
}
