//! Page-number pagination over repository listings.

use serde::Serialize;

use crate::domain::{PostDetails, PostFilter};
use crate::error::RepoError;
use crate::ports::PostRepository;

/// Splits a listing into fixed-size pages.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: u64,
}

/// Position of one page within a listing of `count` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub per_page: u64,
}

impl Paginator {
    pub fn new(per_page: u64) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// An empty listing still has one (empty) page.
    pub fn num_pages(&self, count: u64) -> u64 {
        if count == 0 {
            1
        } else {
            count.div_ceil(self.per_page)
        }
    }

    /// Resolve the raw `page` query value to a valid page.
    ///
    /// Missing or non-numeric values give the first page; numbers outside
    /// `1..=num_pages` give the last page.
    pub fn window(&self, count: u64, requested: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages(count);
        let number = match requested.map(str::trim) {
            None => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n < 1 || n as u64 > num_pages => num_pages,
                Ok(n) => n as u64,
                // Too many digits for i64 is still a number, and out of range
                Err(_) if is_integer(raw) => num_pages,
                Err(_) => 1,
            },
        };

        PageWindow {
            number,
            num_pages,
            count,
            per_page: self.per_page,
        }
    }
}

/// An optionally signed run of ASCII digits.
fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

impl PageWindow {
    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page_number(&self) -> Option<u64> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }
}

/// One page of items.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

/// Fetch the requested page of a post listing.
pub async fn paginate_posts(
    posts: &dyn PostRepository,
    filter: PostFilter,
    paginator: Paginator,
    requested: Option<&str>,
) -> Result<Page<PostDetails>, RepoError> {
    let count = posts.count(filter).await?;
    let window = paginator.window(count, requested);
    let items = posts.list(filter, window.offset(), window.limit()).await?;

    Ok(Page { items, window })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_sizes_follow_count() {
        let paginator = Paginator::new(10);
        // 13 posts: 10 on the first page, 3 on the second
        let first = paginator.window(13, Some("1"));
        let second = paginator.window(13, Some("2"));
        assert_eq!(first.num_pages, 2);
        assert_eq!((first.offset(), first.limit()), (0, 10));
        assert_eq!(second.offset(), 10);
        assert_eq!(13 - second.offset(), 3);
    }

    #[test]
    fn test_missing_or_garbage_page_is_first() {
        let paginator = Paginator::new(10);
        assert_eq!(paginator.window(25, None).number, 1);
        assert_eq!(paginator.window(25, Some("abc")).number, 1);
        assert_eq!(paginator.window(25, Some("2.5")).number, 1);
    }

    #[test]
    fn test_out_of_range_page_is_last() {
        let paginator = Paginator::new(10);
        assert_eq!(paginator.window(25, Some("99")).number, 3);
        assert_eq!(paginator.window(25, Some("0")).number, 3);
        assert_eq!(paginator.window(25, Some("-4")).number, 3);
    }

    #[test]
    fn test_overflowing_page_is_last() {
        let paginator = Paginator::new(10);
        assert_eq!(paginator.window(13, Some("99999999999999999999")).number, 2);
        assert_eq!(paginator.window(13, Some("-99999999999999999999")).number, 2);
        assert_eq!(paginator.window(13, Some("+")).number, 1);
    }

    #[test]
    fn test_empty_listing_has_one_page() {
        let window = Paginator::new(10).window(0, Some("3"));
        assert_eq!(window.number, 1);
        assert_eq!(window.num_pages, 1);
        assert!(!window.has_next());
        assert!(!window.has_previous());
    }

    #[test]
    fn test_neighbour_numbers() {
        let window = Paginator::new(5).window(12, Some("2"));
        assert_eq!(window.previous_page_number(), Some(1));
        assert_eq!(window.next_page_number(), Some(3));
        let last = Paginator::new(5).window(12, Some("3"));
        assert_eq!(last.next_page_number(), None);
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        assert_eq!(Paginator::new(0).per_page(), 1);
    }
}
