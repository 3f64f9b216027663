use crate::error::EngineError;

/// A fixed-size window into a filtered collection.
///
/// Borrows its records, so it can never outlive the collection it was
/// cut from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page<'a, T> {
    pub records: &'a [T],
    /// 1-based.
    pub number: usize,
    pub size: usize,
    pub total_items: usize,
}

impl<T> Page<'_, T> {
    /// `max(1, ceil(total_items / size))`.
    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(self.size).max(1)
    }

    /// Offset of the first record of this page in the source collection.
    pub fn offset(&self) -> usize {
        self.number.saturating_sub(1).saturating_mul(self.size)
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Slice page `page` (1-based) of `page_size` records out of `records`.
///
/// A page past the end is empty rather than an error.
pub fn paginate<T>(records: &[T], page: usize, page_size: usize) -> Result<Page<'_, T>, EngineError> {
    if page == 0 {
        return Err(EngineError::InvalidPage);
    }
    if page_size == 0 {
        return Err(EngineError::InvalidPageSize);
    }
    let start = (page - 1).saturating_mul(page_size).min(records.len());
    let end = start.saturating_add(page_size).min(records.len());
    Ok(Page {
        records: &records[start..end],
        number: page,
        size: page_size,
        total_items: records.len(),
    })
}
