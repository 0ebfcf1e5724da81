//! Pagination for list endpoints

/// Page size when the client does not ask for one
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest page a client may request
pub const MAX_LIMIT: i64 = 100;

/// Sanitized page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Rows per page
    pub limit: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// Clamp a requested page and limit into usable bounds
///
/// # Examples
/// ```
/// use rfmt_server::pagination::calculate_pagination;
///
/// let p = calculate_pagination(3, 10);
/// assert_eq!(p.offset, 20);
///
/// // Nonsense input gets clamped
/// let p = calculate_pagination(-4, 0);
/// assert_eq!((p.page, p.limit, p.offset), (1, 1, 0));
/// ```
pub fn calculate_pagination(requested_page: i64, requested_limit: i64) -> Pagination {
    let page = requested_page.max(1);
    let limit = requested_limit.clamp(1, MAX_LIMIT);
    let offset = (page - 1) * limit;

    Pagination {
        page,
        limit,
        offset,
    }
}
