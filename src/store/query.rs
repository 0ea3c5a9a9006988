//! Filter and pagination parameters shared by all storage backends.

const DEFAULT_LIMIT: usize = 100;

/// Equality-filtered, ordered, paginated query.
#[derive(Debug, Clone)]
pub struct Query {
    filters: Vec<(String, serde_json::Value)>,
    order_by: Vec<(String, bool)>,
    limit: usize,
    offset: usize,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Query {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    /// Add an equality filter on a column; filters combine with AND.
    pub fn push(
        mut self,
        key: &str,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.filters.push((key.to_string(), value.into()));
        self
    }

    /// Order by a column; `rev` selects descending.
    pub fn set_order(
        mut self,
        key: &str,
        rev: bool,
    ) -> Self {
        self.order_by.push((key.to_string(), rev));
        self
    }

    pub fn set_limit(
        mut self,
        limit: usize,
    ) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn set_offset(
        mut self,
        offset: usize,
    ) -> Self {
        self.offset = offset;
        self
    }

    pub fn filters(&self) -> &Vec<(String, serde_json::Value)> {
        &self.filters
    }

    pub fn order_by(&self) -> &Vec<(String, bool)> {
        &self.order_by
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}
