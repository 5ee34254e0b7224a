//! PostgREST query parameters

use std::fmt;

/// Comparison operator of a row filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    Is,
}

impl Filter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::Eq => "eq",
            Filter::Neq => "neq",
            Filter::Gt => "gt",
            Filter::Gte => "gte",
            Filter::Lt => "lt",
            Filter::Lte => "lte",
            Filter::Like => "like",
            Filter::ILike => "ilike",
            Filter::Is => "is",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Select query against one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    columns: Option<String>,
    filters: Vec<(String, Filter, String)>,
    order: Vec<(String, Order)>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns to return, in PostgREST `select` syntax
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    pub fn filter(mut self, column: impl Into<String>, op: Filter, value: impl ToString) -> Self {
        self.filters.push((column.into(), op, value.to_string()));
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, Filter::Eq, value)
    }

    pub fn order(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Query-string pairs in the order PostgREST expects them
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 4);
        pairs.push((
            "select".to_string(),
            self.columns.clone().unwrap_or_else(|| "*".to_string()),
        ));

        for (column, op, value) in &self.filters {
            pairs.push((column.clone(), format!("{}.{}", op, value)));
        }

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, order)| match order {
                    Order::Asc => format!("{}.asc", column),
                    Order::Desc => format!("{}.desc", column),
                })
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }

        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }

        pairs
    }
}
