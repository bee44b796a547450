//! Statement and row types exchanged with the recorder backends

/// A literal bound to a positional placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Integer(i64),
}

/// Parameterized query text plus the fixed width of the rows it yields
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    text: String,
    params: Vec<SqlParam>,
    column_count: usize,
}

impl SqlStatement {
    pub fn new(column_count: usize) -> Self {
        Self {
            text: String::new(),
            params: Vec::new(),
            column_count,
        }
    }

    /// Append a clause, separated from the previous one by a single space
    pub fn push_clause(&mut self, clause: &str) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(clause);
    }

    pub fn push_param(&mut self, param: SqlParam) {
        self.params.push(param);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }
}

/// One column value as returned by a backend
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl RawValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Integer(_) => "integer",
            RawValue::Real(_) => "real",
            RawValue::Text(_) => "text",
        }
    }
}

/// Fixed-position sequence of column values
pub type RawRow = Vec<RawValue>;
