/// Whether any statements are waiting for the next batch flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Empty,
    NonEmpty,
}

/// SQL queued through the proxy since the last clear or flush, in insertion
/// order. Duplicates are kept: every occurrence is reported at flush time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingBatch {
    statements: Vec<String>,
}

impl PendingBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sql: impl Into<String>) {
        self.statements.push(sql.into());
    }

    pub fn clear(&mut self) {
        self.statements.clear();
    }

    /// Hand back the queued statements, leaving the batch empty.
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.statements)
    }

    #[must_use]
    pub fn state(&self) -> BatchState {
        if self.statements.is_empty() {
            BatchState::Empty
        } else {
            BatchState::NonEmpty
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.statements
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.statements.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
