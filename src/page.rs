use chrono::{DateTime, Datelike, Utc};

/// A single document extracted from a dump.
///
/// Pages are produced once by a [`PageSource`](crate::source::PageSource),
/// handed through the work queue and dropped by the aggregator that consumed
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    title: String,
    timestamp: DateTime<Utc>,
    body: String,
    byte_size: u64,
}

impl Page {
    pub fn new(
        title: impl Into<String>,
        timestamp: DateTime<Utc>,
        body: impl Into<String>,
        byte_size: u64,
    ) -> Self {
        Self {
            title: title.into(),
            timestamp,
            body: body.into(),
            byte_size,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn year(&self) -> i32 {
        self.timestamp.year()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Size of the body as declared by the dump, not `body().len()`
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }
}

/// Collects the fields of a page while an adapter walks a document.
///
/// A page is only emitted when every field was seen; anything else is a
/// malformed document and gets dropped.
#[derive(Debug, Default)]
pub struct PageBuilder {
    title: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    body: Option<String>,
    byte_size: Option<u64>,
}

impl PageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&mut self, title: String) -> &mut Self {
        self.title = Some(title);
        self
    }

    pub fn timestamp(&mut self, timestamp: DateTime<Utc>) -> &mut Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn body(&mut self, body: String) -> &mut Self {
        self.body = Some(body);
        self
    }

    pub fn byte_size(&mut self, byte_size: u64) -> &mut Self {
        self.byte_size = Some(byte_size);
        self
    }

    /// Returns the page, or `None` if a required field is missing
    pub fn build(self) -> Option<Page> {
        Some(Page {
            title: self.title?,
            timestamp: self.timestamp?,
            body: self.body?,
            byte_size: self.byte_size?,
        })
    }
}
