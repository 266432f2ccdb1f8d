//! Page extraction from dump files.
//!
//! The pipeline only depends on the [`PageSource`] trait; [`XmlPageSource`]
//! reads MediaWiki XML dumps, optionally bzip2-compressed.

use crate::error::{PipelineError, Result};
use crate::page::{Page, PageBuilder};
use bzip2::read::MultiBzDecoder;
use chrono::{DateTime, Utc};
use log::warn;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const READ_BUFFER_SIZE: usize = 8192 * 24;

/// Turns a decoded byte stream into pages.
pub trait PageSource: Send + Sync {
    /// Calls `on_page` once per well-formed page, in document order.
    ///
    /// Malformed pages are skipped silently. An error returned by `on_page`
    /// stops the read and is propagated.
    fn read_pages(
        &self,
        input: &mut dyn BufRead,
        on_page: &mut dyn FnMut(Page) -> Result<()>,
    ) -> Result<()>;
}

/// Opens `path` for reading, decompressing `.bz2` files on the fly
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|source| PipelineError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    let file = BufReader::with_capacity(READ_BUFFER_SIZE, file);

    let compressed = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("bz2"));
    if compressed {
        Ok(Box::new(BufReader::with_capacity(
            READ_BUFFER_SIZE,
            MultiBzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(file))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Timestamp,
    Text,
}

/// Reads `<page>` elements of a MediaWiki dump.
///
/// A page needs a `<title>`, a `<timestamp>` in RFC 3339 form and a
/// `<text bytes="N">`; the last revision of a page wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlPageSource;

impl XmlPageSource {
    pub fn new() -> Self {
        Self
    }
}

fn declared_size(element: &BytesStart<'_>) -> Option<u64> {
    let attribute = element.try_get_attribute("bytes").ok()??;
    std::str::from_utf8(&attribute.value).ok()?.trim().parse().ok()
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Per-document state while walking the event stream
#[derive(Default)]
struct PageState {
    builder: Option<PageBuilder>,
    field: Option<Field>,
    value: String,
}

impl PageState {
    fn start_field(&mut self, field: Field) {
        self.field = Some(field);
        self.value.clear();
    }

    fn discard(&mut self) {
        self.builder = None;
        self.field = None;
    }

    fn finish_field(&mut self, field: Field) {
        if self.field != Some(field) {
            return;
        }
        self.field = None;
        let value = std::mem::take(&mut self.value);
        let builder = match self.builder.as_mut() {
            Some(builder) => builder,
            None => return,
        };
        match field {
            Field::Title => {
                builder.title(value);
            }
            Field::Text => {
                builder.body(value);
            }
            Field::Timestamp => match parse_timestamp(&value) {
                Some(ts) => {
                    builder.timestamp(ts);
                }
                None => self.discard(),
            },
        }
    }

    fn start_text(&mut self, element: &BytesStart<'_>) {
        match declared_size(element) {
            Some(size) => {
                if let Some(builder) = self.builder.as_mut() {
                    builder.byte_size(size);
                }
                self.start_field(Field::Text);
            }
            None => self.discard(),
        }
    }
}

impl PageSource for XmlPageSource {
    fn read_pages(
        &self,
        input: &mut dyn BufRead,
        on_page: &mut dyn FnMut(Page) -> Result<()>,
    ) -> Result<()> {
        let mut reader = Reader::from_reader(input);
        let mut buf = Vec::new();
        let mut state = PageState::default();

        loop {
            let event = match reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(e) => {
                    warn!(
                        "stopped decoding at byte {}: {}",
                        reader.buffer_position(),
                        e
                    );
                    return Ok(());
                }
            };

            match event {
                Event::Start(element) => match element.name().as_ref() {
                    b"page" => state.builder = Some(PageBuilder::new()),
                    b"title" => state.start_field(Field::Title),
                    b"timestamp" => state.start_field(Field::Timestamp),
                    b"text" => state.start_text(&element),
                    _ => {}
                },
                Event::Empty(element) => {
                    if element.name().as_ref() == b"text" {
                        state.start_text(&element);
                        state.finish_field(Field::Text);
                    }
                }
                Event::Text(text) => {
                    if state.field.is_some() {
                        match text.unescape() {
                            Ok(value) => state.value.push_str(&value),
                            Err(_) => state.discard(),
                        }
                    }
                }
                Event::CData(data) => {
                    if state.field.is_some() {
                        state.value.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::End(element) => match element.name().as_ref() {
                    b"title" => state.finish_field(Field::Title),
                    b"timestamp" => state.finish_field(Field::Timestamp),
                    b"text" => state.finish_field(Field::Text),
                    b"page" => {
                        state.field = None;
                        if let Some(page) = state.builder.take().and_then(PageBuilder::build) {
                            on_page(page)?;
                        }
                    }
                    _ => {}
                },
                Event::Eof => return Ok(()),
                _ => {}
            }
            buf.clear();
        }
    }
}
