//! The lazy hit sequence handed to callers.

use crate::backend::{Backend, HttpBackend};
use crate::cursor::{CursorState, Paginator};
use crate::query::SearchQuery;
use crate::schema::Hit;
use crate::{Config, Result};

/// Forward-only iterator over every hit of a scan, in ascending time order.
///
/// At most one page is held at a time; the next page is only requested once
/// the current one has been fully consumed. A failure is yielded once as
/// `Some(Err(_))`, after which the iterator is finished. Dropping the stream
/// stops the scan; the point-in-time is left to expire on the server.
pub struct HitStream<B: Backend> {
    paginator: Paginator<B>,
    page: std::vec::IntoIter<Hit>,
}

impl<B: Backend> HitStream<B> {
    pub fn new(paginator: Paginator<B>) -> Self {
        Self {
            paginator,
            page: Vec::new().into_iter(),
        }
    }

    pub fn state(&self) -> CursorState {
        self.paginator.state()
    }

    /// Hits of the current page not yet yielded.
    pub fn buffered(&self) -> usize {
        self.page.len()
    }
}

impl<B: Backend> Iterator for HitStream<B> {
    type Item = Result<Hit>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(hit) = self.page.next() {
                return Some(Ok(hit));
            }

            match self.paginator.next_page() {
                Ok(Some(hits)) => self.page = hits.into_iter(),
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<B: Backend> std::iter::FusedIterator for HitStream<B> {}

/// Start a scan of `config.index` on `backend`.
///
/// Configuration problems are reported here, before anything is sent.
pub fn scan<B: Backend>(backend: B, config: &Config, query: &SearchQuery) -> Result<HitStream<B>> {
    let paginator = Paginator::new(backend, config, query)?;
    Ok(HitStream::new(paginator))
}

/// Start a scan against the HTTP server named in `config.host`.
pub fn scan_host(config: &Config, query: &SearchQuery) -> Result<HitStream<HttpBackend>> {
    config.validate()?;
    let backend = HttpBackend::from_config(config)?;
    scan(backend, config, query)
}
