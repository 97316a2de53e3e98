//! Paginated scan input.
//!
//! Models a store that is read one page at a time with a continuation cursor
//! (a DynamoDB scan, a keyset-paginated query). The store itself sits behind
//! [`PageFetcher`]; this module owns the paging loop, the page-size and
//! page-count limits, and the hand-off into the pipe.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{Flow, Producer};
use crate::core::Decoder;
use crate::error::{GallonError, Result};
use crate::pipe::PipeWriter;
use crate::plugin::{
    InputPlugin, PluginTask, SharedObserver, Stage, TracingObserver, TransferStats,
};

const NAME: &str = "paged-input";

/// Request for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Cursor returned with the previous page; `None` for the first page.
    pub cursor: Option<String>,

    /// Maximum number of items the page may contain.
    pub limit: Option<u32>,
}

/// One page of raw items.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Vec<u8>>,

    /// Cursor for the following page; `None` when the scan is exhausted.
    pub next_cursor: Option<String>,
}

/// Access to a paginated store.
#[async_trait]
pub trait PageFetcher: Send + Sync + 'static {
    /// Verify the store is reachable before any page is requested.
    async fn check(&self) -> Result<()> {
        Ok(())
    }

    /// Fetch one page.
    async fn fetch(&self, request: PageRequest) -> Result<Page>;
}

/// Paging limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedInputConfig {
    /// Items requested per page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    /// Stop after this many pages even if the store has more.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_limit: Option<usize>,
}

/// Input that walks a [`PageFetcher`] page by page.
pub struct PagedInput<F: PageFetcher> {
    fetcher: Arc<F>,
    config: PagedInputConfig,
    decoder: Decoder,
    observer: SharedObserver,
}

impl<F: PageFetcher> PagedInput<F> {
    pub fn new(fetcher: F, config: PagedInputConfig, decoder: Decoder) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            config,
            decoder,
            observer: TracingObserver::shared(),
        }
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }
}

#[async_trait]
impl<F: PageFetcher> InputPlugin for PagedInput<F> {
    fn name(&self) -> &str {
        NAME
    }

    async fn connect(&self, cancel: CancellationToken, writer: PipeWriter) -> Result<PluginTask> {
        self.fetcher
            .check()
            .await
            .map_err(|e| GallonError::connect(NAME, e.to_string()))?;

        info!(
            "Scanning (page size: {:?}, page limit: {:?})",
            self.config.page_size, self.config.page_limit
        );

        let producer = Producer::new(
            NAME,
            writer,
            self.decoder.clone(),
            self.observer.clone(),
            cancel,
        );
        Ok(PluginTask::spawn(
            NAME,
            produce_pages(self.fetcher.clone(), self.config.clone(), producer),
        ))
    }
}

async fn produce_pages<F: PageFetcher>(
    fetcher: Arc<F>,
    config: PagedInputConfig,
    mut producer: Producer,
) -> TransferStats {
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    let completed = 'pages: loop {
        if config.page_limit.is_some_and(|limit| pages >= limit) {
            debug!("{}: page limit {} reached", NAME, pages);
            break true;
        }

        let request = PageRequest {
            cursor: cursor.take(),
            limit: config.page_size,
        };
        let page = tokio::select! {
            biased;
            _ = producer.cancel().cancelled() => break false,
            page = fetcher.fetch(request) => page,
        };
        let page = match page {
            Ok(page) => page,
            Err(e) => {
                producer.fail(Stage::Fetch, &e);
                break false;
            }
        };
        pages += 1;
        debug!("{}: page {} with {} items", NAME, pages, page.items.len());

        for item in &page.items {
            if producer.push(item).await == Flow::Stop {
                break 'pages false;
            }
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break true,
        }
    };

    producer.finish(completed)
}
