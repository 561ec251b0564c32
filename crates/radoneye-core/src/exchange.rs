//! Request/response exchanges over notification channels.
//!
//! An exchange subscribes to one channel, writes its commands, then feeds
//! every arriving frame to an [`Aggregator`] until the aggregator reports
//! completion or the deadline passes. The subscription is released on every
//! path; a [`SubscriptionGuard`] covers the exchange future being dropped.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};
use uuid::Uuid;

use radoneye_types::{DeviceStatus, HistoryPage, HistoryReading};

use crate::codec::{FrameCodec, FrameSet, HistoryPlan, tagged};
use crate::commands::Command;
use crate::error::{Error, Result};
use crate::guard::SubscriptionGuard;
use crate::transport::{FrameCallback, Transport};
use crate::util::HexDump;

/// Tracing target for raw frame dumps.
pub const FRAME_TARGET: &str = "radoneye::frames";

/// Outcome of feeding one frame to an aggregator.
#[derive(Debug, PartialEq)]
pub(crate) enum Step<T> {
    Pending,
    Complete(T),
}

/// Completion logic for one exchange shape.
pub(crate) trait Aggregator: Send {
    type Output: Send;

    /// Consume one frame.
    fn accept(&mut self, frame: &[u8]) -> Result<Step<Self::Output>>;

    /// End of an open grace window, if any.
    fn grace_deadline(&self) -> Option<Instant> {
        None
    }

    /// Finish with what has arrived once the grace window is over.
    fn settle(&mut self) -> Option<Self::Output> {
        None
    }

    /// Error to report instead of a plain timeout when the deadline passes.
    fn expire(&mut self) -> Option<Error> {
        None
    }
}

// --- Aggregators ---

/// Collects a fixed set of frames keyed by preamble.
#[derive(Debug)]
pub(crate) struct FrameSetAggregator {
    required: Vec<u8>,
    optional: Vec<u8>,
    grace: Duration,
    grace_until: Option<Instant>,
    frames: FrameSet,
    done: bool,
}

impl FrameSetAggregator {
    pub(crate) fn new(required: Vec<u8>, optional: Vec<u8>, grace: Duration) -> Self {
        Self {
            required,
            optional,
            grace,
            grace_until: None,
            frames: FrameSet::new(),
            done: false,
        }
    }

    fn has_all(&self, tags: &[u8]) -> bool {
        tags.iter().all(|tag| self.frames.contains_key(tag))
    }

    fn finish(&mut self) -> FrameSet {
        self.done = true;
        self.grace_until = None;
        std::mem::take(&mut self.frames)
    }
}

impl Aggregator for FrameSetAggregator {
    type Output = FrameSet;

    fn accept(&mut self, frame: &[u8]) -> Result<Step<FrameSet>> {
        if self.done {
            return Ok(Step::Pending);
        }
        let Some(&tag) = frame.first() else {
            return Ok(Step::Pending);
        };
        if !self.required.contains(&tag) && !self.optional.contains(&tag) {
            debug!("Ignoring unexpected frame 0x{:02X}", tag);
            return Ok(Step::Pending);
        }

        self.frames.insert(tag, frame.to_vec());

        if !self.has_all(&self.required) {
            return Ok(Step::Pending);
        }
        if self.has_all(&self.optional) {
            return Ok(Step::Complete(self.finish()));
        }
        if self.grace_until.is_none() {
            debug!("Required frames complete, waiting {:?} for optional frames", self.grace);
            self.grace_until = Some(Instant::now() + self.grace);
        }
        Ok(Step::Pending)
    }

    fn grace_deadline(&self) -> Option<Instant> {
        self.grace_until
    }

    fn settle(&mut self) -> Option<FrameSet> {
        if self.done || self.grace_until.is_none() {
            return None;
        }
        Some(self.finish())
    }
}

/// Collects numbered history pages and merges them in page order.
///
/// Pages may arrive in any order. Each page is checked against the ones
/// already buffered: a repeated page number or a different page count fails
/// at once. Once the final page (`page_no == page_count`) has been seen, the
/// set is complete as soon as all of `1..=page_count` are present. A gap
/// that is still open at the deadline is reported by [`Aggregator::expire`]
/// as a history integrity error.
#[derive(Debug)]
pub(crate) struct PageSetAggregator {
    codec: Arc<dyn FrameCodec>,
    page_tag: u8,
    pages: Vec<HistoryPage>,
    seen_last: bool,
}

impl PageSetAggregator {
    pub(crate) fn new(codec: Arc<dyn FrameCodec>, page_tag: u8) -> Self {
        Self {
            codec,
            page_tag,
            pages: Vec::new(),
            seen_last: false,
        }
    }

    fn check(&self, page: &HistoryPage) -> Result<()> {
        if page.page_no == 0 || page.page_no > page.page_count {
            return Err(Error::integrity(format!(
                "page number {} outside 1..={}",
                page.page_no, page.page_count
            )));
        }
        if let Some(first) = self.pages.first()
            && first.page_count != page.page_count
        {
            return Err(Error::integrity(format!(
                "page {} declares {} pages, expected {}",
                page.page_no, page.page_count, first.page_count
            )));
        }
        if self.pages.iter().any(|p| p.page_no == page.page_no) {
            return Err(Error::integrity(format!("duplicate page {}", page.page_no)));
        }
        Ok(())
    }

    fn missing(&self) -> Vec<u8> {
        let Some(first) = self.pages.first() else {
            return Vec::new();
        };
        (1..=first.page_count)
            .filter(|no| !self.pages.iter().any(|p| p.page_no == *no))
            .collect()
    }

    fn merge(&mut self) -> HistoryReading {
        let mut pages = std::mem::take(&mut self.pages);
        pages.sort_by_key(|p| p.page_no);

        let converter = self.codec.converter();
        let values = pages
            .iter()
            .flat_map(|p| p.values.iter())
            .map(|&raw| converter.from_bq_m3(f64::from(raw)))
            .collect();
        HistoryReading::new(values)
    }
}

impl Aggregator for PageSetAggregator {
    type Output = HistoryReading;

    fn accept(&mut self, frame: &[u8]) -> Result<Step<HistoryReading>> {
        if frame.first() != Some(&self.page_tag) {
            debug!(
                "Ignoring non-page frame 0x{:02X}",
                frame.first().copied().unwrap_or_default()
            );
            return Ok(Step::Pending);
        }

        let page = self.codec.decode_history_page(frame)?;
        if page.page_count == 0 {
            return Ok(Step::Complete(HistoryReading::empty()));
        }
        self.check(&page)?;

        debug!(
            "History page {}/{} ({} values)",
            page.page_no,
            page.page_count,
            page.values.len()
        );
        let page_count = usize::from(page.page_count);
        self.seen_last |= page.page_no == page.page_count;
        self.pages.push(page);

        // Numbers are distinct and within 1..=page_count, so a full buffer is the full set.
        if self.seen_last && self.pages.len() == page_count {
            Ok(Step::Complete(self.merge()))
        } else {
            Ok(Step::Pending)
        }
    }

    fn expire(&mut self) -> Option<Error> {
        if !self.seen_last {
            return None;
        }
        let missing = self
            .missing()
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Some(Error::integrity(format!("missing page {missing}")))
    }
}

/// Accumulates a raw byte stream of a declared sample count.
#[derive(Debug)]
pub(crate) struct ByteRunAggregator {
    codec: Arc<dyn FrameCodec>,
    count: u16,
    buffer: BytesMut,
}

impl ByteRunAggregator {
    pub(crate) fn new(codec: Arc<dyn FrameCodec>, count: u16) -> Self {
        Self {
            codec,
            count,
            buffer: BytesMut::with_capacity(usize::from(count) * 2),
        }
    }
}

impl Aggregator for ByteRunAggregator {
    type Output = HistoryReading;

    fn accept(&mut self, frame: &[u8]) -> Result<Step<HistoryReading>> {
        self.buffer.extend_from_slice(frame);
        if self.buffer.len() < usize::from(self.count) * 2 {
            return Ok(Step::Pending);
        }
        self.codec
            .decode_history_blob(&self.buffer, self.count)
            .map(Step::Complete)
    }
}

// --- Driving ---

/// An exchange waiting for its frames.
pub(crate) struct PendingExchange<A: Aggregator> {
    operation: &'static str,
    aggregator: A,
    frames: mpsc::UnboundedReceiver<Vec<u8>>,
    deadline: Instant,
    budget: Duration,
}

impl<A: Aggregator> PendingExchange<A> {
    /// Feed frames to the aggregator until it completes or time runs out.
    pub(crate) async fn drive(mut self) -> Result<A::Output> {
        loop {
            let wake = self
                .aggregator
                .grace_deadline()
                .map_or(self.deadline, |grace| grace.min(self.deadline));

            match timeout_at(wake, self.frames.recv()).await {
                Ok(Some(frame)) => {
                    if let Step::Complete(output) = self.aggregator.accept(&frame)? {
                        return Ok(output);
                    }
                }
                Ok(None) => return Err(Error::SubscriptionClosed(self.operation.to_string())),
                Err(_) => {
                    if let Some(output) = self.aggregator.settle() {
                        return Ok(output);
                    }
                    if wake >= self.deadline {
                        return Err(self
                            .aggregator
                            .expire()
                            .unwrap_or_else(|| Error::timeout(self.operation, self.budget)));
                    }
                }
            }
        }
    }
}

/// What one exchange listens to and writes.
struct Request<'a> {
    operation: &'static str,
    listen: Uuid,
    write_to: Uuid,
    commands: &'a [Command],
    deadline: Instant,
    budget: Duration,
}

/// Runs exchanges over a shared transport.
pub(crate) struct ExchangeEngine<T: Transport + ?Sized + 'static> {
    transport: Arc<T>,
}

impl<T: Transport + ?Sized + 'static> ExchangeEngine<T> {
    pub(crate) fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Read a status snapshot.
    pub(crate) async fn status(
        &self,
        codec: &dyn FrameCodec,
        grace: Duration,
        timeout: Duration,
    ) -> Result<DeviceStatus> {
        let plan = codec.status_plan();
        let channels = codec.channels();
        let request = Request {
            operation: "status",
            listen: channels.status,
            write_to: channels.command,
            commands: &plan.commands,
            deadline: Instant::now() + timeout,
            budget: timeout,
        };
        let frames = self
            .run(request, FrameSetAggregator::new(plan.required, plan.optional, grace))
            .await?;
        codec.decode_status(&frames)
    }

    /// Read the stored history.
    ///
    /// Paged history is bounded by `history_timeout`. The V1 metadata frame
    /// is a single short reply and is bounded by `status_timeout`; the raw
    /// stream that follows gets its own `history_timeout`.
    pub(crate) async fn history(
        &self,
        codec: Arc<dyn FrameCodec>,
        status_timeout: Duration,
        history_timeout: Duration,
    ) -> Result<HistoryReading> {
        let channels = codec.channels();

        match codec.history_plan() {
            HistoryPlan::Paged { request, page_tag } => {
                let request = Request {
                    operation: "history",
                    listen: channels.history,
                    write_to: channels.command,
                    commands: std::slice::from_ref(&request),
                    deadline: Instant::now() + history_timeout,
                    budget: history_timeout,
                };
                self.run(request, PageSetAggregator::new(codec, page_tag))
                    .await
            }
            HistoryPlan::TwoPhase {
                metadata_request,
                metadata_tag,
                data_request,
            } => {
                let metadata = Request {
                    operation: "history metadata",
                    listen: channels.status,
                    write_to: channels.command,
                    commands: std::slice::from_ref(&metadata_request),
                    deadline: Instant::now() + status_timeout,
                    budget: status_timeout,
                };
                let frames = self
                    .run(
                        metadata,
                        FrameSetAggregator::new(vec![metadata_tag], Vec::new(), Duration::ZERO),
                    )
                    .await?;
                let count = codec.decode_history_count(tagged(&frames, metadata_tag)?)?;
                debug!("Device reports {} history samples", count);
                if count == 0 {
                    return Ok(HistoryReading::empty());
                }

                let data = Request {
                    operation: "history",
                    listen: channels.history,
                    write_to: channels.command,
                    commands: std::slice::from_ref(&data_request),
                    deadline: Instant::now() + history_timeout,
                    budget: history_timeout,
                };
                self.run(data, ByteRunAggregator::new(codec, count)).await
            }
        }
    }

    /// Write a command that gets no reply, then wait for the device to apply it.
    pub(crate) async fn send(
        &self,
        operation: &'static str,
        channel: Uuid,
        command: &Command,
        settle: Duration,
    ) -> Result<()> {
        let bytes = command.to_bytes();
        debug!(target: FRAME_TARGET, "-> {} ({})\n   {}", channel, operation, HexDump(&bytes));
        self.transport.write(channel, &bytes).await?;
        tokio::time::sleep(settle).await;
        Ok(())
    }

    async fn run<A: Aggregator>(&self, request: Request<'_>, aggregator: A) -> Result<A::Output> {
        let (tx, rx) = mpsc::unbounded_channel();
        let listen = request.listen;
        let on_frame: FrameCallback = Box::new(move |frame: &[u8]| {
            debug!(target: FRAME_TARGET, "<- {}\n   {}", listen, HexDump(frame));
            // The receiver is gone once the exchange has finished.
            let _ = tx.send(frame.to_vec());
        });

        let handle = self.transport.subscribe(request.listen, on_frame).await?;
        let guard = SubscriptionGuard::new(Arc::clone(&self.transport), handle);
        debug!("Exchange '{}' subscribed as {}", request.operation, handle);

        let pending = PendingExchange {
            operation: request.operation,
            aggregator,
            frames: rx,
            deadline: request.deadline,
            budget: request.budget,
        };
        let outcome = async {
            for command in request.commands {
                let bytes = command.to_bytes();
                debug!(target: FRAME_TARGET, "-> {}\n   {}", request.write_to, HexDump(&bytes));
                self.transport.write(request.write_to, &bytes).await?;
            }
            pending.drive().await
        }
        .await;

        match (outcome, guard.release().await) {
            (outcome, Ok(())) => outcome,
            (Ok(output), Err(e)) => {
                warn!("Failed to release subscription after '{}': {}", request.operation, e);
                Ok(output)
            }
            (Err(e), Err(release)) => {
                warn!("Failed to release subscription after '{}': {}", request.operation, release);
                Err(e)
            }
        }
    }
}
