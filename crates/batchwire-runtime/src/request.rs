use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use batchwire_core::EncodedItem;
use tokio::sync::oneshot;

use crate::PredictionError;

pub type ItemResult = Result<EncodedItem, PredictionError>;

/// One queued item. The slot is consumed when written, so each request
/// resolves at most once.
#[derive(Debug)]
pub struct PendingRequest {
    pub id: u64,
    pub item: EncodedItem,
    pub(crate) slot: oneshot::Sender<ItemResult>,
}

/// Caller side of a submitted item; await it for the encoded outputs.
///
/// Resolves to [`PredictionError::SchedulerClosed`] if the scheduler drops the
/// item without answering it.
#[derive(Debug)]
pub struct ResultHandle {
    id: u64,
    rx: oneshot::Receiver<ItemResult>,
}

impl ResultHandle {
    pub(crate) fn new(id: u64, rx: oneshot::Receiver<ItemResult>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Future for ResultHandle {
    type Output = ItemResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or_else(|_| Err(PredictionError::SchedulerClosed)))
    }
}
