use std::collections::VecDeque;
use std::sync::Arc;

use batchwire_core::{decode_record, encode_record, EncodingError, FeatureSpecSet, Record};
use futures::stream::{self, Stream};

use crate::{BatchScheduler, PredictionError, ResultHandle};

/// Pull-based predictions over a fixed list of records, in input order.
///
/// Each pull keeps up to `window` records beyond the current one submitted,
/// so their round trips overlap with the consumer's work. Nothing is
/// submitted before the first pull. Once exhausted the sequence stays
/// exhausted.
///
/// `next` is cancel-safe: dropping its future before it completes leaves the
/// current item in place for the next call.
pub struct LazyPredictionSequence {
    scheduler: Arc<BatchScheduler>,
    inputs: Arc<FeatureSpecSet>,
    outputs: Arc<FeatureSpecSet>,
    window: usize,
    total: usize,
    position: usize,
    unsubmitted: std::vec::IntoIter<Record>,
    ahead: VecDeque<Result<ResultHandle, EncodingError>>,
}

impl LazyPredictionSequence {
    pub(crate) fn new(
        scheduler: Arc<BatchScheduler>,
        inputs: Arc<FeatureSpecSet>,
        outputs: Arc<FeatureSpecSet>,
        records: Vec<Record>,
        window: usize,
    ) -> Self {
        Self {
            scheduler,
            inputs,
            outputs,
            window,
            total: records.len(),
            position: 0,
            unsubmitted: records.into_iter(),
            ahead: VecDeque::with_capacity(window + 1),
        }
    }

    /// Waits for the next result. Only this call suspends.
    pub async fn next(&mut self) -> Option<Result<Record, PredictionError>> {
        if self.position >= self.total {
            return None;
        }
        self.top_up();

        let result = match self.ahead.front_mut()? {
            Err(e) => Err(PredictionError::Encoding(e.clone())),
            Ok(handle) => {
                if !self.scheduler.is_dispatched(handle.id()) {
                    self.scheduler.flush();
                }
                match handle.await {
                    Ok(row) => decode_record(&row, &self.outputs).map_err(PredictionError::from),
                    Err(e) => Err(e),
                }
            }
        };

        self.ahead.pop_front();
        self.position += 1;
        Some(result)
    }

    /// Submits records up to `window` past the current position.
    fn top_up(&mut self) {
        let target = (self.position + 1 + self.window).min(self.total);
        while self.submitted() < target {
            let Some(record) = self.unsubmitted.next() else {
                break;
            };
            let slot = encode_record(&record, &self.inputs).map(|item| self.scheduler.submit(item));
            self.ahead.push_back(slot);
        }
    }

    /// Records handed to the scheduler so far, including ones that failed to
    /// encode.
    pub fn submitted(&self) -> usize {
        self.total - self.unsubmitted.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn remaining(&self) -> usize {
        self.total - self.position
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Record, PredictionError>> {
        stream::unfold(self, |mut seq| async move {
            let item = seq.next().await?;
            Some((item, seq))
        })
    }
}
