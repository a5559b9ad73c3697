#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use batchwire_core::{EncodedItem, FeatureSpec, FeatureSpecSet, FeatureType, Record};
use batchwire_runtime::{
    BatchPayload, BatchResponse, DeploymentSpecs, RowOutcome, Transport, TransportError,
};
use serde_json::{json, Value as Json};
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// How the fake endpoint answers a batch. Unless stated otherwise every row
/// gets `output = 2 * input`.
#[derive(Clone, Debug, Default)]
pub enum Behavior {
    #[default]
    Double,
    /// Fails the whole batch whose first input equals the value.
    FailBatchStartingAt(f64),
    /// Refuses the rows carrying one of these inputs.
    RejectInputs(Vec<i64>),
    /// Answers the row with a value of the wrong wire type.
    GarbleInput(f64),
    /// Answers one row fewer than it was sent.
    DropLastRow,
    /// Never answers.
    Hang,
}

/// Fake endpoint that records every batch it receives.
#[derive(Debug, Default)]
pub struct Recorder {
    behavior: Behavior,
    delay: Duration,
    batches: Mutex<Vec<Vec<f64>>>,
    sent_at: Mutex<Vec<Instant>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Recorder {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            ..Self::default()
        })
    }

    pub fn with_delay(behavior: Behavior, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            delay,
            ..Self::default()
        })
    }

    pub fn batches(&self) -> Vec<Vec<f64>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches().iter().map(Vec::len).collect()
    }

    /// When each batch reached the endpoint, in call order.
    pub fn sent_at(&self) -> Vec<Instant> {
        self.sent_at.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

fn input_of(row: &EncodedItem) -> f64 {
    row.get("input").and_then(Json::as_f64).unwrap_or(f64::NAN)
}

fn doubled(x: f64) -> RowOutcome {
    let mut out = EncodedItem::default();
    out.insert("output", json!(2.0 * x));
    RowOutcome::Ok(out)
}

#[async_trait]
impl Transport for Recorder {
    async fn send(&self, payload: BatchPayload) -> Result<BatchResponse, TransportError> {
        let inputs: Vec<f64> = payload.rows.iter().map(input_of).collect();
        self.batches.lock().unwrap().push(inputs.clone());
        self.sent_at.lock().unwrap().push(Instant::now());

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if matches!(self.behavior, Behavior::Hang) {
            std::future::pending::<()>().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let mut rows: Vec<RowOutcome> = inputs.iter().copied().map(doubled).collect();
        match &self.behavior {
            Behavior::FailBatchStartingAt(first) if inputs.first() == Some(first) => {
                return Err(TransportError::Network("connection reset".into()));
            }
            Behavior::RejectInputs(rejected) => {
                for (row, x) in rows.iter_mut().zip(&inputs) {
                    if rejected.contains(&(*x as i64)) {
                        *row = RowOutcome::Failed {
                            code: "INVALID_INPUT".into(),
                            message: format!("cannot score {x}"),
                        };
                    }
                }
            }
            Behavior::GarbleInput(bad) => {
                for (row, x) in rows.iter_mut().zip(&inputs) {
                    if x == bad {
                        let mut out = EncodedItem::default();
                        out.insert("output", json!("not a number"));
                        *row = RowOutcome::Ok(out);
                    }
                }
            }
            Behavior::DropLastRow => {
                rows.pop();
            }
            _ => {}
        }
        Ok(BatchResponse { rows })
    }
}

pub fn numeric_specs() -> DeploymentSpecs {
    let scalar = |name: &str| FeatureSpec::new(name, FeatureType::Numeric, [1]).unwrap();
    DeploymentSpecs {
        inputs: FeatureSpecSet::new(vec![scalar("input")]).unwrap(),
        outputs: FeatureSpecSet::new(vec![scalar("output")]).unwrap(),
    }
}

pub fn input_record(x: i32) -> Record {
    Record::new().with("input", x)
}

pub fn input_records(n: i32) -> Vec<Record> {
    (0..n).map(input_record).collect()
}

pub fn input_item(x: i32) -> EncodedItem {
    let mut item = EncodedItem::default();
    item.insert("input", json!(f64::from(x)));
    item
}

pub fn output_of(record: &Record) -> f64 {
    record
        .get("output")
        .and_then(|v| v.as_number())
        .unwrap_or(f64::NAN)
}

/// Inputs that reached the endpoint, without regard to batching.
pub fn seen_inputs(recorder: &Recorder) -> HashSet<i64> {
    recorder
        .batches()
        .into_iter()
        .flatten()
        .map(|x| x as i64)
        .collect()
}
