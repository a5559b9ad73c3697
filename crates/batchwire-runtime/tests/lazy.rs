mod common;

use std::time::Duration;

use anyhow::Result;
use batchwire_core::{EncodingError, Record};
use batchwire_runtime::{Deployment, PredictionError, SchedulerConfig};
use common::{init_tracing, input_records, numeric_specs, output_of, Behavior, Recorder};
use futures::StreamExt;

fn deployment(recorder: &std::sync::Arc<Recorder>, window: usize) -> Result<Deployment> {
    init_tracing();
    let config = SchedulerConfig::default().with_look_ahead_window(window);
    Ok(Deployment::new("doubler", numeric_specs(), recorder.clone(), config)?)
}

#[tokio::test(start_paused = true)]
async fn nothing_is_sent_before_the_first_pull() -> Result<()> {
    let recorder = Recorder::new(Behavior::Double);
    let deployment = deployment(&recorder, 4)?;

    let seq = deployment.predict_lazy(input_records(20));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(recorder.calls(), 0);
    assert_eq!(seq.submitted(), 0);
    assert_eq!(seq.len(), 20);
    assert_eq!(seq.remaining(), 20);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn pulls_keep_a_window_of_items_ahead_and_preserve_order() -> Result<()> {
    let recorder = Recorder::new(Behavior::Double);
    let deployment = deployment(&recorder, 4)?;
    let mut seq = deployment.predict_lazy(input_records(20));

    let first = seq.next().await.expect("first item")?;
    assert_eq!(output_of(&first), 0.0);
    assert_eq!(seq.submitted(), 5);
    assert_eq!(seq.position(), 1);
    assert_eq!(recorder.batches(), vec![vec![0.0, 1.0, 2.0, 3.0, 4.0]]);

    let mut outputs = vec![output_of(&first)];
    while let Some(item) = seq.next().await {
        outputs.push(output_of(&item?));
        assert!(seq.submitted() <= (seq.position() + 4).min(20));
    }
    let expected: Vec<f64> = (0..20).map(|x| 2.0 * f64::from(x)).collect();
    assert_eq!(outputs, expected);
    assert_eq!(common::seen_inputs(&recorder).len(), 20);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn an_exhausted_sequence_stays_exhausted() -> Result<()> {
    let recorder = Recorder::new(Behavior::Double);
    let deployment = deployment(&recorder, 2)?;
    let mut seq = deployment.predict_lazy(input_records(3));

    for _ in 0..3 {
        assert!(seq.next().await.is_some());
    }
    assert!(seq.next().await.is_none());
    assert!(seq.next().await.is_none());
    assert_eq!(seq.remaining(), 0);

    let mut empty = deployment.predict_lazy(Vec::new());
    assert!(empty.is_empty());
    assert!(empty.next().await.is_none());
    assert_eq!(recorder.calls(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn an_invalid_record_fails_only_its_own_position() -> Result<()> {
    let recorder = Recorder::new(Behavior::Double);
    let deployment = deployment(&recorder, 4)?;

    let mut records = input_records(6);
    records[3] = Record::new().with("unrelated", 1.0);
    let mut seq = deployment.predict_lazy(records);

    let mut results = Vec::new();
    while let Some(item) = seq.next().await {
        results.push(item);
    }

    assert_eq!(results.len(), 6);
    for (x, result) in results.iter().enumerate() {
        if x == 3 {
            assert_eq!(
                result,
                &Err(PredictionError::Encoding(EncodingError::MissingFeature {
                    feature: "input".into()
                }))
            );
        } else {
            assert_eq!(result.as_ref().map(output_of), Ok(2.0 * x as f64));
        }
    }
    assert!(!common::seen_inputs(&recorder).contains(&3));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn a_garbled_response_row_is_isolated() -> Result<()> {
    let recorder = Recorder::new(Behavior::GarbleInput(2.0));
    let deployment = deployment(&recorder, 4)?;
    let mut seq = deployment.predict_lazy(input_records(5));

    let mut results = Vec::new();
    while let Some(item) = seq.next().await {
        results.push(item);
    }

    assert!(matches!(results[2], Err(PredictionError::Decoding(_))));
    for x in [0, 1, 3, 4] {
        assert_eq!(results[x].as_ref().map(output_of), Ok(2.0 * x as f64));
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn the_sequence_can_be_consumed_as_a_stream() -> Result<()> {
    let recorder = Recorder::new(Behavior::Double);
    let deployment = deployment(&recorder, 3)?;

    let outputs: Vec<f64> = deployment
        .predict_lazy(input_records(10))
        .into_stream()
        .map(|item| item.map(|r| output_of(&r)))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<_, _>>()?;

    let expected: Vec<f64> = (0..10).map(|x| 2.0 * f64::from(x)).collect();
    assert_eq!(outputs, expected);
    Ok(())
}
