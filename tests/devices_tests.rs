use daqpipe::core::{sample_stream, ChannelList, Edge, Sample, Value};
use daqpipe::devices::{Device, Lm335, SpikeWheel, TimeInterval, WheelKinematics};
use daqpipe::engine::Pipeline;
use daqpipe::error::{BuildError, StageError};
use daqpipe::source::{spawn_source, ReplaySource};

fn analog(channels: &[&str], rows: &[&[f64]]) -> ReplaySource {
    let samples = rows
        .iter()
        .enumerate()
        .map(|(i, row)| Sample::numeric(i as f64, row))
        .collect();
    ReplaySource::new(ChannelList::new(channels.iter().copied()).unwrap(), samples)
}

fn approx(value: Value, expected: f64) -> bool {
    value.as_f64().is_some_and(|v| (v - expected).abs() < 1e-9)
}

#[tokio::test]
async fn test_spike_wheel_end_to_end() {
    let wheel = SpikeWheel::default();
    let ds = wheel.step_distance();
    let signal: Vec<[f64; 1]> = [0.0, 0.0, 5.0, 5.0, 0.0, 0.0, 5.0, 5.0, 0.0]
        .iter()
        .map(|v| [*v])
        .collect();
    let rows: Vec<&[f64]> = signal.iter().map(|r| r.as_slice()).collect();
    let (source, input) = spawn_source(analog(&["AIN0"], &rows));

    let mut pipeline = Pipeline::new();
    let output = wheel.attach(&mut pipeline, input).unwrap();
    assert_eq!(output.channels().names(), &["s", "v", "a"]);
    assert_eq!(pipeline.stage_names(), vec!["schmitt-0", "edges-0", "kinematics-0"]);
    assert_eq!(output.producer(), "kinematics-0");

    pipeline.start().unwrap();
    let samples = output.collect().await;
    source.wait().await.unwrap();
    pipeline.join().await.unwrap();

    // edges at t = 2, 4, 6, 8
    let times: Vec<f64> = samples.iter().map(|s| s.timestamp).collect();
    assert_eq!(times, vec![2.0, 4.0, 6.0, 8.0]);
    assert_eq!(samples[0].values, vec![Value::Numeric(0.0), Value::Null, Value::Null]);
    assert!(approx(samples[1].values[1], ds / 2.0));
    assert!(approx(samples[2].values[0], 2.0 * ds));
    assert!(approx(samples[2].values[1], ds / 2.0));
    assert!(approx(samples[2].values[2], 0.0));
    assert!(approx(samples[3].values[0], 3.0 * ds));
}

#[tokio::test]
async fn test_spike_wheel_needs_one_channel() {
    let (_writer, reader) = sample_stream("daq", ChannelList::new(["AIN0", "AIN1"]).unwrap());
    let mut pipeline = Pipeline::new();
    let err = SpikeWheel::default().attach(&mut pipeline, reader).err().unwrap();
    assert_eq!(
        err,
        BuildError::ChannelCount {
            stage: "SpikeWheel",
            expected: 1,
            found: 2
        }
    );
    assert!(pipeline.is_empty());
}

#[tokio::test]
async fn test_zero_interval_is_skipped() {
    let edge = |t: f64| Sample::new(t, vec![Value::Edge(Edge::Rise)]);
    let data = vec![edge(0.0), edge(1.0), edge(1.0), edge(2.0)];
    let (source, input) = spawn_source(ReplaySource::new(ChannelList::single("DIN0"), data));

    let mut pipeline = Pipeline::new();
    let faults = pipeline.faults();
    let output = pipeline.add(input, WheelKinematics::new(0.1)).unwrap();
    pipeline.start().unwrap();
    let samples = output.collect().await;
    source.wait().await.unwrap();
    pipeline.join().await.unwrap();

    let times: Vec<f64> = samples.iter().map(|s| s.timestamp).collect();
    assert_eq!(times, vec![0.0, 1.0, 2.0]);
    assert!(approx(samples[2].values[0], 0.2));
    assert!(approx(samples[2].values[1], 0.1));

    let fault = faults.try_recv().unwrap();
    assert_eq!(fault.error, StageError::ZeroInterval { timestamp: 1.0 });
}

#[tokio::test]
async fn test_time_interval_with_inverted_channel() {
    let rows: [&[f64]; 4] = [&[0.0, 5.0], &[5.0, 0.0], &[5.0, 0.0], &[0.0, 5.0]];
    let (source, input) = spawn_source(analog(&["gate0", "gate1"], &rows));

    let device = TimeInterval {
        active_high: true,
        invert: Some(vec![false, true]),
    };
    let mut pipeline = Pipeline::new();
    let output = device.attach(&mut pipeline, input).unwrap();
    assert_eq!(
        pipeline.stage_names(),
        vec!["schmitt-0", "splitter-0", "inverter-0", "merger-0", "edges-0", "interval-0"]
    );
    assert_eq!(output.channels().names(), &["gate0", "gate1"]);

    pipeline.start().unwrap();
    let samples = output.collect().await;
    source.wait().await.unwrap();
    pipeline.join().await.unwrap();

    assert_eq!(samples, vec![Sample::numeric(3.0, &[2.0, 2.0])]);
}

#[tokio::test]
async fn test_time_interval_rejects_invert_length() {
    let (_writer, reader) = sample_stream("daq", ChannelList::new(["gate0", "gate1"]).unwrap());
    let device = TimeInterval {
        active_high: false,
        invert: Some(vec![true]),
    };
    let err = device.attach(&mut Pipeline::new(), reader).err().unwrap();
    assert!(matches!(err, BuildError::InvalidParameter { stage: "TimeInterval", .. }));
}

#[tokio::test]
async fn test_lm335_converts_every_channel() {
    let rows: [&[f64]; 2] = [&[1.5, 1.49], &[1.4915, 1.5]];
    let (source, input) = spawn_source(analog(&["T1", "T2"], &rows));

    let mut pipeline = Pipeline::new();
    let output = Lm335::default().attach(&mut pipeline, input).unwrap();
    pipeline.start().unwrap();
    let samples = output.collect().await;
    source.wait().await.unwrap();
    pipeline.join().await.unwrap();

    assert_eq!(samples.len(), 2);
    assert!(approx(samples[0].values[0], 26.85));
    assert!(approx(samples[0].values[1], 24.85));
    assert!(approx(samples[1].values[0], 25.15));
}
