use daqpipe::core::{ChannelList, Liveness, Sample};
use daqpipe::source::{spawn_source, ReplaySource, Waveform, WaveformSource};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_replay_delivers_everything_then_finishes() {
    let data: Vec<Sample> = (0..5).map(|i| Sample::numeric(i as f64, &[i as f64])).collect();
    let (handle, reader) = spawn_source(ReplaySource::new(ChannelList::single("AIN0"), data.clone()).with_name("daq"));

    assert_eq!(reader.producer(), "daq");
    assert_eq!(handle.name(), "daq");
    assert_eq!(reader.collect().await, data);
    assert_ok!(handle.wait().await);
}

#[tokio::test]
async fn test_replay_wrong_arity_fails_and_finishes_stream() {
    let data = vec![Sample::numeric(0.0, &[1.0]), Sample::numeric(1.0, &[1.0, 2.0])];
    let (handle, mut reader) = spawn_source(ReplaySource::new(ChannelList::single("AIN0"), data));

    assert!(reader.recv().await.is_some());
    assert!(reader.recv().await.is_none());
    assert_eq!(reader.liveness(), Liveness::Finished);

    let err = assert_err!(handle.wait().await);
    assert!(format!("{err:#}").contains("replay row 1"));
}

#[tokio::test]
async fn test_paced_source_stops_on_request() {
    let data: Vec<Sample> = (0..1000).map(|i| Sample::numeric(i as f64, &[0.0])).collect();
    let source = ReplaySource::new(ChannelList::single("AIN0"), data).with_pacing(Duration::from_millis(5));
    let (handle, mut reader) = spawn_source(source);

    assert!(reader.recv().await.is_some());
    assert_ok!(handle.stop().await);

    reader.finished().await;
    let rest = reader.collect().await;
    assert!(rest.len() < 999);
}

#[tokio::test]
async fn test_waveform_light_barrier() {
    let source = WaveformSource::light_barrier(10.0, 100.0, 20).with_channel("barrier");
    let (handle, reader) = spawn_source(source);
    assert_eq!(reader.channels().names(), &["barrier"]);

    let samples = reader.collect().await;
    assert_ok!(handle.wait().await);

    assert_eq!(samples.len(), 20);
    assert_eq!(samples[0].values[0].as_f64(), Some(5.0));
    assert_eq!(samples[7].values[0].as_f64(), Some(0.0));
    assert!((samples[19].timestamp - 0.19).abs() < 1e-12);
}

#[tokio::test]
async fn test_waveform_rejects_bad_rate() {
    let sine = Waveform::Sine {
        offset: 0.0,
        amplitude: 1.0,
    };
    let (handle, reader) = spawn_source(WaveformSource::new(sine, 1.0, 0.0, 10));
    assert!(reader.collect().await.is_empty());
    assert_err!(handle.wait().await);
}
