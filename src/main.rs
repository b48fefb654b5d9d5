use anyhow::Context;
use daqpipe::config::PipelineConfig;
use daqpipe::engine::Pipeline;
use daqpipe::sink::SampleLog;
use daqpipe::source::{spawn_source, WaveformSource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,daqpipe=debug")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Either a config file given on the command line or the built-in wheel chain.
    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::from_file(&path)?,
        None => PipelineConfig::from_json(serde_json::json!({
            "fault_policy": "skip_sample",
            "stages": [
                { "type": "OutlierBuster", "threshold": 2.0 },
                { "type": "SpikeWheel", "spikes": 20, "diameter_mm": 25.0 }
            ]
        }))?,
    };

    // A wheel passing the barrier at 4 spikes per second, sampled at 1 kHz.
    let source = WaveformSource::light_barrier(4.0, 1000.0, 3000).with_name("barrier");
    let (source, input) = spawn_source(source);

    let (mut pipeline, output) = Pipeline::from_config(&config, input).context("building pipeline")?;
    tracing::info!(stages = ?pipeline.stage_names(), "pipeline built");

    let faults = pipeline.faults();
    pipeline.start()?;
    let sink = SampleLog::new("wheel").every(4).spawn(output);

    source.wait().await?;
    pipeline.join().await?;
    let received = sink.await?;

    for fault in faults.try_iter() {
        tracing::warn!(stage = %fault.stage, error = %fault.error, "fault reported");
    }
    tracing::info!(samples = received, "measurement complete");
    println!("{}", pipeline.monitor().generate_report());

    Ok(())
}
