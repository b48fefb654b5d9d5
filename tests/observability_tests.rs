use daqpipe::observability::{MetricsCollector, PipelineMonitor, StageMetrics, StageReport};
use std::sync::Arc;

#[test]
fn test_metrics_counters() {
    let metrics = StageMetrics::new("schmitt-0");
    assert_eq!(metrics.stage(), "schmitt-0");
    assert_eq!(metrics.samples_in(), 0);

    metrics.record_sample_in();
    metrics.record_sample_in();
    metrics.record_samples_out(3);
    metrics.record_fault();

    assert_eq!(metrics.samples_in(), 2);
    assert_eq!(metrics.samples_out(), 3);
    assert_eq!(metrics.faults(), 1);
}

#[tokio::test]
async fn test_latency_tracking() {
    let metrics = StageMetrics::new("schmitt-0");
    assert_eq!(metrics.avg_latency_ns(), 0);

    let start = metrics.start_processing();
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    metrics.finish_processing(start);

    assert!(metrics.avg_latency_ns() >= 5_000_000);
}

#[test]
fn test_collector_snapshot() {
    let mut collector = MetricsCollector::new();
    let a = Arc::new(StageMetrics::new("edges-0"));
    let b = Arc::new(StageMetrics::new("kinematics-0"));
    a.record_sample_in();
    a.record_sample_in();
    b.record_sample_in();

    collector.register(a);
    collector.register(b);

    let snapshot = collector.snapshot();
    assert_eq!(collector.len(), 2);
    assert_eq!(snapshot["edges-0"].samples_in, 2);
    assert_eq!(snapshot["kinematics-0"].samples_in, 1);
}

fn report(kind: &'static str, state: &'static str, metrics: &StageMetrics) -> StageReport {
    StageReport {
        kind,
        state,
        metrics: metrics.snapshot(),
    }
}

#[test]
fn test_monitor_keeps_pipeline_order() {
    let schmitt = StageMetrics::new("schmitt-0");
    let edges = StageMetrics::new("edges-0");
    let kinematics = StageMetrics::new("kinematics-0");
    kinematics.record_sample_in();
    kinematics.record_fault();

    let monitor = PipelineMonitor::new(vec![
        report("schmitt", "Stopped", &schmitt),
        report("edges", "Stopped", &edges),
        report("kinematics", "Failed", &kinematics),
    ]);
    let report = monitor.generate_report();
    let rows: Vec<&str> = report.lines().skip(1).take(3).collect();

    assert!(rows[0].starts_with("schmitt-0"));
    assert!(rows[1].starts_with("edges-0"));
    assert!(rows[2].starts_with("kinematics-0"));
    assert!(rows[2].contains("Failed"));
    assert!(report.ends_with("1 fault(s) in kinematics-0"));
    assert_eq!(monitor.faulty().count(), 1);
}

#[test]
fn test_clean_run_reports_no_faults() {
    let merger = StageMetrics::new("merger-0");
    merger.record_sample_in();
    merger.record_samples_out(1);

    let report = PipelineMonitor::new(vec![report("merger", "Stopped", &merger)]).generate_report();
    assert!(report.lines().next().unwrap().starts_with("stage"));
    assert!(report.ends_with("no faults"));
}

#[test]
fn test_empty_report() {
    let report = PipelineMonitor::default().generate_report();
    assert_eq!(report, "pipeline has no stages");
}
