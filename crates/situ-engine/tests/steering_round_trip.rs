//! Steering values out to a backend and back into simulation scalars.

use situ_engine::{AdaptorConfig, AdaptorError, BackendCall, CycleOrchestrator};
use situ_graph::Value;
use situ_marshal::{EntryRegistry, SteeringError};
use situ_test_utils::{
    init_tracing, proxy_script_dir, EchoBackend, FailingBackend, RecordingBackend,
};

fn steer_config(script_dir: &std::path::Path) -> AdaptorConfig {
    AdaptorConfig {
        script_dir: script_dir.to_path_buf(),
        steer: true,
        ..AdaptorConfig::default()
    }
}

#[test]
fn echoed_value_is_written_back() {
    init_tracing();
    let dir = proxy_script_dir();
    let mut alpha = 3.5f64;
    let mut vis = EntryRegistry::new();
    let mut steer = EntryRegistry::new();
    steer.add_scalar("alpha", &mut alpha);

    let mut orch = CycleOrchestrator::new(steer_config(dir.path()), EchoBackend::new());
    orch.initialize(&mut vis, &mut steer).unwrap();
    let m = orch.execute(0, 0.0, 0, &mut vis, &mut steer).unwrap();
    assert_eq!(m.steering_pulled, 1);
    assert_eq!(m.channels, 1);
    drop(steer);
    assert_eq!(alpha, 3.5);
    assert!(dir.path().join("proxies/proxy_alpha.xml").exists());
}

#[test]
fn backend_updates_reach_every_scalar_type() {
    let dir = proxy_script_dir();
    let mut gain = 2.0f64;
    let mut rate = 0.5f32;
    let mut steps = 10i32;
    let mut stride = 4u32;
    let mut vis = EntryRegistry::new();
    let mut steer = EntryRegistry::new();
    steer.add_scalar("gain", &mut gain);
    steer.add_scalar("rate", &mut rate);
    steer.add_scalar("steps", &mut steps);
    steer.add_scalar("stride", &mut stride);

    let doubling = EchoBackend::with_transform(|_, v| Value::F64(v.to_f64().unwrap_or(0.0) * 2.0));
    let mut orch = CycleOrchestrator::new(steer_config(dir.path()), doubling);
    orch.initialize(&mut vis, &mut steer).unwrap();
    for cycle in 0..2 {
        let m = orch.execute(cycle, 0.0, 0, &mut vis, &mut steer).unwrap();
        assert_eq!(m.steering_pulled, 4);
    }
    drop(steer);
    assert_eq!(gain, 8.0);
    assert_eq!(rate, 2.0);
    assert_eq!(steps, 40);
    assert_eq!(stride, 16);
}

#[test]
fn steer_channels_listed_in_pipeline_args() {
    let dir = proxy_script_dir();
    let mut alpha = 1.0f64;
    let mut vis = EntryRegistry::new();
    let mut steer = EntryRegistry::new();
    steer.add_scalar("alpha", &mut alpha);
    let mut orch = CycleOrchestrator::new(steer_config(dir.path()), RecordingBackend::new());
    orch.initialize(&mut vis, &mut steer).unwrap();

    let cfg = orch.backend().config.as_ref().unwrap();
    let args: Vec<&str> = cfg["insitu"]["scripts"]["pipeline"]["args"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a.as_str())
        .collect();
    let at = args.iter().position(|a| *a == "--steer").unwrap();
    assert_eq!(args[at + 1], "ON");
    assert_eq!(args.last(), Some(&"alpha"));
    assert!(cfg["insitu"]["proxies"]["proxy_alpha"]["filename"].is_string());
}

#[test]
fn non_numeric_result_is_an_error() {
    let dir = proxy_script_dir();
    let mut alpha = 1.0f64;
    let mut vis = EntryRegistry::new();
    let mut steer = EntryRegistry::new();
    steer.add_scalar("alpha", &mut alpha);
    let backend = RecordingBackend::new().responding("alpha", "fast");
    let mut orch = CycleOrchestrator::new(steer_config(dir.path()), backend);
    orch.initialize(&mut vis, &mut steer).unwrap();

    let err = orch.execute(0, 0.0, 0, &mut vis, &mut steer).unwrap_err();
    assert!(matches!(
        err,
        AdaptorError::Steering(SteeringError::UnsupportedSteeringType { found: "string", .. })
    ));
    assert!(orch.buffers().is_empty());
    assert_eq!(orch.cycles(), 1);
    drop(steer);
    assert_eq!(alpha, 1.0);
}

#[test]
fn failed_fetch_skips_pull() {
    let dir = proxy_script_dir();
    let mut alpha = 1.0f64;
    let mut vis = EntryRegistry::new();
    let mut steer = EntryRegistry::new();
    steer.add_scalar("alpha", &mut alpha);
    let mut orch = CycleOrchestrator::new(
        steer_config(dir.path()),
        FailingBackend::on(BackendCall::FetchResults),
    );
    orch.initialize(&mut vis, &mut steer).unwrap();
    let m = orch.execute(0, 0.0, 0, &mut vis, &mut steer).unwrap();
    assert!(m.backend_ok);
    assert_eq!(m.steering_pulled, 0);
    assert!(orch.backend().calls.contains(&BackendCall::FetchResults));
}

#[test]
fn steering_off_never_fetches() {
    let dir = proxy_script_dir();
    let mut alpha = 1.0f64;
    let mut vis = EntryRegistry::new();
    let mut steer = EntryRegistry::new();
    steer.add_scalar("alpha", &mut alpha);
    let config = AdaptorConfig {
        steer: false,
        ..steer_config(dir.path())
    };
    let mut orch = CycleOrchestrator::new(config, FailingBackend::on(BackendCall::FetchResults));
    orch.initialize(&mut vis, &mut steer).unwrap();
    let m = orch.execute(0, 0.0, 0, &mut vis, &mut steer).unwrap();
    assert_eq!(m.channels, 0);
    assert!(!orch.backend().calls.contains(&BackendCall::FetchResults));
    assert!(!dir.path().join("proxies/proxy_alpha.xml").exists());
}
