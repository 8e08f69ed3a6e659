// tests/retry_scheduler.rs

use std::error::Error;
use std::time::Duration;

use tokio::time::{Instant, sleep};

use keepalive::engine::drive;
use keepalive::exec::Scope;
use keepalive::output::Sink;
use keepalive_test_utils::builders::TaskBuilder;
use keepalive_test_utils::fake_runner::FakeRunner;
use keepalive_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(start_paused = true)]
async fn negative_interval_runs_exactly_once_without_sleeping() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new().with_run_time(Duration::from_millis(30));
    let task = TaskBuilder::new("job").once().build();
    let scope = Scope::new();

    let start = Instant::now();
    let runs = with_timeout(drive(&task, &runner, &scope)).await?;

    assert_eq!(runs, 1);
    assert_eq!(runner.start_count(), 1);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(30) && elapsed < Duration::from_millis(40));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn consecutive_starts_are_spaced_by_the_interval() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new().with_run_time(Duration::from_millis(200));
    let task = TaskBuilder::new("job").name("job").interval(0.5).build();
    let scope = Scope::new();

    let handle = {
        let runner = runner.clone();
        let scope = scope.clone();
        tokio::spawn(async move { drive(&task, &runner, &scope).await })
    };

    sleep(Duration::from_secs(3)).await;
    scope.cancel();
    with_timeout(handle).await??;

    let starts = runner.starts_of("job");
    assert!(starts.len() >= 4, "only {} runs", starts.len());
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(500));
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn delay_postpones_the_first_start() -> TestResult {
    let runner = FakeRunner::new();
    let task = TaskBuilder::new("job").delay(1.5).once().build();
    let scope = Scope::new();

    let start = Instant::now();
    with_timeout(drive(&task, &runner, &scope)).await?;

    let starts = runner.starts();
    assert_eq!(starts.len(), 1);
    assert!(starts[0].1 - start >= Duration::from_millis(1500));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancelling_mid_interval_stops_without_another_start() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new();
    let task = TaskBuilder::new("job").interval(10.0).build();
    let scope = Scope::new();

    let handle = {
        let runner = runner.clone();
        let scope = scope.clone();
        tokio::spawn(async move { drive(&task, &runner, &scope).await })
    };

    sleep(Duration::from_millis(100)).await;
    assert_eq!(runner.start_count(), 1);

    let cancelled_at = Instant::now();
    scope.cancel();
    let runs = with_timeout(handle).await??;

    assert_eq!(runs, 1);
    assert_eq!(runner.start_count(), 1);
    assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancelling_during_delay_never_starts() -> TestResult {
    let runner = FakeRunner::new();
    let task = TaskBuilder::new("job").delay(5.0).interval(1.0).build();
    let scope = Scope::new();
    scope.cancel();

    let runs = with_timeout(drive(&task, &runner, &scope)).await?;
    assert_eq!(runs, 0);
    assert_eq!(runner.start_count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn every_failed_run_is_reported_to_the_error_sink() -> TestResult {
    let (err_sink, errors) = Sink::memory();
    let runner = FakeRunner::new().failing();
    let task = TaskBuilder::new("flaky")
        .name("flaky")
        .format("[{{name}}] %s\n")
        .interval(1.0)
        .err(err_sink)
        .build();
    let scope = Scope::new();

    let handle = {
        let runner = runner.clone();
        let scope = scope.clone();
        tokio::spawn(async move { drive(&task, &runner, &scope).await })
    };

    // Runs at 0s, 1s, 2s.
    sleep(Duration::from_millis(2500)).await;
    scope.cancel();
    with_timeout(handle).await??;

    assert_eq!(runner.start_count(), 3);
    assert_eq!(
        errors.emissions(),
        vec!["[flaky] simulated failure of flaky\n"; 3]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn broken_template_fails_before_any_run() -> TestResult {
    let runner = FakeRunner::new();
    let task = TaskBuilder::new("job").format("{{ .Bogus }}").once().build();

    let result = drive(&task, &runner, &Scope::new()).await;
    assert!(matches!(result, Err(keepalive::errors::KeepaliveError::Template(_))));
    assert_eq!(runner.start_count(), 0);
    Ok(())
}
