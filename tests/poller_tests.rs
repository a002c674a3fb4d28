//! Integration tests for the long-running-operation poller

use azureai::{
    poll_operation, wait_all, ClientError, OperationErrorType, OperationHandle, OperationState,
    PollConfig, Poller,
};
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

type Script = Arc<Mutex<VecDeque<Result<OperationState<String>, ClientError>>>>;

fn scripted(states: Vec<Result<OperationState<String>, ClientError>>) -> Script {
    Arc::new(Mutex::new(VecDeque::from(states)))
}

/// Probe that replays a script, then reports `Running` forever
fn probe(
    script: Script,
    calls: Arc<Mutex<u32>>,
) -> impl FnMut() -> BoxFuture<'static, Result<OperationState<String>, ClientError>> {
    move || {
        let script = script.clone();
        let calls = calls.clone();
        Box::pin(async move {
            *calls.lock().unwrap() += 1;
            script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(OperationState::Running))
        })
    }
}

fn quick_config() -> PollConfig {
    PollConfig {
        initial_delay: Duration::from_millis(20),
        interval: Duration::from_millis(10),
        max_attempts: 10,
        transient_retries: 2,
    }
}

fn operation_kind(err: &ClientError) -> OperationErrorType {
    match err {
        ClientError::Operation(op) => op.error_type,
        other => panic!("expected operation error, got {}", other),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[tokio::test(start_paused = true)]
async fn test_checks_never_outpace_interval() {
    init_tracing();
    let config = PollConfig {
        initial_delay: Duration::from_secs(2),
        interval: Duration::from_secs(1),
        max_attempts: 10,
        transient_retries: 0,
    };
    let script = scripted(vec![
        Ok(OperationState::Running),
        Ok(OperationState::Running),
        Ok(OperationState::Succeeded("done".to_string())),
    ]);
    let times: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
    let start = Instant::now();

    let result = poll_operation(&config, || {
        let script = script.clone();
        let times = times.clone();
        async move {
            times.lock().unwrap().push(Instant::now());
            script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(OperationState::Running))
        }
    })
    .await
    .unwrap();

    assert_eq!(result, "done");
    let times = times.lock().unwrap();
    assert_eq!(times.len(), 3);
    assert!(times[0] - start >= config.initial_delay);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= config.interval);
    }
}

#[tokio::test(start_paused = true)]
async fn test_success_after_three_checks() {
    init_tracing();
    let calls = Arc::new(Mutex::new(0u32));
    let script = scripted(vec![
        Ok(OperationState::Running),
        Ok(OperationState::Running),
        Ok(OperationState::Succeeded("result R".to_string())),
    ]);

    let result = poll_operation(&quick_config(), probe(script, calls.clone()))
        .await
        .unwrap();

    assert_eq!(result, "result R");
    assert_eq!(*calls.lock().unwrap(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_performs_exactly_max_attempts_checks() {
    init_tracing();
    let calls = Arc::new(Mutex::new(0u32));
    let config = PollConfig {
        max_attempts: 5,
        ..quick_config()
    };

    // Empty script: the probe reports Running forever.
    let err = poll_operation(&config, probe(scripted(vec![]), calls.clone()))
        .await
        .unwrap_err();

    assert_eq!(operation_kind(&err), OperationErrorType::TimedOut);
    assert_eq!(*calls.lock().unwrap(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_immediate_failure_is_terminal_after_one_check() {
    init_tracing();
    let calls = Arc::new(Mutex::new(0u32));
    let script = scripted(vec![Ok(OperationState::Failed(Some(
        "InvalidImageURL: the image is unreachable".to_string(),
    )))]);

    let err = poll_operation(&quick_config(), probe(script, calls.clone()))
        .await
        .unwrap_err();

    assert_eq!(operation_kind(&err), OperationErrorType::Failed);
    assert!(err.to_string().contains("InvalidImageURL"));
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_operation_is_terminal() {
    init_tracing();
    let calls = Arc::new(Mutex::new(0u32));
    let script = scripted(vec![
        Ok(OperationState::Running),
        Ok(OperationState::Cancelled(None)),
    ]);

    let err = poll_operation(&quick_config(), probe(script, calls.clone()))
        .await
        .unwrap_err();

    assert_eq!(operation_kind(&err), OperationErrorType::Cancelled);
    assert_eq!(*calls.lock().unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transient_errors_are_transparent_to_the_caller() {
    init_tracing();
    let calls = Arc::new(Mutex::new(0u32));
    let script = scripted(vec![
        Err(ClientError::timeout("status check timed out")),
        Err(ClientError::timeout("status check timed out again")),
        Ok(OperationState::Succeeded("recovered".to_string())),
    ]);

    let result = poll_operation(&quick_config(), probe(script, calls.clone()))
        .await
        .unwrap();

    assert_eq!(result, "recovered");
    assert_eq!(*calls.lock().unwrap(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_transient_budget_exhaustion_surfaces_polling_error() {
    init_tracing();
    let config = PollConfig {
        transient_retries: 1,
        ..quick_config()
    };
    let calls = Arc::new(Mutex::new(0u32));
    let script = scripted(vec![
        Err(ClientError::timeout("check 1 timed out")),
        Err(ClientError::timeout("check 2 timed out")),
    ]);

    let err = poll_operation(&config, probe(script, calls.clone()))
        .await
        .unwrap_err();

    assert_eq!(operation_kind(&err), OperationErrorType::Polling);
    assert_eq!(*calls.lock().unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_non_transient_probe_error_propagates_unchanged() {
    init_tracing();
    let calls = Arc::new(Mutex::new(0u32));
    let script = scripted(vec![Err(ClientError::config("bad endpoint", None))]);

    let err = poll_operation(&quick_config(), probe(script, calls.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Configuration(_)));
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_polls_are_independent() {
    init_tracing();
    let config = quick_config();
    let calls_a = Arc::new(Mutex::new(0u32));
    let calls_b = Arc::new(Mutex::new(0u32));
    let script_a = scripted(vec![
        Ok(OperationState::Running),
        Ok(OperationState::Running),
        Ok(OperationState::Succeeded("alpha".to_string())),
    ]);
    let script_b = scripted(vec![Ok(OperationState::Succeeded("beta".to_string()))]);

    let pollers = vec![
        Poller::new(
            OperationHandle::new("https://svc/operations/a"),
            config.clone(),
            probe(script_a, calls_a.clone()),
        ),
        Poller::new(
            OperationHandle::new("https://svc/operations/b"),
            config.clone(),
            probe(script_b, calls_b.clone()),
        ),
    ];

    let results = wait_all(pollers).await;
    assert_eq!(results.len(), 2);
    for (handle, result) in results {
        match handle.as_str() {
            "https://svc/operations/a" => assert_eq!(result.unwrap(), "alpha"),
            "https://svc/operations/b" => assert_eq!(result.unwrap(), "beta"),
            other => panic!("unexpected handle {}", other),
        }
    }
    assert_eq!(*calls_a.lock().unwrap(), 3);
    assert_eq!(*calls_b.lock().unwrap(), 1);
}
