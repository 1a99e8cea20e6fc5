//! Behavioural tests for the server bootstrap sequence.

use std::cell::RefCell;
use std::sync::Arc;

use abci_config::SocketEndpoint;
use abci_types::{Request, ResponseValue};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::{
    FailingConfigLoader, HealthEvent, RecordingApp, RecordingHealthReporter, TestConfigLoader,
    decode_responses, encode_requests,
};
use crate::bootstrap::{BootstrapError, ConfigLoader, Runtime, bootstrap_with};
use crate::server::{Server, ServerHandle};

/// Scenario world shared across bootstrap steps.
struct BootstrapWorld {
    loader: Box<dyn ConfigLoader>,
    reporter: Arc<RecordingHealthReporter>,
    outcome: Option<Result<Runtime, BootstrapError>>,
    serving: Option<(Server<RecordingApp>, ServerHandle)>,
}

impl BootstrapWorld {
    fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader::new()),
            reporter: Arc::new(RecordingHealthReporter::default()),
            outcome: None,
            serving: None,
        }
    }

    fn runtime(&self) -> Result<&Runtime, String> {
        match &self.outcome {
            Some(Ok(runtime)) => Ok(runtime),
            Some(Err(error)) => Err(format!("bootstrap failed: {error}")),
            None => Err(String::from("bootstrap has not run")),
        }
    }
}

impl Drop for BootstrapWorld {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.serving.take() {
            handle.shutdown();
            let _ = handle.join();
        }
    }
}

#[fixture]
fn world() -> RefCell<BootstrapWorld> {
    RefCell::new(BootstrapWorld::new())
}

#[given("a healthy configuration loader")]
fn given_healthy_loader(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().loader = Box::new(TestConfigLoader::new());
}

#[given("a failing configuration loader")]
fn given_failing_loader(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().loader = Box::new(FailingConfigLoader);
}

#[when("the server bootstrap runs")]
fn when_bootstrap_runs(world: &RefCell<BootstrapWorld>) {
    let mut world = world.borrow_mut();
    let outcome = bootstrap_with(&*world.loader, world.reporter.clone());
    world.outcome = Some(outcome);
}

#[when("the runtime serves the application")]
fn when_runtime_serves(world: &RefCell<BootstrapWorld>) -> Result<(), String> {
    let mut world = world.borrow_mut();
    let serving = world
        .runtime()?
        .serve(RecordingApp::new())
        .map_err(|error| error.to_string())?;
    world.serving = Some(serving);
    Ok(())
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<BootstrapWorld>) -> Result<(), String> {
    world.borrow().runtime().map(|_| ())
}

#[then("bootstrap fails")]
fn then_bootstrap_fails(world: &RefCell<BootstrapWorld>) -> Result<(), String> {
    match &world.borrow().outcome {
        Some(Err(BootstrapError::Configuration { .. })) => Ok(()),
        other => Err(format!(
            "expected a configuration failure, got {:?}",
            other.as_ref().map(|outcome| outcome.as_ref().map(|_| "runtime"))
        )),
    }
}

#[then("the reporter recorded bootstrap start")]
fn then_reporter_start(world: &RefCell<BootstrapWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapStarting),
        "bootstrap start event missing"
    );
}

#[then("the reporter recorded bootstrap success")]
fn then_reporter_success(world: &RefCell<BootstrapWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapSucceeded),
        "bootstrap success event missing"
    );
}

#[then("the reporter recorded bootstrap failure")]
fn then_reporter_failure(world: &RefCell<BootstrapWorld>) {
    let events = world.borrow().reporter.events();
    let failed = events
        .iter()
        .any(|event| matches!(event, HealthEvent::BootstrapFailed(_)));
    assert!(failed, "bootstrap failure event missing: {events:?}");
}

#[then("the reporter recorded a bound listener")]
fn then_reporter_bound(world: &RefCell<BootstrapWorld>) {
    let events = world.borrow().reporter.events();
    let bound = events
        .iter()
        .any(|event| matches!(event, HealthEvent::ListenerBound(_)));
    assert!(bound, "listener bound event missing: {events:?}");
}

#[then("the configured socket accepts a session")]
fn then_socket_accepts(world: &RefCell<BootstrapWorld>) -> Result<(), String> {
    let world = world.borrow();
    let request = encode_requests(&[Request::echo("bootstrapped")]);
    let bytes = match world.runtime()?.config().listen_socket() {
        #[cfg(unix)]
        SocketEndpoint::Unix { path } => {
            let stream = std::os::unix::net::UnixStream::connect(path.as_std_path())
                .map_err(|error| error.to_string())?;
            round_trip(stream, &request, |stream| {
                stream.shutdown(std::net::Shutdown::Write)
            })?
        }
        _ => {
            let (_, handle) = world
                .serving
                .as_ref()
                .ok_or_else(|| String::from("runtime is not serving"))?;
            let addr = handle
                .local_addrs()
                .first()
                .copied()
                .ok_or_else(|| String::from("no TCP address bound"))?;
            let stream = std::net::TcpStream::connect(addr).map_err(|error| error.to_string())?;
            round_trip(stream, &request, |stream| {
                stream.shutdown(std::net::Shutdown::Write)
            })?
        }
    };
    match decode_responses(&bytes).first().map(|response| &response.value) {
        Some(ResponseValue::Echo(echo)) if echo.message == "bootstrapped" => Ok(()),
        other => Err(format!("unexpected reply: {other:?}")),
    }
}

#[scenario(path = "tests/features/server_bootstrap.feature")]
fn server_bootstrap(world: RefCell<BootstrapWorld>) {
    let _ = world;
}

fn round_trip<S: std::io::Read + std::io::Write>(
    mut stream: S,
    request: &[u8],
    close_write: impl FnOnce(&S) -> std::io::Result<()>,
) -> Result<Vec<u8>, String> {
    stream
        .write_all(request)
        .map_err(|error| error.to_string())?;
    close_write(&stream).map_err(|error| error.to_string())?;
    let mut bytes = Vec::new();
    stream
        .read_to_end(&mut bytes)
        .map_err(|error| error.to_string())?;
    Ok(bytes)
}
