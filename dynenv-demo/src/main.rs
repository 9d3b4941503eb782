mod error;

use clap::Parser;
use dynenv::{Environment, Variable};
use dynenv_error::Error;
use error::{RequestAborted, RequestIdMismatch};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{process::ExitCode, time::Duration};
use tokio::time::sleep;
use ulid::Ulid;

#[derive(Parser)]
#[command(name = "dynenv-demo")]
#[command(about = "Runs concurrent simulated requests that each read back their own dynamically bound request id")]
struct Cli {
    /// Number of concurrent requests
    #[arg(short, long, default_value = "20")]
    requests: usize,

    /// Maximum simulated latency of a request (milliseconds)
    #[arg(long, default_value = "1000")]
    max_delay: u64,

    /// Number of runtime worker threads
    #[arg(short, long, default_value = "4")]
    workers: usize,

    /// Seed for the simulated latencies; random if omitted
    #[arg(long)]
    seed: Option<u64>,
}

/// Dynamic state shared by every request.
#[derive(Clone)]
struct Context {
    /// The id of the request being handled.
    request_id: Variable<Ulid>,

    /// Request metadata: `service` is fixed, `route` is rebound per request.
    meta: Environment<String>,
}

impl Context {
    fn new() -> Result<Self, Error> {
        Ok(Self {
            request_id: Variable::new(Ulid::nil()),
            meta: Environment::new([
                ("service", "dynenv-demo".to_string()),
                ("route", "/".to_string()),
            ])?,
        })
    }

    /// Reads the current request id and checks it against the one the request started with.
    fn expect_id(&self, expected: Ulid, layer: &'static str) -> Result<(), Error> {
        let found = self.request_id.get()?;
        if found == expected {
            Ok(())
        } else {
            Err(Error::new(RequestIdMismatch {
                expected: expected.to_string(),
                found: found.to_string(),
                layer,
            }))
        }
    }
}

/// Handles one request: binds a fresh request id and route, then runs the call chain under them.
async fn handle(ctx: Context, index: usize, delay: Duration) -> Result<(), Error> {
    let id = Ulid::new();
    let route = format!("/requests/{}", index);
    let inner = ctx.clone();

    let echoed = ctx.meta.set_async(("route", route), move || {
        let chain = inner.clone();
        inner.request_id.set_async(id, move || async move { authenticate(&chain, delay).await })
    })?.await?;

    if echoed != id {
        return Err(Error::new(RequestIdMismatch {
            expected: id.to_string(),
            found: echoed.to_string(),
            layer: "handler",
        }));
    }
    Ok(())
}

/// First layer: audits the request on a separate task, which inherits the bindings.
async fn authenticate(ctx: &Context, delay: Duration) -> Result<Ulid, Error> {
    let expected = ctx.request_id.get()?;
    dynenv::spawn(audit(ctx.clone(), expected))
        .await
        .map_err(|err| Error::new(RequestAborted {
            task: "audit task".to_string(),
            reason: err.to_string(),
        }))??;

    load(ctx, expected, delay).await
}

/// Runs on its own task, started with [`dynenv::spawn`] so that it sees the request's bindings.
async fn audit(ctx: Context, expected: Ulid) -> Result<(), Error> {
    log::debug!("audit: {} {}", ctx.meta.get("route")?, ctx.request_id.get()?);
    ctx.expect_id(expected, "audit task")
}

/// Second layer: waits out the simulated latency, yielding to every other request.
async fn load(ctx: &Context, expected: Ulid, delay: Duration) -> Result<Ulid, Error> {
    sleep(delay).await;
    ctx.expect_id(expected, "load")?;
    render(ctx).await
}

/// Innermost layer: reads the bindings back and logs them.
async fn render(ctx: &Context) -> Result<Ulid, Error> {
    tokio::task::yield_now().await;
    let id = ctx.request_id.get()?;
    log::info!(
        "{} {} answered request {}",
        ctx.meta.get("service")?,
        ctx.meta.get("route")?,
        id,
    );
    Ok(id)
}

/// Runs every request concurrently and returns the errors of the ones that failed.
async fn simulate(cli: &Cli, ctx: &Context) -> Vec<Error> {
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let handles = (0..cli.requests)
        .map(|index| {
            let delay = Duration::from_millis(rng.gen_range(0..=cli.max_delay));
            tokio::spawn(handle(ctx.clone(), index, delay))
        })
        .collect::<Vec<_>>();

    let mut errors = Vec::new();
    for (index, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(())) => (),
            Ok(Err(err)) => errors.push(err),
            Err(err) => errors.push(Error::new(RequestAborted {
                task: format!("request #{}", index),
                reason: err.to_string(),
            })),
        }
    }

    // every rebinding is gone once the requests are
    if let Err(err) = ctx.expect_id(Ulid::nil(), "main task") {
        errors.push(err);
    }
    errors
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cli.workers.max(1))
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("failed to start the runtime: {}", err);
            return ExitCode::FAILURE;
        },
    };

    let ctx = match Context::new() {
        Ok(ctx) => ctx,
        Err(err) => {
            report(&err);
            return ExitCode::FAILURE;
        },
    };

    let errors = runtime.block_on(simulate(&cli, &ctx));
    if errors.is_empty() {
        log::info!("all {} request(s) observed their own request id", cli.requests);
        return ExitCode::SUCCESS;
    }

    for err in &errors {
        report(err);
    }
    log::error!("{} of {} request(s) failed", errors.len(), cli.requests);
    ExitCode::FAILURE
}

fn report(err: &Error) {
    if let Err(io) = err.report_to_stderr("dynenv-demo") {
        log::error!("{} (could not render report: {})", err, io);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn requests_observe_their_own_id() {
        let cli = Cli { requests: 16, max_delay: 500, workers: 1, seed: Some(7) };
        let ctx = Context::new().unwrap();
        let errors = simulate(&cli, &ctx).await;
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn requests_observe_their_own_id_across_workers() {
        let cli = Cli { requests: 32, max_delay: 20, workers: 4, seed: Some(1) };
        let ctx = Context::new().unwrap();
        let errors = simulate(&cli, &ctx).await;
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn mismatch_is_reported() {
        let ctx = Context::new().unwrap();
        let err = ctx.request_id.set(Ulid::new(), || ctx.expect_id(Ulid::nil(), "test"))
            .unwrap_err();
        assert!(err.is::<RequestIdMismatch>());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["dynenv-demo"]);
        assert_eq!((cli.requests, cli.max_delay, cli.workers, cli.seed), (20, 1000, 4, None));
    }
}
