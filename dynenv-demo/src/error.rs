use dynenv_attrs::ErrorKind;
use dynenv_error::ErrorKind;

/// A request read back a request id other than the one it was started with.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("request `{}` observed request id `{}` in {}", self.expected, self.found, self.layer),
    help = "a rebinding leaked between concurrently running requests",
)]
pub struct RequestIdMismatch {
    /// The id the request was started with.
    pub expected: String,

    /// The id that was read back.
    pub found: String,

    /// The layer of the call chain that read it.
    pub layer: &'static str,
}

/// A simulated request task did not run to completion.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("{} did not complete: {}", self.task, self.reason),
)]
pub struct RequestAborted {
    /// Which task failed, e.g. `request #3` or `audit task`.
    pub task: String,

    /// Why the task stopped, as reported by the runtime (a panic or a cancellation).
    pub reason: String,
}
