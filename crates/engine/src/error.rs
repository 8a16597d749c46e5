//! Engine error types

use thiserror::Error;

/// Errors surfaced by storage engine primitives
///
/// All of these are operational: the controller logs them and continues
/// (conservatively where a space reading is involved). None abort a run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine binary could not be spawned at all
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine command ran and exited nonzero
    #[error("{program} {args} failed with status {status}: {stderr}")]
    Command {
        program: String,
        args: String,
        status: i32,
        stderr: String,
    },

    /// Engine output did not match the expected shape
    #[error("unparsable {what}: {input:?}")]
    Parse {
        what: &'static str,
        input: String,
    },
}
