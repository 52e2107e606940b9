use std::fmt;

/// Progress of one request through the engine.
///
/// `Received -> Validated -> Resolved -> Rendered -> Done`, with `Failed`
/// reachable from any stage. The stage reached before a failure is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    /// Parameters parsed and checked against the registry
    Validated,
    /// Data fetched from the providers
    Resolved,
    /// Output encoded
    Rendered,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Resolved => "resolved",
            Stage::Rendered => "rendered",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
