/// The stage a work execution is in.
/// Mirrors the linear lifecycle driven by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WorkState {
    /// Not started.
    #[default]
    Idle,

    /// Running `check_params`.
    Validating,

    /// Running `started`, which may serve the result from a cache.
    CacheCheck,

    /// Assembling request options from the hooks.
    Building,

    /// Waiting for the transport call.
    Requesting,

    /// Converting the raw response body.
    Converting,

    /// Evaluating business success.
    Evaluating,

    /// Terminal hooks have run.
    Finished,
}

impl WorkState {
    /// Returns a string description of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkState::Idle => "idle",
            WorkState::Validating => "validating",
            WorkState::CacheCheck => "cache check",
            WorkState::Building => "building",
            WorkState::Requesting => "requesting",
            WorkState::Converting => "converting",
            WorkState::Evaluating => "evaluating",
            WorkState::Finished => "finished",
        }
    }

    /// Whether moving to `next` keeps the lifecycle order.
    ///
    /// Stages may be skipped (cache hits and failures jump to `Finished`) but
    /// never revisited.
    pub fn can_advance_to(&self, next: WorkState) -> bool {
        next > *self
    }
}
