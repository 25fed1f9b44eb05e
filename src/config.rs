//! Runtime configuration of a [`Bridge`](crate::Bridge).

/// Default upper bound on simultaneously live handles.
pub const DEFAULT_MAX_HANDLES: usize = 1 << 20;

/// Configuration of the marshaling runtime.
///
/// The presets cover the common cases:
///
/// | Preset | Panics | Fault logging | Handle budget | Collect on release |
/// |--------|--------|---------------|---------------|--------------------|
/// | [`BridgeConfig::default`] | caught | yes | 1M | no |
/// | [`BridgeConfig::minimal`] | caught | no | 1M | no |
/// | [`BridgeConfig::strict`] | propagated | yes | 4096 | yes |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Treat a Rust panic inside a managed body as a managed fault
    /// (`System.ExecutionEngineException`) and domesticate it like any other
    pub catch_panics: bool,

    /// Emit a `warn` event for every domesticated fault
    pub log_faults: bool,

    /// Maximum number of live handles; acquiring more is a handle fault
    pub max_handles: usize,

    /// Collect the managed heap whenever the last handle of an object is released
    pub collect_on_release: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            catch_panics: true,
            log_faults: true,
            max_handles: DEFAULT_MAX_HANDLES,
            collect_on_release: false,
        }
    }
}

impl BridgeConfig {
    /// Default behavior without fault logging.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            log_faults: false,
            ..Self::default()
        }
    }

    /// Small handle budget, eager collection, and panics surface to the caller.
    ///
    /// Intended for tests that want lifetime errors to show up early.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            catch_panics: false,
            log_faults: true,
            max_handles: 4096,
            collect_on_release: true,
        }
    }

    /// Overrides the handle budget.
    #[must_use]
    pub fn with_max_handles(mut self, max_handles: usize) -> Self {
        self.max_handles = max_handles;
        self
    }
}
