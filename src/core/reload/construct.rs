// src/core/reload/construct.rs

//! The scratch bag a fast-reload background task builds before anything is
//! published: fresh views/forwards/hints trees parsed from the new config (§3,
//! §4.4 phase 3 "Construct").

use crate::config::Config;
use crate::core::errors::ControlError;
use crate::core::state::resolver::ResolverState;

pub struct FastReloadConstruct {
    pub resolver: ResolverState,
}

impl FastReloadConstruct {
    /// Builds new trees from `cfg`. Zone-file/RR grammar parsing proper is a named
    /// external collaborator (§1); this only rebuilds the control-plane shape of
    /// the trees from the declarative config sections this subsystem owns.
    pub fn build(cfg: &Config) -> Result<Self, ControlError> {
        Ok(Self {
            resolver: ResolverState::from_config(cfg),
        })
    }

    /// A rough memory estimate for the verbose≥2 "print memory" phase (§4.4 phase 4).
    pub fn estimate_bytes(&self) -> usize {
        let views = self.resolver.views.read().zones.len();
        let forwards = self.resolver.forwards.read().entries.len();
        let hints = self.resolver.hints.read().stubs.len();
        (views + forwards + hints) * 256
    }
}
