//! The deferred two-phase commit a dispatcher hands back from `bind()`, per
//! spec §4.4: capacity is reserved at bind time, but no event flows until
//! `activate()` is called by the cooperation registration protocol. This is
//! what makes `register_coop` all-or-nothing.

/// A reserved dispatcher slot for one agent. Consumed exactly once, by
/// either half of the commit/rollback pair.
pub struct BindingActivator {
    activate: Box<dyn FnOnce() + Send>,
    cancel: Box<dyn FnOnce() + Send>,
}

impl BindingActivator {
    /// Build an activator from its commit and rollback actions.
    pub(crate) fn new(activate: impl FnOnce() + Send + 'static, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            activate: Box::new(activate),
            cancel: Box::new(cancel),
        }
    }

    /// Commit the binding: the agent starts receiving demands from here on.
    pub fn activate(self) {
        (self.activate)()
    }

    /// Roll back the binding: the reserved slot is released, the agent
    /// never runs.
    pub fn cancel(self) {
        (self.cancel)()
    }
}
