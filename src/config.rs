/// How failures of several properties queued on the same bean are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChildFailurePolicy {
    /// Report the failure of the first property in registration order
    #[default]
    FirstFailure,
    /// Report all failures together as [crate::WiringError::Children]
    Aggregate,
}

/// Settings of a container
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Recorded on log events, to tell nested containers apart
    pub label: String,
    pub child_failures: ChildFailurePolicy,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            label: "tsumiki".into(),
            child_failures: ChildFailurePolicy::default(),
        }
    }
}

impl ContainerConfig {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn child_failures(mut self, policy: ChildFailurePolicy) -> Self {
        self.child_failures = policy;
        self
    }
}
