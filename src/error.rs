use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// Errors triggered while registering or resolving beans
///
/// Errors raised by the container itself (missing beans, cycles, malformed registrations)
/// are *domain* errors. Failures reported by caller-supplied code are *opaque* errors.
/// Wrapping a failure with context never changes its classification.
#[derive(Error, Debug, Clone)]
pub enum WiringError {
    #[error("no bean registered with name '{0}'")]
    NoSuchBean(String),
    #[error("cyclic dependency: {}", Chain(.chain))]
    CyclicDependency { name: String, chain: Vec<String> },
    #[error("invalid registration of '{name}': {reason}")]
    InvalidRegistration { name: String, reason: String },
    #[error("a bean named '{0}' already exists")]
    AlreadyRegistered(String),
    #[error("cannot replace '{name}': {reason}")]
    IllegalReplacement { name: String, reason: String },
    #[error("not callable: {0}")]
    NotCallable(String),
    #[error("cannot set property '{property}': the bean is not a collection")]
    NotACollection { property: String },
    #[error("the container has been dropped")]
    ContainerDropped,
    #[error("while creating bean '{bean}': {source}")]
    Creating {
        bean: String,
        #[source]
        source: Box<WiringError>,
    },
    #[error("{} property failures: {}", .0.len(), List(.0))]
    Children(Vec<WiringError>),
    #[error("{0}")]
    Opaque(Rc<anyhow::Error>),
}

impl WiringError {
    /// Wrap an error raised by caller code.
    pub fn opaque(error: impl Into<anyhow::Error>) -> Self {
        Self::Opaque(Rc::new(error.into()))
    }

    /// Add the name of the bean under construction.
    pub(crate) fn while_creating(self, bean: &str) -> Self {
        Self::Creating {
            bean: bean.to_owned(),
            source: Box::new(self),
        }
    }

    /// The innermost error, once all construction contexts are removed.
    pub fn root(&self) -> &WiringError {
        match self {
            Self::Creating { source, .. } => source.root(),
            _ => self,
        }
    }

    /// True if the error comes from the container rather than from caller code.
    pub fn is_domain(&self) -> bool {
        match self.root() {
            Self::Opaque(_) => false,
            Self::Children(errors) => errors.iter().all(WiringError::is_domain),
            _ => true,
        }
    }

    pub fn is_opaque(&self) -> bool {
        !self.is_domain()
    }

    pub fn is_no_such_bean(&self) -> bool {
        matches!(self.root(), Self::NoSuchBean(_))
    }

    pub fn is_cyclic(&self) -> bool {
        matches!(self.root(), Self::CyclicDependency { .. })
    }
}

impl From<anyhow::Error> for WiringError {
    fn from(error: anyhow::Error) -> Self {
        Self::Opaque(Rc::new(error))
    }
}

struct Chain<'a>(&'a [String]);

impl fmt::Display for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" -> "))
    }
}

struct List<'a>(&'a [WiringError]);

impl fmt::Display for List<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}
