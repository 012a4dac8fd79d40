//! How the value of a bean is produced

use std::fmt;
use std::future::Future;

use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::collection::{split_property, validate_name};
use crate::inject::Injector;
use crate::value::{BeanResult, Function, Value};
use crate::WiringError;

/// The callable used by constructors and factories
#[derive(Clone, Debug)]
pub enum Callee {
    Function(Function),
    /// A bean resolving to the callable, delivered as an extra trailing dependency
    Bean(String),
}

impl From<Function> for Callee {
    fn from(f: Function) -> Self {
        Self::Function(f)
    }
}

impl From<&str> for Callee {
    fn from(name: &str) -> Self {
        Self::Bean(name.to_owned())
    }
}

impl From<String> for Callee {
    fn from(name: String) -> Self {
        Self::Bean(name)
    }
}

/// Recipe producing the value of a bean
pub enum Creator {
    /// A fixed value, without dependencies
    Value(Value),
    /// The outcome of an external future, without dependencies
    Future(LocalBoxFuture<'static, BeanResult>),
    /// A synchronous callable invoked with the resolved dependencies
    Constructor(Callee),
    /// A synchronous or asynchronous callable invoked with the resolved dependencies
    Factory(Callee),
    /// The outcome of another bean, without dependencies
    Alias(String),
}

impl Creator {
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn future(future: impl Future<Output = BeanResult> + 'static) -> Self {
        Self::Future(future.boxed_local())
    }

    pub fn constructor(callee: impl Into<Callee>) -> Self {
        Self::Constructor(callee.into())
    }

    pub fn factory(callee: impl Into<Callee>) -> Self {
        Self::Factory(callee.into())
    }

    pub fn alias(name: impl Into<String>) -> Self {
        Self::Alias(name.into())
    }

    pub(crate) fn validate(
        &self,
        bean: &str,
        dependencies: &[Injector],
    ) -> Result<(), WiringError> {
        let invalid = |reason: &str| WiringError::InvalidRegistration {
            name: bean.to_owned(),
            reason: reason.to_owned(),
        };
        match self {
            Self::Value(_) | Self::Future(_) if !dependencies.is_empty() => {
                Err(invalid("value and future beans take no dependencies"))
            }
            Self::Alias(_) if !dependencies.is_empty() => {
                Err(invalid("alias beans take no dependencies"))
            }
            Self::Alias(target)
            | Self::Constructor(Callee::Bean(target))
            | Self::Factory(Callee::Bean(target)) => validate_name(target),
            _ => Ok(()),
        }
    }

    /// Dependency appended to the declared ones to obtain the callable or the aliased bean
    pub(crate) fn implicit_dependency(&self) -> Option<Injector> {
        match self {
            Self::Alias(name) | Self::Constructor(Callee::Bean(name)) => {
                Some(Injector::Reference(name.clone()))
            }
            // Factories obtained from a property keep their owner as receiver
            Self::Factory(Callee::Bean(name)) if split_property(name).is_some() => {
                Some(Injector::Bound(name.clone()))
            }
            Self::Factory(Callee::Bean(name)) => Some(Injector::Reference(name.clone())),
            _ => None,
        }
    }

    /// Produce the value from the resolved dependencies, including the implicit one.
    pub(crate) async fn create(self, mut args: Vec<Value>) -> BeanResult {
        match self {
            Self::Value(value) => Ok(value),
            Self::Future(future) => future.await,
            Self::Alias(_) => Ok(args.pop().unwrap_or_default()),
            Self::Constructor(callee) => {
                let function = callable(callee, &mut args)?;
                if function.is_async() {
                    return Err(WiringError::NotCallable("asynchronous constructor".into()));
                }
                function.call_sync(None, args)
            }
            Self::Factory(callee) => callable(callee, &mut args)?.call(args).await,
        }
    }
}

fn callable(callee: Callee, args: &mut Vec<Value>) -> Result<Function, WiringError> {
    match callee {
        Callee::Function(f) => Ok(f),
        Callee::Bean(name) => match args.pop() {
            Some(Value::Function(f)) => Ok(f),
            _ => Err(WiringError::NotCallable(name)),
        },
    }
}

impl fmt::Debug for Creator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Future(_) => f.write_str("Future"),
            Self::Constructor(c) => f.debug_tuple("Constructor").field(c).finish(),
            Self::Factory(c) => f.debug_tuple("Factory").field(c).finish(),
            Self::Alias(name) => f.debug_tuple("Alias").field(name).finish(),
        }
    }
}

impl From<Value> for Creator {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// A bare bean name used as creator is an alias
impl From<&str> for Creator {
    fn from(name: &str) -> Self {
        Self::Alias(name.to_owned())
    }
}
