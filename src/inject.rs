//! How a declared dependency is delivered to a creator
//!
//! Direct references and bound properties are resolved before the creator runs and take part
//! in cycle detection. Deferred futures and promisers start from an empty dependant path:
//! they can point back at the bean being built without forming a cycle, as long as they are
//! not awaited during its construction. A deferred resolution starts as soon as it is
//! injected.

use std::rc::Weak;

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;

use crate::collection::split_property;
use crate::registry::Inner;
use crate::resolve::{resolve_detached, Path};
use crate::value::{BeanResult, Function, Value};
use crate::Tsumiki;

/// Delivery mode of a dependency
#[derive(Clone, Debug)]
pub enum Injector {
    /// The resolved value of a bean
    Reference(String),
    /// A value given verbatim
    Literal(Value),
    /// A [Value::Future] of the bean, started but not awaited before construction
    Deferred(String),
    /// An asynchronous function resolving the bean when called
    Promiser(String),
    /// A synchronous function returning the bean if it is already resolved,
    /// [Value::Absent] otherwise
    Seeker(String),
    /// A property of another bean, bound to that bean if it is a function
    Bound(String),
}

impl Injector {
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference(name.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn deferred(name: impl Into<String>) -> Self {
        Self::Deferred(name.into())
    }

    pub fn promiser(name: impl Into<String>) -> Self {
        Self::Promiser(name.into())
    }

    pub fn seeker(name: impl Into<String>) -> Self {
        Self::Seeker(name.into())
    }

    pub fn bound(name: impl Into<String>) -> Self {
        Self::Bound(name.into())
    }

    /// Name of the injected bean, if any
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Literal(_) => None,
            Self::Reference(name)
            | Self::Deferred(name)
            | Self::Promiser(name)
            | Self::Seeker(name)
            | Self::Bound(name) => Some(name),
        }
    }

    pub(crate) fn inject(
        &self,
        container: &Tsumiki,
        path: &Path,
    ) -> LocalBoxFuture<'static, BeanResult> {
        match self {
            Self::Reference(name) => container.resolve(name.clone(), path.clone()),
            Self::Literal(value) => future::ready(Ok(value.clone())).boxed_local(),
            Self::Deferred(name) => {
                let deferred = container.deferred(name).shared();
                // Start resolving without waiting for the outcome
                let _ = deferred.clone().now_or_never();
                future::ready(Ok(Value::Future(deferred))).boxed_local()
            }
            Self::Promiser(name) => {
                let weak = container.downgrade();
                let name = name.clone();
                let promiser =
                    Function::future(move |_| resolve_detached(weak.clone(), name.clone()));
                future::ready(Ok(promiser.into())).boxed_local()
            }
            Self::Seeker(name) => {
                let weak = container.downgrade();
                let name = name.clone();
                let seeker = Function::sync(move |_| Tsumiki::upgrade(&weak)?.seek(&name));
                future::ready(Ok(seeker.into())).boxed_local()
            }
            Self::Bound(name) => {
                let resolution = container.resolve(name.clone(), path.clone());
                bind(
                    container.downgrade(),
                    resolution,
                    name.clone(),
                    path.clone(),
                )
                .boxed_local()
            }
        }
    }
}

/// Bind a resolved property to its owner
async fn bind(
    weak: Weak<Inner>,
    resolution: LocalBoxFuture<'static, BeanResult>,
    name: String,
    path: Path,
) -> BeanResult {
    match (resolution.await?, split_property(&name)) {
        (Value::Function(f), Some((owner, _))) => {
            let owner = Tsumiki::upgrade(&weak)?.resolve(owner.to_owned(), path);
            Ok(f.bind(owner.await?).into())
        }
        (value, _) => Ok(value),
    }
}

impl From<&str> for Injector {
    fn from(name: &str) -> Self {
        Self::Reference(name.to_owned())
    }
}

impl From<String> for Injector {
    fn from(name: String) -> Self {
        Self::Reference(name)
    }
}

/// Build a list of dependencies, bare names being direct references.
///
/// ```
/// # use tsumiki::*;
/// let dependencies = deps!["config", Injector::literal(42), Injector::promiser("pool")];
/// assert_eq!(dependencies.len(), 3);
/// ```
#[macro_export]
macro_rules! deps {
    ($($dependency: expr),* $(,)?) => {
        [$($crate::Injector::from($dependency)),*]
    };
}
