//! Resolution engine
//!
//! A bean goes through `Unregistered → Registered → Pending → Resolved`.
//! [Tsumiki::get] drives this state machine:
//!
//! * a name already on the dependant path is a cycle, reported without being cached;
//! * a resolved name returns its memoized outcome, failures included;
//! * a pending name shares the in-flight future, so a bean is built at most once;
//! * a registered name is taken out of the store and replaced by a pending future,
//!   which resolves the dependencies concurrently, invokes the creator, applies the
//!   queued properties, then the properties registered meanwhile, and finally caches
//!   the outcome;
//! * any other name is read as a property of its parent bean, if it has one.
//!
//! Failures raised while building a bean are wrapped in [WiringError::Creating], which
//! keeps the domain or opaque classification of the original failure.

use std::mem;
use std::rc::Weak;

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use tracing::{debug, instrument, trace};

use crate::collection::{self, Collection};
use crate::config::ChildFailurePolicy;
use crate::registry::{Inner, Pending, Registration};
use crate::value::{BeanResult, Value};
use crate::{Tsumiki, WiringError};

/// Names of the beans waiting on the current synchronous resolution chain
#[derive(Clone, Debug, Default)]
pub(crate) struct Path(Vec<String>);

impl Path {
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub(crate) fn with(&self, name: &str) -> Self {
        let mut names = self.0.clone();
        names.push(name.to_owned());
        Self(names)
    }

    fn cycle(&self, name: &str) -> WiringError {
        let start = self.0.iter().position(|n| n == name).unwrap_or_default();
        let mut chain = self.0[start..].to_vec();
        chain.push(name.to_owned());
        WiringError::CyclicDependency {
            name: name.to_owned(),
            chain,
        }
    }
}

enum Step {
    Done(BeanResult),
    Wait(LocalBoxFuture<'static, BeanResult>),
    Property,
}

impl Tsumiki {
    /// Retrieve a bean, building it and its dependencies if needed.
    #[instrument(level = "debug", skip(self), fields(container = %self.inner.config.label))]
    pub async fn get(&self, name: &str) -> BeanResult {
        self.resolve(name.to_owned(), Path::default()).await
    }

    /// Probe the cache: the outcome of a resolved bean, [Value::Absent] for any other name.
    pub fn seek(&self, name: &str) -> BeanResult {
        match self.inner.store.borrow().resolved.get(name) {
            Some(outcome) => outcome.result.clone(),
            None => Ok(Value::Absent),
        }
    }

    pub(crate) fn resolve(&self, name: String, path: Path) -> LocalBoxFuture<'static, BeanResult> {
        if path.contains(&name) {
            return future::ready(Err(path.cycle(&name))).boxed_local();
        }
        match self.begin(&name, &path) {
            Step::Done(result) => future::ready(result).boxed_local(),
            Step::Wait(future) => future,
            Step::Property => {
                collection::read_property(self.downgrade(), name, path).boxed_local()
            }
        }
    }

    /// Resolve a bean from a fresh dependant path, without holding the container alive.
    pub(crate) fn deferred(&self, name: &str) -> LocalBoxFuture<'static, BeanResult> {
        resolve_detached(self.downgrade(), name.to_owned()).boxed_local()
    }

    /// Inspect the state of a name, starting its construction if it is only registered.
    fn begin(&self, name: &str, path: &Path) -> Step {
        let mut store = self.inner.store.borrow_mut();
        if let Some(outcome) = store.resolved.get(name) {
            trace!(bean = name, "cached");
            return Step::Done(outcome.result.clone());
        }
        if let Some(pending) = store.pending.get(name) {
            trace!(bean = name, "pending");
            return Step::Wait(pending.future.clone().boxed_local());
        }
        let Some(registration) = store.take_for_resolution(name) else {
            return Step::Property;
        };

        debug!(bean = name, "creating");
        let collection = registration.collection.clone();
        let future = construct(
            self.downgrade(),
            name.to_owned(),
            registration,
            path.with(name),
        )
        .boxed_local()
        .shared();
        store.pending.insert(
            name.to_owned(),
            Pending {
                future: future.clone(),
                collection,
                children: Vec::new(),
            },
        );
        Step::Wait(future.boxed_local())
    }
}

/// Resolve a bean from an empty dependant path
pub(crate) async fn resolve_detached(weak: Weak<Inner>, name: String) -> BeanResult {
    let resolution = Tsumiki::upgrade(&weak)?.resolve(name, Path::default());
    resolution.await
}

/// Build a registered bean and cache its outcome
async fn construct(
    weak: Weak<Inner>,
    name: String,
    registration: Registration,
    path: Path,
) -> BeanResult {
    let Registration {
        creator,
        dependencies,
        children,
        ..
    } = registration;

    let result = async {
        let injections: Vec<_> = {
            let container = Tsumiki::upgrade(&weak)?;
            dependencies
                .iter()
                .map(|d| d.inject(&container, &path))
                .collect()
        };
        let args = future::join_all(injections)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        let value = creator.create(args).await?;
        apply_children(&weak, &value, children, &name, &path).await?;
        Ok::<_, WiringError>(value)
    }
    .await
    .map_err(|e| e.while_creating(&name));

    settle(&weak, &name, result, &path).await
}

/// Resolve all queued properties concurrently and assign them to the freshly built bean.
async fn apply_children(
    weak: &Weak<Inner>,
    owner: &Value,
    children: Vec<String>,
    name: &str,
    path: &Path,
) -> Result<(), WiringError> {
    if children.is_empty() {
        return Ok(());
    }
    let (policy, applications) = {
        let container = Tsumiki::upgrade(weak)?;
        let collection = container.inner.store.borrow().collection_of(name);
        let applications: Vec<_> = children
            .into_iter()
            .map(|child| {
                container.apply_property(owner.clone(), collection.clone(), child, path.clone())
            })
            .collect();
        (container.inner.config.child_failures, applications)
    };

    let results = future::join_all(applications).await;
    let mut failures: Vec<WiringError> = results.into_iter().filter_map(Result::err).collect();
    match policy {
        _ if failures.is_empty() => Ok(()),
        ChildFailurePolicy::FirstFailure => Err(failures.swap_remove(0)),
        ChildFailurePolicy::Aggregate if failures.len() == 1 => Err(failures.swap_remove(0)),
        ChildFailurePolicy::Aggregate => Err(WiringError::Children(failures)),
    }
}

/// Apply the properties registered while the bean was pending, in order, then cache its outcome.
pub(crate) async fn settle(
    weak: &Weak<Inner>,
    name: &str,
    mut result: BeanResult,
    path: &Path,
) -> BeanResult {
    while let Some((owner, chained, collection)) = take_chained(weak, name, &result) {
        for child in chained {
            trace!(bean = %child, parent = name, "chained property");
            let application = Tsumiki::upgrade(weak)?.apply_property(
                owner.clone(),
                collection.clone(),
                child,
                path.clone(),
            );
            if let Err(e) = application.await {
                result = Err(e.while_creating(name));
                break;
            }
        }
    }
    result
}

/// Take the properties chained on a pending bean, or cache its outcome when none are left.
fn take_chained(
    weak: &Weak<Inner>,
    name: &str,
    result: &BeanResult,
) -> Option<(Value, Vec<String>, Option<Collection>)> {
    let container = Tsumiki::upgrade(weak).ok()?;
    let mut store = container.inner.store.borrow_mut();
    if let (Ok(owner), Some(pending)) = (result, store.pending.get_mut(name)) {
        if !pending.children.is_empty() {
            let chained = mem::take(&mut pending.children);
            return Some((owner.clone(), chained, pending.collection.clone()));
        }
    }
    store.finish(name, result);
    None
}
