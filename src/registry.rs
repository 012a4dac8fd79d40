//! Registration store and the container handle
//!
//! A bean name lives in exactly one of three maps: `registered` (a recipe waiting to be built),
//! `pending` (a shared future under construction) or `resolved` (the memoized outcome).
//! The store is only mutated on registration, when a resolution starts, when a property
//! is linked to its parent and when a construction completes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use futures::FutureExt;
use tracing::{debug, trace, warn};

use crate::collection::{self, Collection};
use crate::config::ContainerConfig;
use crate::create::Creator;
use crate::inject::Injector;
use crate::value::{BeanFuture, BeanResult};
use crate::WiringError;

/// Observable resolution state of a bean name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeanState {
    Unregistered,
    Registered,
    Pending,
    Resolved,
}

/// Registration-time description of a bean: its name, an optional replacement target
/// and optional custom property accessors.
#[derive(Clone, Debug)]
pub struct Specifier {
    pub(crate) name: String,
    pub(crate) replacement: Option<Replacement>,
    pub(crate) collection: Option<Collection>,
}

#[derive(Clone, Debug)]
pub(crate) struct Replacement {
    pub(crate) retain: Option<String>,
}

impl Specifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replacement: None,
            collection: None,
        }
    }

    /// Target an existing, not yet created registration.
    ///
    /// If `retain` is given, the displaced registration stays available under that name.
    pub fn replacement(name: impl Into<String>, retain: Option<&str>) -> Self {
        Self {
            replacement: Some(Replacement {
                retain: retain.map(str::to_owned),
            }),
            ..Self::new(name)
        }
    }

    /// Use custom accessors when properties of this bean are read or assigned.
    pub fn with_collection(mut self, collection: Collection) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for Specifier {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Specifier {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A bean waiting for its first resolution
pub(crate) struct Registration {
    pub(crate) creator: Creator,
    pub(crate) dependencies: Vec<Injector>,
    /// Properties registered after this bean, applied once it is built
    pub(crate) children: Vec<String>,
    pub(crate) collection: Option<Collection>,
}

pub(crate) struct Pending {
    pub(crate) future: BeanFuture,
    pub(crate) collection: Option<Collection>,
    /// Properties registered while the bean was pending, applied before it settles
    pub(crate) children: Vec<String>,
}

pub(crate) struct Outcome {
    pub(crate) result: BeanResult,
    pub(crate) collection: Option<Collection>,
}

#[derive(Default)]
pub(crate) struct Store {
    pub(crate) registered: HashMap<String, Registration>,
    pub(crate) pending: HashMap<String, Pending>,
    pub(crate) resolved: HashMap<String, Outcome>,
}

impl Store {
    pub(crate) fn state(&self, name: &str) -> BeanState {
        if self.registered.contains_key(name) {
            BeanState::Registered
        } else if self.pending.contains_key(name) {
            BeanState::Pending
        } else if self.resolved.contains_key(name) {
            BeanState::Resolved
        } else {
            BeanState::Unregistered
        }
    }

    pub(crate) fn insert(
        &mut self,
        name: &str,
        registration: Registration,
    ) -> Result<(), WiringError> {
        if self.state(name) != BeanState::Unregistered {
            return Err(WiringError::AlreadyRegistered(name.to_owned()));
        }
        self.registered.insert(name.to_owned(), registration);
        Ok(())
    }

    /// Remove a registration so that it can be built, at most once.
    pub(crate) fn take_for_resolution(&mut self, name: &str) -> Option<Registration> {
        self.registered.remove(name)
    }

    /// Move a pending bean to the resolved map.
    pub(crate) fn finish(&mut self, name: &str, result: &BeanResult) {
        let Some(pending) = self.pending.remove(name) else {
            return;
        };
        self.resolved.insert(
            name.to_owned(),
            Outcome {
                result: result.clone(),
                collection: pending.collection,
            },
        );
        match result {
            Ok(_) => debug!(bean = name, "resolved"),
            Err(e) => warn!(bean = name, error = %e, "failed"),
        }
    }

    /// Custom accessors of a bean that started its resolution
    pub(crate) fn collection_of(&self, name: &str) -> Option<Collection> {
        match self.resolved.get(name) {
            Some(outcome) => outcome.collection.clone(),
            None => self.pending.get(name).and_then(|p| p.collection.clone()),
        }
    }
}

pub(crate) struct Inner {
    pub(crate) config: ContainerConfig,
    pub(crate) store: RefCell<Store>,
}

/// Asynchronous bean container.
///
/// Beans are registered under a name with a [Creator] and a list of [Injector]s,
/// and built lazily, at most once, on the first [Tsumiki::get].
/// The handle is cheap to clone: all clones share the same beans.
#[derive(Clone)]
pub struct Tsumiki {
    pub(crate) inner: Rc<Inner>,
}

impl Default for Tsumiki {
    fn default() -> Self {
        Self::new()
    }
}

impl Tsumiki {
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                config,
                store: RefCell::default(),
            }),
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// Declare a bean.
    ///
    /// Fails if the specifier, creator or dependencies are malformed, if dependencies are given
    /// to a creator which does not accept them, if the name already exists, or if a replacement
    /// targets a name which is not waiting for its first resolution.
    pub fn register(
        &self,
        specifier: impl Into<Specifier>,
        creator: impl Into<Creator>,
        dependencies: impl IntoIterator<Item = Injector>,
    ) -> Result<(), WiringError> {
        let specifier = specifier.into();
        let creator = creator.into();
        let mut dependencies: Vec<Injector> = dependencies.into_iter().collect();
        let name = specifier.name.as_str();

        collection::validate_name(name)?;
        creator.validate(name, &dependencies)?;
        for target in dependencies.iter().filter_map(Injector::target) {
            collection::validate_name(target)?;
        }
        dependencies.extend(creator.implicit_dependency());

        let registration = Registration {
            creator,
            dependencies,
            children: Vec::new(),
            collection: specifier.collection,
        };

        let reopened = {
            let mut store = self.inner.store.borrow_mut();
            match specifier.replacement {
                Some(replacement) => {
                    self.replace(&mut store, name, replacement.retain, registration)?
                }
                None => {
                    store.insert(name, registration)?;
                    self.link(&mut store, name)
                }
            }
        };
        debug!(container = %self.inner.config.label, bean = name, "registered");

        // Start assigning the property to a resolved parent right away
        if let Some(future) = reopened {
            trace!(bean = name, "applying property to resolved parent");
            let _ = future.now_or_never();
        }
        Ok(())
    }

    pub fn state(&self, name: &str) -> BeanState {
        self.inner.store.borrow().state(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state(name) != BeanState::Unregistered
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<Inner>) -> Result<Self, WiringError> {
        weak.upgrade()
            .map(|inner| Self { inner })
            .ok_or(WiringError::ContainerDropped)
    }
}

impl fmt::Debug for Tsumiki {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Tsumiki");
        out.field("label", &self.inner.config.label);
        // A bean may print its own container while it is being built
        if let Ok(store) = self.inner.store.try_borrow() {
            out.field("registered", &store.registered.len())
                .field("pending", &store.pending.len())
                .field("resolved", &store.resolved.len());
        }
        out.finish()
    }
}
