//! Property addressing into beans
//!
//! A bean name ending with `.prop` or `[prop]` designates a property of its parent bean,
//! the rightmost segment being parsed first: `a.b[c]` is the property `c` of the bean `a.b`.
//!
//! Reading such a name without a matching registration reads the property from the resolved
//! parent. Registering such a name also assigns the property to the parent, depending on the
//! state of the parent at registration time:
//!
//! * registered: the property is queued and assigned when the parent is built;
//! * pending: the property is assigned once the parent is built successfully, before its
//!   outcome is cached, so every reader waiting on the parent sees it;
//! * successfully resolved: the parent is pending again until the property is assigned;
//!   the assignment starts right away;
//! * unregistered (or failed): the property stays an independent bean, it is never attached
//!   to a parent registered later.

use std::rc::Weak;

use futures::future::Future;
use futures::FutureExt;
use tracing::trace;

use crate::create::Creator;
use crate::registry::{Inner, Pending, Store};
use crate::resolve::{self, Path};
use crate::value::{BeanFuture, BeanResult, Function, Value};
use crate::{Tsumiki, WiringError};

/// Custom property accessors of a bean
///
/// The getter is called with the bean as receiver and the property name as argument,
/// the setter with the property name and the new value. Missing accessors fall back to
/// the default behaviour: map entries, list indices, beans of nested containers or
/// [crate::Object] properties.
#[derive(Clone, Debug, Default)]
pub struct Collection {
    getter: Option<Function>,
    setter: Option<Function>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn getter(mut self, getter: Function) -> Self {
        self.getter = Some(getter);
        self
    }

    pub fn setter(mut self, setter: Function) -> Self {
        self.setter = Some(setter);
        self
    }
}

/// Split a property name into its parent name and the last property
pub(crate) fn split_property(name: &str) -> Option<(&str, &str)> {
    let (parent, property) = match name.strip_suffix(']') {
        Some(inner) => {
            let open = inner.rfind('[')?;
            (&inner[..open], &inner[open + 1..])
        }
        None => {
            let dot = name.rfind('.')?;
            (&name[..dot], &name[dot + 1..])
        }
    };
    (!parent.is_empty() && !property.is_empty()).then_some((parent, property))
}

/// Reject empty names, empty segments and unbalanced brackets.
pub(crate) fn validate_name(name: &str) -> Result<(), WiringError> {
    let invalid = |reason: &str| {
        Err(WiringError::InvalidRegistration {
            name: name.to_owned(),
            reason: reason.to_owned(),
        })
    };
    if name.is_empty() {
        return invalid("empty bean name");
    }

    let mut in_bracket = false;
    let mut closed = false;
    let mut segment = 0;
    for c in name.chars() {
        match c {
            '[' if in_bracket => return invalid("nested '['"),
            '[' | '.' if !in_bracket && segment == 0 && !closed => {
                return invalid("empty name segment")
            }
            '[' => in_bracket = true,
            ']' if !in_bracket => return invalid("unbalanced ']'"),
            ']' if segment == 0 => return invalid("empty property"),
            ']' => {
                in_bracket = false;
                closed = true;
                segment = 0;
                continue;
            }
            _ if in_bracket => {}
            '.' => {}
            _ if closed => return invalid("expected '.' or '[' after ']'"),
            _ => {}
        }
        if c == '[' || (c == '.' && !in_bracket) {
            segment = 0;
            closed = false;
        } else {
            segment += 1;
        }
    }

    if in_bracket {
        invalid("unbalanced '['")
    } else if segment == 0 && !closed {
        invalid("empty name segment")
    } else {
        Ok(())
    }
}

/// Read a property of a bean
pub(crate) async fn read(
    collection: Option<&Collection>,
    owner: Value,
    property: &str,
) -> BeanResult {
    if let Some(getter) = collection.and_then(|c| c.getter.as_ref()) {
        return getter.call_with(Some(owner), vec![property.into()]).await;
    }
    let missing = || WiringError::NoSuchBean(property.to_owned());
    match &owner {
        Value::Map(map) => map.borrow().get(property).cloned().ok_or_else(missing),
        Value::List(list) => property
            .parse::<usize>()
            .ok()
            .and_then(|i| list.borrow().get(i).cloned())
            .ok_or_else(missing),
        Value::Container(container) => container.get(property).await,
        Value::Object(object) => object.get(property).ok_or_else(missing),
        _ => Err(missing()),
    }
}

/// Assign a property of a bean
pub(crate) async fn write(
    collection: Option<&Collection>,
    owner: &Value,
    property: &str,
    value: Value,
) -> Result<(), WiringError> {
    if let Some(setter) = collection.and_then(|c| c.setter.as_ref()) {
        setter
            .call_with(Some(owner.clone()), vec![property.into(), value])
            .await?;
        return Ok(());
    }
    let not_a_collection = || WiringError::NotACollection {
        property: property.to_owned(),
    };
    match owner {
        Value::Map(map) => {
            map.borrow_mut().insert(property.to_owned(), value);
            Ok(())
        }
        Value::List(list) => {
            let mut list = list.borrow_mut();
            match property.parse::<usize>() {
                Ok(i) if i < list.len() => list[i] = value,
                Ok(i) if i == list.len() => list.push(value),
                _ => return Err(not_a_collection()),
            }
            Ok(())
        }
        Value::Container(container) => container.register(property, Creator::Value(value), []),
        Value::Object(object) => object.set(property, value),
        _ => Err(not_a_collection()),
    }
}

impl Tsumiki {
    /// Attach a freshly registered property to its parent.
    ///
    /// Returns the future of a resolved parent reopened for the assignment.
    pub(crate) fn link(&self, store: &mut Store, name: &str) -> Option<BeanFuture> {
        let (parent, _) = split_property(name)?;
        if let Some(registration) = store.registered.get_mut(parent) {
            trace!(bean = name, parent, "queued property");
            registration.children.push(name.to_owned());
            return None;
        }
        if let Some(pending) = store.pending.get_mut(parent) {
            trace!(bean = name, parent, "property queued on pending parent");
            pending.children.push(name.to_owned());
            return None;
        }

        // A successful outcome is reopened, a failure is final
        if !store.resolved.get(parent).is_some_and(|o| o.result.is_ok()) {
            trace!(bean = name, parent, "orphan property");
            return None;
        }
        let outcome = store.resolved.remove(parent)?;
        let owner = outcome.result.ok()?;
        trace!(bean = name, parent, "reopened parent");
        let future = reopen(self.downgrade(), parent.to_owned(), owner)
            .boxed_local()
            .shared();
        store.pending.insert(
            parent.to_owned(),
            Pending {
                future: future.clone(),
                collection: outcome.collection,
                children: vec![name.to_owned()],
            },
        );
        Some(future)
    }

    /// Resolve a property bean and assign it to its owner.
    pub(crate) fn apply_property(
        &self,
        owner: Value,
        collection: Option<Collection>,
        child: String,
        path: Path,
    ) -> impl Future<Output = Result<(), WiringError>> + 'static {
        let property = split_property(&child)
            .map(|(_, property)| property.to_owned())
            .unwrap_or_default();
        let resolution = self.resolve(child, path);
        async move {
            let value = resolution.await?;
            write(collection.as_ref(), &owner, &property, value).await
        }
    }
}

/// Read a property for a name that was never registered.
pub(crate) async fn read_property(weak: Weak<Inner>, name: String, path: Path) -> BeanResult {
    let Some((parent, property)) = split_property(&name) else {
        return Err(WiringError::NoSuchBean(name));
    };
    let resolution = Tsumiki::upgrade(&weak)?.resolve(parent.to_owned(), path);
    let owner = match resolution.await {
        Ok(owner) => owner,
        Err(e) if e.is_domain() && !e.is_cyclic() => {
            return Err(WiringError::NoSuchBean(name.clone()))
        }
        Err(e) => return Err(e),
    };
    let collection = Tsumiki::upgrade(&weak)?
        .inner
        .store
        .borrow()
        .collection_of(parent);
    read(collection.as_ref(), owner, property)
        .await
        .map_err(|e| match e {
            WiringError::NoSuchBean(_) => WiringError::NoSuchBean(name.clone()),
            e => e,
        })
}

/// Apply the properties registered on a resolved bean, then cache it again
async fn reopen(weak: Weak<Inner>, parent: String, owner: Value) -> BeanResult {
    let path = Path::default().with(&parent);
    resolve::settle(&weak, &parent, Ok(owner), &path).await
}
