//! Substitution of registrations that were not built yet

use tracing::debug;

use crate::registry::{BeanState, Registration, Store};
use crate::value::BeanFuture;
use crate::{Specifier, Tsumiki, WiringError};

/// Target an existing registration instead of declaring a new bean.
///
/// With `retain`, the displaced registration (dependencies and queued properties included)
/// remains available under that name, typically as a dependency of the new one.
///
/// ```
/// # use tsumiki::*;
/// # fn main() -> Result<(), WiringError> {
/// let beans = Tsumiki::new();
/// beans.register("greeting", Creator::value("hello"), deps![])?;
/// beans.register(replacement("greeting", Some("original")), Creator::alias("original"), deps![])?;
/// assert!(beans.contains("original"));
/// # Ok(())
/// # }
/// ```
pub fn replacement(name: impl Into<String>, retain: Option<&str>) -> Specifier {
    Specifier::replacement(name, retain)
}

impl Tsumiki {
    pub(crate) fn replace(
        &self,
        store: &mut Store,
        name: &str,
        retain: Option<String>,
        registration: Registration,
    ) -> Result<Option<BeanFuture>, WiringError> {
        let illegal = |reason: &str| WiringError::IllegalReplacement {
            name: name.to_owned(),
            reason: reason.to_owned(),
        };
        match store.state(name) {
            BeanState::Registered => {}
            BeanState::Unregistered => return Err(illegal("no such registration")),
            BeanState::Pending => return Err(illegal("the bean is being created")),
            BeanState::Resolved => return Err(illegal("the bean was already created")),
        }
        if let Some(retain) = &retain {
            crate::collection::validate_name(retain)?;
            if store.state(retain) != BeanState::Unregistered {
                return Err(WiringError::AlreadyRegistered(retain.clone()));
            }
        }

        let displaced = store.registered.insert(name.to_owned(), registration);
        match (retain, displaced) {
            (Some(retain), Some(displaced)) => {
                debug!(bean = name, retain = %retain, "retained replaced registration");
                store.registered.insert(retain.clone(), displaced);
                Ok(self.link(store, &retain))
            }
            _ => Ok(None),
        }
    }
}
