//! Asynchronous bean container with lazy, memoized construction and property addressing.
//!
//! # Simple use case
//!
//! ```
//! # use tsumiki::*;
//! # #[derive(Debug)]
//! # struct Pool { url: String }
//! # fn main() -> Result<(), WiringError> {
//! # futures::executor::block_on(async {
//! let beans = Tsumiki::new();
//!
//! // A plain value and a factory depending on it
//! beans.register("database_url", Creator::value("postgres://localhost"), deps![])?;
//! beans.register(
//!     "pool",
//!     Creator::factory(Function::future(|args: Args| async move {
//!         let url = args.get(0).as_str().unwrap_or_default().to_owned();
//!         Ok(Value::opaque(Pool { url }))
//!     })),
//!     deps!["database_url"],
//! )?;
//!
//! // Built on first use, then shared
//! let pool = beans.get("pool").await?;
//! assert_eq!(pool.downcast::<Pool>().unwrap().url, "postgres://localhost");
//! assert_eq!(beans.get("pool").await?, pool);
//! # Ok(())
//! # })
//! # }
//! ```
//!
//! # Mechanism
//!
//! Each bean name is in one of four states: unregistered, registered, pending or resolved.
//!
//! * [Tsumiki::register] stores a [Creator] and its [Injector]s under a name. Nothing is built yet.
//! * [Tsumiki::get] takes the registration out of the store and replaces it with a shared future:
//!   concurrent requests for the same name wait for the same construction. Dependencies are
//!   resolved concurrently, then the creator runs, and the outcome is memoized, failures included.
//! * Names such as `parent.prop` or `parent[prop]` address properties of other beans.
//!   Registering one assigns the property to its parent, reading one without registration
//!   reads the property of the resolved parent. See [Collection] for custom accessors.
//! * Direct references are checked for cycles. [Injector::Deferred] and [Injector::Promiser]
//!   start a fresh resolution chain and can be used to break a cycle.
//! * A registration which was not built yet can be swapped with [replacement], optionally keeping
//!   the displaced recipe under another name.
//!
//! Beans are dynamic [Value]s. The container is single-threaded: values, futures and the
//! container itself are `!Send` and meant to be driven by a local executor.

mod collection;
mod config;
mod create;
mod error;
mod inject;
mod registry;
mod replace;
mod resolve;
mod value;

pub use collection::Collection;
pub use config::{ChildFailurePolicy, ContainerConfig};
pub use create::{Callee, Creator};
pub use error::WiringError;
pub use inject::Injector;
pub use registry::{BeanState, Specifier, Tsumiki};
pub use replace::replacement;
pub use value::{Args, BeanFuture, BeanResult, Function, List, Map, Object, Value};
