//! Dynamic values held by the container
//!
//! Beans are heterogeneous: a container mixes configuration scalars, shared maps,
//! caller-defined objects and callables under string names. [Value] is the closed set
//! of shapes the engine knows how to store, address into and invoke.
//!
//! Reference variants (lists, maps, objects, functions, futures, containers, opaque payloads)
//! are shared handles: cloning a [Value] never copies the underlying data, and equality
//! between two reference values is identity.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{LocalBoxFuture, Shared};
use futures::FutureExt;
use indexmap::IndexMap;

use crate::{Tsumiki, WiringError};

/// Outcome of a bean resolution
pub type BeanResult = Result<Value, WiringError>;

/// Shared handle on an in-flight bean outcome
pub type BeanFuture = Shared<LocalBoxFuture<'static, BeanResult>>;

/// Shared, ordered map of named values
pub type Map = Rc<RefCell<IndexMap<String, Value>>>;

/// Shared list of values
pub type List = Rc<RefCell<Vec<Value>>>;

#[derive(Clone, Default)]
pub enum Value {
    /// The empty sentinel
    #[default]
    Absent,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(List),
    Map(Map),
    Object(Rc<dyn Object>),
    Function(Function),
    Future(BeanFuture),
    Container(Tsumiki),
    Opaque(Rc<dyn Any>),
}

impl Value {
    /// A new empty map
    pub fn map() -> Self {
        Self::Map(Rc::default())
    }

    /// A new map filled with the given entries
    pub fn map_from<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::Map(Rc::new(RefCell::new(map)))
    }

    /// A new list filled with the given values
    pub fn list(values: impl IntoIterator<Item = Value>) -> Self {
        Self::List(Rc::new(RefCell::new(values.into_iter().collect())))
    }

    pub fn object(object: impl Object) -> Self {
        Self::Object(Rc::new(object))
    }

    /// Wrap an arbitrary payload, retrieved later with [Value::downcast]
    pub fn opaque<T: Any>(payload: T) -> Self {
        Self::Opaque(Rc::new(payload))
    }

    pub fn future(future: impl Future<Output = BeanResult> + 'static) -> Self {
        Self::Future(future.boxed_local().shared())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&Tsumiki> {
        match self {
            Self::Container(c) => Some(c),
            _ => None,
        }
    }

    /// Borrow the concrete type behind an [Object] value
    pub fn as_object<T: Object>(&self) -> Option<&T> {
        match self {
            Self::Object(o) => o.as_any().downcast_ref(),
            _ => None,
        }
    }

    /// Retrieve the payload of an [Value::Opaque] value
    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        match self {
            Self::Opaque(payload) => payload.clone().downcast().ok(),
            _ => None,
        }
    }

    /// Lookup an entry of a map value
    pub fn entry(&self, key: &str) -> Option<Value> {
        self.as_map()?.borrow().get(key).cloned()
    }

    /// Await the value if it is a future, return it unchanged otherwise.
    pub async fn settle(self) -> BeanResult {
        match self {
            Self::Future(future) => future.await,
            other => Ok(other),
        }
    }
}

/// Scalars compare by value, everything else by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Absent, Self::Absent) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b),
            (Self::Map(a), Self::Map(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            (Self::Future(a), Self::Future(b)) => a.ptr_eq(b),
            (Self::Container(a), Self::Container(b)) => a.ptr_eq(b),
            (Self::Opaque(a), Self::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("Absent"),
            Self::Bool(b) => write!(f, "{b:?}"),
            Self::Int(i) => write!(f, "{i:?}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::List(l) => f.debug_list().entries(l.borrow().iter()).finish(),
            Self::Map(m) => f.debug_map().entries(m.borrow().iter()).finish(),
            Self::Object(o) => write!(f, "Object({})", o.type_name()),
            Self::Function(func) => fmt::Debug::fmt(func, f),
            Self::Future(_) => f.write_str("Future"),
            Self::Container(c) => fmt::Debug::fmt(c, f),
            Self::Opaque(_) => f.write_str("Opaque"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s.into())
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Self::Function(f)
    }
}

impl From<Tsumiki> for Value {
    fn from(c: Tsumiki) -> Self {
        Self::Container(c)
    }
}

/// Caller-defined bean exposing named properties
///
/// This is the "plain property access" used by the default collection getter and setter
/// when a bean is neither a map, a list nor a nested container.
/// Implementors use interior mutability to accept property assignments.
pub trait Object: Any {
    /// Read a property, `None` if it does not exist.
    fn get(&self, property: &str) -> Option<Value>;

    /// Assign a property.
    fn set(&self, property: &str, _value: Value) -> Result<(), WiringError> {
        Err(WiringError::NotACollection {
            property: property.to_owned(),
        })
    }

    fn as_any(&self) -> &dyn Any;

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Arguments of a [Function] call
#[derive(Clone, Debug, Default)]
pub struct Args {
    this: Option<Value>,
    values: Vec<Value>,
}

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self { this: None, values }
    }

    /// The receiver, set when the function was bound or called as a method
    pub fn this(&self) -> Option<&Value> {
        self.this.as_ref()
    }

    /// Positional argument, [Value::Absent] when missing
    pub fn get(&self, index: usize) -> Value {
        self.values.get(index).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

type SyncCall = dyn Fn(Args) -> BeanResult;
type AsyncCall = dyn Fn(Args) -> LocalBoxFuture<'static, BeanResult>;

#[derive(Clone)]
enum Call {
    Sync(Rc<SyncCall>),
    Async(Rc<AsyncCall>),
}

/// A callable value, either synchronous or asynchronous
///
/// Functions are used as constructors, factories, collection getters and setters,
/// and are what promiser and seeker injectors deliver.
#[derive(Clone)]
pub struct Function {
    call: Call,
    receiver: Option<Box<Value>>,
}

impl Function {
    /// Wrap a synchronous callable
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Args) -> BeanResult + 'static,
    {
        Self {
            call: Call::Sync(Rc::new(f)),
            receiver: None,
        }
    }

    /// Wrap an asynchronous callable
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(Args) -> Fut + 'static,
        Fut: Future<Output = BeanResult> + 'static,
    {
        Self {
            call: Call::Async(Rc::new(move |args| f(args).boxed_local())),
            receiver: None,
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self.call, Call::Async(_))
    }

    /// A copy of this function with a fixed receiver.
    ///
    /// Binding an already bound function keeps the original receiver.
    pub fn bind(&self, this: Value) -> Self {
        let mut bound = self.clone();
        if bound.receiver.is_none() {
            bound.receiver = Some(Box::new(this));
        }
        bound
    }

    pub fn receiver(&self) -> Option<&Value> {
        self.receiver.as_deref()
    }

    /// Call the function, awaiting its result if it is asynchronous.
    pub fn call(&self, values: Vec<Value>) -> LocalBoxFuture<'static, BeanResult> {
        self.call_with(None, values)
    }

    /// Call the function with a receiver, ignored if the function is bound.
    pub fn call_with(
        &self,
        this: Option<Value>,
        values: Vec<Value>,
    ) -> LocalBoxFuture<'static, BeanResult> {
        let args = self.args(this, values);
        match &self.call {
            Call::Sync(f) => futures::future::ready(f(args)).boxed_local(),
            Call::Async(f) => f(args),
        }
    }

    /// Call a synchronous function, fails with [WiringError::NotCallable] if it is asynchronous.
    pub fn call_sync(&self, this: Option<Value>, values: Vec<Value>) -> BeanResult {
        match &self.call {
            Call::Sync(f) => f(self.args(this, values)),
            Call::Async(_) => Err(WiringError::NotCallable(
                "asynchronous function called synchronously".into(),
            )),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        let same_call = match (&self.call, &other.call) {
            (Call::Sync(a), Call::Sync(b)) => Rc::ptr_eq(a, b),
            (Call::Async(a), Call::Async(b)) => Rc::ptr_eq(a, b),
            _ => false,
        };
        same_call && self.receiver == other.receiver
    }

    fn args(&self, this: Option<Value>, values: Vec<Value>) -> Args {
        let this = self.receiver.as_deref().cloned().or(this);
        Args { this, values }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_async() { "async" } else { "sync" };
        match &self.receiver {
            Some(_) => write!(f, "Function({kind}, bound)"),
            None => write!(f, "Function({kind})"),
        }
    }
}
