//! Handler registry for dispatching requests by method name.
//!
//! The registry is the dispatch table: built once before the server starts,
//! immutable afterwards. Handlers are typed: each declares a parameter type
//! that decoded arguments are bound against via serde, so a positional
//! array binds fields in declaration order and a keyword map binds fields
//! by name. Runtime shape inspection stops at the [`CallArgs`] tag.

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use rmpv::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, RpcError};
use crate::protocol::CallArgs;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for registered handler functions.
pub trait Handler: Send + Sync + 'static {
    /// Invoke the handler with validated call arguments.
    fn call(&self, args: CallArgs) -> BoxFuture<'static, Result<Value>>;
}

/// Wrapper that binds call arguments to the handler's parameter type and
/// serializes its return value.
pub struct TypedHandler<F, T, R, Fut>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(T) -> (Fut, R)>,
}

impl<F, T, R, Fut> TypedHandler<F, T, R, Fut>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, T, R, Fut> Handler for TypedHandler<F, T, R, Fut>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    fn call(&self, args: CallArgs) -> BoxFuture<'static, Result<Value>> {
        // Bind the tagged argument container to the declared parameter type.
        let bound: T = match rmpv::ext::from_value(args.into_value()) {
            Ok(v) => v,
            Err(e) => {
                let err = RpcError::InvalidArguments(e.to_string());
                return Box::pin(async move { Err(err) });
            }
        };

        let fut = (self.handler)(bound);
        Box::pin(async move {
            let result = fut.await?;
            rmpv::ext::to_value(&result)
                .map_err(|e| RpcError::Handler(format!("unserializable result: {e}")))
        })
    }
}

/// Registry mapping method names to handlers.
pub struct HandlerRegistry {
    methods: HashMap<String, Box<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Register a method handler.
    ///
    /// The handler takes its declared parameter type and returns a
    /// serializable value or an error. Registering the same name twice
    /// replaces the earlier handler.
    pub fn register<F, T, R, Fut>(&mut self, name: &str, handler: F)
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        self.methods
            .insert(name.to_string(), Box::new(TypedHandler::new(handler)));
    }

    /// Get a handler by method name.
    pub fn get(&self, name: &str) -> Option<&dyn Handler> {
        self.methods.get(name).map(|h| h.as_ref())
    }

    /// Check whether a method name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Check if no methods are registered.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Dispatch a call to the handler registered under `method`.
    ///
    /// # Errors
    ///
    /// - [`RpcError::MethodNotFound`] if no handler carries that name
    /// - whatever the handler itself reports
    pub async fn dispatch(&self, method: &str, args: CallArgs) -> Result<Value> {
        let handler = self
            .get(method)
            .ok_or_else(|| RpcError::MethodNotFound(method.to_string()))?;

        handler.call(args).await
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
