//! Command handlers and how the bus finds them.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::command::{Command, CommandType};
use crate::error::BusError;

/// A command travelling through the bus with its type erased.
pub type BoxedCommand = Box<dyn Any + Send>;

/// Executes one command kind.
///
/// `identity_map` is the unit of work's map, or `None` when the bus runs
/// without one; the handler then persists its own changes. Closures of the
/// matching shape are handlers too.
pub trait CommandHandler<C, M, E>: Send + Sync + 'static {
    fn handle(&self, command: C, identity_map: Option<&mut M>) -> Result<(), E>;
}

impl<C, M, E, F> CommandHandler<C, M, E> for F
where
    F: Fn(C, Option<&mut M>) -> Result<(), E> + Send + Sync + 'static,
{
    fn handle(&self, command: C, identity_map: Option<&mut M>) -> Result<(), E> {
        self(command, identity_map)
    }
}

/// Object-safe form of [`CommandHandler`] used for dispatch.
pub trait DynCommandHandler<M, E>: Send + Sync {
    fn command_type(&self) -> CommandType;

    fn handle(&self, command: BoxedCommand, identity_map: Option<&mut M>) -> Result<(), E>;
}

/// Shared, type-erased handler.
pub type SharedHandler<M, E> = Arc<dyn DynCommandHandler<M, E>>;

struct Typed<C, H> {
    handler: H,
    command_type: CommandType,
    _command: PhantomData<fn(C)>,
}

impl<C, M, E, H> DynCommandHandler<M, E> for Typed<C, H>
where
    C: Command,
    H: CommandHandler<C, M, E>,
    E: From<BusError>,
{
    fn command_type(&self) -> CommandType {
        self.command_type
    }

    fn handle(&self, command: BoxedCommand, identity_map: Option<&mut M>) -> Result<(), E> {
        let command = command
            .downcast::<C>()
            .map_err(|_| BusError::CommandMismatch {
                expected: self.command_type.name(),
            })?;
        self.handler.handle(*command, identity_map)
    }
}

/// Finds the handler for a command kind.
pub trait HandlerResolver<M>: Send + Sync {
    /// Error type shared by every handler this resolver returns.
    type Error: From<BusError>;

    fn resolve(&self, command_type: CommandType) -> Option<SharedHandler<M, Self::Error>>;

    /// Wraps a resolved handler before the bus runs it.
    ///
    /// Hook for validation or instrumentation around handlers; returns the
    /// handler unchanged unless overridden.
    fn proxy(
        &self,
        handler: SharedHandler<M, Self::Error>,
        command_type: CommandType,
    ) -> SharedHandler<M, Self::Error> {
        let _ = command_type;
        handler
    }
}

/// Explicit command kind → handler registrations.
pub struct HandlerRegistry<M, E> {
    handlers: HashMap<TypeId, SharedHandler<M, E>>,
}

impl<M, E> HandlerRegistry<M, E>
where
    M: 'static,
    E: From<BusError> + 'static,
{
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers the handler for command kind `C`.
    ///
    /// Fails with [`BusError::DuplicateHandler`] if `C` already has one.
    pub fn register<C, H>(&mut self, handler: H) -> Result<&mut Self, BusError>
    where
        C: Command,
        H: CommandHandler<C, M, E>,
    {
        let command_type = CommandType::of::<C>();
        if self.handlers.contains_key(&command_type.id()) {
            return Err(BusError::DuplicateHandler {
                command_type: command_type.name(),
            });
        }

        let typed = Typed {
            handler,
            command_type,
            _command: PhantomData,
        };
        self.handlers.insert(command_type.id(), Arc::new(typed));
        tracing::debug!(
            command = %command_type,
            operation = %command_type.handler_name(),
            "command handler registered"
        );
        Ok(self)
    }

    pub fn contains<C: Command>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<C>())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered kinds with their derived operation names, sorted by kind.
    pub fn operations(&self) -> Vec<(&'static str, String)> {
        let mut operations: Vec<_> = self
            .handlers
            .values()
            .map(|handler| {
                let command_type = handler.command_type();
                (command_type.name(), command_type.handler_name())
            })
            .collect();
        operations.sort();
        operations
    }
}

impl<M, E> Default for HandlerRegistry<M, E>
where
    M: 'static,
    E: From<BusError> + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M, E> HandlerResolver<M> for HandlerRegistry<M, E>
where
    M: 'static,
    E: From<BusError> + 'static,
{
    type Error = E;

    fn resolve(&self, command_type: CommandType) -> Option<SharedHandler<M, E>> {
        self.handlers.get(&command_type.id()).cloned()
    }
}
