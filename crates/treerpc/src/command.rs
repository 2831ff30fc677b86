//! # Typed Commands
//!
//! A [`Command`] is one remote procedure, typed at the call site and erased
//! in the registry.
//!
//! ## Architecture
//!
//! - **Slot**: the handler cell shared between the command and the registry.
//!   It implements [`Invoke`], which is all the dispatch table ever sees.
//! - **Command**: the typed face owned by the endpoint. Client-side it encodes
//!   arguments and decodes the result; server-side it fills the slot.
//! - **Arity Impls**: `call`, `bind`, `bind_ref` and `bind_mut` are generated per
//!   argument count, so callers pass plain arguments and plain closures.
//!
//! The handler slot is guarded by a lock, so rebinding while a dispatch is in
//! flight is safe: the in-flight call finishes with the handler it started
//! with, and the next one sees only the new handler.

use std::any::type_name;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;

use crate::endpoint::CommandInfo;
use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::error::Result;
use crate::macros::for_each_arity;
use crate::node::Node;
use crate::serializer::Serializer;
use crate::transport;
use crate::transport::CommandId;
use crate::transport::Invoke;
use crate::transport::Role;
use crate::transport::Transport;

type Handler<R, A> = Arc<dyn Fn(A) -> R + Send + Sync>;

/// The handler cell behind one registered command.
struct Slot<R, A> {
    name: String,
    handler: RwLock<Option<Handler<R, A>>>,
}

impl<R, A> Slot<R, A> {
    fn current(&self) -> Option<Handler<R, A>> {
        self.handler.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn replace(&self, handler: Option<Handler<R, A>>) {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = handler;
    }
}

impl<R, A> Invoke for Slot<R, A>
where
    R: Serializer + 'static,
    A: Serializer + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, args: Node) -> Result<Node> {
        // the lock is released before the handler runs, so a handler may rebind itself
        let handler = self.current().ok_or_else(|| Error::Unbound {
            command: self.name.clone(),
        })?;
        let args = A::deserialize(args)?;
        Ok(handler(args).serialize())
    }
}

/// A remote procedure returning `R` and taking the argument tuple `A`.
///
/// `A` is `()` for no arguments, `(T,)` for one, `(T, U)` for two, and so on.
/// A single argument that is itself a pair is written `((T, U),)`.
///
/// Return and argument types must implement [`Serializer`], which borrowed
/// views do not:
///
/// ```compile_fail
/// use treerpc::Command;
/// use treerpc::Endpoint;
/// use treerpc::LoopbackServer;
///
/// let endpoint = Endpoint::new(LoopbackServer::new());
/// let name: Command<&'static str> = Command::new(&endpoint, "name");
/// ```
pub struct Command<R, A = ()> {
    transport: Arc<dyn Transport>,
    id: CommandId,
    slot: Arc<Slot<R, A>>,
}

impl<R, A> Command<R, A>
where
    R: Serializer + 'static,
    A: Serializer + 'static,
{
    /// Creates the command and registers it with the endpoint's transport,
    /// which assigns the next identifier.
    pub fn new(endpoint: &Endpoint, name: impl Into<String>) -> Self {
        let slot = Arc::new(Slot {
            name: name.into(),
            handler: RwLock::new(None),
        });
        let transport = Arc::clone(endpoint.transport());
        let id = transport.add_command(slot.clone());

        Self {
            transport,
            id,
            slot,
        }
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.slot.name
    }

    /// Human-readable signature, e.g. `(u32, u32) -> u32`.
    pub fn signature(&self) -> String {
        format!("{} -> {}", type_name::<A>(), type_name::<R>())
    }

    pub fn info(&self) -> CommandInfo {
        CommandInfo {
            id: self.id,
            name: self.slot.name.clone(),
            signature: self.signature(),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn is_bound(&self) -> bool {
        self.slot.current().is_some()
    }

    /// Removes the bound handler; later dispatches fail as unbound.
    pub fn unbind(&self) -> Result<()> {
        self.require(Role::Server)?;
        self.slot.replace(None);
        Ok(())
    }

    fn require(&self, required: Role) -> Result<()> {
        let actual = self.transport.role();
        if actual == required {
            Ok(())
        } else {
            Err(Error::Role {
                command: self.slot.name.clone(),
                required,
                actual,
            })
        }
    }

    /// Client path shared by every arity.
    fn call_tuple(&self, args: A) -> Result<R> {
        self.require(Role::Client)?;

        let envelope = transport::envelope(self.id, args.serialize());
        let reply = self.transport.invoke_endpoint(envelope)?;

        R::deserialize(reply)
    }

    /// Server path shared by every arity.
    fn install(&self, handler: Handler<R, A>) -> Result<()> {
        self.require(Role::Server)?;
        self.slot.replace(Some(handler));
        Ok(())
    }
}

macro_rules! command_arity {
    ($($arg:ident $ty:ident),*) => {
        impl<R, $($ty),*> Command<R, ($($ty,)*)>
        where
            R: Serializer + 'static,
            $($ty: Serializer + 'static,)*
        {
            /// Calls the command on the serving side and waits for its result.
            ///
            /// Fails with a role violation unless the transport is a client.
            pub fn call(&self, $($arg: $ty),*) -> Result<R> {
                self.call_tuple(($($arg,)*))
            }

            /// Binds a handler, replacing any earlier one.
            ///
            /// Fails with a role violation unless the transport is a server.
            pub fn bind<F>(&self, handler: F) -> Result<()>
            where
                F: Fn($($ty),*) -> R + Send + Sync + 'static,
            {
                self.install(Arc::new(move |($($arg,)*): ($($ty,)*)| handler($($arg),*)))
            }

            /// Binds a method that reads its receiver.
            pub fn bind_ref<T>(&self, receiver: Arc<T>, method: fn(&T $(, $ty)*) -> R) -> Result<()>
            where
                T: Send + Sync + 'static,
            {
                self.bind(move |$($arg),*| method(&receiver $(, $arg)*))
            }

            /// Binds a method that mutates its receiver. Calls are serialized
            /// through the receiver's mutex.
            pub fn bind_mut<T>(&self, receiver: Arc<Mutex<T>>, method: fn(&mut T $(, $ty)*) -> R) -> Result<()>
            where
                T: Send + 'static,
            {
                self.bind(move |$($arg),*| {
                    let mut guard = receiver.lock().unwrap_or_else(PoisonError::into_inner);
                    method(&mut guard $(, $arg)*)
                })
            }
        }
    };
}

for_each_arity!(command_arity);
