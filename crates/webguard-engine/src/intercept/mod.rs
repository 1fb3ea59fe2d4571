//! Host binding: the page object model and its interception table.
//!
//! - `host`: prototypes, members, objects and member resolution (`Realm`).
//! - `table`: the `HostBinding` capability and the single-shot patch registry.
//! - `stack`: which script is executing, rendered as a stack trace.
//! - `dom`: the standard DOM prototypes the guard targets.

pub mod dom;
pub mod host;
pub mod stack;
pub mod table;

pub use host::{getter, setter, Accessor, DescriptorFlags, Effect, Heap, Member, ObjectRef, Realm, Value};
pub use stack::{ScriptStack, StackSource};
pub use table::{policy, HostBinding, Interception, InterceptionRecord, Invocation, Policy};
