//! In-process object model standing in for a page's script context.
//!
//! Prototypes form single-parent chains. A member lives on exactly one
//! prototype and is found by walking the chain from the receiver's class,
//! which is how shared prototype state is observed by every object.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use webguard_core::error::{GuardError, Result};

use super::stack::ScriptStack;
use super::table::InterceptionRecord;

/// Chains deeper than this are treated as broken.
const MAX_CHAIN_DEPTH: usize = 64;

/// Script-visible value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Object(ObjectRef),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// String form as `toString()` would produce it; `None` where it would throw.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Undefined | Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Str(s) => Some(s.clone()),
            Value::Object(o) => Some(format!("[object {}]", o.class())),
        }
    }
}

/// Handle to an object allocated in a realm.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    id: u64,
    class: Arc<str>,
}

impl ObjectRef {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the prototype member lookup starts from.
    pub fn class(&self) -> &str {
        &self.class
    }
}

pub type NativeMethod = Arc<dyn Fn(&ObjectRef, &[Value]) -> Value + Send + Sync>;
pub type NativeGetter = Arc<dyn Fn(&ObjectRef) -> Value + Send + Sync>;
pub type NativeSetter = Arc<dyn Fn(&ObjectRef, Value) + Send + Sync>;

/// Property descriptor flags carried over when an accessor is wrapped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DescriptorFlags {
    pub configurable: bool,
    pub enumerable: bool,
    pub writable: Option<bool>,
}

#[derive(Clone)]
pub struct Accessor {
    pub get: Option<NativeGetter>,
    pub set: Option<NativeSetter>,
    pub flags: DescriptorFlags,
}

#[derive(Clone)]
pub enum Member {
    Method(NativeMethod),
    Accessor(Accessor),
}

impl Member {
    pub fn method<F>(f: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Value + Send + Sync + 'static,
    {
        Member::Method(Arc::new(f))
    }
}

pub fn getter<F>(f: F) -> NativeGetter
where
    F: Fn(&ObjectRef) -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn setter<F>(f: F) -> NativeSetter
where
    F: Fn(&ObjectRef, Value) + Send + Sync + 'static,
{
    Arc::new(f)
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Method(_) => f.write_str("Method"),
            Member::Accessor(a) => f
                .debug_struct("Accessor")
                .field("get", &a.get.is_some())
                .field("set", &a.set.is_some())
                .field("flags", &a.flags)
                .finish(),
        }
    }
}

#[derive(Default)]
pub(crate) struct Prototype {
    pub(crate) parent: Option<String>,
    pub(crate) members: HashMap<String, Member>,
}

/// An original native call that actually ran.
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    pub receiver: ObjectRef,
    pub member: String,
    pub args: Vec<Value>,
}

/// Object storage shared with native member implementations.
#[derive(Default)]
pub struct Heap {
    next_id: AtomicU64,
    slots: DashMap<(u64, String), Value>,
    effects: Mutex<Vec<Effect>>,
    document_cleared: AtomicBool,
}

impl Heap {
    pub fn alloc(&self, class: &str) -> ObjectRef {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        ObjectRef {
            id,
            class: Arc::from(class),
        }
    }

    pub fn slot(&self, obj: &ObjectRef, name: &str) -> Option<Value> {
        self.slots.get(&(obj.id, name.to_string())).map(|v| v.value().clone())
    }

    pub fn set_slot(&self, obj: &ObjectRef, name: &str, value: Value) {
        self.slots.insert((obj.id, name.to_string()), value);
    }

    pub fn record(&self, receiver: &ObjectRef, member: &str, args: &[Value]) {
        if let Ok(mut log) = self.effects.lock() {
            log.push(Effect {
                receiver: receiver.clone(),
                member: member.to_string(),
                args: args.to_vec(),
            });
        }
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.effects.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub(crate) fn mark_document_cleared(&self) {
        self.document_cleared.store(true, Ordering::SeqCst);
    }

    pub fn is_document_cleared(&self) -> bool {
        self.document_cleared.load(Ordering::SeqCst)
    }
}

/// One script execution context: its prototypes, objects and running scripts.
///
/// Constructed at context start and dropped with it; nothing in a realm is
/// shared with another context except through the stores.
pub struct Realm {
    pub(crate) protos: DashMap<String, Prototype>,
    pub(crate) table: DashMap<(String, String), InterceptionRecord>,
    heap: Arc<Heap>,
    stack: Arc<ScriptStack>,
    pub(crate) document: Option<ObjectRef>,
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

impl Realm {
    /// Empty realm without any prototypes.
    pub fn new() -> Self {
        Self {
            protos: DashMap::new(),
            table: DashMap::new(),
            heap: Arc::new(Heap::default()),
            stack: Arc::new(ScriptStack::new()),
            document: None,
        }
    }

    pub fn heap(&self) -> Arc<Heap> {
        Arc::clone(&self.heap)
    }

    pub fn script_stack(&self) -> Arc<ScriptStack> {
        Arc::clone(&self.stack)
    }

    pub fn define_prototype(&self, name: &str, parent: Option<&str>) {
        self.protos.insert(
            name.to_string(),
            Prototype {
                parent: parent.map(str::to_string),
                members: HashMap::new(),
            },
        );
    }

    pub fn define_member(&self, proto: &str, name: &str, member: Member) -> Result<()> {
        let mut p = self
            .protos
            .get_mut(proto)
            .ok_or_else(|| GuardError::lookup(proto, name))?;
        p.members.insert(name.to_string(), member);
        Ok(())
    }

    pub fn create_object(&self, class: &str) -> ObjectRef {
        self.heap.alloc(class)
    }

    /// Find the prototype that directly owns `member`, starting at `start`.
    pub fn resolve(&self, start: &str, member: &str) -> Option<(String, Member)> {
        let mut cursor = Some(start.to_string());
        for _ in 0..MAX_CHAIN_DEPTH {
            let name = cursor?;
            let proto = self.protos.get(&name)?;
            if let Some(m) = proto.members.get(member) {
                return Some((name, m.clone()));
            }
            cursor = proto.parent.clone();
        }
        None
    }

    /// Member owned directly by `proto`, without walking the chain.
    pub fn own_member(&self, proto: &str, member: &str) -> Option<Member> {
        self.protos.get(proto)?.members.get(member).cloned()
    }

    pub fn call(&self, receiver: &ObjectRef, member: &str, args: &[Value]) -> Result<Value> {
        match self.resolve(receiver.class(), member) {
            Some((_, Member::Method(f))) => Ok(f(receiver, args)),
            _ => Err(GuardError::lookup(receiver.class(), member)),
        }
    }

    pub fn get(&self, receiver: &ObjectRef, prop: &str) -> Result<Value> {
        match self.resolve(receiver.class(), prop) {
            Some((_, Member::Accessor(Accessor { get: Some(g), .. }))) => Ok(g(receiver)),
            Some((_, Member::Accessor(_))) => Ok(Value::Undefined),
            _ => Err(GuardError::lookup(receiver.class(), prop)),
        }
    }

    pub fn set(&self, receiver: &ObjectRef, prop: &str, value: Value) -> Result<()> {
        match self.resolve(receiver.class(), prop) {
            Some((_, Member::Accessor(Accessor { set: Some(s), .. }))) => {
                s(receiver, value);
                Ok(())
            }
            _ => Err(GuardError::lookup(receiver.class(), prop)),
        }
    }

    /// Run `f` as code loaded from `url` (`None` for inline code).
    pub fn run_script<T>(&self, url: Option<&str>, f: impl FnOnce() -> T) -> T {
        let _frame = self.stack.enter(url);
        f()
    }

    /// Originals that actually executed, in order.
    pub fn effects(&self) -> Vec<Effect> {
        self.heap.effects()
    }
}
