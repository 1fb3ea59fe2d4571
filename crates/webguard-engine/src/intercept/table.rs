//! Interception table: single-shot replacement of prototype members.
//!
//! Installing resolves the member through the target's chain, swaps the
//! owner's member for a forwarding wrapper and records the original. A given
//! (owner, member) pair can be patched once per realm; there is no uninstall.

use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;

use webguard_core::error::{GuardError, Result};

use super::host::{
    getter, setter, Accessor, Member, NativeGetter, NativeMethod, NativeSetter, ObjectRef, Realm, Value,
};

/// One intercepted call as seen by a policy.
pub struct Invocation<'a> {
    pub receiver: &'a ObjectRef,
    pub args: &'a [Value],
}

/// Policy run in place of the original member.
///
/// `proceed` runs the original with the untouched receiver and arguments.
/// Returning `None` means the call was suppressed and yields `undefined`.
pub type Policy = Arc<dyn Fn(&Invocation<'_>, &dyn Fn() -> Value) -> Option<Value> + Send + Sync>;

/// Build a [`Policy`] from a closure.
pub fn policy<F>(f: F) -> Policy
where
    F: Fn(&Invocation<'_>, &dyn Fn() -> Value) -> Option<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub enum Interception {
    Method(Policy),
    /// Missing halves pass straight through to the original accessor.
    Accessor {
        get: Option<Policy>,
        set: Option<Policy>,
    },
}

/// Registry entry for an installed patch.
#[derive(Clone)]
pub struct InterceptionRecord {
    /// Prototype named at install time.
    pub target: String,
    /// Prototype that owns the member and was patched.
    pub owner: String,
    pub member: String,
    pub original: Member,
}

impl fmt::Debug for InterceptionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptionRecord")
            .field("target", &self.target)
            .field("owner", &self.owner)
            .field("member", &self.member)
            .finish()
    }
}

/// Capability to intercept members of a host's shared prototypes.
pub trait HostBinding: Send + Sync {
    fn install(&self, target: &str, member: &str, interception: Interception) -> Result<()>;
}

impl HostBinding for Realm {
    fn install(&self, target: &str, member: &str, interception: Interception) -> Result<()> {
        let (owner, original) = self
            .resolve(target, member)
            .ok_or_else(|| GuardError::lookup(target, member))?;

        let entry = match self.table.entry((owner.clone(), member.to_string())) {
            Entry::Occupied(_) => {
                return Err(GuardError::AlreadyInstalled {
                    target: target.to_string(),
                    member: member.to_string(),
                })
            }
            Entry::Vacant(v) => v,
        };

        let wrapped = match (&original, interception) {
            (Member::Method(f), Interception::Method(policy)) => Member::Method(wrap_method(f.clone(), policy)),
            (Member::Accessor(acc), Interception::Accessor { get, set }) => {
                Member::Accessor(wrap_accessor(acc, get, set))
            }
            // a method where an accessor was expected, or the reverse
            _ => return Err(GuardError::lookup(target, member)),
        };

        self.define_member(&owner, member, wrapped)?;
        tracing::debug!(%target, %owner, %member, "member intercepted");
        entry.insert(InterceptionRecord {
            target: target.to_string(),
            owner,
            member: member.to_string(),
            original,
        });
        Ok(())
    }
}

impl Realm {
    /// Installed patches, sorted by (owner, member).
    pub fn interceptions(&self) -> Vec<InterceptionRecord> {
        let mut out: Vec<InterceptionRecord> = self.table.iter().map(|e| e.value().clone()).collect();
        out.sort_by(|a, b| (&a.owner, &a.member).cmp(&(&b.owner, &b.member)));
        out
    }
}

fn wrap_method(original: NativeMethod, policy: Policy) -> NativeMethod {
    Arc::new(move |receiver: &ObjectRef, args: &[Value]| {
        let proceed = || original(receiver, args);
        let inv = Invocation { receiver, args };
        policy(&inv, &proceed).unwrap_or(Value::Undefined)
    })
}

fn wrap_accessor(original: &Accessor, get: Option<Policy>, set: Option<Policy>) -> Accessor {
    let get_fn: Option<NativeGetter> = match get {
        None => original.get.clone(),
        Some(policy) => {
            let orig = original.get.clone();
            Some(getter(move |receiver: &ObjectRef| {
                let proceed = || orig.as_ref().map(|g| g(receiver)).unwrap_or(Value::Undefined);
                let inv = Invocation { receiver, args: &[] };
                policy(&inv, &proceed).unwrap_or(Value::Undefined)
            }))
        }
    };

    let set_fn: Option<NativeSetter> = match set {
        None => original.set.clone(),
        Some(policy) => {
            let orig = original.set.clone();
            Some(setter(move |receiver: &ObjectRef, value: Value| {
                let args = [value];
                let proceed = || {
                    if let Some(s) = &orig {
                        s(receiver, args[0].clone());
                    }
                    Value::Undefined
                };
                let inv = Invocation { receiver, args: &args };
                let _ = policy(&inv, &proceed);
            }))
        }
    };

    Accessor {
        get: get_fn,
        set: set_fn,
        flags: original.flags,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::intercept::host::DescriptorFlags;

    fn realm() -> Realm {
        let realm = Realm::new();
        realm.define_prototype("Node", None);
        realm.define_prototype("Element", Some("Node"));
        let heap = realm.heap();
        realm
            .define_member(
                "Node",
                "appendChild",
                Member::method(move |recv, args| {
                    heap.record(recv, "appendChild", args);
                    args.first().cloned().unwrap_or(Value::Undefined)
                }),
            )
            .unwrap();
        let heap = realm.heap();
        let heap_get = realm.heap();
        realm
            .define_member(
                "Element",
                "title",
                Member::Accessor(Accessor {
                    get: Some(getter(move |recv| heap_get.slot(recv, "title").unwrap_or(Value::str("")))),
                    set: Some(setter(move |recv, v| {
                        heap.record(recv, "title", std::slice::from_ref(&v));
                        heap.set_slot(recv, "title", v);
                    })),
                    flags: DescriptorFlags {
                        configurable: true,
                        enumerable: true,
                        writable: None,
                    },
                }),
            )
            .unwrap();
        realm
    }

    fn pass_through() -> Policy {
        policy(|_inv, proceed| Some(proceed()))
    }

    #[test]
    fn install_patches_the_owning_prototype() {
        let realm = realm();
        realm.install("Element", "appendChild", Interception::Method(pass_through())).unwrap();

        let recs = realm.interceptions();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].target, "Element");
        assert_eq!(recs[0].owner, "Node");
    }

    #[test]
    fn second_install_is_rejected() {
        let realm = realm();
        realm.install("Element", "appendChild", Interception::Method(pass_through())).unwrap();
        let err = realm
            .install("Node", "appendChild", Interception::Method(pass_through()))
            .unwrap_err();
        assert_eq!(err.kind().as_str(), "ALREADY_INSTALLED");
    }

    #[test]
    fn missing_member_is_lookup_error() {
        let realm = realm();
        let err = realm
            .install("Element", "insertAdjacentHTML", Interception::Method(pass_through()))
            .unwrap_err();
        assert_eq!(err.kind().as_str(), "LOOKUP_ERROR");
        assert!(realm.interceptions().is_empty());
    }

    #[test]
    fn suppressing_policy_skips_original() {
        let realm = realm();
        realm
            .install("Element", "appendChild", Interception::Method(policy(|_inv, _proceed| None)))
            .unwrap();

        let parent = realm.create_object("Element");
        let child = realm.create_object("Element");
        let out = realm.call(&parent, "appendChild", &[Value::Object(child)]).unwrap();
        assert_eq!(out, Value::Undefined);
        assert!(realm.effects().is_empty());
    }

    #[test]
    fn proceed_forwards_receiver_and_args() {
        let realm = realm();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        realm
            .install(
                "Element",
                "appendChild",
                Interception::Method(policy(move |inv, proceed| {
                    seen2.fetch_add(inv.args.len(), Ordering::SeqCst);
                    Some(proceed())
                })),
            )
            .unwrap();

        let parent = realm.create_object("Element");
        let child = Value::Object(realm.create_object("Element"));
        let out = realm.call(&parent, "appendChild", std::slice::from_ref(&child)).unwrap();

        assert_eq!(out, child);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        let effects = realm.effects();
        assert_eq!(effects[0].receiver, parent);
        assert_eq!(effects[0].args, vec![child]);
    }

    #[test]
    fn accessor_without_get_policy_reads_through() {
        let realm = realm();
        realm
            .install(
                "Element",
                "title",
                Interception::Accessor {
                    get: None,
                    set: Some(policy(|inv, proceed| {
                        if inv.args[0] == Value::str("blocked") {
                            return None;
                        }
                        Some(proceed())
                    })),
                },
            )
            .unwrap();

        let el = realm.create_object("Element");
        realm.set(&el, "title", Value::str("ok")).unwrap();
        realm.set(&el, "title", Value::str("blocked")).unwrap();
        assert_eq!(realm.get(&el, "title").unwrap(), Value::str("ok"));

        match realm.own_member("Element", "title").unwrap() {
            Member::Accessor(acc) => {
                assert!(acc.flags.configurable);
                assert!(acc.flags.enumerable);
                assert!(acc.get.is_some());
            }
            other => panic!("expected accessor, got {other:?}"),
        }
    }

    #[test]
    fn kind_mismatch_is_lookup_error() {
        let realm = realm();
        let err = realm
            .install("Element", "title", Interception::Method(pass_through()))
            .unwrap_err();
        assert_eq!(err.kind().as_str(), "LOOKUP_ERROR");
        // nothing recorded, so a correct install still works
        realm
            .install("Element", "title", Interception::Accessor { get: None, set: Some(pass_through()) })
            .unwrap();
    }
}
