//! Standard DOM prototypes.
//!
//! Natives only record what they did (see [`Effect`](super::host::Effect)) and
//! keep per-object slots; there is no layout or network behind them.

use std::sync::Arc;

use super::host::{getter, setter, Accessor, DescriptorFlags, Heap, Member, ObjectRef, Realm, Value};

const ACCESSOR_FLAGS: DescriptorFlags = DescriptorFlags {
    configurable: true,
    enumerable: true,
    writable: None,
};

impl Realm {
    /// Realm with the DOM prototype chains and a `document` object.
    pub fn with_dom() -> Self {
        let mut realm = Realm::new();
        for (name, parent) in [
            ("EventTarget", None),
            ("Node", Some("EventTarget")),
            ("Element", Some("Node")),
            ("HTMLElement", Some("Element")),
            ("HTMLImageElement", Some("HTMLElement")),
            ("HTMLScriptElement", Some("HTMLElement")),
            ("Document", Some("Node")),
            ("HTMLDocument", Some("Document")),
            ("XMLHttpRequest", Some("EventTarget")),
        ] {
            realm.define_prototype(name, parent);
        }

        let heap = realm.heap();
        let members: [(&str, &str, Member); 9] = [
            ("Node", "appendChild", append_child(&heap)),
            ("Node", "insertBefore", insert_before(&heap)),
            ("Element", "setAttribute", set_attribute(&heap)),
            ("Element", "getAttribute", get_attribute(&heap)),
            ("Element", "innerHTML", slot_accessor(&heap, "innerHTML")),
            ("HTMLImageElement", "src", slot_accessor(&heap, "src")),
            ("HTMLScriptElement", "src", slot_accessor(&heap, "src")),
            ("Document", "createElement", create_element(&heap)),
            ("XMLHttpRequest", "open", xhr_open(&heap)),
        ];
        for (proto, name, member) in members {
            if let Err(e) = realm.define_member(proto, name, member) {
                tracing::error!(error = %e, "dom binding incomplete");
            }
        }

        realm.document = Some(heap.alloc("HTMLDocument"));
        realm
    }

    /// The realm's `document`, when it has a DOM.
    pub fn document(&self) -> Option<&ObjectRef> {
        self.document.as_ref()
    }

    /// Drop the whole document content (used for foreign frames).
    pub fn clear_document(&self) {
        let heap = self.heap();
        if let Some(doc) = &self.document {
            heap.set_slot(doc, "innerHTML", Value::str(""));
        }
        heap.mark_document_cleared();
    }

    pub fn is_document_cleared(&self) -> bool {
        self.heap().is_document_cleared()
    }
}

/// Prototype for a tag name, as `createElement` picks it.
pub fn class_for_tag(tag: &str) -> &'static str {
    match tag.to_ascii_lowercase().as_str() {
        "img" => "HTMLImageElement",
        "script" => "HTMLScriptElement",
        _ => "HTMLElement",
    }
}

fn append_child(heap: &Arc<Heap>) -> Member {
    let heap = heap.clone();
    Member::method(move |recv, args| {
        heap.record(recv, "appendChild", args);
        args.first().cloned().unwrap_or(Value::Undefined)
    })
}

fn insert_before(heap: &Arc<Heap>) -> Member {
    let heap = heap.clone();
    Member::method(move |recv, args| {
        heap.record(recv, "insertBefore", args);
        args.first().cloned().unwrap_or(Value::Undefined)
    })
}

fn set_attribute(heap: &Arc<Heap>) -> Member {
    let heap = heap.clone();
    Member::method(move |recv, args| {
        heap.record(recv, "setAttribute", args);
        if let (Some(name), Some(value)) = (args.first().and_then(Value::to_text), args.get(1)) {
            heap.set_slot(recv, &format!("attr:{}", name.to_ascii_lowercase()), value.clone());
        }
        Value::Undefined
    })
}

fn get_attribute(heap: &Arc<Heap>) -> Member {
    let heap = heap.clone();
    Member::method(move |recv, args| {
        args.first()
            .and_then(Value::to_text)
            .and_then(|name| heap.slot(recv, &format!("attr:{}", name.to_ascii_lowercase())))
            .unwrap_or(Value::Null)
    })
}

fn slot_accessor(heap: &Arc<Heap>, name: &'static str) -> Member {
    let read = heap.clone();
    let write = heap.clone();
    Member::Accessor(Accessor {
        get: Some(getter(move |recv| read.slot(recv, name).unwrap_or(Value::str("")))),
        set: Some(setter(move |recv, value| {
            write.record(recv, name, std::slice::from_ref(&value));
            write.set_slot(recv, name, value);
        })),
        flags: ACCESSOR_FLAGS,
    })
}

fn create_element(heap: &Arc<Heap>) -> Member {
    let heap = heap.clone();
    Member::method(move |recv, args| {
        heap.record(recv, "createElement", args);
        let tag = args.first().and_then(Value::to_text).unwrap_or_default();
        Value::Object(heap.alloc(class_for_tag(&tag)))
    })
}

fn xhr_open(heap: &Arc<Heap>) -> Member {
    let heap = heap.clone();
    Member::method(move |recv, args| {
        heap.record(recv, "open", args);
        if let Some(url) = args.get(1) {
            heap.set_slot(recv, "url", url.clone());
        }
        Value::Undefined
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn members_resolve_to_their_dom_owners() {
        let realm = Realm::with_dom();
        assert_eq!(realm.resolve("HTMLImageElement", "appendChild").unwrap().0, "Node");
        assert_eq!(realm.resolve("HTMLScriptElement", "innerHTML").unwrap().0, "Element");
        assert_eq!(realm.resolve("HTMLDocument", "createElement").unwrap().0, "Document");
        assert!(realm.resolve("XMLHttpRequest", "appendChild").is_none());
    }

    #[test]
    fn create_element_picks_class_by_tag() {
        let realm = Realm::with_dom();
        let doc = realm.document().unwrap().clone();
        match realm.call(&doc, "createElement", &[Value::str("IMG")]).unwrap() {
            Value::Object(o) => assert_eq!(o.class(), "HTMLImageElement"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn src_round_trips_through_accessor() {
        let realm = Realm::with_dom();
        let img = realm.create_object("HTMLImageElement");
        realm.set(&img, "src", Value::str("https://a.com/x.png")).unwrap();
        assert_eq!(realm.get(&img, "src").unwrap(), Value::str("https://a.com/x.png"));
    }

    #[test]
    fn set_attribute_names_are_case_insensitive() {
        let realm = Realm::with_dom();
        let el = realm.create_object("HTMLElement");
        realm.call(&el, "setAttribute", &[Value::str("SRC"), Value::str("x")]).unwrap();
        assert_eq!(realm.call(&el, "getAttribute", &[Value::str("src")]).unwrap(), Value::str("x"));
    }

    #[test]
    fn clear_document_marks_realm() {
        let realm = Realm::with_dom();
        assert!(!realm.is_document_cleared());
        realm.clear_document();
        assert!(realm.is_document_cleared());
    }
}
