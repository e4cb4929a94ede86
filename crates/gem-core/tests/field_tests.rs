//! Integration tests for field descriptors and accessors

use gem_core::{Definition, ExternalStore, FieldSpec, Gem, GemError, Instance, TypeRef, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

fn account(gem: &Gem) -> Instance {
    let b = *gem.builtins();
    let ty = gem
        .model(
            "Account",
            &[],
            Definition::new()
                .field("owner*", b.text)
                .field("balance", FieldSpec::new(b.number).with_default(0))
                .field("nickname?", b.text)
                .field("_secret", b.text)
                .field(
                    "id",
                    FieldSpec::getter(b.text, |_, ctx| Ok(Value::text(format!("acct-{}", ctx.target.id())))),
                ),
        )
        .unwrap();
    gem.instantiate(ty, &[Value::record([("owner", "Ann")])]).unwrap()
}

#[test]
fn test_mismatched_assignment_is_rejected() {
    let gem = Gem::new().unwrap();
    let acct = account(&gem);

    let err = acct.set(&gem, "owner", 42).unwrap_err();
    match err {
        GemError::Assignment {
            owner,
            key,
            expected,
            modifier,
            received,
            cause,
            ..
        } => {
            assert_eq!(owner, "Account");
            assert_eq!(key, "owner");
            assert_eq!(expected, "Text");
            assert_eq!(modifier, "*");
            assert_eq!(received, "Number");
            assert!(cause.is_none());
        }
        other => panic!("expected Assignment, got {:?}", other),
    }
    assert_eq!(acct.get(&gem, "owner").unwrap(), Value::from("Ann"));
}

#[test]
fn test_text_is_parsed_into_non_text_fields() {
    let gem = Gem::new().unwrap();
    let acct = account(&gem);

    assert_eq!(acct.set(&gem, "balance", "42").unwrap(), Value::from(42));
    assert_eq!(acct.get(&gem, "balance").unwrap(), Value::from(42));

    let err = acct.set(&gem, "balance", "forty-two").unwrap_err();
    match err {
        GemError::Assignment { cause: Some(cause), .. } => {
            assert!(matches!(*cause, GemError::Parse { .. }));
        }
        other => panic!("expected Assignment with a cause, got {:?}", other),
    }
    assert_eq!(acct.get(&gem, "balance").unwrap(), Value::from(42));
}

#[test]
fn test_nullable_field_admits_null_only() {
    let gem = Gem::new().unwrap();
    let acct = account(&gem);

    acct.set(&gem, "nickname", "annie").unwrap();
    assert!(acct.set(&gem, "nickname", Value::Null).is_ok());
    assert_eq!(acct.get(&gem, "nickname").unwrap(), Value::Null);
    assert!(matches!(
        acct.set(&gem, "nickname", true),
        Err(GemError::Assignment { .. })
    ));
    assert!(matches!(
        acct.set(&gem, "owner", Value::Null),
        Err(GemError::Assignment { .. })
    ));
}

#[test]
fn test_getter_fields_are_read_only() {
    let gem = Gem::new().unwrap();
    let acct = account(&gem);

    let id = acct.get(&gem, "id").unwrap();
    assert_eq!(id, Value::text(format!("acct-{}", acct.id())));
    assert!(matches!(
        acct.set(&gem, "id", "other"),
        Err(GemError::ReadOnly { ref key, .. }) if key == "id"
    ));
}

#[test]
fn test_private_fields_are_hidden_but_usable() {
    let gem = Gem::new().unwrap();
    let acct = account(&gem);

    acct.set(&gem, "_secret", "hunter2").unwrap();
    assert_eq!(acct.get(&gem, "_secret").unwrap(), Value::from("hunter2"));
    let keys: Vec<String> = acct.entries(&gem).unwrap().into_iter().map(|(k, _)| k).collect();
    assert!(!keys.contains(&"_secret".to_string()));
    assert!(keys.contains(&"owner".to_string()));
}

#[test]
fn test_unknown_key_set_is_rejected() {
    let gem = Gem::new().unwrap();
    let acct = account(&gem);
    assert!(matches!(
        acct.set(&gem, "missing", 1),
        Err(GemError::UndefinedProperty { .. })
    ));
    assert_eq!(acct.get(&gem, "missing").unwrap(), Value::Undefined);
}

#[test]
fn test_custom_setter_result_is_cached() {
    let gem = Gem::new().unwrap();
    let b = *gem.builtins();
    let ty = gem
        .model(
            "Tag",
            &[],
            Definition::new().field(
                "label",
                FieldSpec::new(b.text).set_with(|_, ctx| {
                    Ok(Value::text(ctx.to.as_text().unwrap_or_default().to_uppercase()))
                }),
            ),
        )
        .unwrap();
    let tag = gem.instantiate(ty, &[Value::record([("label", "news")])]).unwrap();
    assert_eq!(tag.get(&gem, "label").unwrap(), Value::from("NEWS"));
}

#[test]
fn test_lazy_type_reference_resolves_on_first_use() {
    let gem = Gem::new().unwrap();
    let node = gem
        .model(
            "Node",
            &[],
            Definition::new()
                .field("value", 0)
                .field("next?", FieldSpec::new(TypeRef::from("Node"))),
        )
        .unwrap();

    let tail = gem.construct(node, &[Value::record([("value", 2)])]).unwrap();
    let head = gem
        .instantiate(node, &[Value::record([("value", Value::from(1)), ("next", tail.clone())])])
        .unwrap();
    assert_eq!(head.get(&gem, "next").unwrap(), tail);
    assert!(head.set(&gem, "next", 5).is_err());
}

#[test]
fn test_self_referencing_instances_render() {
    let gem = Gem::new().unwrap();
    let node = gem
        .model(
            "Node",
            &[],
            Definition::new()
                .field("value", 0)
                .field("next?", FieldSpec::new(TypeRef::from("Node"))),
        )
        .unwrap();

    let a = gem.instantiate(node, &[Value::record([("value", 1)])]).unwrap();
    a.set(&gem, "next", Value::Instance(a.clone())).unwrap();
    assert_eq!(
        gem.stringify(node, &Value::Instance(a.clone())).unwrap(),
        "Node { value: 1, next: Node { .. } }"
    );

    let b = gem.instantiate(node, &[Value::record([("value", 2)])]).unwrap();
    b.set(&gem, "next", Value::Instance(a.clone())).unwrap();
    a.set(&gem, "next", Value::Instance(b.clone())).unwrap();
    assert_eq!(
        gem.render(&Value::Instance(a.clone())).unwrap(),
        "Node { value: 1, next: Node { value: 2, next: Node { .. } } }"
    );
    assert_eq!(
        Value::list([Value::Instance(a.clone())]).to_string(),
        format!("[Node#{}]", a.id())
    );
}

#[test]
fn test_unresolved_type_name_fails_on_use() {
    let gem = Gem::new().unwrap();
    let ty = gem
        .model(
            "Dangling",
            &[],
            Definition::new().field("thing?", FieldSpec::new(TypeRef::from("Nowhere"))),
        )
        .unwrap();
    let err = gem.construct(ty, &[Value::record([("thing", 1)])]).unwrap_err();
    assert!(matches!(err, GemError::UnresolvedType(_)));
}

#[derive(Default)]
struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
    writes: Cell<usize>,
}

impl ExternalStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) {
        self.writes.set(self.writes.get() + 1);
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
    }
}

#[test]
fn test_store_backed_field_round_trips_through_text() {
    let gem = Gem::new().unwrap();
    let b = *gem.builtins();
    let store = Rc::new(MemoryStore::default());
    let shared = store.clone();
    let ty = gem
        .model(
            "Settings",
            &[],
            Definition::new().field(
                "volume?",
                FieldSpec::backed_by(b.number, move |_| shared.clone() as Rc<dyn ExternalStore>),
            ),
        )
        .unwrap();

    let first = gem.instantiate(ty, &[]).unwrap();
    assert_eq!(first.get(&gem, "volume").unwrap(), Value::Null);
    first.set(&gem, "volume", 7).unwrap();
    assert_eq!(store.read("volume"), Some("7".to_string()));

    let second = gem.instantiate(ty, &[]).unwrap();
    assert_eq!(second.get(&gem, "volume").unwrap(), Value::from(7));

    second.set(&gem, "volume", 7).unwrap();
    assert_eq!(store.writes.get(), 1);
}
