//! Integration tests for the construction kernel and the type factory flavors

use gem_core::{Definition, Flavor, Gem, GemError, TypeId, Value};

fn person_and_student(gem: &Gem) -> (TypeId, TypeId) {
    let b = *gem.builtins();
    let person = gem
        .model(
            "Person",
            &[],
            Definition::new()
                .field("name*", b.text)
                .field("age?", b.number),
        )
        .unwrap();
    let student = gem
        .compose("Student", &[person], Definition::new().field("gpa*", b.number))
        .unwrap();
    (person, student)
}

#[test]
fn test_student_without_gpa_is_rejected() {
    let gem = Gem::new().unwrap();
    let (_, student) = person_and_student(&gem);

    let err = gem
        .construct(student, &[Value::record([("name", "Ann")])])
        .unwrap_err();
    match err {
        GemError::RequiredProperty { owner, key, expected } => {
            assert_eq!(owner, "Student");
            assert_eq!(key, "gpa");
            assert_eq!(expected, "Number");
        }
        other => panic!("expected RequiredProperty, got {:?}", other),
    }
}

#[test]
fn test_student_with_gpa_succeeds() {
    let gem = Gem::new().unwrap();
    let (person, student) = person_and_student(&gem);

    let ann = gem
        .instantiate(
            student,
            &[Value::record([
                ("name", Value::from("Ann")),
                ("gpa", Value::from(3.5)),
            ])],
        )
        .unwrap();
    assert_eq!(ann.get(&gem, "name").unwrap(), Value::from("Ann"));
    assert_eq!(ann.get(&gem, "gpa").unwrap(), Value::from(3.5));
    assert_eq!(ann.get(&gem, "age").unwrap(), Value::Null);
    assert!(ann.is(&gem, person));
    assert!(ann.is(&gem, student));
}

#[test]
fn test_ancestry_reaches_transitive_parents_only() {
    let gem = Gem::new().unwrap();
    let b = *gem.builtins();
    let (person, student) = person_and_student(&gem);
    let graduate = gem
        .compose("Graduate", &[student], Definition::new().field("thesis?", b.text))
        .unwrap();
    let car = gem
        .model("Car", &[], Definition::new().field("wheels", 4))
        .unwrap();

    let grad = gem
        .construct(
            graduate,
            &[Value::record([
                ("name", Value::from("Gus")),
                ("gpa", Value::from(3.9)),
            ])],
        )
        .unwrap();
    assert!(gem.defines(person, &grad));
    assert!(gem.defines(student, &grad));
    assert!(!gem.defines(car, &grad));
    assert!(gem.defines(b.record, &grad));
    assert!(gem.is_same_or_ancestor(graduate, b.record));
    assert!(!gem.is_same_or_ancestor(person, student));
}

#[test]
fn test_undeclared_record_key_is_rejected() {
    let gem = Gem::new().unwrap();
    let (person, _) = person_and_student(&gem);

    let err = gem
        .construct(
            person,
            &[Value::record([
                ("name", Value::from("Ann")),
                ("email", Value::from("ann@example.com")),
            ])],
        )
        .unwrap_err();
    assert!(matches!(err, GemError::UndefinedProperty { ref key, .. } if key == "email"));
}

#[test]
fn test_undeclared_key_is_reported_before_missing_field() {
    let gem = Gem::new().unwrap();
    let (_, student) = person_and_student(&gem);

    let err = gem
        .construct(
            student,
            &[Value::record([
                ("name", Value::from("Ann")),
                ("email", Value::from("ann@example.com")),
            ])],
        )
        .unwrap_err();
    assert!(matches!(err, GemError::UndefinedProperty { ref key, .. } if key == "email"));
}

#[test]
fn test_required_nullable_field_accepts_null() {
    let gem = Gem::new().unwrap();
    let b = *gem.builtins();
    let ty = gem
        .model("Maybe", &[], Definition::new().field("value*", b.number))
        .unwrap();
    assert!(gem.construct(ty, &[]).is_err());

    let nullable = gem
        .model(
            "MaybeNull",
            &[],
            Definition::new().field("value", gem_core::FieldSpec::new(b.number).required().nullable()),
        )
        .unwrap();
    assert!(gem.construct(nullable, &[Value::record([("value", Value::Null)])]).is_ok());
}

#[test]
fn test_abstract_types_are_not_constructible() {
    let gem = Gem::new().unwrap();
    let b = *gem.builtins();
    let shape = gem
        .abstract_type("Shape", &[], Definition::new().field("sides*", b.number))
        .unwrap();
    assert!(matches!(
        gem.construct(shape, &[]),
        Err(GemError::Abstract { ref name }) if name == "Shape"
    ));

    let square = gem
        .compose("Square", &[shape], Definition::new().field("sides", 4))
        .unwrap();
    let sq = gem.instantiate(square, &[Value::list(Vec::<Value>::new())]).unwrap();
    assert_eq!(sq.get(&gem, "sides").unwrap(), Value::from(4));
    assert!(sq.is(&gem, shape));
}

#[test]
fn test_meta_types_are_not_constructible() {
    let gem = Gem::new().unwrap();
    let meta = gem.builtins().meta;
    assert!(matches!(
        gem.construct(meta.root, &[]),
        Err(GemError::MetaType { .. })
    ));
    assert!(matches!(
        gem.construct(meta.model, &[]),
        Err(GemError::MetaType { .. })
    ));
}

#[test]
fn test_produced_types_are_instances_of_their_meta() {
    let gem = Gem::new().unwrap();
    let meta = gem.builtins().meta;
    let (person, student) = person_and_student(&gem);

    assert_eq!(gem.type_of(&Value::Type(person)), Some(meta.model));
    assert_eq!(gem.type_of(&Value::Type(student)), Some(meta.composable));
    assert!(gem.defines(meta.root, &Value::Type(person)));
    assert_eq!(gem.factory(Flavor::Model).meta(), meta.model);
}

#[test]
fn test_extension_of_list_builds_native_payload() {
    let gem = Gem::new().unwrap();
    let b = *gem.builtins();
    let stack = gem
        .extend(
            "Stack",
            b.list,
            Definition::new().method("peek", |_, this, _| {
                let items = this.native().and_then(|v| v.list_items()).unwrap_or_default();
                Ok(items.last().cloned().unwrap_or_default())
            }),
        )
        .unwrap();

    let s = gem
        .instantiate(stack, &[Value::list([1, 2, 3])])
        .unwrap();
    assert_eq!(s.native(), Some(Value::list([1, 2, 3])));
    assert_eq!(s.call(&gem, "peek", &[]).unwrap(), Value::from(3));
    assert!(s.is(&gem, b.list));

    let empty = gem.instantiate(stack, &[]).unwrap();
    assert_eq!(empty.native(), Some(Value::list(Vec::<Value>::new())));
}

#[test]
fn test_extension_requires_a_base() {
    let gem = Gem::new().unwrap();
    let result = gem
        .factory(Flavor::Extension)
        .build("Orphan", &[], Definition::new());
    assert!(result.is_err());
}

#[test]
fn test_extension_runs_base_init_once() {
    let gem = Gem::new().unwrap();
    let b = *gem.builtins();
    let base = gem
        .compose(
            "Tally",
            &[],
            Definition::new()
                .field("count", 0)
                .method("init", |gem, this, _| {
                    let count = this.get(gem, "count")?.as_number().unwrap_or(0.0);
                    this.set(gem, "count", count + 1.0)?;
                    Ok(Value::Undefined)
                }),
        )
        .unwrap();
    let derived = gem
        .extend("SubTally", base, Definition::new().field("label?", b.text))
        .unwrap();

    let t = gem.instantiate(derived, &[]).unwrap();
    assert_eq!(t.get(&gem, "count").unwrap(), Value::from(1));
}

#[test]
fn test_init_can_delegate_to_a_grandparent() {
    let gem = Gem::new().unwrap();
    let b = *gem.builtins();
    let a = gem
        .model(
            "A",
            &[],
            Definition::new()
                .field("property*", b.number)
                .field("value?", b.boolean),
        )
        .unwrap();
    let b_ty = gem
        .compose(
            "B",
            &[a],
            Definition::new().method("init", move |gem, this, args| {
                gem.initialize_as(this, a, args)?;
                Ok(Value::Undefined)
            }),
        )
        .unwrap();
    let c = gem.compose("C", &[b_ty], Definition::new()).unwrap();
    let d = gem.compose("D", &[c], Definition::new()).unwrap();

    let record = Value::record([
        ("property", Value::from(69)),
        ("value", Value::from(true)),
    ]);
    let inst = gem.instantiate(d, &[record]).unwrap();
    assert_eq!(inst.get(&gem, "property").unwrap(), Value::from(69));
    assert_eq!(inst.get(&gem, "value").unwrap(), Value::Bool(true));
    assert!(inst.is(&gem, a));
    assert!(inst.is(&gem, c));
}

#[test]
fn test_instance_arguments_are_merged() {
    let gem = Gem::new().unwrap();
    let (person, _) = person_and_student(&gem);
    let ann = gem
        .construct(person, &[Value::record([("name", "Ann")])])
        .unwrap();
    let copy = gem
        .instantiate(person, &[ann.clone(), Value::record([("age", 41)])])
        .unwrap();
    assert_eq!(copy.get(&gem, "name").unwrap(), Value::from("Ann"));
    assert_eq!(copy.get(&gem, "age").unwrap(), Value::from(41));
    assert!(!copy.ptr_eq(ann.as_instance().unwrap()));
}

#[test]
fn test_instantiate_rejects_primitive_types() {
    let gem = Gem::new().unwrap();
    let b = *gem.builtins();
    assert!(gem.instantiate(b.number, &[Value::from(1)]).is_err());
}

#[test]
fn test_render_uses_enumerable_fields() {
    let gem = Gem::new().unwrap();
    let (person, _) = person_and_student(&gem);
    let ann = gem
        .construct(
            person,
            &[Value::record([("name", Value::from("Ann")), ("age", Value::from(30))])],
        )
        .unwrap();
    assert_eq!(gem.render(&ann).unwrap(), r#"Person { name: "Ann", age: 30 }"#);
    assert_eq!(gem.stringify(person, &ann).unwrap(), r#"Person { name: "Ann", age: 30 }"#);
}
