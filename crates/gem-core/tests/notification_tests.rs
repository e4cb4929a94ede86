//! Integration tests for deferred change notification

use gem_core::{Definition, FieldSpec, Gem, GemError, GemOptions, Instance, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn gauge(gem: &Gem, calls: Rc<Cell<usize>>) -> Instance {
    let b = *gem.builtins();
    let ty = gem
        .model(
            "Gauge",
            &[],
            Definition::new().field(
                "level",
                FieldSpec::new(b.number).with_default(0).on_change(move |_, _| {
                    calls.set(calls.get() + 1);
                    Ok(())
                }),
            ),
        )
        .unwrap();
    gem.instantiate(ty, &[]).unwrap()
}

#[test]
fn test_idempotent_write_does_not_notify() {
    let gem = Gem::new().unwrap();
    let calls = Rc::new(Cell::new(0));
    let g = gauge(&gem, calls.clone());

    g.set(&gem, "level", 0).unwrap();
    assert_eq!(gem.pending_notifications(), 0);
    let report = gem.tick();
    assert_eq!(report.notifications, 0);
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_change_notifies_exactly_once_after_tick() {
    let gem = Gem::new().unwrap();
    let calls = Rc::new(Cell::new(0));
    let g = gauge(&gem, calls.clone());

    g.set(&gem, "level", 5).unwrap();
    assert_eq!(calls.get(), 0);
    assert_eq!(gem.pending_notifications(), 1);

    let report = gem.tick();
    assert_eq!(report.notifications, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.pending, 0);
    assert_eq!(calls.get(), 1);

    g.set(&gem, "level", 5).unwrap();
    gem.tick();
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_change_carries_old_and_new_values() {
    let gem = Gem::new().unwrap();
    let b = *gem.builtins();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let ty = gem
        .model(
            "Thermostat",
            &[],
            Definition::new().field(
                "target",
                FieldSpec::new(b.number).with_default(20).on_change(move |_, change| {
                    log.borrow_mut().push((change.key.clone(), change.from.clone(), change.to.clone()));
                    Ok(())
                }),
            ),
        )
        .unwrap();
    let t = gem.instantiate(ty, &[]).unwrap();

    t.set(&gem, "target", 21).unwrap();
    t.set(&gem, "target", 22).unwrap();
    gem.tick();

    assert_eq!(
        *seen.borrow(),
        vec![
            ("target".to_string(), Value::from(20), Value::from(21)),
            ("target".to_string(), Value::from(21), Value::from(22)),
        ]
    );
}

#[test]
fn test_listener_writes_are_delivered_next_tick() {
    let gem = Gem::new().unwrap();
    let b = *gem.builtins();
    let mirrored = Rc::new(Cell::new(0));
    let count = mirrored.clone();
    let ty = gem
        .model(
            "Pair",
            &[],
            Definition::new()
                .field(
                    "source",
                    FieldSpec::new(b.number).with_default(0).on_change(|gem, change| {
                        change.target.set(gem, "mirror", change.to.clone())?;
                        Ok(())
                    }),
                )
                .field(
                    "mirror",
                    FieldSpec::new(b.number).with_default(0).on_change(move |_, _| {
                        count.set(count.get() + 1);
                        Ok(())
                    }),
                ),
        )
        .unwrap();
    let p = gem.instantiate(ty, &[]).unwrap();

    p.set(&gem, "source", 3).unwrap();
    let first = gem.tick();
    assert_eq!(first.notifications, 1);
    assert_eq!(first.pending, 1);
    assert_eq!(mirrored.get(), 0);
    assert_eq!(p.get(&gem, "mirror").unwrap(), Value::from(3));

    let second = gem.tick();
    assert_eq!(second.notifications, 1);
    assert_eq!(mirrored.get(), 1);
}

#[test]
fn test_listener_failures_are_counted_not_raised() {
    let gem = Gem::new().unwrap();
    let b = *gem.builtins();
    let ty = gem
        .model(
            "Fragile",
            &[],
            Definition::new().field(
                "value",
                FieldSpec::new(b.number)
                    .with_default(0)
                    .on_change(|_, _| Err(GemError::Definition("listener broke".into())))
                    .on_change(|_, _| Ok(())),
            ),
        )
        .unwrap();
    let f = gem.instantiate(ty, &[]).unwrap();

    assert!(f.set(&gem, "value", 1).is_ok());
    let report = gem.tick();
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
}

#[test]
fn test_run_until_idle_is_bounded() {
    let options = GemOptions {
        idle_tick_limit: 3,
        ..GemOptions::default()
    };
    let gem = Gem::with_options(options).unwrap();
    let b = *gem.builtins();
    let ty = gem
        .model(
            "Ticker",
            &[],
            Definition::new().field(
                "n",
                FieldSpec::new(b.number).with_default(0).on_change(|gem, change| {
                    let next = change.to.as_number().unwrap_or(0.0) + 1.0;
                    change.target.set(gem, "n", next)?;
                    Ok(())
                }),
            ),
        )
        .unwrap();
    let t = gem.instantiate(ty, &[]).unwrap();

    t.set(&gem, "n", 1).unwrap();
    let report = gem.run_until_idle();
    assert_eq!(report.notifications, 3);
    assert_eq!(report.pending, 1);
    assert_eq!(t.get(&gem, "n").unwrap(), Value::from(4));
}

#[test]
fn test_construction_writes_notify() {
    let gem = Gem::new().unwrap();
    let calls = Rc::new(Cell::new(0));
    let b = *gem.builtins();
    let counter = calls.clone();
    let ty = gem
        .model(
            "Named",
            &[],
            Definition::new().field(
                "name?",
                FieldSpec::new(b.text).on_change(move |_, _| {
                    counter.set(counter.get() + 1);
                    Ok(())
                }),
            ),
        )
        .unwrap();

    gem.construct(ty, &[Value::record([("name", "first")])]).unwrap();
    gem.construct(ty, &[]).unwrap();
    assert_eq!(gem.run_until_idle().notifications, 1);
    assert_eq!(calls.get(), 1);
}
