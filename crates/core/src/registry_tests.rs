// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

fn add(registry: &Registry, id: &str) -> (Registry, Vec<Effect>) {
    registry.transition(RegistryEvent::Add {
        worker_id: WorkerId::from(id),
    })
}

fn constructs(effects: &[Effect]) -> Vec<(&IdempotencyKey, &CreateRequest)> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Construct { key, request } => Some((key, request)),
            _ => None,
        })
        .collect()
}

fn next_iteration(effects: &[Effect]) -> Option<(u64, Duration, &IdempotencyKey)> {
    effects.iter().find_map(|e| match e {
        Effect::Schedule {
            call:
                Call::Registry {
                    call: RegistryCall::Demo(DemoRequest { iteration }),
                },
            delay,
            key,
        } => Some((*iteration, *delay, key)),
        _ => None,
    })
}

#[test]
fn initialize_is_empty_and_unfrozen() {
    let (registry, effects) = Registry::initialize();
    assert!(registry.worker_ids.is_empty());
    assert!(!registry.frozen);
    assert!(matches!(
        &effects[0],
        Effect::Persist { operation: Operation::RegistryInitialize }
    ));
}

#[test]
fn add_is_idempotent() {
    let (registry, _) = Registry::initialize();
    let (registry, first) = add(&registry, "w-1");
    let (registry, second) = add(&registry, "w-1");

    assert_eq!(registry.worker_ids, vec![WorkerId::from("w-1")]);
    assert_eq!(first.len(), 2);
    assert!(second.is_empty());
}

#[test]
fn add_keeps_registration_order() {
    let (registry, _) = add(&Registry::default(), "b");
    let (registry, _) = add(&registry, "a");
    let (registry, _) = add(&registry, "c");
    let ids: Vec<&str> = registry.worker_ids.iter().map(WorkerId::as_str).collect();
    assert_eq!(ids, vec!["b", "a", "c"]);
}

#[test]
fn remove_absent_is_a_no_op() {
    let (registry, _) = add(&Registry::default(), "w-1");
    let (after, effects) = registry.transition(RegistryEvent::Remove {
        worker_id: WorkerId::from("w-2"),
    });
    assert_eq!(after, registry);
    assert!(effects.is_empty());
}

#[test]
fn remove_present_forgets_the_worker() {
    let (registry, _) = add(&Registry::default(), "w-1");
    let (registry, effects) = registry.transition(RegistryEvent::Remove {
        worker_id: WorkerId::from("w-1"),
    });
    assert!(registry.worker_ids.is_empty());
    assert!(matches!(
        &effects[1],
        Effect::Emit { event: Event::WorkerRemoved { .. } }
    ));
}

#[test]
fn freeze_toggles_and_repeats_are_quiet() {
    let registry = Registry::default();
    let (frozen, effects) = registry.transition(RegistryEvent::Freeze { frozen: true });
    assert!(frozen.frozen);
    assert_eq!(effects.len(), 2);

    let (again, effects) = frozen.transition(RegistryEvent::Freeze { frozen: true });
    assert!(again.frozen);
    assert!(effects.is_empty());

    let (thawed, _) = again.transition(RegistryEvent::Freeze { frozen: false });
    assert!(!thawed.frozen);
}

#[test]
fn first_demo_iteration_constructs_five() {
    let timings = Timings::default();
    let effects = Registry::default().plan_demo(0, &timings, &mut StdRng::seed_from_u64(1));

    let planned = constructs(&effects);
    assert_eq!(planned.len(), FIRST_DEMO_BATCH);
    let keys: Vec<&str> = planned.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(
        keys,
        vec!["create-0-0", "create-0-1", "create-0-2", "create-0-3", "create-0-4"]
    );
    for (_, request) in planned {
        assert!(request.start_delay() <= timings.max_start_delay);
        assert!(request.task_description.contains(" the "));
    }

    let (iteration, delay, key) = next_iteration(&effects).unwrap();
    assert_eq!(iteration, 1);
    assert_eq!(delay, timings.demo_interval);
    assert_eq!(key.as_str(), "demo/1");
}

#[test]
fn later_iterations_construct_one() {
    let effects =
        Registry::default().plan_demo(7, &Timings::default(), &mut StdRng::seed_from_u64(1));
    let planned = constructs(&effects);
    assert_eq!(planned.len(), DEMO_BATCH);
    assert_eq!(planned[0].0.as_str(), "create-7-0");
    assert_eq!(next_iteration(&effects).unwrap().0, 8);
}

#[test]
fn frozen_registry_only_reschedules() {
    let registry = Registry {
        frozen: true,
        ..Registry::default()
    };
    for iteration in [0, 1, 5] {
        let effects =
            registry.plan_demo(iteration, &Timings::default(), &mut StdRng::seed_from_u64(3));
        assert!(constructs(&effects).is_empty());
        assert_eq!(next_iteration(&effects).unwrap().0, iteration + 1);
    }
}

#[test]
fn replanned_iteration_reuses_keys() {
    // Random draws may differ, but the keys that dedupe construction do not
    let registry = Registry::default();
    let a = registry.plan_demo(0, &Timings::default(), &mut StdRng::seed_from_u64(1));
    let b = registry.plan_demo(0, &Timings::default(), &mut StdRng::seed_from_u64(2));
    let keys = |effects: &[Effect]| -> Vec<IdempotencyKey> {
        constructs(effects).into_iter().map(|(k, _)| k.clone()).collect()
    };
    assert_eq!(keys(&a), keys(&b));
}

#[test]
fn well_known_keys() {
    assert_eq!(initialize_key().as_str(), "initialize");
    assert_eq!(demo_key(0).as_str(), "demo/0");
    assert_eq!(construct_key(2, 3).as_str(), "create-2-3");
}

use proptest::prelude::*;

proptest! {
    #[test]
    fn ids_stay_unique(ops in proptest::collection::vec((any::<bool>(), 0..4u8), 0..40)) {
        let mut registry = Registry::default();
        for (is_add, n) in ops {
            let worker_id = WorkerId(format!("w-{}", n));
            let event = if is_add {
                RegistryEvent::Add { worker_id }
            } else {
                RegistryEvent::Remove { worker_id }
            };
            registry = registry.transition(event).0;
            let mut sorted = registry.worker_ids.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), registry.worker_ids.len());
        }
    }
}
