// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Demonstration suites shipped with the binary.

use opsbench::{Candidate, Harness, Hook, SuiteConfig};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Register every demonstration suite on `harness`.
pub fn register(harness: &mut Harness) {
    string_building(harness);
    counter_increments(harness);
    map_insertion(harness);
    completion_styles(harness);
}

fn string_building(harness: &mut Harness) {
    let age = Rc::new(Cell::new(15u32));

    let suite = harness.create_suite(
        "String building",
        SuiteConfig::new().description("Build the same sentence in different ways"),
    );

    let a = age.clone();
    suite.setup(Hook::sync(move || a.set(21)));

    let a = age.clone();
    suite.add(
        "format!",
        Candidate::sync(move || format!("Whiskey has an age of {} years.", a.get())),
    );

    let a = age.clone();
    suite.add(
        "join",
        Candidate::sync(move || {
            let age = a.get().to_string();
            ["Whiskey has an age of", age.as_str(), "years."].join(" ")
        }),
    );

    let a = age.clone();
    suite.reference(
        "push_str",
        Candidate::sync(move || {
            let mut s = String::from("Whiskey has an age of ");
            s.push_str(&a.get().to_string());
            s.push_str(" years.");
            s
        }),
    );

    let a = age;
    suite.add(
        "concat",
        Candidate::sync(move || {
            let age = a.get().to_string();
            ["Whiskey has an age of ", age.as_str(), " years."].concat()
        }),
    );
}

fn counter_increments(harness: &mut Harness) {
    let suite = harness.create_suite("Increment integer", SuiteConfig::new());

    let plain = Rc::new(Cell::new(0u64));
    suite.add("+= 1", Candidate::sync(move || plain.set(plain.get() + 1)));

    let wrapping = Rc::new(Cell::new(0u64));
    suite.add(
        "wrapping_add",
        Candidate::sync(move || wrapping.set(wrapping.get().wrapping_add(1))),
    );

    let checked = Rc::new(Cell::new(0u64));
    suite.add(
        "checked_add",
        Candidate::try_sync(move || {
            let next = checked.get().checked_add(1).ok_or("counter overflow")?;
            checked.set(next);
            Ok::<(), &str>(())
        }),
    );
}

fn map_insertion(harness: &mut Harness) {
    let hash: Rc<RefCell<HashMap<u64, u64>>> = Rc::default();
    let btree: Rc<RefCell<BTreeMap<u64, u64>>> = Rc::default();
    let counter = Rc::new(Cell::new(0u64));

    let suite = harness.create_suite(
        "HashMap vs BTreeMap",
        SuiteConfig::new()
            .time_ms(1000)
            .description("Insert increasing keys")
            .meta("keys", "u64"),
    );

    let (h, b) = (hash.clone(), btree.clone());
    suite.setup(Hook::sync(move || {
        tracing::debug!("allocating maps");
        *h.borrow_mut() = HashMap::with_capacity(1024);
        *b.borrow_mut() = BTreeMap::new();
    }));

    let (h, b, c) = (hash.clone(), btree.clone(), counter.clone());
    suite.teardown(Hook::sync(move || {
        tracing::debug!(
            hash = h.borrow().len(),
            btree = b.borrow().len(),
            counter = c.get(),
            "dropping maps"
        );
        h.borrow_mut().clear();
        b.borrow_mut().clear();
    }));

    let c = counter.clone();
    suite.add(
        "HashMap::insert",
        Candidate::sync(move || {
            let key = c.get();
            c.set(key + 1);
            hash.borrow_mut().insert(key, key)
        }),
    );

    let c = counter;
    suite.add(
        "BTreeMap::insert",
        Candidate::sync(move || {
            let key = c.get();
            c.set(key + 1);
            btree.borrow_mut().insert(key, key)
        }),
    );
}

fn add(a: u64, b: u64) -> u64 {
    a + b
}

fn completion_styles(harness: &mut Harness) {
    let suite = harness.create_suite(
        "Sync vs async",
        SuiteConfig::new().description("Cost of going through a future"),
    );

    suite.add("sync", Candidate::sync(|| add(5, 8)));
    suite.add(
        "ready future",
        Candidate::future(|| async {
            std::hint::black_box(add(5, 8));
        }),
    );
    suite.add("yield_now", Candidate::future(tokio::task::yield_now));
}
