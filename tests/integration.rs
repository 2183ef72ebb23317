//! End-to-end tests for the reasoner bridge.
//!
//! These drive a [`Reasoner`] through the public API only: declare and tell,
//! classify and realise, then query, checking state transitions and error
//! mapping along the way.

use std::time::Duration;

use dlbridge::config::ReasonerConfig;
use dlbridge::entity::{EntityHandle, EntityKind};
use dlbridge::error::{BridgeError, KernelFault};
use dlbridge::kernel::KbState;
use dlbridge::reasoner::Reasoner;

fn names(handles: &[EntityHandle]) -> Vec<String> {
    let mut names: Vec<String> = handles.iter().map(|h| h.name().to_string()).collect();
    names.sort();
    names
}

/// Animal > Mammal > Dog, Cat; Mammal disjoint from Fish; rex is a Dog.
fn zoo() -> Reasoner {
    let mut r = Reasoner::new();
    let animal = r.declare_class("Animal").unwrap();
    let mammal = r.declare_class("Mammal").unwrap();
    let fish = r.declare_class("Fish").unwrap();
    let dog = r.declare_class("Dog").unwrap();
    let cat = r.declare_class("Cat").unwrap();
    r.implies_concepts(&mammal, &animal).unwrap();
    r.implies_concepts(&fish, &animal).unwrap();
    r.implies_concepts(&dog, &mammal).unwrap();
    r.implies_concepts(&cat, &mammal).unwrap();
    r.disjoint_concepts(&[&mammal, &fish]).unwrap();
    let rex = r.declare_individual("rex").unwrap();
    r.instance_of(&rex, &dog).unwrap();
    r
}

#[test]
fn fresh_reasoner_has_done_nothing() {
    let r = Reasoner::new();
    assert!(!r.is_preprocessed());
    assert!(!r.is_classified());
    assert!(!r.is_realised());
    assert_eq!(r.state(), KbState::Empty);
}

#[test]
fn empty_kb_classifies_and_realises() {
    let mut r = Reasoner::new();
    r.set_operation_timeout(Duration::ZERO);
    r.classify().unwrap();
    assert!(r.is_preprocessed());
    assert!(r.is_classified());
    r.realise().unwrap();
    assert!(r.is_realised());
    assert!(r.is_classified());

    let top = r.top().unwrap();
    assert_eq!(top.kind(), EntityKind::Class);
    assert_eq!(top.name(), "*TOP*");
}

#[test]
fn realise_before_classify_fails_every_time() {
    let mut r = zoo();
    for _ in 0..3 {
        assert!(matches!(
            r.realise(),
            Err(BridgeError::NotClassified { operation: "realise" })
        ));
        assert!(!r.is_realised());
    }
}

#[test]
fn clear_returns_to_empty() {
    let mut r = zoo();
    let dog = r.class("Dog").unwrap();
    r.classify().unwrap();
    assert!(r.is_classified());

    r.clear().unwrap();
    assert_eq!(r.state(), KbState::Empty);
    assert!(!r.is_classified());
    assert!(matches!(r.not(&dog), Err(BridgeError::StaleHandle { .. })));
    assert!(r.entities(EntityKind::Class).unwrap().iter().all(|c| c.name().starts_with('*')));
}

#[test]
fn unknown_class_lookup_fails() {
    let r = zoo();
    match r.class("Unicorn") {
        Err(BridgeError::UnknownEntity { kind, name }) => {
            assert_eq!(kind, EntityKind::Class);
            assert_eq!(name, "Unicorn");
        }
        other => panic!("expected UnknownEntity, got {other:?}"),
    }
    // An individual is not a class.
    assert!(r.class("rex").is_err());
}

#[test]
fn repeated_lookup_gives_equal_name_and_kind() {
    let r = zoo();
    let a = r.class("Dog").unwrap();
    let b = r.class("Dog").unwrap();
    assert_eq!(a.name(), b.name());
    assert_eq!(a.kind(), b.kind());
}

#[test]
fn restricted_datatype_with_swapped_arguments_fails() {
    let mut r = Reasoner::new();
    let int = r.builtin_data_type("xsd:int").unwrap();
    let zero = r.data_value("0", &int).unwrap();
    let non_negative = r.min_inclusive(&zero).unwrap();

    assert!(matches!(
        r.restricted_data_type(&non_negative, &int),
        Err(BridgeError::KindMismatch { .. })
    ));
    let natural = r.restricted_data_type(&int, &non_negative).unwrap();
    assert_eq!(natural.kind(), EntityKind::DataTypeExpression);
}

#[test]
fn custom_property_names_apply_on_classify() {
    let mut r = Reasoner::new();
    r.set_top_bottom_property_names(
        "owl:topObjectProperty",
        "owl:bottomObjectProperty",
        "owl:topDataProperty",
        "owl:bottomDataProperty",
    )
    .unwrap();
    r.classify().unwrap();
    assert_eq!(r.top_object_property().unwrap().name(), "owl:topObjectProperty");
    assert_eq!(r.bottom_object_property().unwrap().name(), "owl:bottomObjectProperty");
    assert_eq!(r.top_data_property().unwrap().name(), "owl:topDataProperty");
    assert_eq!(r.bottom_data_property().unwrap().name(), "owl:bottomDataProperty");
    assert_eq!(r.top_data_property().unwrap().kind(), EntityKind::DataProperty);
}

#[test]
fn property_name_taken_by_a_class_is_reported() {
    let mut r = Reasoner::new();
    r.declare_class("hasPart").unwrap();
    r.set_top_bottom_property_names("hasPart", "none", "anyData", "noData")
        .unwrap();
    assert!(matches!(
        r.classify(),
        Err(BridgeError::Kernel(KernelFault::CantRegisterName { .. }))
    ));
    assert!(!r.is_classified());
}

#[test]
fn failed_rename_drops_the_classified_state() {
    let mut r = Reasoner::new();
    let part = r.declare_class("hasPart").unwrap();
    let whole = r.declare_class("Whole").unwrap();
    r.implies_concepts(&part, &whole).unwrap();
    r.classify().unwrap();
    assert!(r.is_classified());

    r.set_top_bottom_property_names("hasPart", "none", "anyData", "noData")
        .unwrap();
    assert!(matches!(
        r.classify(),
        Err(BridgeError::Kernel(KernelFault::CantRegisterName { .. }))
    ));
    assert_eq!(r.state(), KbState::Loaded);
    assert!(matches!(
        r.sub_classes(&whole, true),
        Err(BridgeError::NotClassified { .. })
    ));

    r.set_top_bottom_property_names("U", "E", "UD", "ED").unwrap();
    r.classify().unwrap();
    assert_eq!(r.top_object_property().unwrap().name(), "U");
}

#[test]
fn config_applies_names_and_timeout() {
    let config = ReasonerConfig::from_toml_str(
        r#"
        operation_timeout_ms = 5000

        [property_names]
        top_object = "U"
        bottom_object = "E"
        top_data = "UD"
        bottom_data = "ED"
        "#,
    )
    .unwrap();
    let mut r = Reasoner::with_config(config).unwrap();
    assert_eq!(r.config().operation_timeout_ms, 5000);
    r.classify().unwrap();
    assert_eq!(r.top_object_property().unwrap().name(), "U");
}

#[test]
fn told_hierarchy_is_queryable() {
    let mut r = zoo();
    r.classify().unwrap();
    let animal = r.class("Animal").unwrap();
    let mammal = r.class("Mammal").unwrap();
    let dog = r.class("Dog").unwrap();

    assert_eq!(names(&r.sub_classes(&mammal, true).unwrap()), ["Cat", "Dog"]);
    assert_eq!(names(&r.super_classes(&dog, true).unwrap()), ["Mammal"]);
    assert_eq!(
        names(&r.super_classes(&dog, false).unwrap()),
        ["*TOP*", "Animal", "Mammal"]
    );
    assert!(r.is_subsumed_by(&dog, &animal).unwrap());
    assert!(!r.is_subsumed_by(&animal, &dog).unwrap());
    assert!(r.equivalent_classes(&dog).unwrap().is_empty());
}

#[test]
fn complex_expressions_take_part_in_subsumption() {
    let mut r = zoo();
    let dog = r.class("Dog").unwrap();
    let cat = r.class("Cat").unwrap();
    let mammal = r.class("Mammal").unwrap();
    let pet = r.declare_class("Pet").unwrap();
    let dog_or_cat = r.or(&[&dog, &cat]).unwrap();
    r.implies_concepts(&dog_or_cat, &pet).unwrap();
    let pet_mammal = r.and(&[&pet, &mammal]).unwrap();
    r.classify().unwrap();

    assert!(r.is_subsumed_by(&dog, &pet).unwrap());
    assert!(r.is_subsumed_by(&cat, &pet).unwrap());
    assert!(r.is_subsumed_by(&dog, &pet_mammal).unwrap());
    assert!(r.is_subsumed_by(&pet_mammal, &mammal).unwrap());
}

#[test]
fn realised_kb_answers_type_queries() {
    let mut r = zoo();
    r.classify().unwrap();
    r.realise().unwrap();
    let rex = r.individual("rex").unwrap();
    let mammal = r.class("Mammal").unwrap();

    assert_eq!(names(&r.types(&rex, true).unwrap()), ["Dog"]);
    assert!(names(&r.types(&rex, false).unwrap()).contains(&"Animal".to_string()));
    assert_eq!(names(&r.instances(&mammal, false).unwrap()), ["rex"]);
    assert!(r.instances(&mammal, true).unwrap().is_empty());
}

#[test]
fn telling_after_classify_needs_reclassification() {
    let mut r = zoo();
    r.classify().unwrap();
    let dog = r.class("Dog").unwrap();
    let puppy = r.declare_class("Puppy").unwrap();
    r.implies_concepts(&puppy, &dog).unwrap();
    assert!(!r.is_classified());
    assert!(matches!(
        r.sub_classes(&dog, true),
        Err(BridgeError::NotClassified { .. })
    ));
    r.classify().unwrap();
    assert_eq!(names(&r.sub_classes(&dog, true).unwrap()), ["Puppy"]);
}

#[test]
fn disjoint_types_make_the_kb_inconsistent() {
    let mut r = zoo();
    let rex = r.individual("rex").unwrap();
    let fish = r.class("Fish").unwrap();
    r.instance_of(&rex, &fish).unwrap();

    assert!(!r.is_consistent().unwrap());
    assert!(matches!(
        r.classify(),
        Err(BridgeError::Kernel(KernelFault::InconsistentKb { .. }))
    ));
}

#[test]
fn role_cycle_is_a_kernel_fault() {
    let mut r = Reasoner::new();
    let p = r.declare_object_property("partOf").unwrap();
    let q = r.declare_object_property("componentOf").unwrap();
    r.implies_object_properties(&p, &q).unwrap();
    r.implies_object_properties(&q, &p).unwrap();
    match r.classify() {
        Err(BridgeError::Kernel(KernelFault::CycleInRia { roles })) => {
            assert_eq!(roles, "componentOf, partOf");
        }
        other => panic!("expected CycleInRia, got {other:?}"),
    }
}

#[test]
fn counting_over_a_transitive_role_is_rejected() {
    let mut r = Reasoner::new();
    let ancestor = r.declare_object_property("ancestorOf").unwrap();
    r.set_transitive(&ancestor).unwrap();
    let person = r.declare_class("Person").unwrap();
    let few = r.max_cardinality(2, &ancestor, &person).unwrap();
    let limited = r.declare_class("Limited").unwrap();
    r.implies_concepts(&limited, &few).unwrap();
    assert!(matches!(
        r.classify(),
        Err(BridgeError::Kernel(KernelFault::NonSimpleRole { .. }))
    ));
}

#[test]
fn data_restrictions_build_classes() {
    let mut r = Reasoner::new();
    let age = r.declare_data_property("age").unwrap();
    let int = r.builtin_data_type("http://www.w3.org/2001/XMLSchema#integer").unwrap();
    let eighteen = r.data_value("18", &int).unwrap();
    let adult_age = r.min_inclusive(&eighteen).unwrap();
    let adult_range = r.restricted_data_type(&int, &adult_age).unwrap();
    let adult = r.data_some(&age, &adult_range).unwrap();
    assert_eq!(adult.kind(), EntityKind::Class);

    let not_adult = r.data_not(&adult_range).unwrap();
    let any_age = r.data_or(&[&adult_range, &not_adult]).unwrap();
    assert_eq!(any_age.kind(), EntityKind::DataTypeExpression);

    assert!(matches!(
        r.data_some(&age, &eighteen),
        Err(BridgeError::KindMismatch { actual: EntityKind::DataValue, .. })
    ));
}

#[test]
fn queries_on_wrong_state_are_rejected() {
    let mut r = zoo();
    let dog = r.class("Dog").unwrap();
    assert!(matches!(
        r.is_subsumed_by(&dog, &dog),
        Err(BridgeError::NotClassified { .. })
    ));
    r.classify().unwrap();
    let rex = r.individual("rex").unwrap();
    assert!(matches!(r.types(&rex, true), Err(BridgeError::NotRealised { .. })));
}

#[test]
fn tiny_timeout_on_large_kb_times_out() {
    let mut r = Reasoner::new();
    let mut prev = r.declare_class("C0").unwrap();
    for i in 1..2000 {
        let next = r.declare_class(&format!("C{i}")).unwrap();
        r.implies_concepts(&next, &prev).unwrap();
        prev = next;
    }
    r.set_operation_timeout(Duration::from_nanos(1));
    assert!(matches!(
        r.classify(),
        Err(BridgeError::Kernel(KernelFault::Timeout { .. }))
    ));
    r.set_operation_timeout(Duration::ZERO);
    r.classify().unwrap();
    assert!(r.is_classified());
}
