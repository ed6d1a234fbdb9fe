use tracing_test::traced_test;

use super::*;
use crate::error::DevsError;
use crate::model::{RecorderModel, TicModel};
use crate::time::TimeUnit;
use crate::value::ValueKind;

const UNIT: TimeUnit = TimeUnit::Seconds;

fn uri(s: &str) -> ModelUri {
    ModelUri::new(s)
}

fn tic(name: &str) -> AtomicDescriptor {
    TicModel::descriptor(name, UNIT)
}

fn sink(name: &str) -> AtomicDescriptor {
    RecorderModel::descriptor(name, UNIT, ["tic"])
}

/// house ⊃ {plant ⊃ {tank}, meter}
fn nested() -> Architecture {
    let mut arch = Architecture::with_time_unit(UNIT);
    arch.add_coupled_model_as_root(
        CoupledDescriptor::new("house")
            .with_submodel("plant")
            .with_submodel("meter")
            .connect(EventSource::new("plant", "tic"), EventSink::new("meter", "tic")),
    )
    .unwrap();
    arch.add_coupled_model(
        CoupledDescriptor::new("plant")
            .with_submodel("tank")
            .reexport("tic", EventSource::new("tank", "tic")),
    )
    .unwrap();
    arch.add_atomic_model(tic("tank")).unwrap();
    arch.add_atomic_model(sink("meter")).unwrap();
    arch
}

// ── Registration ──────────────────────────────────────────────────────

#[test]
fn test_second_atomic_root_is_rejected() {
    let mut arch = Architecture::with_time_unit(UNIT);
    arch.add_atomic_model_as_root(tic("a")).unwrap();
    assert!(arch.is_mono_model());

    assert!(matches!(
        arch.add_atomic_model_as_root(tic("b")),
        Err(DevsError::ArchitectureNotEmpty { count: 1 })
    ));
    assert!(matches!(
        arch.add_atomic_model_as_root(tic("a")),
        Err(DevsError::DuplicateModel(_))
    ));
    assert_eq!(arch.all_models(), vec![uri("a")]);
    assert_eq!(arch.root_model(), Some(&uri("a")));
}

#[test]
fn test_root_and_time_unit_are_set_once() {
    let mut arch = nested();
    assert!(matches!(
        arch.add_coupled_model_as_root(CoupledDescriptor::new("other").with_submodel("x")),
        Err(DevsError::RootAlreadySet { .. })
    ));
    assert!(!arch.is_model(&uri("other")));
    assert!(matches!(arch.set_root(&uri("plant")), Err(DevsError::RootAlreadySet { .. })));
    assert!(matches!(arch.set_time_unit(UNIT), Err(DevsError::TimeUnitAlreadySet)));

    let mut fresh = Architecture::new();
    assert!(!fresh.is_time_unit_set());
    fresh.set_time_unit(TimeUnit::Minutes).unwrap();
    assert_eq!(fresh.time_unit(), Some(TimeUnit::Minutes));
    assert!(matches!(fresh.set_root(&uri("ghost")), Err(DevsError::UnknownModel(_))));
}

#[test]
fn test_duplicate_uri_is_rejected() {
    let mut arch = nested();
    assert!(matches!(
        arch.add_atomic_model(tic("tank")),
        Err(DevsError::DuplicateModel(_))
    ));
    assert_eq!(arch.model_count(), 4);
}

#[test]
fn test_remove_and_readd_gives_identical_answers() {
    let mut arch = nested();
    let queries = |arch: &Architecture| {
        (
            arch.is_model(&uri("tank")),
            arch.is_atomic_model(&uri("tank")).ok(),
            arch.is_coupled_model(&uri("tank")).ok(),
            arch.is_complete(),
        )
    };
    let before = queries(&arch);
    assert_eq!(before, (true, Some(true), Some(false), true));

    let removed = arch.remove_model(&uri("tank")).unwrap();
    assert!(!arch.is_model(&uri("tank")));
    assert!(matches!(arch.is_atomic_model(&uri("tank")), Err(DevsError::UnknownModel(_))));
    assert_eq!(arch.missing_references(), vec![uri("tank")]);

    match removed {
        ModelDescriptor::Atomic(d) => arch.add_atomic_model(d).unwrap(),
        ModelDescriptor::Coupled(_) => panic!("tank is atomic"),
    }
    assert_eq!(queries(&arch), before);
}

#[test]
fn test_removing_the_root_clears_it() {
    let mut arch = nested();
    arch.remove_model(&uri("house")).unwrap();
    assert_eq!(arch.root_model(), None);
    assert!(!arch.is_complete());
    arch.set_root(&uri("plant")).unwrap();
    assert!(arch.is_root_model(&uri("plant")));
}

// ── Ancestry ──────────────────────────────────────────────────────────

#[test]
fn test_ancestry_queries() {
    let arch = nested();
    assert_eq!(arch.children_of(&uri("house")).unwrap(), vec![uri("plant"), uri("meter")]);
    assert_eq!(
        arch.descendants_of(&uri("house")).unwrap(),
        vec![uri("plant"), uri("tank"), uri("meter")]
    );
    assert_eq!(arch.parent_of(&uri("tank")), Some(&uri("plant")));
    assert_eq!(arch.parent_of(&uri("house")), None);

    assert!(arch.is_child_model_of(&uri("tank"), &uri("plant")).unwrap());
    assert!(!arch.is_child_model_of(&uri("tank"), &uri("house")).unwrap());
    assert!(arch.is_descendant(&uri("tank"), &uri("house")).unwrap());
    assert!(!arch.is_descendant(&uri("meter"), &uri("plant")).unwrap());
}

#[test]
fn test_ancestry_contract_violations() {
    let arch = nested();
    assert!(matches!(
        arch.is_descendant(&uri("house"), &uri("house")),
        Err(DevsError::ProtocolViolation { .. })
    ));
    assert!(matches!(
        arch.children_of(&uri("ghost")),
        Err(DevsError::UnknownModel(_))
    ));
    assert!(matches!(
        arch.children_of(&uri("tank")),
        Err(DevsError::UnknownModel(_))
    ));
    assert!(matches!(
        arch.is_descendant(&uri("tank"), &uri("meter")),
        Err(DevsError::UnknownModel(_))
    ));
}

#[test]
fn test_child_query_preconditions() {
    let arch = nested();
    match arch.is_child_model_of(&uri("tank"), &uri("meter")) {
        Err(DevsError::UnknownModel(model)) => assert_eq!(model, uri("meter")),
        other => panic!("unexpected {:?}", other),
    }
    match arch.is_child_model_of(&uri("ghost"), &uri("plant")) {
        Err(DevsError::UnknownModel(model)) => assert_eq!(model, uri("ghost")),
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        arch.is_child_model_of(&uri("plant"), &uri("plant")),
        Err(DevsError::ProtocolViolation { .. })
    ));
    assert!(arch.is_child_model_of(&uri("tank"), &uri("plant")).unwrap());
}

// ── Completeness and ordering ─────────────────────────────────────────

#[test]
fn test_incomplete_architecture_constructs_nothing() {
    let mut arch = Architecture::with_time_unit(UNIT);
    arch.add_coupled_model_as_root(
        CoupledDescriptor::new("pair")
            .with_submodel("tic")
            .with_submodel("sink"),
    )
    .unwrap();
    arch.add_atomic_model(tic("tic")).unwrap();

    assert!(!arch.is_complete());
    assert_eq!(arch.missing_references(), vec![uri("sink")]);
    assert!(matches!(
        arch.construct_simulator(),
        Err(DevsError::IncompleteArchitecture(_))
    ));
    assert!(matches!(
        arch.topological_sort(),
        Err(DevsError::IncompleteArchitecture(_))
    ));

    let mut no_unit = Architecture::new();
    no_unit.add_atomic_model_as_root(tic("tic")).unwrap();
    assert!(!no_unit.is_complete());
    assert!(matches!(
        no_unit.construct_simulator(),
        Err(DevsError::IncompleteArchitecture(_))
    ));
}

#[test]
fn test_children_precede_parents() {
    let arch = nested();
    let order = arch.topological_sort().unwrap();
    assert_eq!(order, vec![uri("tank"), uri("plant"), uri("meter"), uri("house")]);

    for coupled in order.iter().filter(|u| arch.is_coupled_model(u).unwrap()) {
        let at = |u: &ModelUri| order.iter().position(|o| o == u).unwrap();
        for child in arch.children_of(coupled).unwrap() {
            assert!(at(&child) < at(coupled), "{} before {}", child, coupled);
        }
    }

    assert_eq!(
        arch.topological_sort_from(&uri("plant")).unwrap(),
        vec![uri("tank"), uri("plant")]
    );
}

#[test]
fn test_folded_models_are_filtered_out() {
    let mut arch = Architecture::with_time_unit(UNIT);
    arch.add_coupled_model_as_root(
        CoupledDescriptor::new("site")
            .with_submodel("bundle")
            .with_submodel("sink"),
    )
    .unwrap();
    arch.add_coupled_model(
        CoupledDescriptor::new("bundle")
            .with_submodel("tic_a")
            .with_submodel("tic_b")
            .with_creation_mode(EngineCreationMode::AtomicEngine),
    )
    .unwrap();
    for name in ["tic_a", "tic_b"] {
        arch.add_atomic_model(tic(name).with_creation_mode(EngineCreationMode::NoEngine))
            .unwrap();
    }
    arch.add_atomic_model(sink("sink")).unwrap();

    let order = arch.topological_sort().unwrap();
    assert_eq!(order.len(), 5);
    assert_eq!(
        arch.extract_models_with_engine(&order),
        vec![uri("bundle"), uri("sink"), uri("site")]
    );
    assert!(arch.is_engine_creation_mode(&uri("tic_a"), EngineCreationMode::NoEngine));
    assert!(arch.validate().is_ok());
}

// ── Validation ────────────────────────────────────────────────────────

#[test]
fn test_validate_resolves_run_context() {
    let mut arch = nested();
    arch.declare_priority("stop", "start");
    let run = arch.validate().unwrap();
    assert_eq!(run.time_unit(), UNIT);
    assert!(run.priorities().rank(&"stop".into()) < run.priorities().rank(&"start".into()));
}

#[test]
fn test_model_with_two_parents_is_rejected() {
    let mut arch = Architecture::with_time_unit(UNIT);
    arch.add_coupled_model_as_root(
        CoupledDescriptor::new("a")
            .with_submodel("b")
            .with_submodel("tic"),
    )
    .unwrap();
    arch.add_coupled_model(CoupledDescriptor::new("b").with_submodel("tic"))
        .unwrap();
    arch.add_atomic_model(tic("tic")).unwrap();

    match arch.validate() {
        Err(DevsError::InvalidDescriptor { uri: model, reason }) => {
            assert_eq!(model, uri("tic"));
            assert!(reason.contains("both"));
        }
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_folded_child_needs_single_engine_parent() {
    let mut arch = Architecture::with_time_unit(UNIT);
    arch.add_coupled_model_as_root(
        CoupledDescriptor::new("pair")
            .with_submodel("tic")
            .with_submodel("sink"),
    )
    .unwrap();
    arch.add_atomic_model(tic("tic").with_creation_mode(EngineCreationMode::NoEngine))
        .unwrap();
    arch.add_atomic_model(sink("sink")).unwrap();
    assert!(matches!(
        arch.validate(),
        Err(DevsError::InvalidDescriptor { .. })
    ));
}

#[test]
fn test_atomic_cannot_coordinate() {
    let mut arch = Architecture::with_time_unit(UNIT);
    assert!(matches!(
        arch.add_atomic_model(tic("tic").with_creation_mode(EngineCreationMode::CoordinationEngine)),
        Err(DevsError::InvalidDescriptor { .. })
    ));
}

#[test]
fn test_time_unit_mismatch_is_rejected() {
    let mut arch = Architecture::with_time_unit(UNIT);
    arch.add_atomic_model_as_root(TicModel::descriptor("tic", TimeUnit::Minutes))
        .unwrap();
    let err = arch.validate().unwrap_err();
    assert!(err.to_string().contains("time unit"));
}

#[test]
fn test_route_to_undeclared_import_is_rejected() {
    let mut arch = Architecture::with_time_unit(UNIT);
    arch.add_coupled_model_as_root(
        CoupledDescriptor::new("pair")
            .with_submodel("tic")
            .with_submodel("sink")
            .connect(EventSource::new("tic", "tic"), EventSink::new("sink", "toc")),
    )
    .unwrap();
    arch.add_atomic_model(tic("tic")).unwrap();
    arch.add_atomic_model(sink("sink")).unwrap();

    let err = arch.validate().unwrap_err();
    assert!(err.to_string().contains("does not import toc"), "{}", err);
}

#[test]
fn test_binding_kind_mismatch_is_rejected() {
    let mut arch = Architecture::with_time_unit(UNIT);
    arch.add_coupled_model_as_root(
        CoupledDescriptor::new("room")
            .with_submodel("gauge")
            .with_submodel("reader")
            .bind(
                VariableSource::new("level", ValueKind::Real, "gauge"),
                VariableSink::new("level", ValueKind::Integer, "reader"),
            ),
    )
    .unwrap();
    arch.add_atomic_model(
        tic("gauge")
            .with_signature(ModelSignature::new().exports_variable("level", ValueKind::Real)),
    )
    .unwrap();
    arch.add_atomic_model(
        tic("reader")
            .with_signature(ModelSignature::new().imports_variable("level", ValueKind::Integer)),
    )
    .unwrap();

    let err = arch.validate().unwrap_err();
    assert!(err.to_string().contains("mixes"), "{}", err);
}

#[test]
fn test_priority_cycle_is_rejected() {
    let mut arch = nested();
    arch.declare_priority("start", "stop");
    arch.declare_priority("stop", "refill");
    arch.declare_priority("refill", "start");
    assert!(matches!(arch.validate(), Err(DevsError::PriorityCycle(_))));
    assert!(arch.construct_simulator().is_err());
}

#[traced_test]
#[test]
fn test_unreachable_model_is_reported() {
    let mut arch = nested();
    arch.add_atomic_model(tic("stray")).unwrap();
    assert!(arch.validate().is_ok());
    assert!(logs_contain("not reachable from the root"));
}
