use model_rules_core::{
    ModelErrorKind, ModelReference, ModelRegistry, NodeRegistration, NodeState, Path, RegistryOptions, RuleDescriptor,
    RuleRegistration, RuleSource, SearchDepth, TypeToken, ValidationErrorType,
};
use rstest::{fixture, rstest};
use std::cell::Cell;
use std::error::Error;
use std::rc::Rc;

fn p(s: &str) -> Path {
    Path::parse(s).unwrap()
}

fn marks() -> TypeToken {
    TypeToken::named("Marks")
}

/// A registry with a `values` element holding a string.
#[fixture]
fn registry() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry.register(&p("values"), NodeRegistration::instance(String::from("foo"))).unwrap();
    registry
}

#[rstest]
fn test_sources_with_dependencies_cannot_be_scoped(mut registry: ModelRegistry) {
    registry.apply(
        &p("values"),
        RuleSource::new("RuleSourceUsingRuleWithDependencies").rule(
            RuleRegistration::mutate("mutate", ModelReference::path(Path::root())).with_external_dependencies(),
        ),
    );

    let err = registry.get::<String>(&p("values")).unwrap_err();
    assert_eq!(err.kind(), ModelErrorKind::ScopeViolation);
    assert!(err
        .source()
        .unwrap()
        .to_string()
        .starts_with("Rule source RuleSourceUsingRuleWithDependencies cannot have plugin dependencies"));
}

#[rstest]
fn test_creation_rules_cannot_be_scoped(mut registry: ModelRegistry) {
    registry.apply(
        &p("values"),
        RuleSource::new("ElementRules").rule(RuleRegistration::create("string", p("string"), TypeToken::of::<String>())),
    );

    let err = registry.get::<String>(&p("values")).unwrap_err();
    assert_eq!(err.rule, Some(RuleDescriptor::new("ElementRules", "string")));
    assert_eq!(
        err.cause().to_string(),
        "Rule ElementRules.string cannot be applied at the scope of model element values as creation rules cannot be used when applying rule sources to particular elements."
    );
}

#[rstest]
fn test_relative_paths_resolve_under_scope(mut registry: ModelRegistry) {
    for name in ["first", "second", "values.first", "values.second"] {
        registry.register(&p(name), NodeRegistration::null(TypeToken::of::<String>())).unwrap();
    }
    registry.apply(
        &p("values"),
        RuleSource::new("ValueRules")
            .rule(RuleRegistration::mutate("first", ModelReference::path(p("first"))).action(|ctx| {
                ctx.set_subject(String::from("first"));
                Ok(())
            }))
            .rule(
                RuleRegistration::mutate("second", ModelReference::path(p("second")))
                    .input(ModelReference::path(p("first")))
                    .action(|ctx| {
                        let value = format!("from first: {}", ctx.input::<String>(0)?);
                        ctx.set_subject(value);
                        Ok(())
                    }),
            ),
    );

    registry.realize(&p("values")).unwrap();
    assert_eq!(registry.get::<String>(&p("values.first")).unwrap(), "first");
    assert_eq!(registry.get::<String>(&p("values.second")).unwrap(), "from first: first");
    for name in ["first", "second"] {
        let node = registry.node(&p(name)).unwrap();
        assert!(node.value.is_none());
        assert_eq!(node.state, NodeState::Created);
    }
}

#[rstest]
fn test_type_subjects_bind_only_below_scope(mut registry: ModelRegistry) {
    registry.register(&p("values.mutable"), NodeRegistration::value(marks(), Vec::<String>::new())).unwrap();
    registry.register(&p("elsewhere"), NodeRegistration::value(marks(), Vec::<String>::new())).unwrap();
    registry.apply(
        &p("values"),
        RuleSource::new("MarkRules").rule(RuleRegistration::mutate("mark", ModelReference::of_type(marks())).action(
            |ctx| {
                ctx.subject_mut::<Vec<String>>()?.push(String::from("mutated"));
                Ok(())
            },
        )),
    );

    registry.realize(&p("values")).unwrap();
    assert_eq!(registry.get::<Vec<String>>(&p("values.mutable")).unwrap(), &vec![String::from("mutated")]);
    assert!(registry.get::<Vec<String>>(&p("elsewhere")).unwrap().is_empty());
}

#[rstest]
fn test_type_inputs_search_enclosing_scope(mut registry: ModelRegistry) {
    let integer = TypeToken::named("Integer");
    let number = TypeToken::named("Number");
    registry.register(&p("count"), NodeRegistration::value(integer.clone(), 5_i64)).unwrap();
    registry.register(&p("values.number"), NodeRegistration::value(number.clone(), 0_i64)).unwrap();
    registry.register(&p("other"), NodeRegistration::value(number.clone(), 0_i64)).unwrap();
    registry.apply(
        &p("values"),
        RuleSource::new("NumberRules").rule(
            RuleRegistration::mutate("copy", ModelReference::of_type(number))
                .input(ModelReference::of_type(integer))
                .action(|ctx| {
                    let count = *ctx.input::<i64>(0)?;
                    *ctx.subject_mut::<i64>()? = count;
                    Ok(())
                }),
        ),
    );

    assert_eq!(*registry.get::<i64>(&p("values.number")).unwrap(), 5);
    assert_eq!(*registry.get::<i64>(&p("other")).unwrap(), 0);
}

#[rstest]
fn test_realization_is_idempotent(mut registry: ModelRegistry) {
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    registry.mutate(&p("values"), move |ctx| {
        counter.set(counter.get() + 1);
        ctx.subject_mut::<String>()?.push('!');
        Ok(())
    });

    assert_eq!(registry.get::<String>(&p("values")).unwrap(), "foo!");
    assert_eq!(registry.get::<String>(&p("values")).unwrap(), "foo!");
    assert_eq!(runs.get(), 1);
}

#[rstest]
fn test_rule_reading_its_subject_is_a_cycle(mut registry: ModelRegistry) {
    registry.apply(
        &Path::root(),
        RuleSource::new("Loop").rule(
            RuleRegistration::mutate("self", ModelReference::path(p("values"))).input(ModelReference::path(p("values"))),
        ),
    );

    let err = registry.get::<String>(&p("values")).unwrap_err();
    assert_eq!(err.kind(), ModelErrorKind::Cycle);
    assert_eq!(
        err.cause().to_string(),
        "A cycle has been detected in model rule dependencies. References forming the cycle: values -> values"
    );
    assert_eq!(registry.state(&p("values")), Some(NodeState::Created));
}

#[rstest]
#[case(SearchDepth::Subtree, vec!["mutated"])]
#[case(SearchDepth::Children, vec![])]
fn test_subject_search_depth(#[case] depth: SearchDepth, #[case] expected: Vec<&str>) {
    let options = RegistryOptions { subject_search: depth, ..RegistryOptions::default() };
    let mut registry = ModelRegistry::with_options(options);
    registry.register(&p("values"), NodeRegistration::null(TypeToken::named("Values"))).unwrap();
    registry.register(&p("values.group"), NodeRegistration::null(TypeToken::named("Group"))).unwrap();
    registry.register(&p("values.group.deep"), NodeRegistration::value(marks(), Vec::<String>::new())).unwrap();
    registry.apply(
        &p("values"),
        RuleSource::new("MarkRules").rule(RuleRegistration::mutate("mark", ModelReference::of_type(marks())).action(
            |ctx| {
                ctx.subject_mut::<Vec<String>>()?.push(String::from("mutated"));
                Ok(())
            },
        )),
    );

    let validation = registry.validate();
    assert_eq!(validation.is_ok(), depth == SearchDepth::Subtree);
    if let Err(errors) = validation {
        assert_eq!(errors[0].error_type, ValidationErrorType::Unbound);
    }

    registry.realize(&p("values")).unwrap();
    assert_eq!(registry.get::<Vec<String>>(&p("values.group.deep")).unwrap(), &expected);
}

#[rstest]
#[case::subject(ModelReference::of_type(marks()), ModelReference::path(Path::root()))]
#[case::input(ModelReference::path(Path::root()), ModelReference::of_type(marks()))]
fn test_ambiguous_type_reference_fails_realization(
    mut registry: ModelRegistry,
    #[case] subject: ModelReference,
    #[case] input: ModelReference,
) {
    registry.register(&p("values.a"), NodeRegistration::value(marks(), Vec::<String>::new())).unwrap();
    registry.register(&p("values.b"), NodeRegistration::value(marks(), Vec::<String>::new())).unwrap();
    registry.apply(&p("values"), RuleSource::new("MarkRules").rule(RuleRegistration::mutate("mark", subject).input(input)));

    let err = registry.get::<String>(&p("values")).unwrap_err();
    assert_eq!(err.kind(), ModelErrorKind::Ambiguity);
    assert_eq!(err.rule, Some(RuleDescriptor::new("MarkRules", "mark")));
    assert!(err.cause().to_string().ends_with("values.a, values.b"), "{}", err.cause());
}

#[rstest]
fn test_cycle_across_two_elements(mut registry: ModelRegistry) {
    registry.register(&p("a"), NodeRegistration::instance(1_i32)).unwrap();
    registry.register(&p("b"), NodeRegistration::instance(2_i32)).unwrap();
    registry.apply(
        &Path::root(),
        RuleSource::new("Loop")
            .rule(RuleRegistration::mutate("aFromB", ModelReference::path(p("a"))).input(ModelReference::path(p("b"))))
            .rule(RuleRegistration::mutate("bFromA", ModelReference::path(p("b"))).input(ModelReference::path(p("a")))),
    );

    let err = registry.get::<i32>(&p("a")).unwrap_err();
    assert_eq!(err.kind(), ModelErrorKind::Cycle);
    assert_eq!(err.rule, Some(RuleDescriptor::new("Loop", "bFromA")));
    assert_eq!(
        err.cause().to_string(),
        "A cycle has been detected in model rule dependencies. References forming the cycle: a -> b -> a"
    );
}
