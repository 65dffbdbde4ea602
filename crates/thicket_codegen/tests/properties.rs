// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structural guarantees of resolution and generation.

use pretty_assertions::assert_eq;
use thicket_codegen::binding::BindingType;
use thicket_codegen::declarations::{
    BindingMethodDecl, ClassDecl, ComponentDecl, ComponentMethodDecl, Contribution, Declarations, ModuleDecl, Param,
    Scope,
};
use thicket_codegen::key::Key;
use thicket_codegen::types::{TypeName, TypeRef, well_known};
use thicket_codegen::writing::field_state::{Begin, Completion, FieldState, FieldStates};
use thicket_codegen::writing::{MAX_CASES_PER_SWITCH, MethodKind, STATEMENTS_PER_INITIALIZE_METHOD, TypeKind};
use thicket_codegen::{CompilerOptions, Diagnostics, GenerateError, GeneratedComponent};
use tracing_test::traced_test;

fn app() -> TypeName {
    TypeName::new("crate::App")
}

fn generate(declarations: &Declarations, options: &CompilerOptions) -> GeneratedComponent {
    let mut diagnostics = Diagnostics::new();
    match thicket_codegen::generate(declarations, &app(), options, &mut diagnostics) {
        Ok(component) => component,
        Err(error) => panic!("{error}: {:?}", diagnostics.error_messages()),
    }
}

/// `count` providers of classes that each need a shared `Clock`.
fn many_providers(count: usize, scope: Option<Scope>) -> Declarations {
    let mut component = ComponentDecl::component("crate::App");
    if let Some(scope) = &scope {
        component = component.with_scope(scope.clone());
    }
    let mut declarations = Declarations::new().with_class(ClassDecl::new("crate::Clock").with_constructor(Vec::new()));
    for index in 0..count {
        let name = format!("crate::Service{index}");
        let mut class = ClassDecl::new(&name)
            .with_constructor(vec![Param::new("clock", TypeRef::declared("crate::Clock"))]);
        if let Some(scope) = &scope {
            class = class.with_scope(scope.clone());
        }
        declarations = declarations.with_class(class);
        component = component.with_method(ComponentMethodDecl::new(
            format!("service{index}"),
            TypeRef::declared(&name).wrapped_in(well_known::PROVIDER),
        ));
    }
    declarations.with_component(component)
}

#[test]
fn switches_are_split_at_one_hundred_cases() {
    let app = generate(&many_providers(250, None), &CompilerOptions::default().with_fast_init(true));

    let switching: Vec<_> = app
        .types()
        .iter()
        .filter(|ty| ty.kind == TypeKind::SwitchingProviders)
        .collect();
    assert_eq!(switching.len(), 1);
    let tokens: String = switching[0].tokens.to_string().split_whitespace().collect();
    assert_eq!(250_usize.div_ceil(MAX_CASES_PER_SWITCH), 3);
    assert!(tokens.contains("fnget2("));
    assert!(!tokens.contains("fnget3("));
    assert_eq!(app.methods_of_kind(MethodKind::Initialize).count(), 0);
}

#[test]
fn initialization_is_chunked() {
    let app = generate(&many_providers(150, Some(Scope::singleton())), &CompilerOptions::default());

    let initialize: Vec<&str> = app
        .methods_of_kind(MethodKind::Initialize)
        .map(|method| method.name.as_str())
        .collect();
    assert_eq!(150_usize.div_ceil(STATEMENTS_PER_INITIALIZE_METHOD), 2);
    assert_eq!(initialize, ["initialize0", "initialize1"]);

    let constructor = app.method("new").expect("constructor is generated");
    let constructor: String = constructor.tokens.to_string().split_whitespace().collect();
    assert!(constructor.contains("component.initialize0();component.initialize1();"));
}

#[test]
fn generation_is_deterministic() {
    let declarations = many_providers(20, Some(Scope::singleton()));

    for fast_init in [false, true] {
        let options = CompilerOptions::default().with_fast_init(fast_init);
        let first = generate(&declarations, &options).to_source().expect("first output parses");
        let second = generate(&declarations, &options).to_source().expect("second output parses");

        assert_eq!(first, second);
    }
}

#[test]
fn production_spreads_to_collections() {
    let declarations = Declarations::new()
        .with_module(
            ModuleDecl::new("crate::Defaults")
                .with_method(
                    BindingMethodDecl::provides("fallback", TypeRef::declared("String")).contributing(Contribution::IntoSet),
                )
                .with_method(
                    BindingMethodDecl::provides("core", TypeRef::declared("crate::Plugin"))
                        .contributing(Contribution::IntoSet),
                ),
        )
        .with_module(ModuleDecl::producer("crate::Remote").with_method(
            BindingMethodDecl::produces("fetched", TypeRef::declared("String")).contributing(Contribution::IntoSet),
        ))
        .with_component(
            ComponentDecl::production_component("crate::App")
                .with_module("crate::Defaults")
                .with_module("crate::Remote")
                .with_method(ComponentMethodDecl::new(
                    "names",
                    TypeRef::set_of(TypeRef::declared("String")).wrapped_in(well_known::PRODUCER_FUTURE),
                ))
                .with_method(ComponentMethodDecl::new(
                    "plugins",
                    TypeRef::set_of(TypeRef::declared("crate::Plugin")),
                )),
        );

    let mut diagnostics = Diagnostics::new();
    let graph = thicket_codegen::resolve(&declarations, &app(), &CompilerOptions::default(), &mut diagnostics)
        .expect("component resolves");

    let binding_type = |element: &str| {
        let key = Key::new(TypeRef::set_of(TypeRef::declared(element)));
        graph
            .contribution_bindings(&key)
            .and_then(|resolved| resolved.binding())
            .map(|owned| owned.binding.binding_type)
    };
    assert_eq!(binding_type("String"), Some(BindingType::Production));
    assert_eq!(binding_type("crate::Plugin"), Some(BindingType::Provision));
}

#[test]
fn field_states_only_move_forward() {
    let mut states = FieldStates::<&str>::default();

    let Begin::Start(outer) = states.begin(&"chicken") else {
        panic!("first read starts the field");
    };
    assert_eq!(states.state(&"chicken"), FieldState::Initializing);

    assert!(matches!(states.begin(&"chicken"), Begin::Delegate));
    assert!(matches!(states.begin(&"chicken"), Begin::AlreadyDelegated));
    assert_eq!(states.state(&"chicken"), FieldState::Delegated);

    let Begin::Start(inner) = states.begin(&"egg") else {
        panic!("first read starts the field");
    };
    assert_eq!(states.in_flight(), ["chicken", "egg"]);
    assert_eq!(states.finish(inner), Completion::Direct);
    assert_eq!(states.finish(outer), Completion::BackPatch);

    assert_eq!(states.state(&"chicken"), FieldState::Initialized);
    assert!(matches!(states.begin(&"chicken"), Begin::Initialized));
    assert_eq!(states.delegated(), ["chicken"]);
    assert!(states.in_flight().is_empty());
}

#[test]
fn unknown_root_is_rejected() {
    let mut diagnostics = Diagnostics::new();

    let result = thicket_codegen::generate(&Declarations::new(), &app(), &CompilerOptions::default(), &mut diagnostics);

    assert!(matches!(result, Err(GenerateError::UnknownComponent(name)) if name == app()));
    assert!(diagnostics.is_empty());
}

#[test]
fn missing_binding_is_reported() {
    let declarations = Declarations::new()
        .with_class(
            ClassDecl::new("crate::Greeter")
                .with_constructor(vec![Param::new("clock", TypeRef::declared("crate::Clock"))]),
        )
        .with_component(
            ComponentDecl::component("crate::App")
                .with_method(ComponentMethodDecl::new("greeter", TypeRef::declared("crate::Greeter"))),
        );
    let mut diagnostics = Diagnostics::new();

    let result = thicket_codegen::generate(&declarations, &app(), &CompilerOptions::default(), &mut diagnostics);

    assert!(matches!(result, Err(GenerateError::Invalid { error_count: 1 })));
    let errors = diagnostics.error_messages();
    assert!(errors[0].starts_with("`crate::Clock` cannot be provided"), "{errors:?}");
}

#[test]
fn unavailable_type_is_deferred() {
    let declarations = Declarations::new().with_component(ComponentDecl::component("crate::App").with_method(
        ComponentMethodDecl::new("generated", TypeRef::Unavailable(TypeName::new("crate::Generated"))),
    ));
    let mut diagnostics = Diagnostics::new();

    let result = thicket_codegen::generate(&declarations, &app(), &CompilerOptions::default(), &mut diagnostics);

    assert!(result.is_err_and(|error| error.is_deferred()));
    assert!(diagnostics.is_empty());
}

#[test]
#[traced_test]
fn generation_is_traced() {
    let declarations = many_providers(1, None);

    generate(&declarations, &CompilerOptions::default());

    assert!(logs_contain("resolving component"));
    assert!(logs_contain("writing component"));
    assert!(logs_contain("generated component"));
}
