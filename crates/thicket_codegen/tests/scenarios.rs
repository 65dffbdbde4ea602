// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! End-to-end generation of small components.

use pretty_assertions::assert_eq;
use proc_macro2::TokenStream;
use quote::quote;
use thicket_codegen::declarations::{
    BindingMethodDecl, ClassDecl, ComponentDecl, ComponentMethodDecl, Contribution, CreatorDecl, Declarations,
    ModuleDecl, Param, Scope,
};
use thicket_codegen::types::{TypeName, TypeRef, well_known};
use thicket_codegen::writing::{FieldKind, GeneratedComponent, MethodKind, TypeKind};
use thicket_codegen::{CompilerOptions, Diagnostics};

fn generate(declarations: &Declarations, options: &CompilerOptions) -> GeneratedComponent {
    let mut diagnostics = Diagnostics::new();
    let result = thicket_codegen::generate(declarations, &TypeName::new("crate::App"), options, &mut diagnostics);
    match result {
        Ok(component) => component,
        Err(error) => panic!("{error}: {:?}", diagnostics.error_messages()),
    }
}

fn squash(tokens: &TokenStream) -> String {
    tokens.to_string().split_whitespace().collect()
}

fn method(component: &GeneratedComponent, name: &str) -> String {
    let method = component
        .method(name)
        .unwrap_or_else(|| panic!("{name} is not generated"));
    squash(&method.tokens)
}

fn declared(name: &str) -> TypeRef {
    TypeRef::declared(name)
}

fn param(name: &str, ty: &str) -> Param {
    Param::new(name, declared(ty))
}

#[test]
fn leaf_dependencies_are_inlined() {
    let declarations = Declarations::new()
        .with_class(ClassDecl::new("crate::Clock").with_constructor(Vec::new()))
        .with_class(ClassDecl::new("crate::Greeter").with_constructor(vec![param("clock", "crate::Clock")]))
        .with_component(
            ComponentDecl::component("crate::App")
                .with_method(ComponentMethodDecl::new("greeter", declared("crate::Greeter"))),
        );

    let app = generate(&declarations, &CompilerOptions::default());

    assert_eq!(
        method(&app, "greeter"),
        squash(&quote! {
            pub fn greeter(&self) -> crate::Greeter {
                <crate::Greeter>::new(<crate::Clock>::new())
            }
        })
    );
    assert_eq!(app.fields().len(), 1);
    assert_eq!(app.methods_of_kind(MethodKind::Initialize).count(), 0);
    assert_eq!(app.methods_of_kind(MethodKind::PrivateMethod).count(), 0);
}

#[test]
fn scoped_binding_is_double_checked() {
    let declarations = Declarations::new()
        .with_class(
            ClassDecl::new("crate::Db")
                .with_scope(Scope::singleton())
                .with_constructor(Vec::new()),
        )
        .with_class(ClassDecl::new("crate::Repository").with_constructor(vec![param("db", "crate::Db")]))
        .with_component(
            ComponentDecl::component("crate::App")
                .with_scope(Scope::singleton())
                .with_method(ComponentMethodDecl::new("repository", declared("crate::Repository"))),
        );

    let app = generate(&declarations, &CompilerOptions::default());

    let field = app.field("db_provider").expect("scoped binding is held in a field");
    assert_eq!(field.kind, FieldKind::Framework);
    assert_eq!(squash(&field.ty), squash(&quote!(::thicket::ProviderSlot<crate::Db>)));
    assert_eq!(
        method(&app, "repository"),
        squash(&quote! {
            pub fn repository(&self) -> crate::Repository {
                <crate::Repository>::new(::std::sync::Arc::clone(self.db_provider.get()).get())
            }
        })
    );
    assert_eq!(
        method(&app, "initialize0"),
        squash(&quote! {
            fn initialize0(&self) {
                self.db_provider.set(::thicket::DoubleCheck::provider(::thicket::provider_fn({
                    move || -> crate::Db { <crate::Db>::new() }
                })));
            }
        })
    );
}

#[test]
fn reusable_binding_is_single_checked() {
    let declarations = Declarations::new()
        .with_class(
            ClassDecl::new("crate::Cache")
                .with_scope(Scope::reusable())
                .with_constructor(Vec::new()),
        )
        .with_component(
            ComponentDecl::component("crate::App")
                .with_method(ComponentMethodDecl::new("cache", declared("crate::Cache"))),
        );

    let app = generate(&declarations, &CompilerOptions::default());

    assert!(method(&app, "initialize0").contains("::thicket::SingleCheck::provider("));
}

#[test]
fn production_set_is_collected_by_a_producer() {
    let declarations = Declarations::new()
        .with_module(
            ModuleDecl::producer("crate::Pages")
                .with_method(
                    BindingMethodDecl::produces("home", declared("String").wrapped_in(well_known::PRODUCER_FUTURE))
                        .contributing(Contribution::IntoSet),
                )
                .with_method(BindingMethodDecl::produces("about", declared("String")).contributing(Contribution::IntoSet)),
        )
        .with_component(
            ComponentDecl::production_component("crate::App")
                .with_module("crate::Pages")
                .with_method(ComponentMethodDecl::new(
                    "pages",
                    TypeRef::set_of(declared("String")).wrapped_in(well_known::PRODUCER_FUTURE),
                )),
        );

    let app = generate(&declarations, &CompilerOptions::default());

    let producers: Vec<&str> = app
        .fields()
        .iter()
        .filter(|field| field.kind == FieldKind::Framework)
        .map(|field| field.name.as_str())
        .collect();
    assert_eq!(producers.len(), 3, "{producers:?}");
    assert!(producers.contains(&"set_of_string_producer"));
    assert_eq!(
        method(&app, "pages"),
        squash(&quote! {
            pub fn pages(&self) -> ::thicket::ProducerFuture<::thicket::Set<String>> {
                ::thicket::retain_producer(&self.this, ::std::sync::Arc::clone(self.set_of_string_producer.get())).get()
            }
        })
    );
    let initialize = method(&app, "initialize0");
    assert!(initialize.contains("<crate::Pages>::home().await?"), "{initialize}");
    assert!(initialize.contains("<crate::Pages>::about()"), "{initialize}");
    assert!(initialize.contains("::thicket::Set::builder(2usize)"), "{initialize}");
    assert!(initialize.contains(".get().await?"), "{initialize}");
}

#[test]
fn provider_cycle_has_exactly_one_delegated_field() {
    let declarations = Declarations::new()
        .with_class(
            ClassDecl::new("crate::Chicken")
                .with_constructor(vec![Param::new("egg", declared("crate::Egg").wrapped_in(well_known::PROVIDER))]),
        )
        .with_class(ClassDecl::new("crate::Egg").with_constructor(vec![param("chicken", "crate::Chicken")]))
        .with_component(
            ComponentDecl::component("crate::App")
                .with_method(ComponentMethodDecl::new("chicken", declared("crate::Chicken").wrapped_in(well_known::PROVIDER)))
                .with_method(ComponentMethodDecl::new("egg", declared("crate::Egg").wrapped_in(well_known::PROVIDER))),
        );

    let app = generate(&declarations, &CompilerOptions::default());

    assert_eq!(app.delegated_fields().len(), 1);
    let initialize = method(&app, "initialize0");
    let delegated = &app.delegated_fields()[0];
    assert_eq!(initialize.matches(&format!("self.{delegated}.install_delegate();")).count(), 1);
    assert_eq!(initialize.matches(&format!("self.{delegated}.set_delegate(")).count(), 1);
    assert_eq!(initialize.matches(&format!("self.{delegated}.set(")).count(), 0);
}

#[test]
fn duplicate_component_methods_share_one_body() {
    let declarations = Declarations::new()
        .with_class(ClassDecl::new("crate::Clock").with_constructor(Vec::new()))
        .with_class(ClassDecl::new("crate::Greeter").with_constructor(vec![param("clock", "crate::Clock")]))
        .with_component(
            ComponentDecl::component("crate::App")
                .with_method(ComponentMethodDecl::new("greeter", declared("crate::Greeter")))
                .with_method(ComponentMethodDecl::new("same_greeter", declared("crate::Greeter"))),
        );

    let app = generate(&declarations, &CompilerOptions::default());

    assert_eq!(
        method(&app, "greeter"),
        squash(&quote! {
            pub fn greeter(&self) -> crate::Greeter {
                <crate::Greeter>::new(<crate::Clock>::new())
            }
        })
    );
    assert_eq!(
        method(&app, "same_greeter"),
        squash(&quote! {
            pub fn same_greeter(&self) -> crate::Greeter {
                self.greeter()
            }
        })
    );
    assert_eq!(app.methods_of_kind(MethodKind::PrivateMethod).count(), 0);
}

#[test]
fn subcomponent_reaches_ancestor_bindings_through_parent() {
    let declarations = Declarations::new()
        .with_class(
            ClassDecl::new("crate::Db")
                .with_scope(Scope::singleton())
                .with_constructor(Vec::new()),
        )
        .with_class(ClassDecl::new("crate::Request").with_constructor(vec![param("db", "crate::Db")]))
        .with_component(
            ComponentDecl::component("crate::App")
                .with_scope(Scope::singleton())
                .with_method(ComponentMethodDecl::new("session", declared("crate::Session"))),
        )
        .with_component(
            ComponentDecl::subcomponent("crate::Session")
                .with_method(ComponentMethodDecl::new("request", declared("crate::Request"))),
        );

    let app = generate(&declarations, &CompilerOptions::default());
    let session = app
        .subcomponent(&TypeName::new("crate::Session"))
        .expect("subcomponent is nested");

    assert_eq!(
        method(&app, "session"),
        squash(&quote! {
            pub fn session(&self) -> ::std::sync::Arc<Session> {
                Session::new(::thicket::upgrade_component(&self.this))
            }
        })
    );
    assert_eq!(
        method(session, "request"),
        squash(&quote! {
            pub fn request(&self) -> crate::Request {
                <crate::Request>::new(::std::sync::Arc::clone(self.parent.db_provider.get()).get())
            }
        })
    );
    assert!(app.field("db_provider").is_some());
    assert_eq!(session.field("parent").map(|field| field.kind), Some(FieldKind::Parent));
}

#[test]
fn creator_checks_required_setters() {
    let declarations = Declarations::new()
        .with_class(ClassDecl::new("crate::Config"))
        .with_class(ClassDecl::new("crate::Greeter").with_constructor(vec![param("name", "String")]))
        .with_component(
            ComponentDecl::component("crate::App")
                .with_dependency("crate::Config")
                .with_method(ComponentMethodDecl::new("greeter", declared("crate::Greeter")))
                .with_creator(
                    CreatorDecl::new("crate::AppFactory")
                        .with_setter("config", declared("crate::Config"))
                        .with_bound_instance(param("name", "String")),
                ),
        );

    let app = generate(&declarations, &CompilerOptions::default());

    let creator = app
        .types()
        .iter()
        .find(|ty| ty.kind == TypeKind::Creator)
        .expect("creator is generated");
    assert_eq!(creator.name, "AppFactory");
    let tokens = squash(&creator.tokens);
    assert!(tokens.contains(&squash(&quote! {
        self.config.ok_or_else(|| ::thicket::MissingRequirement::new("crate::App", "config"))?
    })));
    assert!(tokens.contains(&squash(&quote! {
        pub fn name(mut self, value: String) -> Self
    })));
    assert_eq!(
        method(&app, "greeter"),
        squash(&quote! {
            pub fn greeter(&self) -> crate::Greeter {
                <crate::Greeter>::new(::std::clone::Clone::clone(&self.name))
            }
        })
    );
    assert!(app.method("builder").is_some());
    assert!(app.method("create").is_none());
}

#[test]
fn members_injection_calls_injected_methods() {
    let declarations = Declarations::new()
        .with_class(ClassDecl::new("crate::Clock").with_constructor(Vec::new()))
        .with_class(
            ClassDecl::new("crate::Screen").with_member(thicket_codegen::declarations::MemberDecl::injected_method(
                "set_clock",
                vec![param("clock", "crate::Clock")],
            )),
        )
        .with_component(
            ComponentDecl::component("crate::App")
                .with_method(ComponentMethodDecl::members_injection("inject", declared("crate::Screen"))),
        );

    let app = generate(&declarations, &CompilerOptions::default());

    assert_eq!(
        method(&app, "inject_screen"),
        squash(&quote! {
            fn inject_screen(&self, instance: &mut crate::Screen) {
                instance.set_clock(<crate::Clock>::new());
            }
        })
    );
}

#[test]
fn generated_source_is_valid_rust() {
    let declarations = Declarations::new()
        .with_class(
            ClassDecl::new("crate::Db")
                .with_scope(Scope::singleton())
                .with_constructor(Vec::new()),
        )
        .with_class(ClassDecl::new("crate::Repository").with_constructor(vec![param("db", "crate::Db")]))
        .with_module(
            ModuleDecl::new("crate::Plugins")
                .with_method(BindingMethodDecl::provides("audit", declared("crate::Plugin")).contributing(Contribution::IntoSet)),
        )
        .with_component(
            ComponentDecl::component("crate::App")
                .with_scope(Scope::singleton())
                .with_module("crate::Plugins")
                .with_method(ComponentMethodDecl::new("repository", declared("crate::Repository")))
                .with_method(ComponentMethodDecl::new(
                    "repositories",
                    declared("crate::Repository").wrapped_in(well_known::PROVIDER),
                ))
                .with_method(ComponentMethodDecl::new("plugins", TypeRef::set_of(declared("crate::Plugin")))),
        );

    for fast_init in [false, true] {
        let app = generate(&declarations, &CompilerOptions::default().with_fast_init(fast_init));
        let source = app.to_source().expect("generated tokens parse as a file");

        let file = syn::parse_file(&source).expect("generated source parses");
        let methods: Vec<String> = file
            .items
            .iter()
            .filter_map(|item| match item {
                syn::Item::Impl(block) => Some(block),
                _ => None,
            })
            .flat_map(|block| &block.items)
            .filter_map(|item| match item {
                syn::ImplItem::Fn(method) => Some(method.sig.ident.to_string()),
                _ => None,
            })
            .collect();

        assert!(source.contains("pub struct App"), "{source}");
        assert!(methods.iter().any(|name| name == "repositories"), "{methods:?}");
        assert!(methods.iter().any(|name| name == "plugins"), "{methods:?}");
    }
}

#[test]
fn fast_init_providers_keep_their_component() {
    let declarations = Declarations::new()
        .with_class(ClassDecl::new("crate::Clock").with_constructor(Vec::new()))
        .with_class(ClassDecl::new("crate::Service").with_constructor(vec![param("clock", "crate::Clock")]))
        .with_component(ComponentDecl::component("crate::App").with_method(ComponentMethodDecl::new(
            "service",
            declared("crate::Service").wrapped_in(well_known::PROVIDER),
        )));

    let app = generate(&declarations, &CompilerOptions::default().with_fast_init(true));

    assert_eq!(
        method(&app, "service"),
        squash(&quote! {
            pub fn service(&self) -> ::std::sync::Arc<dyn ::thicket::Provider<crate::Service>> {
                ::thicket::SwitchingProvider::<crate::Service>::create(
                    ::std::sync::Arc::new(AppSwitchingProviders0 {
                        component: ::thicket::ComponentHandle::strong(&self.this)
                    }),
                    0usize,
                )
            }
        })
    );
    let dispatch = app
        .types()
        .iter()
        .find(|ty| ty.kind == TypeKind::SwitchingProviders)
        .expect("dispatch type is generated");
    let dispatch = squash(&dispatch.tokens);
    assert!(dispatch.contains("component:::thicket::ComponentHandle<App>,"), "{dispatch}");
    assert!(!dispatch.contains("Weak"), "{dispatch}");
}
