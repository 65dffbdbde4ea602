// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Selection of how a request is written.
//!
//! Selection only looks at facts about the binding and its component; allocating fields, methods
//! and switching-provider ids for the selected strategy is left to the writer.

use crate::binding::{Binding, BindingKind};
use crate::request::{FrameworkType, RequestKind};

/// The facts a selection depends on.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Selection<'a> {
    /// The requested binding.
    pub(crate) binding: &'a Binding,
    /// How the binding is requested.
    pub(crate) kind: RequestKind,
    /// Whether fast-init mode is on.
    pub(crate) fast_init: bool,
    /// How many requests in the owning component reach the binding.
    pub(crate) dependent_count: usize,
    /// Whether the owning component declares a method returning the instance.
    pub(crate) has_component_method: bool,
}

/// The selected strategy, before names and ids are allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    Inline,
    PrivateMethod,
    ComponentMethod,
    MemoizedMethod,
    FrameworkField(FrameworkType),
    InlineFramework(FrameworkType),
    SwitchingProvider,
    DerivedFromFramework(FrameworkType),
    MembersInjection,
}

/// Selects the strategy for one request in the component that owns its binding.
pub(crate) fn select(selection: Selection<'_>) -> Strategy {
    let binding = selection.binding;
    if binding.kind == BindingKind::MembersInjection {
        return Strategy::MembersInjection;
    }
    match selection.kind {
        RequestKind::Instance => instance(selection),
        RequestKind::Provider => provider(selection),
        RequestKind::Lazy | RequestKind::ProviderOfLazy => Strategy::DerivedFromFramework(FrameworkType::Provider),
        RequestKind::Producer if binding.is_production() => Strategy::FrameworkField(FrameworkType::Producer),
        RequestKind::Producer => Strategy::DerivedFromFramework(FrameworkType::Provider),
        RequestKind::Future | RequestKind::Produced => Strategy::DerivedFromFramework(FrameworkType::Producer),
        RequestKind::MembersInjection => {
            unreachable!("internal error: members injection requested for {}", binding.key)
        }
    }
}

fn instance(selection: Selection<'_>) -> Strategy {
    let binding = selection.binding;
    assert!(
        !binding.is_production(),
        "internal error: production binding {} requested as an instance outside of a producer",
        binding.key
    );
    if binding.is_scoped() {
        return if selection.fast_init {
            Strategy::MemoizedMethod
        } else {
            Strategy::DerivedFromFramework(FrameworkType::Provider)
        };
    }
    if binding.all_dependencies().next().is_none() || selection.dependent_count < 2 {
        return Strategy::Inline;
    }
    if selection.has_component_method {
        Strategy::ComponentMethod
    } else {
        Strategy::PrivateMethod
    }
}

fn provider(selection: Selection<'_>) -> Strategy {
    let binding = selection.binding;
    if binding.kind == BindingKind::Delegate && !binding.is_scoped() {
        return Strategy::InlineFramework(FrameworkType::Provider);
    }
    if binding.is_scoped() {
        return if selection.fast_init {
            Strategy::SwitchingProvider
        } else {
            Strategy::FrameworkField(FrameworkType::Provider)
        };
    }
    if binding.all_dependencies().next().is_none() {
        Strategy::InlineFramework(FrameworkType::Provider)
    } else if selection.fast_init {
        Strategy::SwitchingProvider
    } else {
        Strategy::FrameworkField(FrameworkType::Provider)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::binding::BindingType;
    use crate::declarations::Scope;
    use crate::key::Key;
    use crate::request::DependencyRequest;
    use crate::types::TypeRef;

    fn binding(kind: BindingKind, dependencies: usize, scope: Option<Scope>) -> Binding {
        let mut binding = Binding::new(kind, BindingType::Provision, Key::new(TypeRef::declared("crate::Service")));
        binding.dependencies = (0..dependencies)
            .map(|index| {
                DependencyRequest::new(
                    RequestKind::Instance,
                    Key::new(TypeRef::declared(format!("crate::Dependency{index}"))),
                )
            })
            .collect();
        binding.scope = scope;
        binding
    }

    fn select_for(binding: &Binding, kind: RequestKind, fast_init: bool, dependent_count: usize) -> Strategy {
        select(Selection {
            binding,
            kind,
            fast_init,
            dependent_count,
            has_component_method: false,
        })
    }

    #[test]
    fn unscoped_leaf_instance_is_inline() {
        let leaf = binding(BindingKind::Injection, 0, None);

        assert_eq!(select_for(&leaf, RequestKind::Instance, false, 5), Strategy::Inline);
        assert_eq!(
            select_for(&leaf, RequestKind::Provider, false, 5),
            Strategy::InlineFramework(FrameworkType::Provider)
        );
    }

    #[test]
    fn shared_instance_gets_a_method() {
        let shared = binding(BindingKind::Injection, 1, None);

        assert_eq!(select_for(&shared, RequestKind::Instance, false, 1), Strategy::Inline);
        assert_eq!(select_for(&shared, RequestKind::Instance, false, 2), Strategy::PrivateMethod);
        assert_eq!(
            select(Selection {
                binding: &shared,
                kind: RequestKind::Instance,
                fast_init: false,
                dependent_count: 2,
                has_component_method: true,
            }),
            Strategy::ComponentMethod
        );
    }

    #[rstest]
    #[case(false, RequestKind::Instance, Strategy::DerivedFromFramework(FrameworkType::Provider))]
    #[case(false, RequestKind::Provider, Strategy::FrameworkField(FrameworkType::Provider))]
    #[case(true, RequestKind::Instance, Strategy::MemoizedMethod)]
    #[case(true, RequestKind::Provider, Strategy::SwitchingProvider)]
    fn scoped_bindings_are_cached(#[case] fast_init: bool, #[case] kind: RequestKind, #[case] expected: Strategy) {
        let scoped = binding(BindingKind::Injection, 0, Some(Scope::singleton()));

        assert_eq!(select_for(&scoped, kind, fast_init, 1), expected);
    }

    #[test]
    fn unscoped_provider_with_dependencies() {
        let service = binding(BindingKind::Injection, 2, None);

        assert_eq!(
            select_for(&service, RequestKind::Provider, false, 1),
            Strategy::FrameworkField(FrameworkType::Provider)
        );
        assert_eq!(select_for(&service, RequestKind::Provider, true, 1), Strategy::SwitchingProvider);
    }

    #[test]
    fn unscoped_delegate_provider_wraps_target() {
        let delegate = binding(BindingKind::Delegate, 1, None);

        assert_eq!(
            select_for(&delegate, RequestKind::Provider, true, 3),
            Strategy::InlineFramework(FrameworkType::Provider)
        );
    }

    #[test]
    fn lazy_and_producer_derive_from_provider() {
        let service = binding(BindingKind::Injection, 1, None);

        for kind in [RequestKind::Lazy, RequestKind::ProviderOfLazy, RequestKind::Producer] {
            assert_eq!(
                select_for(&service, kind, false, 1),
                Strategy::DerivedFromFramework(FrameworkType::Provider)
            );
        }
    }

    #[test]
    fn production_bindings_use_producer_fields() {
        let mut production = binding(BindingKind::Production, 1, None);
        production.binding_type = BindingType::Production;

        assert_eq!(
            select_for(&production, RequestKind::Producer, false, 1),
            Strategy::FrameworkField(FrameworkType::Producer)
        );
        assert_eq!(
            select_for(&production, RequestKind::Future, false, 1),
            Strategy::DerivedFromFramework(FrameworkType::Producer)
        );
    }

    #[test]
    #[should_panic(expected = "outside of a producer")]
    fn production_instance_is_rejected() {
        let mut production = binding(BindingKind::Production, 0, None);
        production.binding_type = BindingType::Production;

        let _ = select_for(&production, RequestKind::Instance, false, 1);
    }
}
