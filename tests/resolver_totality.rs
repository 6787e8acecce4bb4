use std::sync::Arc;

use proptest::prelude::*;

use snipexec::fs::mock::MockFileSystem;
use snipexec::interpreter::{InterpreterRegistry, InterpreterResolver};
use snipexec::types::HostOs;

fn builtin_extensions() -> Vec<String> {
    InterpreterRegistry::builtin()
        .iter()
        .map(|s| s.extension.clone())
        .collect()
}

fn os_strategy() -> impl Strategy<Value = HostOs> {
    prop::sample::select(HostOs::ALL.to_vec())
}

/// Leading dot, surrounding spaces and case do not matter.
fn spelling_strategy() -> impl Strategy<Value = String> {
    (
        prop::sample::select(builtin_extensions()),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(ext, dot, upper, padded)| {
            let mut s = if upper { ext.to_uppercase() } else { ext };
            if dot {
                s.insert(0, '.');
            }
            if padded {
                s = format!("  {s} ");
            }
            s
        })
}

proptest! {
    #[test]
    fn every_builtin_resolves_on_every_os(
        spelling in spelling_strategy(),
        os in os_strategy(),
        bundled in any::<bool>(),
    ) {
        let registry = InterpreterRegistry::builtin();
        let fs = MockFileSystem::new();
        let spec = registry.get(&spelling).expect("spelling normalizes to a builtin key").clone();
        let name = spec.executable_for(os).to_string();
        if bundled {
            fs.add_file(format!("/tools/{name}"), "");
        }

        let resolver = InterpreterResolver::new(registry, os, Some("/tools".into()))
            .with_file_system(Arc::new(fs));
        let resolved = resolver.resolve(&spelling).expect("builtin must resolve");

        prop_assert_eq!(resolved.bundled, bundled);
        prop_assert!(!resolved.program.as_os_str().is_empty());
        prop_assert!(resolved.program.ends_with(&name));
        prop_assert_eq!(resolved.default_args, spec.default_args);
    }

    #[test]
    fn unregistered_extensions_resolve_to_none(ext in "[a-z]{6,10}", os in os_strategy()) {
        let registry = InterpreterRegistry::builtin();
        prop_assume!(registry.get(&ext).is_none());
        let resolver = InterpreterResolver::new(registry, os, None);
        prop_assert!(resolver.resolve(&ext).is_none());
    }
}
