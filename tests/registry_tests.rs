//! Registry state-machine and event properties.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{RegistryFixture, TestModule};
use dynmod::module::{DisableOutcome, EnableOutcome, ModuleError, ModuleEvent};
use dynmod::state::StateStore;

#[tokio::test]
async fn enabling_displaces_the_declared_incompatible_peer() {
    let mut fx = RegistryFixture::with_modules(vec![
        TestModule::new("dictation", &["command"]).boxed(),
        TestModule::new("command", &["dictation"]).boxed(),
    ])
    .await;

    assert_eq!(
        fx.registry.enable("command").await.unwrap(),
        EnableOutcome::Enabled
    );
    assert_eq!(fx.enabled_names().await, vec!["command".to_string()]);
    assert!(fx.store.get("dynamics.command", false));

    // Enabling the peer disables the holder first, then enables the target.
    assert_eq!(
        fx.registry.enable("dictation").await.unwrap(),
        EnableOutcome::Enabled
    );
    assert_eq!(fx.enabled_names().await, vec!["dictation".to_string()]);
    assert!(!fx.store.get("dynamics.command", false));
    assert!(fx.store.get("dynamics.dictation", false));

    assert_eq!(
        fx.drain_events(),
        vec![
            ModuleEvent::Enabled {
                module: "command".into()
            },
            ModuleEvent::Disabled {
                module: "command".into()
            },
            ModuleEvent::Enabled {
                module: "dictation".into()
            },
        ]
    );
}

#[tokio::test]
async fn one_sided_declarations_are_honored_in_both_directions() {
    // Only "dictation" declares the relation.
    let mut fx = RegistryFixture::with_modules(vec![
        TestModule::new("dictation", &["command"]).boxed(),
        TestModule::new("command", &[]).boxed(),
    ])
    .await;

    fx.registry.enable("command").await.unwrap();
    fx.registry.enable("dictation").await.unwrap();
    assert_eq!(fx.enabled_names().await, vec!["dictation".to_string()]);

    // Reverse direction: the enabled module is the one declaring the
    // relation, and it is still displaced.
    fx.registry.enable("command").await.unwrap();
    assert_eq!(fx.enabled_names().await, vec!["command".to_string()]);

    assert_eq!(
        fx.drain_events(),
        vec![
            ModuleEvent::Enabled {
                module: "command".into()
            },
            ModuleEvent::Disabled {
                module: "command".into()
            },
            ModuleEvent::Enabled {
                module: "dictation".into()
            },
            ModuleEvent::Disabled {
                module: "dictation".into()
            },
            ModuleEvent::Enabled {
                module: "command".into()
            },
        ]
    );
}

#[tokio::test]
async fn enabling_an_enabled_module_is_a_distinguishable_no_op() {
    let mut fx =
        RegistryFixture::with_modules(vec![TestModule::new("dictation", &[]).boxed()]).await;

    fx.registry.enable("dictation").await.unwrap();
    fx.drain_events();

    assert_eq!(
        fx.registry.enable("dictation").await.unwrap(),
        EnableOutcome::AlreadyEnabled
    );
    assert!(fx.store.get("dynamics.dictation", false));
    assert_eq!(
        fx.drain_events(),
        vec![ModuleEvent::AlreadyEnabled {
            module: "dictation".into()
        }]
    );
}

#[tokio::test]
async fn disabling_a_disabled_module_is_a_distinguishable_no_op() {
    let mut fx =
        RegistryFixture::with_modules(vec![TestModule::new("dictation", &[]).boxed()]).await;

    assert_eq!(
        fx.registry.disable("dictation").await.unwrap(),
        DisableOutcome::AlreadyDisabled
    );
    assert_eq!(fx.store.snapshot().len(), 0);
    assert_eq!(
        fx.drain_events(),
        vec![ModuleEvent::AlreadyDisabled {
            module: "dictation".into()
        }]
    );
}

#[tokio::test]
async fn unknown_names_are_reported_without_state_change() {
    let mut fx =
        RegistryFixture::with_modules(vec![TestModule::new("dictation", &[]).boxed()]).await;

    let error = fx.registry.enable("telemetry").await.unwrap_err();
    assert!(matches!(error, ModuleError::UnknownModule(name) if name == "telemetry"));
    assert!(fx.enabled_names().await.is_empty());
    assert_eq!(
        fx.drain_events(),
        vec![ModuleEvent::UnknownModule {
            module: "telemetry".into()
        }]
    );
}

#[tokio::test]
async fn disable_all_counts_only_actual_transitions() {
    let mut fx = RegistryFixture::with_modules(vec![
        TestModule::new("dictation", &[]).boxed(),
        TestModule::new("numbers", &[]).boxed(),
        TestModule::new("navigation", &[]).boxed(),
    ])
    .await;

    fx.registry.enable("dictation").await.unwrap();
    fx.registry.enable("numbers").await.unwrap();
    fx.drain_events();

    assert_eq!(fx.registry.disable_all().await.unwrap(), 2);
    assert!(fx.enabled_names().await.is_empty());
    assert_eq!(
        fx.drain_events(),
        vec![
            ModuleEvent::Disabled {
                module: "dictation".into()
            },
            ModuleEvent::Disabled {
                module: "numbers".into()
            },
            ModuleEvent::AllDisabled { count: 2 },
        ]
    );

    // Nothing enabled: count is zero and no state changes.
    assert_eq!(fx.registry.disable_all().await.unwrap(), 0);
    assert_eq!(fx.drain_events(), vec![ModuleEvent::NoneEnabled]);
}

#[tokio::test]
async fn enable_set_skips_members_declared_incompatible_within_the_batch() {
    let mut fx = RegistryFixture::with_modules(vec![
        TestModule::new("dictation", &["command"]).boxed(),
        TestModule::new("command", &["dictation"]).boxed(),
    ])
    .await;

    let outcome = fx
        .registry
        .enable_set(&["dictation".to_string(), "command".to_string()], false)
        .await
        .unwrap();

    assert_eq!(outcome.enabled, vec!["dictation".to_string()]);
    assert_eq!(outcome.skipped, vec!["command".to_string()]);
    assert_eq!(fx.enabled_names().await, vec!["dictation".to_string()]);
    assert_eq!(
        fx.drain_events(),
        vec![
            ModuleEvent::Enabled {
                module: "dictation".into()
            },
            ModuleEvent::ConflictSkipped {
                module: "command".into(),
                conflicts_with: "dictation".into()
            },
        ]
    );
}

#[tokio::test]
async fn exclusive_enable_set_sweeps_the_board_first() {
    let mut fx = RegistryFixture::with_modules(vec![
        TestModule::new("dictation", &[]).boxed(),
        TestModule::new("numbers", &[]).boxed(),
        TestModule::new("navigation", &[]).boxed(),
    ])
    .await;

    fx.registry.enable("navigation").await.unwrap();
    fx.drain_events();

    let outcome = fx
        .registry
        .enable_set(&["dictation".to_string(), "numbers".to_string()], true)
        .await
        .unwrap();

    assert_eq!(
        outcome.enabled,
        vec!["dictation".to_string(), "numbers".to_string()]
    );
    assert_eq!(
        fx.enabled_names().await,
        vec!["dictation".to_string(), "numbers".to_string()]
    );
    // Per-module disables are reported; the aggregate sweep event is not.
    assert_eq!(
        fx.drain_events(),
        vec![
            ModuleEvent::Disabled {
                module: "navigation".into()
            },
            ModuleEvent::Enabled {
                module: "dictation".into()
            },
            ModuleEvent::Enabled {
                module: "numbers".into()
            },
        ]
    );
}

#[tokio::test]
async fn enable_set_rejects_oversized_batches() {
    let fx = RegistryFixture::with_modules(vec![TestModule::new("dictation", &[]).boxed()]).await;

    let names: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
    let error = fx.registry.enable_set(&names, false).await.unwrap_err();
    assert!(matches!(error, ModuleError::BatchTooLarge(4)));
}

#[tokio::test]
async fn enable_set_reports_unknown_members_and_continues() {
    let mut fx = RegistryFixture::with_modules(vec![
        TestModule::new("dictation", &[]).boxed(),
        TestModule::new("numbers", &[]).boxed(),
    ])
    .await;

    let outcome = fx
        .registry
        .enable_set(
            &[
                "dictation".to_string(),
                "telemetry".to_string(),
                "numbers".to_string(),
            ],
            false,
        )
        .await
        .unwrap();

    assert_eq!(
        outcome.enabled,
        vec!["dictation".to_string(), "numbers".to_string()]
    );
    assert!(outcome.skipped.is_empty());
    assert_eq!(
        fx.drain_events(),
        vec![
            ModuleEvent::Enabled {
                module: "dictation".into()
            },
            ModuleEvent::UnknownModule {
                module: "telemetry".into()
            },
            ModuleEvent::Enabled {
                module: "numbers".into()
            },
        ]
    );
}

#[tokio::test]
async fn status_reflects_discovery_order_without_mutation() {
    let fx = RegistryFixture::with_modules(vec![
        TestModule::new("navigation", &[]).boxed(),
        TestModule::new("dictation", &[]).boxed(),
        TestModule::new("command", &[]).boxed(),
    ])
    .await;

    fx.registry.enable("dictation").await.unwrap();

    let names: Vec<String> = fx
        .registry
        .status()
        .await
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "navigation".to_string(),
            "dictation".to_string(),
            "command".to_string()
        ]
    );
    assert_eq!(fx.enabled_names().await, vec!["dictation".to_string()]);
}

#[tokio::test]
async fn unload_reaches_every_module_exactly_once() {
    let counters: Vec<Arc<AtomicUsize>> =
        (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();
    let fx = RegistryFixture::with_modules(vec![
        TestModule::new("dictation", &[])
            .with_unload_counter(counters[0].clone())
            .boxed(),
        TestModule::new("numbers", &[])
            .with_unload_counter(counters[1].clone())
            .boxed(),
        TestModule::new("navigation", &[])
            .with_unload_counter(counters[2].clone())
            .boxed(),
    ])
    .await;

    // One enabled, two never enabled: unload reaches all of them.
    fx.registry.enable("numbers").await.unwrap();
    fx.registry.unload().await;

    for counter in &counters {
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
    assert!(fx.registry.status().await.is_empty());
}

#[tokio::test]
async fn duplicate_discovery_does_not_reload_modules() {
    let fx = RegistryFixture::with_modules(vec![TestModule::new("dictation", &[]).boxed()]).await;
    fx.registry.enable("dictation").await.unwrap();

    let mut second = dynmod::module::StaticProvider::new(vec![
        Ok(TestModule::new("dictation", &[]).boxed()),
        Ok(TestModule::new("numbers", &[]).boxed()),
    ]);
    let discovered = fx.registry.discover(&mut second).await;

    // Only the new name registers; the existing module keeps its state.
    assert_eq!(discovered, vec!["numbers".to_string()]);
    assert_eq!(fx.enabled_names().await, vec!["dictation".to_string()]);
}
