//! Integration tests: plugin load/unload/reload and failure containment.

use nf_core::{DataMap, Notice, SceneGraph};
use nf_plugin::{
    Capabilities, HookContext, LifecycleEvent, Plugin, PluginCatalog, PluginEnv, PluginError, PluginFactory,
    PluginHost, PluginState,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Default)]
struct Behavior {
    fail_register: bool,
    panic_setup: bool,
    fail_teardown: bool,
    /// Skip cleanup in teardown.
    leak: bool,
}

struct Probe {
    label: &'static str,
    behavior: Behavior,
    log: Rc<RefCell<Vec<String>>>,
}

impl Plugin for Probe {
    fn setup(&mut self) -> Result<(), PluginError> {
        if self.behavior.panic_setup {
            panic!("setup exploded");
        }
        Ok(())
    }

    fn register(&mut self, caps: &mut Capabilities<'_>) -> Result<(), PluginError> {
        let log = self.log.clone();
        let owner = caps.owner().to_string();
        caps.register_menu_command(
            self.label,
            Box::new(move |_: &mut HookContext<'_>| {
                log.borrow_mut().push(format!("{owner} menu"));
                Ok(())
            }),
        )?;
        let log = self.log.clone();
        let owner = caps.owner().to_string();
        caps.subscribe(
            LifecycleEvent::BeforeSave,
            Box::new(move |_: &mut HookContext<'_>| {
                log.borrow_mut().push(format!("{owner} before-save"));
                Ok(())
            }),
        );
        if self.behavior.fail_register {
            return Err(PluginError::failed("register refused"));
        }
        Ok(())
    }

    fn teardown(&mut self, caps: &mut Capabilities<'_>) -> Result<(), PluginError> {
        if self.behavior.fail_teardown {
            return Err(PluginError::failed("teardown refused"));
        }
        if !self.behavior.leak {
            caps.remove_menu_command(self.label);
        }
        Ok(())
    }
}

fn probe(label: &'static str, behavior: Behavior, log: &Rc<RefCell<Vec<String>>>) -> PluginFactory {
    let log = log.clone();
    Box::new(move |_: &PluginEnv| {
        Ok(Box::new(Probe {
            label,
            behavior,
            log: log.clone(),
        }) as Box<dyn Plugin>)
    })
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Doc {
    graph: SceneGraph,
    data: DataMap,
    dirty: bool,
    notices: Vec<Notice>,
}

impl Doc {
    fn new() -> Self {
        Self {
            graph: SceneGraph::new(),
            data: DataMap::new(),
            dirty: false,
            notices: Vec::new(),
        }
    }

    fn ctx(&mut self) -> HookContext<'_> {
        HookContext::new(&mut self.graph, &mut self.data, None, &mut self.dirty, &mut self.notices)
    }
}

#[test]
fn failed_register_leaves_nothing_behind() {
    init_logging();
    let log = Rc::default();
    let catalog = PluginCatalog::new().with(
        "broken",
        probe(
            "Broken Command",
            Behavior {
                fail_register: true,
                ..Default::default()
            },
            &log,
        ),
    );
    let mut host = PluginHost::new(catalog, ".");

    let err = host.load("broken").unwrap_err();

    assert_eq!(err, PluginError::failed("register refused"));
    assert!(!host.is_loaded("broken"));
    assert!(host.menu_labels().is_empty());
    assert!(host.registry().owned_by("broken").is_empty());
    assert_eq!(host.state("broken"), Some(PluginState::Failed));
    assert_eq!(host.last_error("broken"), Some(&err));
}

#[test]
fn panicking_setup_is_contained() {
    init_logging();
    let log = Rc::default();
    let catalog = PluginCatalog::new()
        .with(
            "panicky",
            probe(
                "Panicky",
                Behavior {
                    panic_setup: true,
                    ..Default::default()
                },
                &log,
            ),
        )
        .with("fine", probe("Fine", Behavior::default(), &log));
    let mut host = PluginHost::new(catalog, ".");

    let failures = host.load_enabled();

    assert_eq!(
        failures,
        vec![("panicky".to_string(), PluginError::Panicked("setup exploded".into()))]
    );
    assert_eq!(host.loaded_names(), vec!["fine"]);
    assert_eq!(host.menu_labels(), vec!["Fine"]);
}

#[test]
fn discovery_hides_underscore_names_and_respects_disable() {
    let log = Rc::default();
    let catalog = PluginCatalog::new()
        .with("_helper", probe("Helper", Behavior::default(), &log))
        .with("visible", probe("Visible", Behavior::default(), &log));
    let mut host = PluginHost::new(catalog, ".");

    assert_eq!(host.discover(), vec!["visible".to_string()]);
    assert_eq!(host.state("_helper"), None);
    assert!(matches!(host.load("_helper"), Err(PluginError::UnknownPlugin(_))));
    assert!(matches!(host.load("nope"), Err(PluginError::UnknownPlugin(_))));

    host.set_enabled("visible", false);
    assert_eq!(host.state("visible"), Some(PluginState::Disabled));
    assert!(matches!(host.load("visible"), Err(PluginError::Disabled(_))));
    assert!(host.load_enabled().is_empty());
    assert!(host.loaded_names().is_empty());
}

#[test]
fn double_load_is_refused_and_unload_is_idempotent() {
    let log = Rc::default();
    let catalog = PluginCatalog::new().with("p", probe("P", Behavior::default(), &log));
    let mut host = PluginHost::new(catalog, ".");

    host.load("p").unwrap();
    assert!(matches!(host.load("p"), Err(PluginError::AlreadyLoaded(_))));
    assert_eq!(host.menu_labels(), vec!["P"]);

    assert_eq!(host.unload("p"), Ok(true));
    assert_eq!(host.unload("p"), Ok(false));
    assert_eq!(host.state("p"), Some(PluginState::Available));
}

#[test]
fn clean_unload_keeps_leftovers_failed_teardown_retracts_them() {
    let _ = env_logger::builder().is_test(true).try_init();
    let log = Rc::default();
    let catalog = PluginCatalog::new()
        .with(
            "leaky",
            probe(
                "Leaky",
                Behavior {
                    leak: true,
                    ..Default::default()
                },
                &log,
            ),
        )
        .with(
            "stubborn",
            probe(
                "Stubborn",
                Behavior {
                    fail_teardown: true,
                    ..Default::default()
                },
                &log,
            ),
        );
    let mut host = PluginHost::new(catalog, ".");
    host.load("leaky").unwrap();
    host.load("stubborn").unwrap();

    assert_eq!(host.unload("leaky"), Ok(true));
    assert_eq!(host.menu_labels(), vec!["Leaky", "Stubborn"]);

    assert!(host.unload("stubborn").is_err());
    assert!(!host.is_loaded("stubborn"));
    assert_eq!(host.menu_labels(), vec!["Leaky"]);
    assert!(host.registry().owned_by("stubborn").is_empty());
}

#[test]
fn reload_restores_registrations() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let catalog = PluginCatalog::new().with("p", probe("P", Behavior::default(), &log));
    let mut host = PluginHost::new(catalog, ".");
    host.load("p").unwrap();

    host.reload("p").unwrap();

    assert_eq!(host.menu_labels(), vec!["P"]);
    let mut doc = Doc::new();
    host.invoke_menu_command("P", &mut doc.ctx()).unwrap();
    assert_eq!(log.borrow().as_slice(), ["p menu"]);
}

#[test]
fn hooks_run_in_subscription_order_and_failures_are_isolated() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut catalog = PluginCatalog::new().with("first", probe("First", Behavior::default(), &log));
    catalog.register(
        "faulty",
        Box::new(|_: &PluginEnv| {
            struct Faulty;
            impl Plugin for Faulty {
                fn register(&mut self, caps: &mut Capabilities<'_>) -> Result<(), PluginError> {
                    caps.subscribe(
                        LifecycleEvent::BeforeSave,
                        Box::new(|_: &mut HookContext<'_>| panic!("hook exploded")),
                    );
                    Ok(())
                }
            }
            Ok(Box::new(Faulty) as Box<dyn Plugin>)
        }),
    );
    catalog.register("last", probe("Last", Behavior::default(), &log));
    let mut host = PluginHost::new(catalog, ".");
    assert!(host.load_enabled().is_empty());

    let mut doc = Doc::new();
    let failures = host.emit(LifecycleEvent::BeforeSave, &mut doc.ctx());

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "faulty");
    assert_eq!(log.borrow().as_slice(), ["first before-save", "last before-save"]);
    assert_eq!(host.state("faulty"), Some(PluginState::Loaded));
    assert!(matches!(host.last_error("faulty"), Some(PluginError::Panicked(_))));
}

#[test]
fn data_key_conflict_fails_the_second_plugin() {
    struct Claimer;
    impl Plugin for Claimer {
        fn register(&mut self, caps: &mut Capabilities<'_>) -> Result<(), PluginError> {
            caps.register_data_key("shared", json!({}))
        }
    }
    let catalog = PluginCatalog::new()
        .with("one", Box::new(|_: &PluginEnv| Ok(Box::new(Claimer) as Box<dyn Plugin>)))
        .with("two", Box::new(|_: &PluginEnv| Ok(Box::new(Claimer) as Box<dyn Plugin>)));
    let mut host = PluginHost::new(catalog, ".");

    let failures = host.load_enabled();

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "two");
    assert!(matches!(failures[0].1, PluginError::Rejected(_)));
    assert_eq!(host.registry().data_key_owner("shared"), Some("one"));

    let mut data = DataMap::new();
    host.seed_data(&mut data);
    assert_eq!(data["shared"], json!({}));
}

#[test]
fn unknown_menu_command_is_rejected() {
    let mut host = PluginHost::new(PluginCatalog::new(), ".");
    let mut doc = Doc::new();
    assert!(matches!(
        host.invoke_menu_command("Ghost", &mut doc.ctx()),
        Err(PluginError::Rejected(_))
    ));
}

#[test]
fn timers_are_dropped_with_a_failed_load() {
    struct TimerThenFail;
    impl Plugin for TimerThenFail {
        fn register(&mut self, caps: &mut Capabilities<'_>) -> Result<(), PluginError> {
            caps.schedule_repeating(Duration::from_secs(1), Box::new(|_: &mut HookContext<'_>| Ok(())));
            Err(PluginError::failed("late failure"))
        }
    }
    let catalog = PluginCatalog::new().with(
        "t",
        Box::new(|_: &PluginEnv| Ok(Box::new(TimerThenFail) as Box<dyn Plugin>)),
    );
    let mut host = PluginHost::new(catalog, ".");

    assert!(host.load("t").is_err());
    assert!(host.registry().timers().is_empty());

    let mut doc = Doc::new();
    assert!(host.tick(Instant::now() + Duration::from_secs(5), &mut doc.ctx()).is_empty());
}
