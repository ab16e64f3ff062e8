//! End-to-end filtering scenarios against the SQLite store.
//!
//! Each test wires the engine with the built-in rules exactly as the CLI does
//! and checks the resulting visible set and reasons.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use nowdo_core::geo::METERS_PER_DEGREE;
use nowdo_core::{
    AuditStore, AvailabilityCalculator, Config, Context, ContextResolver, ContextUpdate,
    Coordinates, DependencyError, DependencyResolver, DependencyType, EnergyLevel, FilterEngine,
    FilterFamily, FilterFlags, Location, SocialContext, SqliteStore, Task, TaskDependency,
    TaskStatus,
};

struct Harness {
    store: Arc<SqliteStore>,
    resolver: Arc<DependencyResolver>,
    engine: FilterEngine,
}

impl Harness {
    fn new(flags: FilterFlags) -> Self {
        let config = Config {
            filters: flags,
            ..Config::default()
        };
        Self::with_config(&config)
    }

    fn with_config(config: &Config) -> Self {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let resolver = Arc::new(DependencyResolver::new(store.clone(), store.clone()));
        let engine =
            FilterEngine::with_default_rules(resolver.clone(), store.clone(), store.clone(), config);
        Self {
            store,
            resolver,
            engine,
        }
    }

    fn task(&self, title: &str, build: impl FnOnce(Task) -> Task) -> Task {
        let task = build(Task::new(title, "u1").unwrap());
        self.store.insert_task(&task).unwrap();
        task
    }

    fn reload(&self, task: &Task) -> Task {
        use nowdo_core::TaskSource;
        self.store.task(&task.id).unwrap().unwrap()
    }
}

fn ctx() -> Context {
    Context::new("u1", Utc::now())
}

fn titles(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.title.as_str()).collect()
}

#[test]
fn only_short_task_fits_ten_minutes() {
    let h = Harness::new(FilterFlags::only(FilterFamily::Time));
    let tasks = vec![
        h.task("five", |t| t.with_estimated_minutes(5)),
        h.task("thirty", |t| t.with_estimated_minutes(30)),
        h.task("two hours", |t| t.with_estimated_minutes(120)),
    ];

    let outcome = h
        .engine
        .filter_tasks(&ctx().with_available_minutes(10), &tasks);
    assert_eq!(titles(&outcome.visible), vec!["five"]);
    assert_eq!(outcome.results.len(), tasks.len() * 5);
}

#[test]
fn location_radius_scenario() {
    let h = Harness::new(FilterFlags::only(FilterFamily::Location));
    let office = Location::new("u1", "Office", Coordinates::new(40.0, -74.0), 100.0).unwrap();
    h.store.insert_location(&office).unwrap();
    let task = h.task("Print forms", |t| t.at_location(&office.id));

    let at = |meters: f64| {
        ctx().with_position(Coordinates::new(40.0 + meters / METERS_PER_DEGREE, -74.0))
    };

    let far = h.engine.apply_single_filter("location", &at(200.0), &task).unwrap();
    assert!(!far.visible);
    let near = h.engine.apply_single_filter("location", &at(50.0), &task).unwrap();
    assert!(near.visible);

    assert!(h.engine.filter_tasks(&at(200.0), &[task.clone()]).visible.is_empty());
    assert_eq!(h.engine.filter_tasks(&at(50.0), &[task]).visible.len(), 1);
}

#[test]
fn blocking_dependency_scenario() {
    let h = Harness::new(FilterFlags::default());
    let b = h.task("Buy paint", |t| t);
    let a = h.task("Paint fence", |t| t);
    h.store
        .add_dependency(&TaskDependency::new(&a.id, &b.id, DependencyType::Blocking).unwrap())
        .unwrap();

    let explanation = h.engine.explain_task_visibility(&ctx(), &a);
    assert!(!explanation.visible);
    let blocking = explanation.blocking_rules();
    assert_eq!(blocking.len(), 1);
    assert_eq!(blocking[0].rule_name, "dependency");
    assert!(blocking[0].reason.contains("'Buy paint' must be completed first"));

    h.store.update_task_status(&b.id, TaskStatus::Active).unwrap();
    h.store.update_task_status(&b.id, TaskStatus::Completed).unwrap();

    let a = h.reload(&a);
    assert!(h.engine.explain_task_visibility(&ctx(), &a).visible);
    assert_eq!(h.engine.filter_tasks(&ctx(), &[a]).visible.len(), 1);
}

#[test]
fn free_morning_is_capped_at_eight_hours() {
    let store = Arc::new(SqliteStore::open_memory().unwrap());
    let calc = AvailabilityCalculator::new(store);
    let eight_am = Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap();
    assert_eq!(calc.compute("u1", eight_am), 480);
}

#[test]
fn cycle_hides_both_tasks_and_fails_chain() {
    let h = Harness::new(FilterFlags::default());
    let a = h.task("A", |t| t);
    let b = h.task("B", |t| t);
    h.store
        .add_dependency(&TaskDependency::new(&a.id, &b.id, DependencyType::Blocking).unwrap())
        .unwrap();
    h.store
        .add_dependency(&TaskDependency::new(&b.id, &a.id, DependencyType::Blocking).unwrap())
        .unwrap();

    assert!(h.resolver.has_cycle(&a.id).unwrap().is_some());
    assert!(h.resolver.has_cycle(&b.id).unwrap().is_some());
    assert!(matches!(
        h.resolver.chain(&a.id),
        Err(DependencyError::CircularDependency { .. })
    ));

    let outcome = h.engine.filter_tasks(&ctx(), &[a.clone(), b]);
    assert!(outcome.visible.is_empty());
    let reason = &outcome
        .results
        .iter()
        .find(|r| r.task_id == a.id && r.rule_name == "dependency")
        .unwrap()
        .reason;
    assert!(reason.starts_with("circular dependency detected"), "{reason}");
}

#[test]
fn rules_report_in_priority_order() {
    let h = Harness::new(FilterFlags::all());
    let task = h.task("Anything", |t| t);
    let explanation = h.engine.explain_task_visibility(&ctx(), &task);
    let names: Vec<&str> = explanation
        .rules
        .iter()
        .map(|r| r.rule_name.as_str())
        .collect();
    assert_eq!(names, vec!["dependency", "time", "location", "focus", "energy"]);
}

#[test]
fn energy_rule_is_off_until_enabled() {
    let h = Harness::new(FilterFlags::default());
    let taxes = h.task("Taxes", |t| t.with_priority(5).unwrap());
    let tired = ctx().with_energy(EnergyLevel::new(1).unwrap());

    let decision = h.engine.apply_single_filter("energy", &tired, &taxes).unwrap();
    assert!(decision.visible);
    assert_eq!(decision.reason, "disabled");

    h.engine.enable_filter("energy").unwrap();
    assert!(!h.engine.apply_single_filter("energy", &tired, &taxes).unwrap().visible);
    assert!(h.engine.filter_tasks(&tired, &[taxes]).visible.is_empty());
}

#[test]
fn focus_contexts_come_from_config() {
    let mut config = Config::default();
    config
        .update("focus.conducive_contexts", "alone,at_work")
        .unwrap();
    let h = Harness::with_config(&config);
    let review = h.task("Review design", |t| t.requiring_focus());

    let at_work = ctx().with_social_context(SocialContext::AtWork);
    let in_public = ctx().with_social_context(SocialContext::InPublic);
    assert_eq!(h.engine.filter_tasks(&at_work, &[review.clone()]).visible.len(), 1);
    assert!(h.engine.filter_tasks(&in_public, &[review]).visible.is_empty());
}

#[test]
fn audits_are_persisted_per_task() {
    let h = Harness::new(FilterFlags::default());
    let quick = h.task("Quick", |t| t.with_estimated_minutes(5).with_priority(4).unwrap());
    let slow = h.task("Slow", |t| t.with_estimated_minutes(90));
    let context = ctx().with_available_minutes(30);

    h.engine.filter_tasks(&context, &[quick.clone(), slow.clone()]);

    let quick_log = h.engine.audit_log(&quick.id, &context).unwrap();
    assert_eq!(quick_log.len(), 1);
    assert!(quick_log[0].visible);
    assert_eq!(quick_log[0].priority_score, 4.0);
    assert_eq!(quick_log[0].context_id, context.id);

    let slow_log = h.engine.audit_log(&slow.id, &context).unwrap();
    assert!(!slow_log[0].visible);
    assert_eq!(slow_log[0].failed_rules(), vec!["time"]);

    let since = h
        .store
        .audits_for_user_since("u1", context.timestamp - chrono::Duration::minutes(1), 10)
        .unwrap();
    assert_eq!(since.len(), 2);
}

#[test]
fn stats_name_most_restrictive_rule() {
    let h = Harness::new(FilterFlags::default());
    let tasks = vec![
        h.task("a", |t| t.with_estimated_minutes(60)),
        h.task("b", |t| t.with_estimated_minutes(90)),
        h.task("c", |t| t.requiring_focus()),
        h.task("d", |t| t),
    ];
    let context = ctx()
        .with_available_minutes(30)
        .with_social_context(SocialContext::Driving);

    let stats = h.engine.filter_stats(&context, &tasks);
    assert_eq!(stats.total_tasks, 4);
    assert_eq!(stats.visible_tasks, 1);
    assert_eq!(stats.rules["time"].hidden, 2);
    assert_eq!(stats.rules["focus"].hidden, 1);
    assert_eq!(stats.rules["energy"].reasons["disabled"], 4);
    assert_eq!(stats.most_restrictive(), Some("time"));
}

#[test]
fn resolved_context_feeds_location_rule() {
    let h = Harness::new(FilterFlags::default());
    let store = h.store.clone();
    let gym = Location::new("u1", "Gym", Coordinates::new(48.85, 2.35), 150.0).unwrap();
    store.insert_location(&gym).unwrap();
    let workout = h.task("Workout", |t| t.at_location(&gym.id));

    let resolver = ContextResolver::new(AvailabilityCalculator::new(store.clone()), store.clone());
    let mut update = ContextUpdate::new("u1");
    update.position = Some(Coordinates::new(48.85 + 20.0 / METERS_PER_DEGREE, 2.35));
    update.available_minutes = Some(60);
    let context = resolver.resolve(update);

    assert_eq!(context.current_location_id.as_deref(), Some(gym.id.as_str()));
    let decision = h.engine.apply_single_filter("location", &context, &workout).unwrap();
    assert_eq!(decision.reason, format!("at required location {}", gym.id));
}

#[test]
fn concurrent_reads_and_rule_mutations() {
    let h = Arc::new(Harness::new(FilterFlags::default()));
    let tasks: Vec<Task> = (0..20)
        .map(|i| h.task(&format!("t{i}"), |t| t.with_estimated_minutes(i * 5)))
        .collect();
    let context = ctx().with_available_minutes(50);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..10 {
                    let outcome = h.engine.filter_tasks(&context, &tasks);
                    assert!(outcome.visible.len() <= tasks.len());
                }
            });
        }
        scope.spawn(|| {
            for _ in 0..10 {
                h.engine.disable_filter("time").unwrap();
                h.engine.enable_filter("time").unwrap();
            }
        });
    });

    assert_eq!(h.engine.filter_tasks(&context, &tasks).visible.len(), 11);
}
