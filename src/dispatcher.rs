use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use crate::{rule_table::RuleTable, rules::ExtractionRule, Event, Target, LOG_TARGET};

/// Translates events into refresh targets using a shared [`RuleTable`].
///
/// `Dispatcher` is cheap to clone and can be used from many threads at once.
///
/// ```
/// # use std::sync::Arc;
/// # use aws_event_targets::{rule_table::RuleTable, Dispatcher, Event};
/// # use serde_json::json;
/// let dispatcher = Dispatcher::new(Arc::new(RuleTable::builder().build()));
/// assert!(dispatcher.parse(&Event::new("AWS_ALARM_cpu-high", json!({}))).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher {
    rule_table: Arc<RuleTable>,
}

impl Dispatcher {
    /// Create a dispatcher over `rule_table`.
    pub fn new(rule_table: Arc<RuleTable>) -> Dispatcher {
        Dispatcher { rule_table }
    }

    /// The rule table this dispatcher looks rules up in.
    pub fn rule_table(&self) -> &RuleTable {
        &self.rule_table
    }

    /// Extract refresh targets from `event`.
    ///
    /// All rules registered for the event type run in registration order and their targets are
    /// concatenated. Targets are not deduplicated. Unknown event types, missing values and faulty
    /// rules never fail the call; they only contribute no targets.
    pub fn parse(&self, event: &Event) -> Vec<Target> {
        let rules = self.rule_table.lookup(event);
        if rules.is_empty() {
            log::debug!(target: LOG_TARGET,
                        event_type:display = event.event_type;
                        "no extraction rule registered for event type");
            return Vec::new();
        }

        let targets: Vec<Target> = rules
            .iter()
            .flat_map(|rule| run_rule(*rule, event))
            .collect();

        log::trace!(target: LOG_TARGET,
                    event_type:display = event.event_type,
                    rules = rules.len(),
                    targets = targets.len();
                    "parsed event targets");

        targets
    }
}

/// Run a single rule, treating any fault as an empty contribution.
fn run_rule(rule: &dyn ExtractionRule, event: &Event) -> Vec<Target> {
    // Rules only read the payload, so a panicking rule cannot leave shared state inconsistent.
    match panic::catch_unwind(AssertUnwindSafe(|| rule.extract(&event.payload))) {
        Ok(Ok(targets)) => targets,
        Ok(Err(err)) => {
            log::warn!(target: LOG_TARGET,
                       event_type:display = event.event_type,
                       rule = rule.name();
                       "extraction rule failed: {}", err);
            Vec::new()
        }
        Err(_) => {
            log::warn!(target: LOG_TARGET,
                       event_type:display = event.event_type,
                       rule = rule.name();
                       "extraction rule panicked");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};

    use super::Dispatcher;
    use crate::{
        rule_table::{EventTypeMatcher, RuleTable},
        EntityClass, Event, ExtractError, Target,
    };

    fn vm(id: &str) -> Target {
        Target::ems_ref(EntityClass::Vm, id).unwrap()
    }

    fn dispatcher() -> Dispatcher {
        let table = RuleTable::builder()
            .register(
                EventTypeMatcher::prefix("TEST_"),
                |payload: &Value| -> Result<Vec<Target>, ExtractError> {
                    Ok(payload["id"]
                        .as_str()
                        .and_then(|id| Target::ems_ref(EntityClass::Vm, id))
                        .into_iter()
                        .collect())
                },
            )
            .register(
                EventTypeMatcher::exact("TEST_faulty"),
                |_payload: &Value| -> Result<Vec<Target>, ExtractError> {
                    Err(ExtractError::UnexpectedShape {
                        path: "id".to_owned(),
                        expected: "list",
                    })
                },
            )
            .register(
                EventTypeMatcher::exact("TEST_panicky"),
                |_payload: &Value| -> Result<Vec<Target>, ExtractError> {
                    panic!("rule bug");
                },
            )
            .register(
                EventTypeMatcher::prefix("TEST_"),
                |payload: &Value| -> Result<Vec<Target>, ExtractError> {
                    Ok(payload["id"]
                        .as_str()
                        .and_then(|id| Target::ems_ref(EntityClass::InstanceState, id))
                        .into_iter()
                        .collect())
                },
            )
            .build();

        Dispatcher::new(Arc::new(table))
    }

    #[test]
    fn unknown_event_type_has_no_targets() {
        let _ = env_logger::builder().is_test(true).try_init();

        assert!(dispatcher()
            .parse(&Event::new("UNKNOWN", json!({"id": "i-1"})))
            .is_empty());
    }

    #[test]
    fn concatenates_rules_in_registration_order() {
        assert_eq!(
            dispatcher().parse(&Event::new("TEST_event", json!({"id": "i-1"}))),
            vec![
                vm("i-1"),
                Target::ems_ref(EntityClass::InstanceState, "i-1").unwrap()
            ]
        );
    }

    #[test]
    fn faulty_rule_does_not_affect_other_rules() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dispatcher = dispatcher();

        for event_type in ["TEST_faulty", "TEST_panicky"] {
            assert_eq!(
                dispatcher.parse(&Event::new(event_type, json!({"id": "i-1"}))),
                vec![
                    vm("i-1"),
                    Target::ems_ref(EntityClass::InstanceState, "i-1").unwrap()
                ]
            );
        }
    }

    #[test]
    fn rules_yielding_nothing_give_empty_result() {
        assert!(dispatcher()
            .parse(&Event::new("TEST_event", json!({"other": "i-1"})))
            .is_empty());
    }

    #[test]
    fn does_not_mutate_event() {
        let event = Event::new("TEST_event", json!({"id": "i-1", "nested": {"a": [1, 2]}}));
        let before = event.clone();

        let dispatcher = dispatcher();
        let first = dispatcher.parse(&event);
        let second = dispatcher.parse(&event);

        assert_eq!(event, before);
        assert_eq!(first, second);
    }

    #[test]
    fn can_parse_from_other_threads() {
        let dispatcher = dispatcher();

        let handles = (0..4)
            .map(|i| {
                let dispatcher = dispatcher.clone();
                std::thread::spawn(move || {
                    dispatcher.parse(&Event::new("TEST_event", json!({"id": format!("i-{i}")})))
                })
            })
            .collect::<Vec<_>>();

        for (i, handle) in handles.into_iter().enumerate() {
            let targets = handle.join().unwrap();
            assert_eq!(targets[0], vm(&format!("i-{i}")));
        }
    }
}
