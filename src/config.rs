use std::sync::Arc;

use crate::{
    amazon,
    rule_table::EventTypeMatcher,
    rules::ExtractionRule,
    Dispatcher, EntityClass, Result,
};

/// Configuration for [`Dispatcher`] over the AWS event families.
pub struct ParserConfig {
    pub(crate) instance_state_class: EntityClass,
    pub(crate) extra_rules: Vec<(EventTypeMatcher, Arc<dyn ExtractionRule>)>,
}

impl ParserConfig {
    /// Create the default configuration.
    ///
    /// ```
    /// # use aws_event_targets::ParserConfig;
    /// let dispatcher = ParserConfig::new().to_dispatcher().unwrap();
    /// ```
    pub fn new() -> Self {
        ParserConfig {
            instance_state_class: EntityClass::InstanceState,
            extra_rules: Vec::new(),
        }
    }

    /// Entity class used for the instances reported back by instance lifecycle API calls
    /// (`StartInstances`, `StopInstances`, ...). Defaults to [`EntityClass::InstanceState`].
    ///
    /// ```
    /// # use aws_event_targets::{EntityClass, ParserConfig};
    /// let dispatcher = ParserConfig::new()
    ///     .instance_state_class(EntityClass::Other("ems_cluster".to_owned()))
    ///     .to_dispatcher()
    ///     .unwrap();
    /// ```
    pub fn instance_state_class(&mut self, entity_class: EntityClass) -> &mut Self {
        self.instance_state_class = entity_class;
        self
    }

    /// Register an additional rule. Extra rules run after the built-in rules for the same event.
    pub fn rule(
        &mut self,
        matcher: EventTypeMatcher,
        rule: impl ExtractionRule + 'static,
    ) -> &mut Self {
        self.extra_rules.push((matcher, Arc::new(rule)));
        self
    }

    /// Build the rule table and create a [`Dispatcher`] for it.
    pub fn to_dispatcher(&self) -> Result<Dispatcher> {
        let table = self
            .extra_rules
            .iter()
            .fold(amazon::rules(self)?, |builder, (matcher, rule)| {
                builder.register_shared(matcher.clone(), None, Arc::clone(rule))
            })
            .build();

        log::debug!(target: crate::LOG_TARGET, rules = table.len(); "built rule table");

        Ok(Dispatcher::new(Arc::new(table)))
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::ParserConfig;
    use crate::{rule_table::EventTypeMatcher, EntityClass, Event, ExtractError, Target};

    #[test]
    fn extra_rules_run_after_builtin_rules() {
        let dispatcher = ParserConfig::new()
            .rule(
                EventTypeMatcher::prefix("EC2_Instance_State_change_Notification"),
                |payload: &Value| -> Result<Vec<Target>, ExtractError> {
                    Ok(payload["region"]
                        .as_str()
                        .and_then(|region| {
                            Target::ems_ref(EntityClass::Other("availability_zone".into()), region)
                        })
                        .into_iter()
                        .collect())
                },
            )
            .to_dispatcher()
            .unwrap();

        let targets = dispatcher.parse(&Event::new(
            "EC2_Instance_State_change_Notification_running",
            json!({"region": "us-east-1", "detail": {"instance-id": "i-1", "state": "running"}}),
        ));

        assert_eq!(
            targets,
            vec![
                Target::ems_ref(EntityClass::Vm, "i-1").unwrap(),
                Target::ems_ref(EntityClass::Other("availability_zone".into()), "us-east-1")
                    .unwrap(),
            ]
        );
    }

    #[test]
    fn instance_state_class_applies_to_api_calls() {
        let dispatcher = ParserConfig::new()
            .instance_state_class(EntityClass::Vm)
            .to_dispatcher()
            .unwrap();

        let targets = dispatcher.parse(&Event::new(
            "AWS_API_CALL_StopInstances",
            json!({"detail": {
                "requestParameters": {"instancesSet": {"items": [{"instanceId": "i-1"}]}},
                "responseElements": {"instancesSet": {"items": [{"instanceId": "i-1"}]}}
            }}),
        ));

        assert_eq!(
            targets,
            vec![Target::ems_ref(EntityClass::Vm, "i-1").unwrap(); 2]
        );
    }
}
