//! Registry of extraction rules keyed by event type.
//!
//! A [`RuleTable`] is built once with a [`RuleTableBuilder`] and is immutable afterwards, so it
//! can be shared between threads (usually behind an `Arc`) without locking.

use std::{borrow::Cow, fmt, sync::Arc};

use regex::Regex;
use serde_json::Value;

use crate::{
    navigator::{self, Path},
    rules::ExtractionRule,
    Event, Result,
};

/// Selects the event types a rule is registered for.
#[derive(Debug, Clone)]
pub enum EventTypeMatcher {
    /// The event type equals the string.
    Exact(String),
    /// The event type starts with the string.
    Prefix(String),
    /// The event type matches the regular expression.
    Pattern(Regex),
    /// The inner matcher selects the event type and it does not start with `prefix`.
    Excluding {
        /// Matcher that selects candidate event types.
        matcher: Box<EventTypeMatcher>,
        /// Prefix of event types to leave out.
        prefix: String,
    },
}

impl EventTypeMatcher {
    /// Match `event_type` exactly.
    pub fn exact(event_type: impl Into<String>) -> EventTypeMatcher {
        EventTypeMatcher::Exact(event_type.into())
    }

    /// Match event types starting with `prefix`.
    pub fn prefix(prefix: impl Into<String>) -> EventTypeMatcher {
        EventTypeMatcher::Prefix(prefix.into())
    }

    /// Match event types against a regular expression.
    ///
    /// Returns [`Error::InvalidPattern`](crate::Error::InvalidPattern) if `pattern` does not
    /// compile.
    pub fn pattern(pattern: &str) -> Result<EventTypeMatcher> {
        Ok(EventTypeMatcher::Pattern(Regex::new(pattern)?))
    }

    /// Narrow this matcher to event types that do not start with `prefix`.
    ///
    /// ```
    /// # use aws_event_targets::rule_table::EventTypeMatcher;
    /// let matcher = EventTypeMatcher::prefix("AWS_").excluding("AWS_ALARM_");
    /// assert!(matcher.matches("AWS_API_CALL_StartInstances"));
    /// assert!(!matcher.matches("AWS_ALARM_cpu-high"));
    /// ```
    pub fn excluding(self, prefix: impl Into<String>) -> EventTypeMatcher {
        EventTypeMatcher::Excluding {
            matcher: Box::new(self),
            prefix: prefix.into(),
        }
    }

    /// Whether `event_type` is selected.
    pub fn matches(&self, event_type: &str) -> bool {
        match self {
            EventTypeMatcher::Exact(expected) => event_type == expected,
            EventTypeMatcher::Prefix(prefix) => event_type.starts_with(prefix.as_str()),
            EventTypeMatcher::Pattern(regex) => regex.is_match(event_type),
            EventTypeMatcher::Excluding { matcher, prefix } => {
                !event_type.starts_with(prefix.as_str()) && matcher.matches(event_type)
            }
        }
    }
}

impl fmt::Display for EventTypeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTypeMatcher::Exact(expected) => f.write_str(expected),
            EventTypeMatcher::Prefix(prefix) => write!(f, "{}*", prefix),
            EventTypeMatcher::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
            EventTypeMatcher::Excluding { matcher, prefix } => {
                write!(f, "{} except {}*", matcher, prefix)
            }
        }
    }
}

/// Secondary key for event families whose type alone does not decide the rule.
///
/// The value at `path` is read from the [notification body](navigator::notification_body) and
/// must coerce to `expected` for the registration to apply.
#[derive(Debug, Clone)]
pub struct Discriminator {
    path: Path,
    expected: String,
}

impl Discriminator {
    /// Require the value at `path` to equal `expected`.
    pub fn new(path: &str, expected: impl Into<String>) -> Result<Discriminator> {
        Ok(Discriminator {
            path: Path::parse(path)?,
            expected: expected.into(),
        })
    }

    /// Whether `body` holds the expected value.
    pub fn matches(&self, body: &Value) -> bool {
        navigator::get(body, &self.path)
            .as_deref()
            .and_then(navigator::reference_value)
            .is_some_and(|value| value == self.expected)
    }
}

struct Registration {
    matcher: EventTypeMatcher,
    discriminator: Option<Discriminator>,
    rule: Arc<dyn ExtractionRule>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("matcher", &self.matcher)
            .field("discriminator", &self.discriminator)
            .field("rule", &self.rule.name())
            .finish()
    }
}

/// Immutable mapping from event type to an ordered list of extraction rules.
#[derive(Debug)]
pub struct RuleTable {
    registrations: Vec<Registration>,
}

impl RuleTable {
    /// Start an empty table.
    pub fn builder() -> RuleTableBuilder {
        RuleTableBuilder::default()
    }

    /// Rules that apply to `event`, in registration order.
    ///
    /// An empty result is a normal outcome and means the event has no targets.
    pub fn lookup<'a>(&'a self, event: &Event) -> Vec<&'a dyn ExtractionRule> {
        // Decoded lazily and at most once per lookup.
        let mut body: Option<Cow<'_, Value>> = None;

        self.registrations
            .iter()
            .filter(|registration| registration.matcher.matches(&event.event_type))
            .filter(|registration| match &registration.discriminator {
                None => true,
                Some(discriminator) => discriminator.matches(
                    body.get_or_insert_with(|| navigator::notification_body(&event.payload)),
                ),
            })
            .map(|registration| -> &'a dyn ExtractionRule { registration.rule.as_ref() })
            .collect()
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

/// Collects registrations for a [`RuleTable`].
#[derive(Debug, Default)]
pub struct RuleTableBuilder {
    registrations: Vec<Registration>,
}

impl RuleTableBuilder {
    /// Register `rule` for every event type selected by `matcher`.
    pub fn register(self, matcher: EventTypeMatcher, rule: impl ExtractionRule + 'static) -> Self {
        self.register_shared(matcher, None, Arc::new(rule))
    }

    /// Register `rule` for event types selected by `matcher` whose payload also satisfies
    /// `discriminator`.
    pub fn register_when(
        self,
        matcher: EventTypeMatcher,
        discriminator: Discriminator,
        rule: impl ExtractionRule + 'static,
    ) -> Self {
        self.register_shared(matcher, Some(discriminator), Arc::new(rule))
    }

    /// Register an already shared rule, optionally behind a `discriminator`.
    pub fn register_shared(
        mut self,
        matcher: EventTypeMatcher,
        discriminator: Option<Discriminator>,
        rule: Arc<dyn ExtractionRule>,
    ) -> Self {
        self.registrations.push(Registration {
            matcher,
            discriminator,
            rule,
        });
        self
    }

    /// Freeze the registrations into a table.
    pub fn build(self) -> RuleTable {
        RuleTable {
            registrations: self.registrations,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{Discriminator, EventTypeMatcher, RuleTable};
    use crate::{rules::ExtractionRule, Error, Event, ExtractError, Target};

    fn named(name: &'static str) -> impl Fn(&Value) -> Result<Vec<Target>, ExtractError> {
        move |_payload: &Value| Ok(vec![Target::ems_ref(crate::EntityClass::Vm, name).unwrap()])
    }

    fn names(table: &RuleTable, event: &Event) -> Vec<String> {
        table
            .lookup(event)
            .into_iter()
            .flat_map(|rule| rule.extract(&event.payload).unwrap())
            .map(|target| target.reference().get("ems_ref").unwrap().to_owned())
            .collect()
    }

    #[test]
    fn matchers() {
        assert!(EventTypeMatcher::exact("AWS_API_CALL_StartInstances")
            .matches("AWS_API_CALL_StartInstances"));
        assert!(!EventTypeMatcher::exact("AWS_API_CALL_StartInstances")
            .matches("AWS_API_CALL_StartInstancesX"));
        assert!(EventTypeMatcher::prefix("AWS_ALARM_").matches("AWS_ALARM_cpu-high"));
        assert!(!EventTypeMatcher::prefix("AWS_ALARM_").matches("AWS_API_CALL_RunInstances"));

        let pattern = EventTypeMatcher::pattern(r"^AWS_\w+_(CREATE|DELETE)$").unwrap();
        assert!(pattern.matches("AWS_CloudFormation_Stack_DELETE"));
        assert!(!pattern.matches("AWS_CloudFormation_Stack_UPDATE"));
    }

    #[test]
    fn excluding_matcher() {
        let matcher = EventTypeMatcher::pattern(r"^AWS_[A-Za-z0-9]+_[A-Za-z0-9]+_DELETE$")
            .unwrap()
            .excluding("AWS_API_CALL_");

        assert!(matcher.matches("AWS_CloudFormation_Stack_DELETE"));
        assert!(!matcher.matches("AWS_API_CALL_DELETE"));
        assert!(!matcher.matches("AWS_CloudFormation_Stack_CREATE"));
        assert_eq!(
            EventTypeMatcher::prefix("AWS_")
                .excluding("AWS_ALARM_")
                .to_string(),
            "AWS_* except AWS_ALARM_*"
        );
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(matches!(
            EventTypeMatcher::pattern("(unclosed"),
            Err(Error::InvalidPattern(_))
        ));
    }

    #[test]
    fn displays_matchers() {
        assert_eq!(EventTypeMatcher::exact("a").to_string(), "a");
        assert_eq!(EventTypeMatcher::prefix("AWS_").to_string(), "AWS_*");
        assert_eq!(
            EventTypeMatcher::pattern("^x$").unwrap().to_string(),
            "/^x$/"
        );
    }

    #[test]
    fn lookup_miss_is_empty() {
        let table = RuleTable::builder()
            .register(EventTypeMatcher::exact("known"), named("a"))
            .build();

        assert!(table
            .lookup(&Event::new("unknown", json!({})))
            .is_empty());
    }

    #[test]
    fn lookup_preserves_registration_order() {
        let table = RuleTable::builder()
            .register(EventTypeMatcher::prefix("AWS_API_CALL_"), named("first"))
            .register(EventTypeMatcher::exact("AWS_API_CALL_RunInstances"), named("second"))
            .register(EventTypeMatcher::prefix("AWS_"), named("third"))
            .register(EventTypeMatcher::prefix("EC2_"), named("unrelated"))
            .build();

        assert_eq!(table.len(), 4);
        assert_eq!(
            names(&table, &Event::new("AWS_API_CALL_RunInstances", json!({}))),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn discriminator_selects_rules() {
        let matcher = || EventTypeMatcher::pattern(r"^AWS_\w+_CREATE$").unwrap();
        let table = RuleTable::builder()
            .register_when(
                matcher(),
                Discriminator::new("configurationItem.resourceType", "AWS::EC2::Instance")
                    .unwrap(),
                named("instance"),
            )
            .register_when(
                matcher(),
                Discriminator::new("configurationItem.resourceType", "AWS::EC2::Volume")
                    .unwrap(),
                named("volume"),
            )
            .build();

        let body = json!({"configurationItem": {"resourceType": "AWS::EC2::Volume"}});
        assert_eq!(
            names(&table, &Event::new("AWS_EC2_Volume_CREATE", body.clone())),
            vec!["volume"]
        );

        // Discriminators see through SNS envelopes.
        let wrapped = json!({"Type": "Notification", "Message": body.to_string()});
        assert_eq!(
            names(&table, &Event::new("AWS_EC2_Volume_CREATE", wrapped)),
            vec!["volume"]
        );

        assert!(table
            .lookup(&Event::new("AWS_EC2_Volume_CREATE", json!({})))
            .is_empty());
    }

    #[test]
    fn empty_table() {
        let table = RuleTable::builder().build();
        assert!(table.is_empty());
        assert!(table.lookup(&Event::new("anything", Value::Null)).is_empty());
    }
}
