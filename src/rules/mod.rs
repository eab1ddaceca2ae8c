//! Extraction rules turn an event payload into zero or more [`Target`]s.
//!
//! Each rule knows the payload shape of one event family. Rules are pure: they only read the
//! payload and keep no state between calls. A rule that cannot find a reference returns no target
//! for it; a rule only returns an [`ExtractError`] when a value is present but has a shape it
//! cannot work with.

use serde_json::Value;

use crate::{
    navigator::{self, Path},
    EntityClass, ExtractError, Result, Target,
};

mod alarm;
mod audit_call;
mod snapshot;

pub use alarm::AlarmRule;
pub use audit_call::AuditCallRule;
pub use snapshot::SnapshotRule;

/// Extract refresh targets from an event payload.
///
/// Any `Fn(&Value) -> Result<Vec<Target>, ExtractError>` is an extraction rule:
///
/// ```
/// # use aws_event_targets::{rules::ExtractionRule, EntityClass, ExtractError, Target};
/// # use serde_json::{json, Value};
/// let rule = |payload: &Value| -> Result<Vec<Target>, ExtractError> {
///     Ok(payload["clusterId"]
///         .as_str()
///         .and_then(|id| Target::ems_ref(EntityClass::Other("ems_cluster".into()), id))
///         .into_iter()
///         .collect())
/// };
/// assert_eq!(rule.extract(&json!({"clusterId": "c-1"})).unwrap().len(), 1);
/// ```
pub trait ExtractionRule: Send + Sync {
    /// Targets named by `payload`, in payload order. Values the rule does not find produce no
    /// target.
    fn extract(&self, payload: &Value) -> std::result::Result<Vec<Target>, ExtractError>;

    /// Name used when logging rule faults.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<T> ExtractionRule for T
where
    T: Fn(&Value) -> std::result::Result<Vec<Target>, ExtractError> + Send + Sync,
{
    fn extract(&self, payload: &Value) -> std::result::Result<Vec<Target>, ExtractError> {
        self(payload)
    }
}

/// Reads a single identifier at a fixed path and emits one target of a fixed class.
///
/// Covers every family whose payload names exactly one resource, e.g. EC2 state-change
/// notifications (`detail.instance-id`) and AWS Config notifications
/// (`configurationItem.resourceId`).
#[derive(Debug, Clone)]
pub struct PathRule {
    entity_class: EntityClass,
    path: Path,
    in_notification_body: bool,
}

impl PathRule {
    /// Emit one `entity_class` target for the identifier at `path`.
    pub fn new(entity_class: EntityClass, path: &str) -> Result<PathRule> {
        Ok(PathRule {
            entity_class,
            path: Path::parse(path)?,
            in_notification_body: false,
        })
    }

    /// Resolve the path against the [notification body](navigator::notification_body) instead
    /// of the raw payload, so SNS-wrapped and unwrapped deliveries extract the same way.
    pub fn in_notification_body(mut self) -> PathRule {
        self.in_notification_body = true;
        self
    }
}

impl ExtractionRule for PathRule {
    fn extract(&self, payload: &Value) -> std::result::Result<Vec<Target>, ExtractError> {
        let reference = if self.in_notification_body {
            navigator::reference(&navigator::notification_body(payload), &self.path)?
        } else {
            navigator::reference(payload, &self.path)?
        };

        Ok(reference
            .and_then(|value| Target::ems_ref(self.entity_class.clone(), value))
            .into_iter()
            .collect())
    }

    fn name(&self) -> &str {
        "path"
    }
}
