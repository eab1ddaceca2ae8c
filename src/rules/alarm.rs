use serde_json::Value;

use super::ExtractionRule;
use crate::{
    navigator::{self, Path},
    EntityClass, ExtractError, Result, Target,
};

/// Rule for CloudWatch alarm notifications (`AWS_ALARM_*`).
///
/// Alarms arrive through SNS with the alarm document double-encoded in `Message`. The metric the
/// alarm watches is described by `Trigger.Dimensions`, a list of `{"name", "value"}` pairs. Only
/// instance and volume dimensions produce a target. Everything else is a pure metric alarm
/// (billing, custom metrics, load balancer health, ...) and produces none.
#[derive(Debug, Clone)]
pub struct AlarmRule {
    dimensions: Path,
    dimension_name: Path,
    dimension_value: Path,
    resource_dimensions: Vec<(String, EntityClass)>,
}

impl AlarmRule {
    /// Create the rule for `InstanceId` and `VolumeId` dimensions.
    pub fn new() -> Result<AlarmRule> {
        Ok(AlarmRule {
            dimensions: Path::parse("Trigger.Dimensions")?,
            dimension_name: Path::parse("name")?,
            dimension_value: Path::parse("value")?,
            resource_dimensions: vec![
                ("InstanceId".to_owned(), EntityClass::Vm),
                ("VolumeId".to_owned(), EntityClass::CloudVolume),
            ],
        })
    }

    fn entity_class(&self, dimension: &str) -> Option<&EntityClass> {
        self.resource_dimensions
            .iter()
            .find(|(name, _)| name == dimension)
            .map(|(_, entity_class)| entity_class)
    }
}

impl ExtractionRule for AlarmRule {
    fn extract(&self, payload: &Value) -> std::result::Result<Vec<Target>, ExtractError> {
        let body = navigator::notification_body(payload);

        let mut targets = Vec::new();
        for dimension in navigator::items(&body, &self.dimensions)?.iter() {
            let Some(name) = navigator::get(dimension, &self.dimension_name)
                .as_deref()
                .and_then(navigator::reference_value)
            else {
                continue;
            };
            let Some(entity_class) = self.entity_class(&name) else {
                continue;
            };
            if let Some(value) = navigator::reference(dimension, &self.dimension_value)? {
                targets.extend(Target::ems_ref(entity_class.clone(), value));
            }
        }

        Ok(targets)
    }

    fn name(&self) -> &str {
        "alarm"
    }
}
