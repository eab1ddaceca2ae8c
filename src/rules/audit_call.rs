use serde_json::Value;

use super::ExtractionRule;
use crate::{
    navigator::{self, Path},
    EntityClass, ExtractError, Result, Target,
};

const REQUEST_PARAMETERS: &str = "detail.requestParameters";
const RESPONSE_ELEMENTS: &str = "detail.responseElements";
const INSTANCE_ITEMS: &str = "instancesSet.items";
const INSTANCE_ID: &str = "instanceId";

/// Identifier fields CloudTrail reports at the top level of request parameters and response
/// elements, and the entity class each one refers to.
fn identifier_fields() -> Vec<(&'static str, EntityClass)> {
    vec![
        ("instanceId", EntityClass::Vm),
        ("imageId", EntityClass::Image),
        ("stackName", EntityClass::OrchestrationStack),
        ("stackId", EntityClass::OrchestrationStack),
        ("vpcId", EntityClass::CloudNetwork),
        ("subnetId", EntityClass::CloudSubnet),
        ("networkInterfaceId", EntityClass::NetworkPort),
        ("groupId", EntityClass::SecurityGroup),
        ("allocationId", EntityClass::FloatingIp),
        ("loadBalancerName", EntityClass::LoadBalancer),
        ("volumeId", EntityClass::CloudVolume),
        ("snapshotId", EntityClass::CloudVolumeSnapshot),
        ("keyName", EntityClass::KeyPair),
    ]
}

/// Rule for CloudTrail API calls delivered through CloudWatch Events (`AWS_API_CALL_*`).
///
/// Both `detail.requestParameters` and `detail.responseElements` are scanned for known
/// identifier fields. Instance lifecycle calls (`StartInstances`, `StopInstances`, ...) list the
/// affected instances under `instancesSet.items` on both sides:
///
/// - request items become [`EntityClass::Vm`] targets;
/// - response items, which carry the instance's new power state, become targets of the
///   configured instance state class ([`EntityClass::InstanceState`] by default).
///
/// One affected instance therefore yields two targets with the same reference.
#[derive(Debug, Clone)]
pub struct AuditCallRule {
    request_fields: Vec<(Path, EntityClass)>,
    response_fields: Vec<(Path, EntityClass)>,
    request_instances: Path,
    response_instances: Path,
    instance_id: Path,
    instance_state_class: EntityClass,
}

impl AuditCallRule {
    /// Create the rule, emitting response-side instances as `instance_state_class`.
    pub fn new(instance_state_class: EntityClass) -> Result<AuditCallRule> {
        let request = Path::parse(REQUEST_PARAMETERS)?;
        let response = Path::parse(RESPONSE_ELEMENTS)?;
        let instance_items = Path::parse(INSTANCE_ITEMS)?;

        let fields_under = |section: &Path| {
            identifier_fields()
                .into_iter()
                .map(|(field, entity_class)| -> Result<(Path, EntityClass)> {
                    Ok((section.join(&Path::parse(field)?), entity_class))
                })
                .collect::<Result<Vec<_>>>()
        };

        Ok(AuditCallRule {
            request_fields: fields_under(&request)?,
            response_fields: fields_under(&response)?,
            request_instances: request.join(&instance_items),
            response_instances: response.join(&instance_items),
            instance_id: Path::parse(INSTANCE_ID)?,
            instance_state_class,
        })
    }

    fn extract_fields(
        &self,
        payload: &Value,
        fields: &[(Path, EntityClass)],
        targets: &mut Vec<Target>,
    ) -> std::result::Result<(), ExtractError> {
        for (path, entity_class) in fields {
            if let Some(value) = navigator::reference(payload, path)? {
                targets.extend(Target::ems_ref(entity_class.clone(), value));
            }
        }
        Ok(())
    }

    fn extract_instances(
        &self,
        payload: &Value,
        items_path: &Path,
        entity_class: &EntityClass,
        targets: &mut Vec<Target>,
    ) -> std::result::Result<(), ExtractError> {
        // Items are usually objects; anything else has no instance id to offer.
        for item in navigator::items(payload, items_path)?.iter() {
            if !item.is_object() {
                continue;
            }
            if let Some(value) = navigator::reference(item, &self.instance_id)? {
                targets.extend(Target::ems_ref(entity_class.clone(), value));
            }
        }
        Ok(())
    }
}

impl ExtractionRule for AuditCallRule {
    fn extract(&self, payload: &Value) -> std::result::Result<Vec<Target>, ExtractError> {
        let mut targets = Vec::new();

        self.extract_fields(payload, &self.request_fields, &mut targets)?;
        self.extract_instances(
            payload,
            &self.request_instances,
            &EntityClass::Vm,
            &mut targets,
        )?;

        self.extract_fields(payload, &self.response_fields, &mut targets)?;
        self.extract_instances(
            payload,
            &self.response_instances,
            &self.instance_state_class,
            &mut targets,
        )?;

        Ok(targets)
    }

    fn name(&self) -> &str {
        "audit_call"
    }
}
