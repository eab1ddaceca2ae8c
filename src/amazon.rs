//! Rule registrations for AWS event families.
//!
//! | Event type | Source | Rule |
//! |---|---|---|
//! | `AWS_<Service>_<Resource>_<CREATE\|UPDATE\|DELETE>` | AWS Config via SNS | [`PathRule`] per resource type |
//! | `AWS_API_CALL_<eventName>` | CloudTrail via CloudWatch Events | [`AuditCallRule`] |
//! | `EC2_Instance_State_change_Notification_<state>` | CloudWatch Events | [`PathRule`] |
//! | `EBS_Snapshot_Notification_<event>` | CloudWatch Events | [`SnapshotRule`] |
//! | `AWS_ALARM_<alarmName>` | CloudWatch alarms via SNS | [`AlarmRule`] |

use std::sync::Arc;

use crate::{
    rule_table::{Discriminator, EventTypeMatcher, RuleTable, RuleTableBuilder},
    rules::{AlarmRule, AuditCallRule, PathRule, SnapshotRule},
    EntityClass, ParserConfig, Result,
};

/// AWS Config change notifications. Event types starting with [`API_CALL_PREFIX`] are never
/// configuration changes, even when they fit the pattern (`AWS_API_CALL_DELETE`).
pub const CONFIG_EVENT_PATTERN: &str = r"^AWS_[A-Za-z0-9]+_[A-Za-z0-9]+_(CREATE|UPDATE|DELETE)$";
/// CloudTrail API calls, followed by the API operation name.
pub const API_CALL_PREFIX: &str = "AWS_API_CALL_";
/// EC2 instance state changes, followed by the new state.
pub const INSTANCE_STATE_CHANGE_PREFIX: &str = "EC2_Instance_State_change_Notification";
/// EBS snapshot notifications, followed by the snapshot event.
pub const SNAPSHOT_NOTIFICATION_PREFIX: &str = "EBS_Snapshot_Notification";
/// CloudWatch alarms, followed by the alarm name.
pub const ALARM_PREFIX: &str = "AWS_ALARM_";

const CONFIG_RESOURCE_TYPE: &str = "configurationItem.resourceType";
const CONFIG_RESOURCE_ID: &str = "configurationItem.resourceId";
const INSTANCE_ID: &str = "detail.instance-id";

/// AWS Config resource types and the entity class they refresh.
fn config_resource_types() -> Vec<(&'static str, EntityClass)> {
    vec![
        ("AWS::EC2::Instance", EntityClass::Vm),
        ("AWS::EC2::SecurityGroup", EntityClass::SecurityGroup),
        ("AWS::EC2::Volume", EntityClass::CloudVolume),
        ("AWS::EC2::NetworkInterface", EntityClass::NetworkPort),
        ("AWS::EC2::VPC", EntityClass::CloudNetwork),
        ("AWS::EC2::Subnet", EntityClass::CloudSubnet),
        ("AWS::EC2::EIP", EntityClass::FloatingIp),
        ("AWS::CloudFormation::Stack", EntityClass::OrchestrationStack),
        (
            "AWS::ElasticLoadBalancing::LoadBalancer",
            EntityClass::LoadBalancer,
        ),
    ]
}

/// Builder pre-populated with the AWS rules, ready for further registrations.
pub fn rules(config: &ParserConfig) -> Result<RuleTableBuilder> {
    let config_events =
        EventTypeMatcher::pattern(CONFIG_EVENT_PATTERN)?.excluding(API_CALL_PREFIX);

    let builder = config_resource_types().into_iter().try_fold(
        RuleTable::builder(),
        |builder, (resource_type, entity_class)| -> Result<RuleTableBuilder> {
            Ok(builder.register_when(
                config_events.clone(),
                Discriminator::new(CONFIG_RESOURCE_TYPE, resource_type)?,
                PathRule::new(entity_class, CONFIG_RESOURCE_ID)?.in_notification_body(),
            ))
        },
    )?;

    Ok(builder
        .register(
            EventTypeMatcher::prefix(API_CALL_PREFIX),
            AuditCallRule::new(config.instance_state_class.clone())?,
        )
        .register(
            EventTypeMatcher::prefix(INSTANCE_STATE_CHANGE_PREFIX),
            PathRule::new(EntityClass::Vm, INSTANCE_ID)?,
        )
        .register(
            EventTypeMatcher::prefix(SNAPSHOT_NOTIFICATION_PREFIX),
            SnapshotRule::new()?,
        )
        .register(EventTypeMatcher::prefix(ALARM_PREFIX), AlarmRule::new()?))
}

/// The default AWS rule table.
pub fn rule_table() -> Result<Arc<RuleTable>> {
    Ok(Arc::new(rules(&ParserConfig::default())?.build()))
}
