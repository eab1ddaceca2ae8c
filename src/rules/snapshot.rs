use serde_json::Value;

use super::ExtractionRule;
use crate::{
    navigator::{self, Path},
    EntityClass, ExtractError, Result, Target,
};

/// Rule for EBS snapshot notifications (`EBS_Snapshot_Notification_*`).
///
/// The notification names the snapshot and its source volume by ARN
/// (`arn:aws:ec2::us-east-1:snapshot/snap-01234567`), while the inventory keys them by id.
#[derive(Debug, Clone)]
pub struct SnapshotRule {
    snapshot: Path,
    source_volume: Path,
}

impl SnapshotRule {
    /// Create the rule for the `detail.snapshot_id` and `detail.source` fields.
    pub fn new() -> Result<SnapshotRule> {
        Ok(SnapshotRule {
            snapshot: Path::parse("detail.snapshot_id")?,
            source_volume: Path::parse("detail.source")?,
        })
    }
}

/// The resource id at the end of an ARN, or the value itself if it is not an ARN.
fn resource_id(arn: &str) -> &str {
    match arn.rsplit_once('/') {
        Some((_, id)) => id,
        None => arn,
    }
}

impl ExtractionRule for SnapshotRule {
    fn extract(&self, payload: &Value) -> std::result::Result<Vec<Target>, ExtractError> {
        let mut targets = Vec::new();

        if let Some(arn) = navigator::reference(payload, &self.snapshot)? {
            targets.extend(Target::ems_ref(
                EntityClass::CloudVolumeSnapshot,
                resource_id(&arn),
            ));
        }
        if let Some(arn) = navigator::reference(payload, &self.source_volume)? {
            targets.extend(Target::ems_ref(EntityClass::CloudVolume, resource_id(&arn)));
        }

        Ok(targets)
    }

    fn name(&self) -> &str {
        "snapshot"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{resource_id, SnapshotRule};
    use crate::{rules::ExtractionRule, EntityClass, Target};

    #[test]
    fn strips_arn_prefix() {
        assert_eq!(
            resource_id("arn:aws:ec2::us-west-2:snapshot/snap-01234567"),
            "snap-01234567"
        );
        assert_eq!(resource_id("vol-01234567"), "vol-01234567");
        assert_eq!(resource_id("arn:aws:ec2::us-west-2:volume/"), "");
    }

    #[test]
    fn extracts_snapshot_and_source_volume() {
        let rule = SnapshotRule::new().unwrap();
        let payload = json!({
            "detail-type": "EBS Snapshot Notification",
            "detail": {
                "event": "createSnapshot",
                "result": "succeeded",
                "snapshot_id": "arn:aws:ec2::us-west-2:snapshot/snap-01234567",
                "source": "arn:aws:ec2::us-west-2:volume/vol-01234567"
            }
        });

        assert_eq!(
            rule.extract(&payload).unwrap(),
            vec![
                Target::ems_ref(EntityClass::CloudVolumeSnapshot, "snap-01234567").unwrap(),
                Target::ems_ref(EntityClass::CloudVolume, "vol-01234567").unwrap(),
            ]
        );
    }

    #[test]
    fn skips_arns_without_resource_id() {
        let rule = SnapshotRule::new().unwrap();
        let payload = json!({
            "detail": {
                "snapshot_id": "arn:aws:ec2::us-west-2:snapshot/snap-01234567",
                "source": "arn:aws:ec2::us-west-2:volume/"
            }
        });

        assert_eq!(
            rule.extract(&payload).unwrap(),
            vec![Target::ems_ref(EntityClass::CloudVolumeSnapshot, "snap-01234567").unwrap()]
        );
    }
}
