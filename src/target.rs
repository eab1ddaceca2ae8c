use std::collections::BTreeMap;

use derive_more::Display;
use serde::{
    de::{value::StrDeserializer, IntoDeserializer},
    Deserialize, Serialize,
};

use crate::Error;

/// Reference key under which the provider-native identifier of an entity is stored.
pub const EMS_REF: &str = "ems_ref";

/// Kind of inventory entity a [`Target`] points at.
///
/// The same provider resource may legitimately appear under several entity classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    /// Compute instance.
    #[display(fmt = "vm")]
    Vm,
    /// Machine image.
    #[display(fmt = "image")]
    Image,
    /// CloudFormation stack.
    #[display(fmt = "orchestration_stack")]
    OrchestrationStack,
    /// VPC.
    #[display(fmt = "cloud_network")]
    CloudNetwork,
    /// VPC subnet.
    #[display(fmt = "cloud_subnet")]
    CloudSubnet,
    /// Network interface.
    #[display(fmt = "network_port")]
    NetworkPort,
    /// Security group.
    #[display(fmt = "security_group")]
    SecurityGroup,
    /// Elastic IP address.
    #[display(fmt = "floating_ip")]
    FloatingIp,
    /// Elastic load balancer.
    #[display(fmt = "load_balancer")]
    LoadBalancer,
    /// EBS volume.
    #[display(fmt = "cloud_volume")]
    CloudVolume,
    /// EBS snapshot.
    #[display(fmt = "cloud_volume_snapshot")]
    CloudVolumeSnapshot,
    /// EC2 key pair.
    #[display(fmt = "key_pair")]
    KeyPair,
    /// Power state of a compute instance, as reported back by instance lifecycle API calls.
    #[display(fmt = "instance_state")]
    InstanceState,
    /// Any entity class the downstream refresh understands that has no dedicated variant.
    ///
    /// Names of the dedicated variants deserialize to those variants, so `Other` should only
    /// hold other names. Build classes from names with [`EntityClass::from_name`], which applies
    /// the same normalization.
    #[serde(untagged)]
    #[display(fmt = "{}", _0)]
    Other(String),
}

impl EntityClass {
    /// The class serialized as `name`: a dedicated variant if there is one, `Other` otherwise.
    ///
    /// ```
    /// # use aws_event_targets::EntityClass;
    /// assert_eq!(EntityClass::from_name("vm"), EntityClass::Vm);
    /// assert_eq!(
    ///     EntityClass::from_name("ems_cluster"),
    ///     EntityClass::Other("ems_cluster".to_owned())
    /// );
    /// ```
    pub fn from_name(name: &str) -> EntityClass {
        let deserializer: StrDeserializer<'_, serde::de::value::Error> = name.into_deserializer();
        EntityClass::deserialize(deserializer)
            .unwrap_or_else(|_| EntityClass::Other(name.to_owned()))
    }

    /// Returns `self` with an `Other` holding a dedicated variant's name replaced by that
    /// variant.
    pub fn normalized(self) -> EntityClass {
        match self {
            EntityClass::Other(name) => EntityClass::from_name(&name),
            entity_class => entity_class,
        }
    }
}

impl From<&str> for EntityClass {
    fn from(name: &str) -> Self {
        EntityClass::from_name(name)
    }
}

impl log::kv::ToValue for EntityClass {
    fn to_value(&self) -> log::kv::Value<'_> {
        log::kv::Value::from_display(self)
    }
}

/// Provider-native identifiers of an entity, keyed for lookup by the refresh step.
///
/// A `Reference` is never empty and never holds blank keys or values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>")]
pub struct Reference(BTreeMap<String, String>);

impl Reference {
    /// Create a single-key reference. Returns `None` if `key` or `value` is blank.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Option<Reference> {
        Reference::from_pairs([(key.into(), value.into())])
    }

    /// Create an `{ems_ref => value}` reference. Returns `None` if `value` is blank.
    pub fn ems_ref(value: impl Into<String>) -> Option<Reference> {
        Reference::new(EMS_REF, value)
    }

    /// Returns `None` if there are no pairs or any key or value is blank.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Option<Reference>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let map = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<BTreeMap<String, String>>();
        Reference::try_from(map).ok()
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Key/value pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl TryFrom<BTreeMap<String, String>> for Reference {
    type Error = Error;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let blank = map
            .iter()
            .any(|(k, v)| k.trim().is_empty() || v.trim().is_empty());
        if map.is_empty() || blank {
            return Err(Error::InvalidReference);
        }
        Ok(Reference(map))
    }
}

/// A typed reference to one inventory entity that needs to be refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    entity_class: EntityClass,
    reference: Reference,
}

impl Target {
    /// Create a target for `reference` with the given class.
    pub fn new(entity_class: EntityClass, reference: Reference) -> Target {
        Target {
            entity_class,
            reference,
        }
    }

    /// Shorthand for a target referenced by `ems_ref`. Returns `None` if `value` is blank.
    pub fn ems_ref(entity_class: EntityClass, value: impl Into<String>) -> Option<Target> {
        Reference::ems_ref(value).map(|reference| Target::new(entity_class, reference))
    }

    /// Kind of entity to refresh.
    pub fn entity_class(&self) -> &EntityClass {
        &self.entity_class
    }

    /// Identifiers of the entity to refresh.
    pub fn reference(&self) -> &Reference {
        &self.reference
    }
}

impl log::kv::ToValue for Target {
    fn to_value(&self) -> log::kv::Value<'_> {
        log::kv::Value::from_serde(self)
    }
}
