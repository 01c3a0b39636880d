//! Gateway network policy document
//!
//! The policy lives in the GitOps repository as a Cilium-style network policy.
//! Only one value is ever rewritten:
//!
//! ```yaml
//! spec:
//!   ingress:
//!     - fromCIDRSet:
//!         - cidr: 203.0.113.9/32   # <- this one
//! ```
//!
//! Every other key at every level is carried through a pass-through map, and
//! only the first item of each list on that path is typed. Later ingress rules
//! and CIDR entries are kept as raw YAML whatever their shape, so the rest of
//! the document comes back out with the same values. Key order and formatting
//! may change on serialization.

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::{Mapping, Value};

use crate::domain::PublicIp;
use crate::error::PolicyError;

/// Parsed policy document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkPolicy {
    #[serde(flatten)]
    rest: Mapping,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    spec: Option<PolicySpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PolicySpec {
    #[serde(flatten)]
    rest: Mapping,

    #[serde(default)]
    ingress: HeadList<IngressRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IngressRule {
    #[serde(
        rename = "fromCIDRSet",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    from_cidr_set: Option<HeadList<CidrEntry>>,

    #[serde(flatten)]
    rest: Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CidrEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cidr: Option<String>,

    #[serde(flatten)]
    rest: Mapping,
}

/// YAML sequence whose first item is typed and whose tail is passed through
#[derive(Debug, Clone, PartialEq)]
struct HeadList<T> {
    head: Option<T>,
    tail: Vec<Value>,
}

impl<T> Default for HeadList<T> {
    fn default() -> Self {
        Self {
            head: None,
            tail: Vec::new(),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for HeadList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut items = Vec::<Value>::deserialize(deserializer)?.into_iter();
        let head = items
            .next()
            .map(serde_yaml::from_value)
            .transpose()
            .map_err(|e| D::Error::custom(format!("[0]: {}", e)))?;
        Ok(Self {
            head,
            tail: items.collect(),
        })
    }
}

impl<T: Serialize> Serialize for HeadList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = usize::from(self.head.is_some()) + self.tail.len();
        let mut seq = serializer.serialize_seq(Some(len))?;
        if let Some(head) = &self.head {
            seq.serialize_element(head)?;
        }
        for item in &self.tail {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

impl NetworkPolicy {
    /// Parse policy YAML and check that the rewritten path exists
    pub fn parse(yaml: &str) -> Result<Self, PolicyError> {
        let policy: Self = serde_yaml::from_str(yaml).map_err(PolicyError::Parse)?;
        policy.first_cidr_entry()?;
        Ok(policy)
    }

    /// Current value of `spec.ingress[0].fromCIDRSet[0].cidr`
    pub fn source_cidr(&self) -> Option<&str> {
        self.first_cidr_entry()
            .ok()
            .and_then(|entry| entry.cidr.as_deref())
    }

    /// Point the first CIDR entry of the first ingress rule at `ip`
    ///
    /// Returns the value that was replaced. Later rules and entries are left alone.
    pub fn set_source_cidr(&mut self, ip: &PublicIp) -> Result<Option<String>, PolicyError> {
        let entry = self.first_cidr_entry_mut()?;
        Ok(entry.cidr.replace(ip.host_cidr()))
    }

    /// Serialize back to block-style YAML
    pub fn to_yaml(&self) -> Result<String, PolicyError> {
        serde_yaml::to_string(self).map_err(PolicyError::Serialize)
    }

    fn first_cidr_entry(&self) -> Result<&CidrEntry, PolicyError> {
        let spec = self.spec.as_ref().ok_or_else(|| shape("spec", "missing"))?;
        let rule = spec
            .ingress
            .head
            .as_ref()
            .ok_or_else(|| shape("spec.ingress", "no ingress rules"))?;
        let set = rule
            .from_cidr_set
            .as_ref()
            .ok_or_else(|| shape("spec.ingress[0].fromCIDRSet", "missing"))?;
        set.head
            .as_ref()
            .ok_or_else(|| shape("spec.ingress[0].fromCIDRSet", "no CIDR entries"))
    }

    fn first_cidr_entry_mut(&mut self) -> Result<&mut CidrEntry, PolicyError> {
        let spec = self.spec.as_mut().ok_or_else(|| shape("spec", "missing"))?;
        let rule = spec
            .ingress
            .head
            .as_mut()
            .ok_or_else(|| shape("spec.ingress", "no ingress rules"))?;
        let set = rule
            .from_cidr_set
            .as_mut()
            .ok_or_else(|| shape("spec.ingress[0].fromCIDRSet", "missing"))?;
        set.head
            .as_mut()
            .ok_or_else(|| shape("spec.ingress[0].fromCIDRSet", "no CIDR entries"))
    }
}

fn shape(path: &str, reason: &str) -> PolicyError {
    PolicyError::UnexpectedShape {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;
    use std::net::Ipv4Addr;

    const POLICY: &str = r#"
apiVersion: cilium.io/v2
kind: CiliumNetworkPolicy
metadata:
  name: gateway-allow-home
  namespace: gateway
spec:
  endpointSelector:
    matchLabels:
      app: envoy-gateway
  ingress:
    - fromCIDRSet:
        - cidr: "1.2.3.4/32"
        - cidr: 10.0.0.0/8
          except:
            - 10.96.0.0/12
      toPorts:
        - ports:
            - port: "443"
              protocol: TCP
    - fromEndpoints:
        - matchLabels:
            app: monitoring
"#;

    fn ip(a: u8, b: u8, c: u8, d: u8) -> PublicIp {
        PublicIp::new(Ipv4Addr::new(a, b, c, d))
    }

    fn cidr_at(value: &Value, rule: usize, entry: usize) -> Option<&str> {
        value["spec"]["ingress"][rule]["fromCIDRSet"][entry]["cidr"].as_str()
    }

    #[test]
    fn test_parse_reads_source_cidr() {
        let policy = NetworkPolicy::parse(POLICY).unwrap();
        assert_eq!(policy.source_cidr(), Some("1.2.3.4/32"));
    }

    #[test]
    fn test_set_source_cidr_rewrites_only_first_entry() {
        let mut policy = NetworkPolicy::parse(POLICY).unwrap();
        let previous = policy.set_source_cidr(&ip(5, 6, 7, 8)).unwrap();
        assert_eq!(previous.as_deref(), Some("1.2.3.4/32"));

        let rendered: Value = serde_yaml::from_str(&policy.to_yaml().unwrap()).unwrap();
        assert_eq!(cidr_at(&rendered, 0, 0), Some("5.6.7.8/32"));
        assert_eq!(cidr_at(&rendered, 0, 1), Some("10.0.0.0/8"));
    }

    #[test]
    fn test_other_fields_survive_unchanged() {
        let mut policy = NetworkPolicy::parse(POLICY).unwrap();
        policy.set_source_cidr(&ip(5, 6, 7, 8)).unwrap();
        let rendered: Value = serde_yaml::from_str(&policy.to_yaml().unwrap()).unwrap();

        let mut expected: Value = serde_yaml::from_str(POLICY).unwrap();
        expected["spec"]["ingress"][0]["fromCIDRSet"][0]["cidr"] =
            Value::String("5.6.7.8/32".to_string());

        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_untyped_later_items_pass_through() {
        let yaml = r#"
spec:
  ingress:
    - fromCIDRSet:
        - cidr: 1.2.3.4/32
        - 192.168.0.0/16
        - [nested, list]
    - foo
    - 42
"#;
        let mut policy = NetworkPolicy::parse(yaml).unwrap();
        policy.set_source_cidr(&ip(5, 6, 7, 8)).unwrap();
        let rendered: Value = serde_yaml::from_str(&policy.to_yaml().unwrap()).unwrap();

        let mut expected: Value = serde_yaml::from_str(yaml).unwrap();
        expected["spec"]["ingress"][0]["fromCIDRSet"][0]["cidr"] =
            Value::String("5.6.7.8/32".to_string());
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_non_mapping_first_rule_is_rejected() {
        let err = NetworkPolicy::parse("spec:\n  ingress:\n    - foo\n").unwrap_err();
        assert!(matches!(err, PolicyError::Parse(_)));
    }

    #[test]
    fn test_set_source_cidr_is_idempotent() {
        let mut policy = NetworkPolicy::parse(POLICY).unwrap();
        policy.set_source_cidr(&ip(5, 6, 7, 8)).unwrap();
        let first = policy.to_yaml().unwrap();

        let mut again = NetworkPolicy::parse(&first).unwrap();
        let previous = again.set_source_cidr(&ip(5, 6, 7, 8)).unwrap();

        assert_eq!(previous.as_deref(), Some("5.6.7.8/32"));
        assert_eq!(again.to_yaml().unwrap(), first);
    }

    #[test]
    fn test_missing_cidr_key_is_created() {
        let yaml = "spec:\n  ingress:\n    - fromCIDRSet:\n        - except: []\n";
        let mut policy = NetworkPolicy::parse(yaml).unwrap();
        assert_eq!(policy.source_cidr(), None);

        assert_eq!(policy.set_source_cidr(&ip(5, 6, 7, 8)).unwrap(), None);
        assert_eq!(policy.source_cidr(), Some("5.6.7.8/32"));
    }

    #[test]
    fn test_unexpected_shapes() {
        let cases = [
            ("kind: CiliumNetworkPolicy\n", "spec"),
            ("spec:\n  endpointSelector: {}\n", "spec.ingress"),
            ("spec:\n  ingress: []\n", "spec.ingress"),
            (
                "spec:\n  ingress:\n    - fromEndpoints: []\n",
                "spec.ingress[0].fromCIDRSet",
            ),
            (
                "spec:\n  ingress:\n    - fromCIDRSet: []\n",
                "spec.ingress[0].fromCIDRSet",
            ),
        ];

        for (yaml, expected_path) in cases {
            match NetworkPolicy::parse(yaml) {
                Err(PolicyError::UnexpectedShape { path, .. }) => {
                    assert_eq!(path, expected_path, "{yaml}")
                }
                other => panic!("expected shape error for {yaml:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_invalid_yaml() {
        let err = NetworkPolicy::parse("spec: [unterminated").unwrap_err();
        assert!(matches!(err, PolicyError::Parse(_)));
    }
}
