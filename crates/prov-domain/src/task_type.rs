use serde::{Deserialize, Serialize};

/// The closed set of concrete task kinds a node can be. Closed deliberately:
/// the dispatcher matches on this enum rather than discovering kinds via
/// reflection, so adding a kind is a compile-time decision everywhere it
/// matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    Cluster,
    DataCentre,
    Role,
    Vpc,
    SecurityGroups,
    BindSecurityGroup,
    InternetGateway,
    RouteTable,
    SubNets,
    FirewallRules,
    CreateEbs,
    AttachEbs,
    CreateInstance,
    BindIp,
}

impl TaskType {
    /// All 14 members, in no particular order. Used by tests and by the
    /// crash-recovery load path when validating a persisted `type` column.
    pub const ALL: [TaskType; 14] = [
        TaskType::Cluster,
        TaskType::DataCentre,
        TaskType::Role,
        TaskType::Vpc,
        TaskType::SecurityGroups,
        TaskType::BindSecurityGroup,
        TaskType::InternetGateway,
        TaskType::RouteTable,
        TaskType::SubNets,
        TaskType::FirewallRules,
        TaskType::CreateEbs,
        TaskType::AttachEbs,
        TaskType::CreateInstance,
        TaskType::BindIp,
    ];

    /// Purely structural kinds transition straight to the terminal state
    /// with no provider call.
    pub fn is_structural(self) -> bool {
        !matches!(
            self,
            TaskType::Vpc
                | TaskType::InternetGateway
                | TaskType::RouteTable
                | TaskType::SubNets
                | TaskType::SecurityGroups
                | TaskType::CreateInstance
        )
    }

    /// The canonical wire string, matching the `node.type` column form.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Cluster => "Cluster",
            TaskType::DataCentre => "DataCentre",
            TaskType::Role => "Role",
            TaskType::Vpc => "VPC",
            TaskType::SecurityGroups => "SecurityGroups",
            TaskType::BindSecurityGroup => "BindSecurityGroup",
            TaskType::InternetGateway => "InternetGateway",
            TaskType::RouteTable => "RouteTable",
            TaskType::SubNets => "SubNets",
            TaskType::FirewallRules => "FirewallRules",
            TaskType::CreateEbs => "CreateEBS",
            TaskType::AttachEbs => "AttachEBS",
            TaskType::CreateInstance => "CreateInstance",
            TaskType::BindIp => "BindIP",
        }
    }

    /// Parses the wire string form. Returns `None` on anything outside the
    /// closed set — callers (the store's row loader) turn that into a
    /// `ConfigurationError`, since an unknown type tag means the row was
    /// written by something other than this system.
    pub fn parse(s: &str) -> Option<TaskType> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_member_round_trips_through_its_wire_string() {
        for t in TaskType::ALL {
            assert_eq!(TaskType::parse(t.as_str()), Some(t));
        }
    }

    #[test]
    fn unknown_tag_does_not_parse() {
        assert_eq!(TaskType::parse("NotARealType"), None);
    }

    #[test]
    fn structural_set_matches_the_provider_effectful_set() {
        let effectful = [
            TaskType::Vpc,
            TaskType::InternetGateway,
            TaskType::RouteTable,
            TaskType::SubNets,
            TaskType::SecurityGroups,
            TaskType::CreateInstance,
        ];
        for t in TaskType::ALL {
            assert_eq!(!t.is_structural(), effectful.contains(&t));
        }
    }
}
