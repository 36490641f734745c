//! Domain and domain record entities.

use cloudmock_core::entity::{Dependent, Entity, EntityId, ResourceKind, Timestamps};
use serde::{Deserialize, Serialize};

/// Zone role of a domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainType {
    /// Authoritative zone served from its own records
    #[default]
    Master,
    /// Secondary zone transferred from `master_ips`
    Slave,
}

impl DomainType {
    /// Parses the API spelling
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "master" => Some(Self::Master),
            "slave" => Some(Self::Slave),
            _ => None,
        }
    }
}

/// Serving status of a domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    /// Zone is served
    #[default]
    Active,
    /// Zone is not served
    Disabled,
    /// Zone is being imported or edited
    EditMode,
    /// Zone failed to load
    HasErrors,
}

impl DomainStatus {
    /// Parses the API spelling
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(Self::Active),
            "disabled" => Some(Self::Disabled),
            "edit_mode" => Some(Self::EditMode),
            "has_errors" => Some(Self::HasErrors),
            _ => None,
        }
    }
}

/// A DNS zone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Store-assigned id
    #[serde(default)]
    pub id: EntityId,
    /// Zone name, e.g. `example.com`
    pub domain: String,
    /// Zone role
    #[serde(rename = "type", default)]
    pub domain_type: DomainType,
    /// Serving status
    #[serde(default)]
    pub status: DomainStatus,
    /// Start of authority contact
    #[serde(default)]
    pub soa_email: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Display group
    #[serde(default)]
    pub group: String,
    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Primaries of a slave zone
    #[serde(default)]
    pub master_ips: Vec<String>,
    /// Hosts allowed to transfer the zone
    #[serde(default)]
    pub axfr_ips: Vec<String>,
    /// Default TTL, seconds
    #[serde(default)]
    pub ttl_sec: u32,
    /// SOA refresh, seconds
    #[serde(default)]
    pub refresh_sec: u32,
    /// SOA retry, seconds
    #[serde(default)]
    pub retry_sec: u32,
    /// SOA expire, seconds
    #[serde(default)]
    pub expire_sec: u32,
    /// Store-maintained timestamps
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Domain {
    /// A master zone with every optional attribute empty
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            domain: domain.into(),
            domain_type: DomainType::Master,
            status: DomainStatus::Active,
            soa_email: String::new(),
            description: String::new(),
            group: String::new(),
            tags: Vec::new(),
            master_ips: Vec::new(),
            axfr_ips: Vec::new(),
            ttl_sec: 0,
            refresh_sec: 0,
            retry_sec: 0,
            expire_sec: 0,
            timestamps: Timestamps::default(),
        }
    }
}

impl Entity for Domain {
    const KIND: ResourceKind = ResourceKind::new("domain");
    const DEPENDENTS: &'static [Dependent] = &[Dependent::cascade(DomainRecord::KIND, "domain_id")];

    fn id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> String {
        self.domain.clone()
    }

    fn url(&self) -> String {
        format!("/v4/domains/{}", self.id)
    }
}

/// Resource record type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Name server
    Ns,
    /// Mail exchanger
    Mx,
    /// Canonical name
    Cname,
    /// Text
    Txt,
    /// Service locator
    Srv,
    /// Certification authority authorization
    Caa,
}

impl RecordType {
    /// Every type, in API order
    pub const ALL: [Self; 8] = [
        Self::A,
        Self::Aaaa,
        Self::Ns,
        Self::Mx,
        Self::Cname,
        Self::Txt,
        Self::Srv,
        Self::Caa,
    ];

    /// API spelling
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Ns => "NS",
            Self::Mx => "MX",
            Self::Cname => "CNAME",
            Self::Txt => "TXT",
            Self::Srv => "SRV",
            Self::Caa => "CAA",
        }
    }

    /// Parses the API spelling
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

/// One resource record of a [`Domain`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    /// Store-assigned id
    #[serde(default)]
    pub id: EntityId,
    /// Owning domain
    pub domain_id: EntityId,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Host part, empty for the zone apex
    #[serde(default)]
    pub name: String,
    /// Address, host name or text the record points at
    pub target: String,
    /// MX/SRV priority
    #[serde(default)]
    pub priority: u32,
    /// SRV weight
    #[serde(default)]
    pub weight: u32,
    /// SRV port
    #[serde(default)]
    pub port: u32,
    /// TTL, seconds (0 means the domain default)
    #[serde(default)]
    pub ttl_sec: u32,
    /// SRV service
    #[serde(default)]
    pub service: Option<String>,
    /// SRV protocol
    #[serde(default)]
    pub protocol: Option<String>,
    /// CAA tag
    #[serde(default)]
    pub tag: Option<String>,
    /// Store-maintained timestamps
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl DomainRecord {
    /// A record of `record_type` pointing at `target`
    #[must_use]
    pub fn new(domain_id: EntityId, record_type: RecordType, name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            domain_id,
            record_type,
            name: name.into(),
            target: target.into(),
            priority: 0,
            weight: 0,
            port: 0,
            ttl_sec: 0,
            service: None,
            protocol: None,
            tag: None,
            timestamps: Timestamps::default(),
        }
    }
}

impl Entity for DomainRecord {
    const KIND: ResourceKind = ResourceKind::new("domain_record");

    fn id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> String {
        if self.name.is_empty() {
            self.target.clone()
        } else {
            self.name.clone()
        }
    }

    fn url(&self) -> String {
        format!("/v4/domains/{}/records/{}", self.domain_id, self.id)
    }
}

/// Whether `name` is a dotted host name: at least two labels of letters, digits,
/// `-` or `_`, no label empty or longer than 63, none starting or ending with `-`.
#[must_use]
pub fn is_valid_domain_name(name: &str) -> bool {
    name.len() <= 253
        && name.contains('.')
        && name.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}
