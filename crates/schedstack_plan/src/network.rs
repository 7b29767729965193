//! Network topology: an address block split into subnet tiers.
//!
//! Subnets are carved sequentially out of the block, tier by tier and one
//! subnet per availability zone, each aligned to its own size. Whether the
//! plan fits is decided here with plain arithmetic; nothing is left for the
//! provisioning engine to reject.

use schedstack_core::{ResourceId, StackError, StackId, StackResult};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Maximum availability zones a topology may span
pub const MAX_ZONES: u8 = 6;

/// Narrowest subnet mask the provider accepts
pub const MAX_SUBNET_MASK: u8 = 28;

/// Address block used when none is configured
pub const DEFAULT_ADDRESS_BLOCK: Ipv4Cidr = Ipv4Cidr {
    network: Ipv4Addr::new(172, 31, 0, 0),
    prefix: 16,
};

/// An IPv4 CIDR block with no host bits set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// Create a block from a network address and prefix length
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddressPlan` if the prefix exceeds 32 or host bits are set
    pub fn new(network: Ipv4Addr, prefix: u8) -> StackResult<Self> {
        if prefix > 32 {
            return Err(StackError::address_plan(format!(
                "prefix /{prefix} is longer than 32 bits"
            )));
        }
        let cidr = Self { network, prefix };
        if u32::from(network) & !cidr.netmask() != 0 {
            return Err(StackError::address_plan(format!(
                "{network}/{prefix} has host bits set"
            )));
        }
        Ok(cidr)
    }

    /// Parse `a.b.c.d/p`
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddressPlan` if the text is not a valid block
    pub fn parse(text: &str) -> StackResult<Self> {
        let (addr, prefix) = text
            .split_once('/')
            .ok_or_else(|| StackError::address_plan(format!("'{text}' has no prefix length")))?;
        let network: Ipv4Addr = addr
            .parse()
            .map_err(|_| StackError::address_plan(format!("'{addr}' is not an IPv4 address")))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| StackError::address_plan(format!("'{prefix}' is not a prefix length")))?;
        Self::new(network, prefix)
    }

    /// Network address
    #[must_use]
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Prefix length
    #[must_use]
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Number of addresses in the block
    #[must_use]
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix))
    }

    /// First address as an integer
    #[must_use]
    pub fn start(&self) -> u64 {
        u64::from(u32::from(self.network))
    }

    /// One past the last address as an integer
    #[must_use]
    pub fn end(&self) -> u64 {
        self.start() + self.size()
    }

    /// Check whether `other` lies entirely inside this block
    #[must_use]
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.start() >= self.start() && other.end() <= self.end()
    }

    /// Check whether two blocks share any address
    #[must_use]
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.start() < other.end() && other.start() < self.end()
    }

    fn netmask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.prefix))
        }
    }
}

impl std::fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = StackError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Ipv4Cidr> for String {
    fn from(cidr: Ipv4Cidr) -> Self {
        cidr.to_string()
    }
}

/// Reachability class of a subnet tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessClass {
    /// Routed to an internet gateway
    Public,
    /// Outbound only, through a NAT gateway
    PrivateWithEgress,
    /// No route outside the network
    PrivateIsolated,
}

/// Requested subnet tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetTierSpec {
    /// Tier name, unique within the topology
    pub name: String,
    /// Prefix length of each subnet in the tier
    pub mask: u8,
    /// Reachability class
    pub access: AccessClass,
}

impl SubnetTierSpec {
    /// Create a tier spec
    #[must_use]
    pub fn new(name: impl Into<String>, mask: u8, access: AccessClass) -> Self {
        Self {
            name: name.into(),
            mask,
            access,
        }
    }
}

/// One subnet in one availability zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    /// Zone index, starting at 0
    pub zone: u8,
    /// Address range
    pub cidr: Ipv4Cidr,
}

/// An allocated subnet tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetTier {
    /// Tier name
    pub name: String,
    /// Prefix length of each subnet
    pub mask: u8,
    /// Reachability class
    pub access: AccessClass,
    /// One subnet per zone
    pub subnets: Vec<Subnet>,
}

impl SubnetTier {
    /// Address span `[start, end)` covered by the tier's subnets
    #[must_use]
    pub fn span(&self) -> (u64, u64) {
        let start = self.subnets.iter().map(|s| s.cidr.start()).min().unwrap_or(0);
        let end = self.subnets.iter().map(|s| s.cidr.end()).max().unwrap_or(0);
        (start, end)
    }
}

/// A derived network topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTopology {
    /// Resource id
    pub id: ResourceId,
    /// Logical name
    pub name: String,
    /// Address block
    pub address_block: Ipv4Cidr,
    /// Availability zones spanned
    pub availability_zones: u8,
    /// NAT gateways serving the egress tier
    pub nat_gateways: u8,
    /// Tiers in declaration order
    pub tiers: Vec<SubnetTier>,
}

impl NetworkTopology {
    /// Look up a tier by name
    #[must_use]
    pub fn tier(&self, name: &str) -> Option<&SubnetTier> {
        self.tiers.iter().find(|t| t.name == name)
    }

    /// Every subnet, tier by tier
    pub fn subnets(&self) -> impl Iterator<Item = &Subnet> {
        self.tiers.iter().flat_map(|t| t.subnets.iter())
    }
}

/// Builder for [`NetworkTopology`]
#[derive(Debug, Clone)]
pub struct NetworkTopologyBuilder {
    name: String,
    address_block: Ipv4Cidr,
    availability_zones: u8,
    nat_gateways: u8,
    tiers: Vec<SubnetTierSpec>,
}

impl NetworkTopologyBuilder {
    /// Start a topology over `address_block` spanning one zone
    #[must_use]
    pub fn new(name: impl Into<String>, address_block: Ipv4Cidr) -> Self {
        Self {
            name: name.into(),
            address_block,
            availability_zones: 1,
            nat_gateways: 0,
            tiers: Vec::new(),
        }
    }

    /// Set the number of availability zones
    #[must_use]
    pub fn with_zones(mut self, zones: u8) -> Self {
        self.availability_zones = zones;
        self
    }

    /// Set the number of NAT gateways
    #[must_use]
    pub fn with_nat_gateways(mut self, count: u8) -> Self {
        self.nat_gateways = count;
        self
    }

    /// Append a tier
    #[must_use]
    pub fn with_tier(mut self, tier: SubnetTierSpec) -> Self {
        self.tiers.push(tier);
        self
    }

    /// Derive the topology
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddressPlan` if the zone count, NAT layout or any tier
    /// does not fit the address block
    pub fn build(&self, stack: &StackId) -> StackResult<NetworkTopology> {
        self.check_layout()?;

        let block = self.address_block;
        let mut offset: u64 = 0;
        let mut tiers = Vec::with_capacity(self.tiers.len());

        for spec in &self.tiers {
            if spec.mask < block.prefix() || spec.mask > MAX_SUBNET_MASK {
                return Err(StackError::address_plan(format!(
                    "tier '{}' mask /{} must be between /{} and /{}",
                    spec.name,
                    spec.mask,
                    block.prefix(),
                    MAX_SUBNET_MASK
                )));
            }
            let size = 1u64 << (32 - u32::from(spec.mask));
            let mut subnets = Vec::with_capacity(usize::from(self.availability_zones));

            for zone in 0..self.availability_zones {
                offset = offset.div_ceil(size) * size;
                if offset + size > block.size() {
                    return Err(StackError::address_plan(format!(
                        "tier '{}' needs {} x /{} but only {} of {} addresses remain in {}",
                        spec.name,
                        self.availability_zones,
                        spec.mask,
                        block.size().saturating_sub(offset),
                        block.size(),
                        block
                    )));
                }
                let start = u32::try_from(block.start() + offset).map_err(|_| {
                    StackError::address_plan(format!("tier '{}' runs past 255.255.255.255", spec.name))
                })?;
                let cidr = Ipv4Cidr::new(Ipv4Addr::from(start), spec.mask)?;
                subnets.push(Subnet { zone, cidr });
                offset += size;
            }

            tracing::debug!(tier = %spec.name, mask = spec.mask, zones = self.availability_zones, "allocated subnet tier");
            tiers.push(SubnetTier {
                name: spec.name.clone(),
                mask: spec.mask,
                access: spec.access,
                subnets,
            });
        }

        Ok(NetworkTopology {
            id: ResourceId::derive(stack, "Network", &self.name),
            name: self.name.clone(),
            address_block: block,
            availability_zones: self.availability_zones,
            nat_gateways: self.nat_gateways,
            tiers,
        })
    }

    fn check_layout(&self) -> StackResult<()> {
        if self.name.trim().is_empty() {
            return Err(StackError::validation("network.name", "must not be empty"));
        }
        if self.availability_zones == 0 || self.availability_zones > MAX_ZONES {
            return Err(StackError::address_plan(format!(
                "availability zone count {} is outside 1-{MAX_ZONES}",
                self.availability_zones
            )));
        }
        if self.tiers.is_empty() {
            return Err(StackError::address_plan("at least one subnet tier is required"));
        }
        for (i, tier) in self.tiers.iter().enumerate() {
            if tier.name.trim().is_empty() {
                return Err(StackError::address_plan("subnet tier names must not be empty"));
            }
            if self.tiers[..i].iter().any(|t| t.name == tier.name) {
                return Err(StackError::address_plan(format!(
                    "subnet tier '{}' is declared twice",
                    tier.name
                )));
            }
        }

        let has = |access: AccessClass| self.tiers.iter().any(|t| t.access == access);
        if self.nat_gateways > self.availability_zones {
            return Err(StackError::address_plan(format!(
                "{} NAT gateways requested for {} zones",
                self.nat_gateways, self.availability_zones
            )));
        }
        if self.nat_gateways > 0 && !has(AccessClass::Public) {
            return Err(StackError::address_plan(
                "NAT gateways need a public subnet tier",
            ));
        }
        if self.nat_gateways == 0 && has(AccessClass::PrivateWithEgress) {
            return Err(StackError::address_plan(
                "a private-with-egress tier needs at least one NAT gateway",
            ));
        }
        Ok(())
    }
}
