//! Per-role resource ceilings and the policy gate applied before a request is accepted.
//!
//! | Role    | RAM       | CPU       |
//! |---------|-----------|-----------|
//! | TRAINEE | 8 GB      | 4 cores   |
//! | DEV     | 32 GB     | 8 cores   |
//! | ADMIN   | unlimited | unlimited |
//!
//! Role names that are not recognised fall back to TRAINEE.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::error::{PolicyViolation, Resource, Result, ValidationError};

// The whole token must match: `1TB` or `2048MB` must not read as gigabytes.
static RAM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(\d+)\s*(?:gb?)?\s*$").expect("valid RAM pattern"));
static CPU_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(\d+)\s*(?:v?cpu)?\s*$").expect("valid CPU pattern"));

/// Role name every unrecognised or unresolvable role maps to.
pub const LEAST_PRIVILEGED_ROLE: &str = "TRAINEE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Bounded(u64),
    Unlimited,
}

impl Limit {
    pub fn allows(&self, requested: u64) -> bool {
        match self {
            Limit::Bounded(max) => requested <= *max,
            Limit::Unlimited => true,
        }
    }

    fn format(&self, unit: &str) -> String {
        match self {
            Limit::Bounded(max) => format!("{}{}", max, unit),
            Limit::Unlimited => "unlimited".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceQuota {
    pub role: &'static str,
    pub max_ram_gb: Limit,
    pub max_cpu_cores: Limit,
}

impl ResourceQuota {
    pub const TRAINEE: ResourceQuota = ResourceQuota {
        role: "TRAINEE",
        max_ram_gb: Limit::Bounded(8),
        max_cpu_cores: Limit::Bounded(4),
    };

    pub const DEV: ResourceQuota = ResourceQuota {
        role: "DEV",
        max_ram_gb: Limit::Bounded(32),
        max_cpu_cores: Limit::Bounded(8),
    };

    pub const ADMIN: ResourceQuota = ResourceQuota {
        role: "ADMIN",
        max_ram_gb: Limit::Unlimited,
        max_cpu_cores: Limit::Unlimited,
    };

    /// Resolve a role string, ignoring case.
    pub fn for_role(role: &str) -> ResourceQuota {
        match role.trim().to_ascii_uppercase().as_str() {
            "TRAINEE" => Self::TRAINEE,
            "DEV" | "DEVELOPER" => Self::DEV,
            "ADMIN" | "ADMINISTRATOR" => Self::ADMIN,
            _ => Self::TRAINEE,
        }
    }

    pub fn max_ram_formatted(&self) -> String {
        self.max_ram_gb.format("GB")
    }

    pub fn max_cpu_formatted(&self) -> String {
        self.max_cpu_cores.format("vCPU")
    }
}

/// Check a request against the quota of `role`.
///
/// RAM is checked before CPU; the first exceeded dimension is reported.
/// Limits are inclusive.
pub fn enforce(role: &str, ram: &str, cpu: &str) -> Result<()> {
    let quota = ResourceQuota::for_role(role);

    let requested_ram = parse_ram(ram)?;
    let requested_cpu = parse_cpu(cpu)?;

    info!(
        role,
        requested_ram_gb = requested_ram,
        requested_cpu_cores = requested_cpu,
        max_ram = %quota.max_ram_formatted(),
        max_cpu = %quota.max_cpu_formatted(),
        "Checking quota"
    );

    if !quota.max_ram_gb.allows(requested_ram) {
        let violation = PolicyViolation {
            role: role.to_string(),
            resource: Resource::Ram,
            requested: ram.to_string(),
            max_allowed: quota.max_ram_formatted(),
        };
        warn!(role, resource = "RAM", requested = ram, "{}", violation);
        return Err(violation.into());
    }

    if !quota.max_cpu_cores.allows(requested_cpu) {
        let violation = PolicyViolation {
            role: role.to_string(),
            resource: Resource::Cpu,
            requested: cpu.to_string(),
            max_allowed: quota.max_cpu_formatted(),
        };
        warn!(role, resource = "CPU", requested = cpu, "{}", violation);
        return Err(violation.into());
    }

    info!(role, "Quota check passed");
    Ok(())
}

/// Parse a RAM token such as `16GB`, `16gb` or `16 GB` into gigabytes.
pub fn parse_ram(token: &str) -> std::result::Result<u64, ValidationError> {
    parse_amount(&RAM_PATTERN, token, Resource::Ram, "'16GB' or '32gb'")
}

/// Parse a CPU token such as `4vCPU`, `8vcpu` or `2 CPU` into cores.
pub fn parse_cpu(token: &str) -> std::result::Result<u64, ValidationError> {
    parse_amount(&CPU_PATTERN, token, Resource::Cpu, "'4vCPU' or '8vcpu'")
}

fn parse_amount(
    pattern: &Regex,
    token: &str,
    resource: Resource,
    expected: &'static str,
) -> std::result::Result<u64, ValidationError> {
    pattern
        .captures(token)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
        .ok_or_else(|| ValidationError::InvalidFormat {
            resource,
            value: token.to_string(),
            expected,
        })
}
