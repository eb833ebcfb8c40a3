use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{InvalidTransition, Result, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvisioningStatus {
    PendingApproval,
    Approved,
    Rejected,
    Provisioning,
    Active,
    Failed,
}

impl ProvisioningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningStatus::PendingApproval => "PENDING_APPROVAL",
            ProvisioningStatus::Approved => "APPROVED",
            ProvisioningStatus::Rejected => "REJECTED",
            ProvisioningStatus::Provisioning => "PROVISIONING",
            ProvisioningStatus::Active => "ACTIVE",
            ProvisioningStatus::Failed => "FAILED",
        }
    }
}

impl Display for ProvisioningStatus {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProvisioningStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING_APPROVAL" => Ok(ProvisioningStatus::PendingApproval),
            "APPROVED" => Ok(ProvisioningStatus::Approved),
            "REJECTED" => Ok(ProvisioningStatus::Rejected),
            "PROVISIONING" => Ok(ProvisioningStatus::Provisioning),
            "ACTIVE" => Ok(ProvisioningStatus::Active),
            "FAILED" => Ok(ProvisioningStatus::Failed),
            other => Err(format!("Unknown provisioning status: {}", other)),
        }
    }
}

/// A single request for a virtual machine, and the state machine it moves through.
///
/// Identity, requester and the requested resources are fixed at creation. The
/// status only changes through the transition methods below, each of which also
/// stamps `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningRequest {
    id: Uuid,
    requester: String,
    ram: String,
    cpu: String,
    status: ProvisioningStatus,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl ProvisioningRequest {
    /// Create a new request in `PendingApproval` with a fresh identifier.
    pub fn new(
        requester: impl Into<String>,
        ram: impl Into<String>,
        cpu: impl Into<String>,
    ) -> Result<Self> {
        let requester = required("requester", requester.into())?;
        let ram = required("RAM", ram.into())?;
        let cpu = required("CPU", cpu.into())?;

        Ok(Self {
            id: Uuid::new_v4(),
            requester,
            ram,
            cpu,
            status: ProvisioningStatus::PendingApproval,
            created_at: Utc::now(),
            updated_at: None,
        })
    }

    /// Rebuild a request from its persisted fields.
    ///
    /// Only stores should call this; it performs no transition checks.
    pub fn restore(
        id: Uuid,
        requester: String,
        ram: String,
        cpu: String,
        status: ProvisioningStatus,
        created_at: DateTime<Utc>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            requester,
            ram,
            cpu,
            status,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn requester(&self) -> &str {
        &self.requester
    }

    pub fn ram(&self) -> &str {
        &self.ram
    }

    pub fn cpu(&self) -> &str {
        &self.cpu
    }

    pub fn status(&self) -> ProvisioningStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn approve(&mut self) -> Result<()> {
        self.transition(ProvisioningStatus::PendingApproval, ProvisioningStatus::Approved, "approve")
    }

    pub fn reject(&mut self) -> Result<()> {
        self.transition(ProvisioningStatus::PendingApproval, ProvisioningStatus::Rejected, "reject")
    }

    pub fn mark_provisioning(&mut self) -> Result<()> {
        self.transition(
            ProvisioningStatus::Approved,
            ProvisioningStatus::Provisioning,
            "mark as provisioning",
        )
    }

    /// Move to `Active`.
    ///
    /// Accepted from any state: the dispatcher drives freshly created requests
    /// straight to a terminal state without the approval steps.
    pub fn complete(&mut self) {
        self.status = ProvisioningStatus::Active;
        self.touch();
    }

    /// Move to `Failed`. Accepted from any state, like [`complete`](Self::complete).
    pub fn fail(&mut self) {
        self.status = ProvisioningStatus::Failed;
        self.touch();
    }

    fn transition(
        &mut self,
        expected: ProvisioningStatus,
        next: ProvisioningStatus,
        action: &'static str,
    ) -> Result<()> {
        if self.status != expected {
            return Err(InvalidTransition {
                from: self.status,
                action,
            }
            .into());
        }

        self.status = next;
        self.touch();
        Ok(())
    }

    // Wall clock can step backwards; never record an update before creation.
    fn touch(&mut self) {
        self.updated_at = Some(Utc::now().max(self.created_at));
    }
}

fn required(field: &'static str, value: String) -> std::result::Result<String, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn pending() -> ProvisioningRequest {
        ProvisioningRequest::new("alice", "16GB", "4vCPU").unwrap()
    }

    #[test]
    fn test_new_request_starts_pending() {
        let request = pending();

        assert_eq!(request.status(), ProvisioningStatus::PendingApproval);
        assert_eq!(request.requester(), "alice");
        assert_eq!(request.ram(), "16GB");
        assert_eq!(request.cpu(), "4vCPU");
        assert!(request.updated_at().is_none());
    }

    #[test]
    fn test_empty_fields_are_rejected() {
        let cases = [("", "16GB", "4vCPU"), ("alice", "  ", "4vCPU"), ("alice", "16GB", "")];

        for (requester, ram, cpu) in cases {
            let err = ProvisioningRequest::new(requester, ram, cpu).unwrap_err();
            assert!(
                matches!(err, CoreError::Validation(ValidationError::EmptyField(_))),
                "expected EmptyField for {:?}, got {:?}",
                (requester, ram, cpu),
                err
            );
        }
    }

    #[test]
    fn test_identical_inputs_get_distinct_ids() {
        let a = pending();
        let b = pending();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_approve_then_provision_then_complete() {
        let mut request = pending();

        request.approve().unwrap();
        assert_eq!(request.status(), ProvisioningStatus::Approved);
        assert!(request.updated_at().is_some());

        request.mark_provisioning().unwrap();
        assert_eq!(request.status(), ProvisioningStatus::Provisioning);

        request.complete();
        assert_eq!(request.status(), ProvisioningStatus::Active);
        assert!(request.updated_at().unwrap() >= request.created_at());
    }

    #[test]
    fn test_reject_pending_request() {
        let mut request = pending();
        request.reject().unwrap();
        assert_eq!(request.status(), ProvisioningStatus::Rejected);
    }

    #[test]
    fn test_double_approve_fails() {
        let mut request = pending();
        request.approve().unwrap();

        let err = request.approve().unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidTransition(InvalidTransition {
                from: ProvisioningStatus::Approved,
                action: "approve",
            })
        );
        assert_eq!(request.status(), ProvisioningStatus::Approved);
    }

    #[test]
    fn test_approve_after_reject_fails() {
        let mut request = pending();
        request.reject().unwrap();
        assert!(matches!(
            request.approve(),
            Err(CoreError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_mark_provisioning_requires_approval() {
        let mut request = pending();
        assert!(matches!(
            request.mark_provisioning(),
            Err(CoreError::InvalidTransition(_))
        ));
        assert_eq!(request.status(), ProvisioningStatus::PendingApproval);
    }

    #[test]
    fn test_terminal_transitions_are_unconditional() {
        let mut request = pending();
        request.complete();
        assert_eq!(request.status(), ProvisioningStatus::Active);

        let mut request = pending();
        request.reject().unwrap();
        request.fail();
        assert_eq!(request.status(), ProvisioningStatus::Failed);
    }
}
