use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Free => f.write_str("free"),
            Tier::Pro => f.write_str("pro"),
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            other => Err(Error::Other(format!("unknown tier '{}'", other))),
        }
    }
}

/// Actions the gate rules on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Scan,
    Cleanup,
    Compress,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Scan => f.write_str("scan"),
            Action::Cleanup => f.write_str("cleanup"),
            Action::Compress => f.write_str("compress"),
        }
    }
}

/// Settings that are only available to Pro subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    AutoScan,
    CloudSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeTierLimits {
    pub scans_per_period: u32,
    pub cleanups_per_period: u32,
}

impl Default for FreeTierLimits {
    fn default() -> Self {
        Self {
            scans_per_period: 3,
            cleanups_per_period: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementState {
    pub tier: Tier,
    pub scans_remaining: u32,
    pub cleanups_remaining: u32,
}

impl EntitlementState {
    pub fn new_install(limits: FreeTierLimits) -> Self {
        Self {
            tier: Tier::Free,
            scans_remaining: limits.scans_per_period,
            cleanups_remaining: limits.cleanups_per_period,
        }
    }

    fn reset_quotas(&mut self, limits: FreeTierLimits) {
        self.scans_remaining = limits.scans_per_period;
        self.cleanups_remaining = limits.cleanups_per_period;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    QuotaExceeded { requested: u32, remaining: u32 },
    ProOnly,
    NotLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenialReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Proof that an action was authorized. While outstanding, a free-tier grant
/// holds its units in reserve so concurrent grants cannot overdraw the quota.
/// Hand it back through [`EntitlementGate::commit`] once the action succeeded,
/// or [`EntitlementGate::release`] if it failed.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a grant holds reserved quota until it is committed or released"]
pub struct Grant {
    action: Action,
    units: u32,
    tier: Tier,
}

impl Grant {
    pub fn action(&self) -> Action {
        self.action
    }

    pub fn units(&self) -> u32 {
        self.units
    }

    /// Tier in effect when the grant was issued.
    pub fn tier(&self) -> Tier {
        self.tier
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseEvent {
    PurchaseConfirmed,
    SubscriptionLapsed,
}

/// Owns the entitlement state. Every tier and quota decision in the app goes
/// through here.
#[derive(Debug, Clone)]
pub struct EntitlementGate {
    state: Option<EntitlementState>,
    limits: FreeTierLimits,
    reserved: Reserved,
}

/// Units held by outstanding free-tier grants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Reserved {
    scans: u32,
    cleanups: u32,
}

impl Reserved {
    fn slot(&mut self, action: Action) -> Option<&mut u32> {
        match action {
            Action::Scan => Some(&mut self.scans),
            Action::Cleanup => Some(&mut self.cleanups),
            Action::Compress => None,
        }
    }
}

impl EntitlementGate {
    /// A gate whose state has not been read from persistence yet. Every
    /// gated action is denied until [`load`](Self::load) is called.
    pub fn new(limits: FreeTierLimits) -> Self {
        Self {
            state: None,
            limits,
            reserved: Reserved::default(),
        }
    }

    pub fn with_state(state: EntitlementState, limits: FreeTierLimits) -> Self {
        Self {
            state: Some(state),
            limits,
            reserved: Reserved::default(),
        }
    }

    pub fn load(&mut self, state: EntitlementState) {
        debug!(
            "Entitlement loaded: tier={}, scans={}, cleanups={}",
            state.tier, state.scans_remaining, state.cleanups_remaining
        );
        self.state = Some(state);
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    pub fn limits(&self) -> FreeTierLimits {
        self.limits
    }

    pub fn state(&self) -> Result<&EntitlementState, Error> {
        self.state.as_ref().ok_or(Error::EntitlementDesync)
    }

    fn state_mut(&mut self) -> Result<&mut EntitlementState, Error> {
        self.state.as_mut().ok_or(Error::EntitlementDesync)
    }

    pub fn can_perform(&self, action: Action, requested_units: u32) -> Decision {
        let state = match &self.state {
            Some(state) => state,
            None => return Decision::Denied(DenialReason::NotLoaded),
        };
        if state.tier == Tier::Pro {
            return Decision::Allowed;
        }
        // Units held by outstanding grants are not available to new requests.
        let (requested, remaining) = match action {
            Action::Compress => return Decision::Denied(DenialReason::ProOnly),
            Action::Scan => (1, state.scans_remaining.saturating_sub(self.reserved.scans)),
            Action::Cleanup => (
                requested_units,
                state.cleanups_remaining.saturating_sub(self.reserved.cleanups),
            ),
        };
        if requested > remaining {
            Decision::Denied(DenialReason::QuotaExceeded {
                requested,
                remaining,
            })
        } else {
            Decision::Allowed
        }
    }

    /// Check an action and, on the free tier, reserve its units until the
    /// returned grant is committed or released.
    pub fn authorize(&mut self, action: Action, requested_units: u32) -> Result<Grant, Error> {
        let units = match action {
            Action::Scan => 1,
            _ => requested_units,
        };
        match self.can_perform(action, units) {
            Decision::Allowed => {
                let tier = self.state()?.tier;
                if tier == Tier::Free {
                    if let Some(slot) = self.reserved.slot(action) {
                        *slot += units;
                    }
                }
                Ok(Grant {
                    action,
                    units,
                    tier,
                })
            }
            Decision::Denied(DenialReason::NotLoaded) => Err(Error::EntitlementDesync),
            Decision::Denied(DenialReason::ProOnly) => Err(Error::ProFeature(action)),
            Decision::Denied(DenialReason::QuotaExceeded {
                requested,
                remaining,
            }) => Err(Error::QuotaExceeded {
                action,
                requested,
                remaining,
            }),
        }
    }

    fn unreserve(&mut self, grant: &Grant) {
        if grant.tier == Tier::Free {
            if let Some(slot) = self.reserved.slot(grant.action) {
                *slot = slot.saturating_sub(grant.units);
            }
        }
    }

    /// Return the units held by a grant whose action failed or was abandoned.
    pub fn release(&mut self, grant: Grant) {
        self.unreserve(&grant);
        debug!("Released {} x{}", grant.action, grant.units);
    }

    /// Consume the quota for an action that has reported success. Grants issued
    /// under Pro, or settled after an upgrade, consume nothing.
    pub fn commit(&mut self, grant: Grant) -> Result<(), Error> {
        self.unreserve(&grant);
        let state = self.state_mut()?;
        if grant.tier == Tier::Pro || state.tier == Tier::Pro {
            return Ok(());
        }
        match grant.action {
            Action::Scan => {
                state.scans_remaining = state.scans_remaining.saturating_sub(grant.units);
            }
            Action::Cleanup => {
                state.cleanups_remaining = state.cleanups_remaining.saturating_sub(grant.units);
            }
            Action::Compress => {}
        }
        debug!(
            "Committed {} x{}: scans={}, cleanups={}",
            grant.action, grant.units, state.scans_remaining, state.cleanups_remaining
        );
        Ok(())
    }

    pub fn apply(&mut self, event: PurchaseEvent) -> Result<(), Error> {
        let limits = self.limits;
        let state = self.state_mut()?;
        match event {
            PurchaseEvent::PurchaseConfirmed => {
                state.tier = Tier::Pro;
                info!("Purchase confirmed, tier upgraded to pro");
            }
            PurchaseEvent::SubscriptionLapsed => {
                state.tier = Tier::Free;
                state.reset_quotas(limits);
                warn!("Subscription lapsed, tier reverted to free");
            }
        }
        Ok(())
    }

    /// Billing period boundary. Free quotas return to their defaults.
    pub fn period_rollover(&mut self) -> Result<(), Error> {
        let limits = self.limits;
        let state = self.state_mut()?;
        if state.tier == Tier::Free {
            state.reset_quotas(limits);
            info!(
                "Billing period rolled over: {} scans, {} cleanups available",
                state.scans_remaining, state.cleanups_remaining
            );
        }
        Ok(())
    }

    pub fn is_feature_enabled(&self, feature: Feature) -> bool {
        let enabled = matches!(self.state, Some(EntitlementState { tier: Tier::Pro, .. }));
        debug!("Feature {:?} enabled: {}", feature, enabled);
        enabled
    }
}
