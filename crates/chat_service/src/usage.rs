//! Usage-limit gate and billing standing
//!
//! The gate is consulted before a generation starts and incremented only
//! when one completes. Billing itself is an external collaborator; the
//! core only needs an account's standing to pick the right daily limit
//! and to compute the resolve-message flag.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;

use chat_core::{ChatConfig, Principal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStanding {
    Anonymous,
    Free,
    Subscribed,
    Unlimited,
}

/// Resolves an account's standing. External collaborator seam.
pub trait BillingDirectory: Send + Sync {
    fn standing(&self, principal: &Principal) -> AccountStanding;
}

/// Static lookup used by tests and single-node deployments.
#[derive(Default)]
pub struct StaticBillingDirectory {
    subscribed: HashSet<String>,
    unlimited: HashSet<String>,
}

impl StaticBillingDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscribed(mut self, account: impl Into<String>) -> Self {
        self.subscribed.insert(account.into());
        self
    }

    pub fn with_unlimited(mut self, account: impl Into<String>) -> Self {
        self.unlimited.insert(account.into());
        self
    }
}

impl BillingDirectory for StaticBillingDirectory {
    fn standing(&self, principal: &Principal) -> AccountStanding {
        match principal {
            Principal::Fingerprint(_) => AccountStanding::Anonymous,
            Principal::Account(id) if self.unlimited.contains(id) => AccountStanding::Unlimited,
            Principal::Account(id) if self.subscribed.contains(id) => AccountStanding::Subscribed,
            Principal::Account(_) => AccountStanding::Free,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UsageDecision {
    pub allowed: bool,
    pub remaining: u32,
}

#[async_trait]
pub trait UsageGate: Send + Sync {
    async fn check(&self, principal: &Principal) -> UsageDecision;
    async fn increment(&self, principal: &Principal);
}

#[derive(Debug, Clone, Copy)]
struct DayCount {
    date: NaiveDate,
    used: u32,
}

/// Fixed-window daily counter per principal, reset on date change.
pub struct DailyUsageGate {
    counters: DashMap<String, DayCount>,
    billing: std::sync::Arc<dyn BillingDirectory>,
    anonymous_limit: u32,
    free_limit: u32,
    subscribed_limit: u32,
}

impl DailyUsageGate {
    pub fn new(billing: std::sync::Arc<dyn BillingDirectory>, config: &ChatConfig) -> Self {
        Self {
            counters: DashMap::new(),
            billing,
            anonymous_limit: config.anonymous_daily_limit,
            free_limit: config.free_daily_limit,
            subscribed_limit: config.subscribed_daily_limit,
        }
    }

    fn limit_for(&self, standing: AccountStanding) -> u32 {
        match standing {
            AccountStanding::Anonymous => self.anonymous_limit,
            AccountStanding::Free => self.free_limit,
            AccountStanding::Subscribed => self.subscribed_limit,
            AccountStanding::Unlimited => u32::MAX,
        }
    }

    fn used_today(&self, principal: &Principal) -> u32 {
        let today = Utc::now().date_naive();
        self.counters
            .get(principal.key())
            .filter(|count| count.date == today)
            .map(|count| count.used)
            .unwrap_or(0)
    }
}

#[async_trait]
impl UsageGate for DailyUsageGate {
    async fn check(&self, principal: &Principal) -> UsageDecision {
        let standing = self.billing.standing(principal);
        if standing == AccountStanding::Unlimited {
            return UsageDecision {
                allowed: true,
                remaining: u32::MAX,
            };
        }

        let limit = self.limit_for(standing);
        let used = self.used_today(principal);
        UsageDecision {
            allowed: used < limit,
            remaining: limit.saturating_sub(used),
        }
    }

    async fn increment(&self, principal: &Principal) {
        let today = Utc::now().date_naive();
        let mut entry = self
            .counters
            .entry(principal.key().to_string())
            .or_insert(DayCount {
                date: today,
                used: 0,
            });
        if entry.date != today {
            entry.date = today;
            entry.used = 0;
        }
        entry.used += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn gate() -> DailyUsageGate {
        let config = ChatConfig {
            anonymous_daily_limit: 3,
            free_daily_limit: 5,
            ..Default::default()
        };
        let billing = Arc::new(
            StaticBillingDirectory::new()
                .with_subscribed("payer")
                .with_unlimited("vip"),
        );
        DailyUsageGate::new(billing, &config)
    }

    #[tokio::test]
    async fn anonymous_principal_gets_anonymous_limit() {
        let gate = gate();
        let anon = Principal::Fingerprint("fp1".into());

        for _ in 0..3 {
            assert!(gate.check(&anon).await.allowed);
            gate.increment(&anon).await;
        }
        let decision = gate.check(&anon).await;
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test]
    async fn remaining_counts_down_for_free_accounts() {
        let gate = gate();
        let user = Principal::Account("u1".into());

        assert_eq!(gate.check(&user).await.remaining, 5);
        gate.increment(&user).await;
        gate.increment(&user).await;
        assert_eq!(gate.check(&user).await.remaining, 3);
    }

    #[tokio::test]
    async fn unlimited_accounts_are_never_blocked() {
        let gate = gate();
        let vip = Principal::Account("vip".into());

        for _ in 0..100 {
            gate.increment(&vip).await;
        }
        assert!(gate.check(&vip).await.allowed);
    }

    #[tokio::test]
    async fn subscribed_accounts_use_the_paid_limit() {
        let gate = gate();
        let payer = Principal::Account("payer".into());
        let decision = gate.check(&payer).await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, ChatConfig::default().subscribed_daily_limit);
    }

    #[test]
    fn standing_resolution_covers_all_tiers() {
        let billing = StaticBillingDirectory::new()
            .with_subscribed("payer")
            .with_unlimited("vip");

        assert_eq!(
            billing.standing(&Principal::Fingerprint("fp".into())),
            AccountStanding::Anonymous
        );
        assert_eq!(
            billing.standing(&Principal::Account("payer".into())),
            AccountStanding::Subscribed
        );
        assert_eq!(
            billing.standing(&Principal::Account("vip".into())),
            AccountStanding::Unlimited
        );
        assert_eq!(
            billing.standing(&Principal::Account("someone".into())),
            AccountStanding::Free
        );
    }
}
