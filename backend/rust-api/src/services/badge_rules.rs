use std::collections::BTreeSet;

use crate::models::user::User;

pub const CLEAN_SPORT_BADGE: &str = "badge_001";
pub const QUIZ_MASTER_BADGE: &str = "badge_002";

/// Completed modules needed for the Clean Sport Champ badge.
pub const CLEAN_SPORT_MODULES: usize = 5;

/// State a rule sees after an attempt's rewards have been applied.
pub struct AttemptContext<'a> {
    pub user: &'a User,
    pub correct: usize,
    pub total: usize,
}

impl AttemptContext<'_> {
    pub fn is_perfect(&self) -> bool {
        self.total > 0 && self.correct == self.total
    }
}

pub trait BadgeRule: Send + Sync {
    fn badge_id(&self) -> &str;

    fn qualifies(&self, ctx: &AttemptContext<'_>) -> bool;
}

pub struct CompletedModulesRule {
    badge_id: String,
    threshold: usize,
}

impl CompletedModulesRule {
    pub fn new(badge_id: impl Into<String>, threshold: usize) -> Self {
        Self {
            badge_id: badge_id.into(),
            threshold,
        }
    }
}

impl BadgeRule for CompletedModulesRule {
    fn badge_id(&self) -> &str {
        &self.badge_id
    }

    fn qualifies(&self, ctx: &AttemptContext<'_>) -> bool {
        ctx.user.completed_modules.len() >= self.threshold
    }
}

pub struct PerfectScoreRule {
    badge_id: String,
}

impl PerfectScoreRule {
    pub fn new(badge_id: impl Into<String>) -> Self {
        Self {
            badge_id: badge_id.into(),
        }
    }
}

impl BadgeRule for PerfectScoreRule {
    fn badge_id(&self) -> &str {
        &self.badge_id
    }

    fn qualifies(&self, ctx: &AttemptContext<'_>) -> bool {
        ctx.is_perfect()
    }
}

/// Hand-coded unlock rules keyed by badge id.
pub struct BadgeRuleSet {
    rules: Vec<Box<dyn BadgeRule>>,
}

impl BadgeRuleSet {
    pub fn new(rules: Vec<Box<dyn BadgeRule>>) -> Self {
        Self { rules }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(CompletedModulesRule::new(
                CLEAN_SPORT_BADGE,
                CLEAN_SPORT_MODULES,
            )),
            Box::new(PerfectScoreRule::new(QUIZ_MASTER_BADGE)),
        ])
    }

    /// Badges that qualify now and are not yet in `unlocked`.
    pub fn newly_unlocked(
        &self,
        ctx: &AttemptContext<'_>,
        unlocked: &BTreeSet<String>,
    ) -> Vec<String> {
        self.rules
            .iter()
            .filter(|rule| !unlocked.contains(rule.badge_id()) && rule.qualifies(ctx))
            .map(|rule| rule.badge_id().to_string())
            .collect()
    }
}
