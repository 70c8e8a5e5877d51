//! Static approval-rule configuration.
//!
//! Each gate type maps to the review team that owns it, how many approvals
//! satisfy the gate, an escalation contact, and the weekday SLO for the
//! team's first response. The table is read-only; the engine treats it as
//! injected configuration and never mutates it.

use crate::models::StageType;

// Gate type identifiers. The numbering leaves room between teams so new
// review types can slot in without renumbering.
pub const GATE_API_PROTOTYPE: i64 = 1;
pub const GATE_API_ORIGIN_TRIAL: i64 = 2;
pub const GATE_API_EXTEND_ORIGIN_TRIAL: i64 = 3;
pub const GATE_API_SHIP: i64 = 4;
pub const GATE_API_PLAN: i64 = 5;
pub const GATE_PRIVACY_ORIGIN_TRIAL: i64 = 32;
pub const GATE_PRIVACY_SHIP: i64 = 34;
pub const GATE_SECURITY_ORIGIN_TRIAL: i64 = 42;
pub const GATE_SECURITY_SHIP: i64 = 44;
pub const GATE_ENTERPRISE_SHIP: i64 = 54;
pub const GATE_DEBUGGABILITY_ORIGIN_TRIAL: i64 = 62;
pub const GATE_DEBUGGABILITY_SHIP: i64 = 64;
pub const GATE_TESTING_SHIP: i64 = 74;

/// Weekdays a team gets for its first response when its rule does not say
/// otherwise, and the fallback for unknown gate types.
pub const DEFAULT_SLO_LIMIT: i64 = 5;

/// How many approvals satisfy a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// A single approval resolves the gate.
    OneLgtm,
    /// Three approvals are needed, from any mix of reviewers.
    ThreeLgtm,
}

impl Rule {
    pub fn required_approvals(&self) -> u32 {
        match self {
            Rule::OneLgtm => 1,
            Rule::ThreeLgtm => 3,
        }
    }
}

/// One review team's policy for a gate type.
#[derive(Debug, Clone, Copy)]
pub struct ApprovalRule {
    pub gate_type: i64,
    /// Human-readable gate name.
    pub name: &'static str,
    /// Review team that owns the gate. Gates sharing a team share reviewer
    /// assignments; see auto-assignment.
    pub team_name: &'static str,
    pub rule: Rule,
    /// Address escalations go to when the team misses its SLO.
    pub escalation_email: &'static str,
    /// Weekdays allowed before the team's first response is due.
    pub slo_initial_response: i64,
}

/// The built-in rule table. Deployments with different review teams can
/// supply their own slice; every lookup below takes the table as an
/// argument.
pub static APPROVAL_RULES: &[ApprovalRule] = &[
    ApprovalRule {
        gate_type: GATE_API_PROTOTYPE,
        name: "Intent to Prototype",
        team_name: "API Owners",
        rule: Rule::OneLgtm,
        escalation_email: "api-owners@example.com",
        slo_initial_response: DEFAULT_SLO_LIMIT,
    },
    ApprovalRule {
        gate_type: GATE_API_ORIGIN_TRIAL,
        name: "Intent to Experiment",
        team_name: "API Owners",
        rule: Rule::OneLgtm,
        escalation_email: "api-owners@example.com",
        slo_initial_response: DEFAULT_SLO_LIMIT,
    },
    ApprovalRule {
        gate_type: GATE_API_EXTEND_ORIGIN_TRIAL,
        name: "Intent to Extend Experiment",
        team_name: "API Owners",
        rule: Rule::OneLgtm,
        escalation_email: "api-owners@example.com",
        slo_initial_response: DEFAULT_SLO_LIMIT,
    },
    ApprovalRule {
        gate_type: GATE_API_SHIP,
        name: "Intent to Ship",
        team_name: "API Owners",
        rule: Rule::ThreeLgtm,
        escalation_email: "api-owners@example.com",
        slo_initial_response: DEFAULT_SLO_LIMIT,
    },
    ApprovalRule {
        gate_type: GATE_API_PLAN,
        name: "Intent to Deprecate and Remove",
        team_name: "API Owners",
        rule: Rule::OneLgtm,
        escalation_email: "api-owners@example.com",
        slo_initial_response: DEFAULT_SLO_LIMIT,
    },
    ApprovalRule {
        gate_type: GATE_PRIVACY_ORIGIN_TRIAL,
        name: "Privacy OT Review",
        team_name: "Privacy",
        rule: Rule::OneLgtm,
        escalation_email: "privacy-review@example.com",
        slo_initial_response: DEFAULT_SLO_LIMIT,
    },
    ApprovalRule {
        gate_type: GATE_PRIVACY_SHIP,
        name: "Privacy Ship Review",
        team_name: "Privacy",
        rule: Rule::OneLgtm,
        escalation_email: "privacy-review@example.com",
        slo_initial_response: DEFAULT_SLO_LIMIT,
    },
    ApprovalRule {
        gate_type: GATE_SECURITY_ORIGIN_TRIAL,
        name: "Security OT Review",
        team_name: "Security",
        rule: Rule::OneLgtm,
        escalation_email: "security-review@example.com",
        slo_initial_response: DEFAULT_SLO_LIMIT,
    },
    ApprovalRule {
        gate_type: GATE_SECURITY_SHIP,
        name: "Security Ship Review",
        team_name: "Security",
        rule: Rule::OneLgtm,
        escalation_email: "security-review@example.com",
        slo_initial_response: DEFAULT_SLO_LIMIT,
    },
    ApprovalRule {
        gate_type: GATE_ENTERPRISE_SHIP,
        name: "Enterprise Ship Review",
        team_name: "Enterprise",
        rule: Rule::OneLgtm,
        escalation_email: "enterprise-review@example.com",
        slo_initial_response: DEFAULT_SLO_LIMIT,
    },
    ApprovalRule {
        gate_type: GATE_DEBUGGABILITY_ORIGIN_TRIAL,
        name: "Debuggability OT Review",
        team_name: "Debuggability",
        rule: Rule::OneLgtm,
        escalation_email: "devtools-review@example.com",
        slo_initial_response: DEFAULT_SLO_LIMIT,
    },
    ApprovalRule {
        gate_type: GATE_DEBUGGABILITY_SHIP,
        name: "Debuggability Ship Review",
        team_name: "Debuggability",
        rule: Rule::OneLgtm,
        escalation_email: "devtools-review@example.com",
        slo_initial_response: DEFAULT_SLO_LIMIT,
    },
    ApprovalRule {
        gate_type: GATE_TESTING_SHIP,
        name: "Testing Ship Review",
        team_name: "Testing",
        rule: Rule::OneLgtm,
        escalation_email: "web-testing@example.com",
        slo_initial_response: DEFAULT_SLO_LIMIT,
    },
];

/// Look up the rule for a gate type.
pub fn rule_for_gate_type(
    rules: &'static [ApprovalRule],
    gate_type: i64,
) -> Option<&'static ApprovalRule> {
    rules.iter().find(|r| r.gate_type == gate_type)
}

/// Approval rule for a gate type. Unknown types fall back to one-LGTM;
/// this is the documented default, not an error.
pub fn required_rule(rules: &'static [ApprovalRule], gate_type: i64) -> Rule {
    rule_for_gate_type(rules, gate_type)
        .map(|r| r.rule)
        .unwrap_or(Rule::OneLgtm)
}

/// Weekday SLO for a gate type's first response, falling back to
/// `default_slo_limit` for unknown types.
pub fn slo_limit_for(
    rules: &'static [ApprovalRule],
    gate_type: i64,
    default_slo_limit: i64,
) -> i64 {
    rule_for_gate_type(rules, gate_type)
        .map(|r| r.slo_initial_response)
        .unwrap_or(default_slo_limit)
}

/// Gate types a stage of the given type needs before it can advance.
pub fn gates_for_stage_type(stage_type: StageType) -> &'static [i64] {
    match stage_type {
        StageType::Prototype => &[GATE_API_PROTOTYPE],
        // Dev trials carry no cross-functional review
        StageType::DevTrial => &[],
        StageType::OriginTrial => &[
            GATE_API_ORIGIN_TRIAL,
            GATE_PRIVACY_ORIGIN_TRIAL,
            GATE_SECURITY_ORIGIN_TRIAL,
            GATE_DEBUGGABILITY_ORIGIN_TRIAL,
        ],
        StageType::ExtendOriginTrial => &[GATE_API_EXTEND_ORIGIN_TRIAL],
        StageType::Ship => &[
            GATE_API_SHIP,
            GATE_PRIVACY_SHIP,
            GATE_SECURITY_SHIP,
            GATE_ENTERPRISE_SHIP,
            GATE_DEBUGGABILITY_SHIP,
            GATE_TESTING_SHIP,
        ],
    }
}
