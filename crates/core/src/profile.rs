//! Financial profile model and its deterministic derivations.
//!
//! The caller sends the user's full financial profile with each
//! personalized request. Two text renderings are derived from it on every
//! call and never stored:
//!
//! - [`FinancialProfile::context_block`]: a multi-line block injected into
//!   the generation prompt
//! - [`FinancialProfile::snapshot`]: a single paragraph of facts fed to the
//!   history compressor

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub age: u32,
    pub gender: String,
    #[serde(default)]
    pub address: String,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub zip: String,
    pub country: String,
    pub marital_status: String,
    pub dependents: u32,
    pub employment_type: String,
    pub annual_income: f64,
    /// conservative | moderate | aggressive
    #[serde(default = "default_risk_profile")]
    pub risk_profile: String,
}

fn default_risk_profile() -> String {
    "conservative".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeItem {
    /// salary | freelance | investment | rental | business | other
    pub source_type: String,
    pub monthly_amount: f64,
    #[serde(default)]
    pub growth_rate: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseItem {
    pub category: String,
    pub monthly_amount: f64,
    /// fixed | variable
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetItem {
    /// stock | mutual_fund | crypto | fd | real_estate | gold
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    pub current_value: f64,
    #[serde(default)]
    pub invested_amount: f64,
    #[serde(default)]
    pub expected_return_rate: f64,
    #[serde(default)]
    pub liquidity_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiabilityItem {
    /// loan | credit_card | other
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub principal_amount: f64,
    #[serde(default)]
    pub outstanding_amount: f64,
    #[serde(default)]
    pub interest_rate: f64,
    pub emi_amount: f64,
    /// Months remaining
    #[serde(default)]
    pub tenure_remaining: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialGoal {
    /// house | retirement | car | travel | emergency_fund
    pub goal_type: String,
    pub target_amount: f64,
    pub target_date: NaiveDate,
    #[serde(default)]
    pub priority_level: String,
    #[serde(default)]
    pub inflation_rate: f64,
    #[serde(default)]
    pub current_savings_for_goal: f64,
    /// active | achieved
    pub status: String,
}

impl FinancialGoal {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceItem {
    /// health | term | vehicle
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub provider: String,
    pub coverage_amount: f64,
    #[serde(default)]
    pub premium_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maturity_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthScore {
    pub score: f64,
    #[serde(default)]
    pub breakdown: serde_json::Map<String, serde_json::Value>,
}

/// Everything the caller knows about the user's finances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialProfile {
    pub user: UserProfile,
    #[serde(default)]
    pub income: Vec<IncomeItem>,
    #[serde(default)]
    pub expense: Vec<ExpenseItem>,
    #[serde(default)]
    pub asset: Vec<AssetItem>,
    #[serde(default)]
    pub liability: Vec<LiabilityItem>,
    #[serde(default)]
    pub financial_goal: Vec<FinancialGoal>,
    #[serde(default)]
    pub insurance: Vec<InsuranceItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_health_score: Option<HealthScore>,
}

/// Aggregate figures derived from a [`FinancialProfile`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSummary {
    pub monthly_income: f64,
    pub income_sources: BTreeSet<String>,
    pub monthly_expense: f64,
    pub monthly_savings: f64,
    /// Percentage of income saved; 0 when income is 0
    pub savings_rate_pct: f64,
    pub total_emi: f64,
    /// EMI as a percentage of income; 0 when income is 0
    pub debt_ratio_pct: f64,
    pub total_asset_value: f64,
    pub asset_types: BTreeSet<String>,
    pub term_coverage: f64,
    pub active_goals: BTreeSet<String>,
    pub health_score: Option<f64>,
}

/// A single-paragraph fact sheet used as compression input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileSnapshot(String);

impl ProfileSnapshot {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProfileSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FinancialProfile {
    /// Compute the aggregate figures. Pure and deterministic.
    pub fn summary(&self) -> ProfileSummary {
        let active_income = self.income.iter().filter(|i| i.is_active);
        let monthly_income: f64 = active_income.clone().map(|i| i.monthly_amount).sum();
        let income_sources = active_income.map(|i| i.source_type.clone()).collect();

        let monthly_expense: f64 = self.expense.iter().map(|e| e.monthly_amount).sum();
        let monthly_savings = monthly_income - monthly_expense;
        let total_emi: f64 = self.liability.iter().map(|l| l.emi_amount).sum();

        ProfileSummary {
            monthly_income,
            income_sources,
            monthly_expense,
            monthly_savings,
            savings_rate_pct: percentage(monthly_savings, monthly_income),
            total_emi,
            debt_ratio_pct: percentage(total_emi, monthly_income),
            total_asset_value: self.asset.iter().map(|a| a.current_value).sum(),
            asset_types: self.asset.iter().map(|a| a.kind.clone()).collect(),
            term_coverage: self
                .insurance
                .iter()
                .filter(|i| i.kind == "term")
                .map(|i| i.coverage_amount)
                .sum(),
            active_goals: self
                .financial_goal
                .iter()
                .filter(|g| g.is_active())
                .map(|g| g.goal_type.clone())
                .collect(),
            health_score: self.financial_health_score.as_ref().map(|s| s.score),
        }
    }

    /// Multi-line profile block for the personalized prompt.
    pub fn context_block(&self) -> String {
        let u = &self.user;
        let s = self.summary();

        let score_line = s
            .health_score
            .map(|score| format!("\n  Financial Health Score: {score}/100"))
            .unwrap_or_default();

        format!(
            "=== USER FINANCIAL PROFILE ===\n\
             Name: {name} | Age: {age} | Gender: {gender}\n\
             Marital Status: {marital} | Dependents: {dependents}\n\
             Employment: {employment} | Annual Income: {annual}\n\
             Risk Profile: {risk}\n\
             Location: {city}, {state}, {country}\n\
             {score_line}\n\
             \n\
             === FINANCIAL SNAPSHOT ===\n\
             Monthly Income : {income} ({sources})\n\
             Monthly Expenses: {expense}\n\
             Monthly Savings : {savings} ({savings_rate:.1}% rate)\n\
             Total EMI       : {emi} ({debt_ratio:.1}% debt ratio)\n\
             Total Assets    : {assets} ({asset_types})\n\
             Term Coverage   : {term}\n\
             Active Goals    : {goals}\n\
             ==============================",
            name = u.name,
            age = u.age,
            gender = u.gender,
            marital = u.marital_status,
            dependents = u.dependents,
            employment = u.employment_type,
            annual = format_rupees(u.annual_income),
            risk = u.risk_profile.to_uppercase(),
            city = u.city,
            state = u.state,
            country = u.country,
            income = format_rupees(s.monthly_income),
            sources = join_or(&s.income_sources, "None"),
            expense = format_rupees(s.monthly_expense),
            savings = format_rupees(s.monthly_savings),
            savings_rate = s.savings_rate_pct,
            emi = format_rupees(s.total_emi),
            debt_ratio = s.debt_ratio_pct,
            assets = format_rupees(s.total_asset_value),
            asset_types = join_or(&s.asset_types, "None"),
            term = format_rupees(s.term_coverage),
            goals = join_or(&s.active_goals, "None"),
        )
    }

    /// One-paragraph fact sheet for the history compressor.
    pub fn snapshot(&self) -> ProfileSnapshot {
        let u = &self.user;
        let s = self.summary();
        let score = s
            .health_score
            .map(|score| score.to_string())
            .unwrap_or_else(|| "N/A".into());

        ProfileSnapshot(format!(
            "{}, {}y, {}, {} risk. Annual income: {}. \
             Monthly income: {}, savings: {:.0}%, debt ratio: {:.0}%, EMI: {}. \
             Assets: {}. Goals: {}. Health score: {}/100. Dependents: {}.",
            u.name,
            u.age,
            u.employment_type,
            u.risk_profile,
            format_rupees(u.annual_income),
            format_rupees(s.monthly_income),
            s.savings_rate_pct,
            s.debt_ratio_pct,
            format_rupees(s.total_emi),
            join_or(&s.asset_types, "none"),
            join_or(&s.active_goals, "none"),
            score,
            u.dependents,
        ))
    }
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

fn join_or(items: &BTreeSet<String>, empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}

/// Render an amount as whole rupees with thousands separators: `₹1,234,567`.
pub fn format_rupees(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-₹{grouped}")
    } else {
        format!("₹{grouped}")
    }
}
