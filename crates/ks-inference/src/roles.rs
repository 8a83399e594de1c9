//! Role assignments: which graph variable plays which part in an estimator.

use std::fmt;

use ks_core::{Error, Result};
use ks_graph::AssumptionGraph;
use serde::{Deserialize, Serialize};

/// Part a variable plays in an estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Exposure whose effect is estimated.
    Treatment,
    /// Response.
    Outcome,
    /// Source of exogenous variation in the treatment.
    Instrument,
    /// Treated-vs-control group indicator (panel designs).
    Group,
    /// Pre-vs-post period indicator (panel designs).
    Time,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Treatment => "treatment",
            Role::Outcome => "outcome",
            Role::Instrument => "instrument",
            Role::Group => "group",
            Role::Time => "time",
        };
        f.write_str(s)
    }
}

/// Immutable binding of roles to variable names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    bindings: Vec<(Role, String)>,
}

impl RoleAssignment {
    /// Treatment and outcome.
    pub fn new(treatment: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self { bindings: vec![(Role::Treatment, treatment.into()), (Role::Outcome, outcome.into())] }
    }

    /// Treatment, outcome and instrument.
    pub fn instrumented(
        treatment: impl Into<String>,
        outcome: impl Into<String>,
        instrument: impl Into<String>,
    ) -> Self {
        let mut r = Self::new(treatment, outcome);
        r.bindings.push((Role::Instrument, instrument.into()));
        r
    }

    /// Group, time and outcome for panel designs.
    pub fn panel(group: impl Into<String>, time: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self {
            bindings: vec![
                (Role::Group, group.into()),
                (Role::Time, time.into()),
                (Role::Outcome, outcome.into()),
            ],
        }
    }

    /// Variable bound to `role`, if any.
    pub fn get(&self, role: Role) -> Option<&str> {
        self.bindings.iter().find(|(r, _)| *r == role).map(|(_, v)| v.as_str())
    }

    /// Variable bound to `role`, or a validation error naming the role.
    pub fn require(&self, role: Role) -> Result<&str> {
        self.get(role).ok_or_else(|| Error::Validation(format!("no variable bound to role '{role}'")))
    }

    /// The exposure: treatment, or the group indicator for panel designs.
    pub fn exposure(&self) -> Result<&str> {
        match self.get(Role::Treatment) {
            Some(t) => Ok(t),
            None => self.require(Role::Group),
        }
    }

    /// Outcome variable.
    pub fn outcome(&self) -> Result<&str> {
        self.require(Role::Outcome)
    }

    /// All bindings in declaration order.
    pub fn bindings(&self) -> &[(Role, String)] {
        &self.bindings
    }

    /// Bound variable names in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(_, v)| v.as_str())
    }

    /// Every bound variable must be a graph member, and no variable may fill two roles.
    pub fn validate(&self, graph: &AssumptionGraph) -> Result<()> {
        for (role, var) in &self.bindings {
            if !graph.contains(var) {
                return Err(Error::Validation(format!(
                    "{role} '{var}' is not a variable of the assumption graph; known variables: {:?}",
                    graph.nodes()
                )));
            }
        }
        for (i, (ra, a)) in self.bindings.iter().enumerate() {
            for (rb, b) in &self.bindings[i + 1..] {
                if a == b {
                    return Err(Error::Validation(format!(
                        "{ra} and {rb} must be different variables (both '{a}')"
                    )));
                }
            }
        }
        Ok(())
    }
}
