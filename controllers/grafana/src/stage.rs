//! Stage classification.
//!
//! Environments are partitioned in two: `prod`, and everything else ("hors prod").
//! Each partition shares one Grafana instance, one datasource pair and one pair of
//! access groups.

use crate::models::Environment;
use std::fmt;

/// Stage value marking a production environment
pub const PROD_STAGE: &str = "prod";

/// Resource sharing partition of environments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Environments whose stage is `prod`
    Prod,
    /// Every other environment
    HorsProd,
}

impl Stage {
    /// Both stages, production first
    pub const ALL: [Stage; 2] = [Stage::Prod, Stage::HorsProd];

    /// Partition of an environment stage value; anything but `prod` is hors prod
    pub fn of(stage: &str) -> Self {
        if stage == PROD_STAGE {
            Stage::Prod
        } else {
            Stage::HorsProd
        }
    }

    /// Short label used in resource names, labels and group names
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Prod => "prod",
            Stage::HorsProd => "hprod",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether at least one environment belongs to `stage`
pub fn has_stage(environments: &[Environment], stage: Stage) -> bool {
    environments.iter().any(|env| Stage::of(&env.stage) == stage)
}

/// Whether a production environment exists
pub fn contains_prod(environments: &[Environment]) -> bool {
    has_stage(environments, Stage::Prod)
}

/// Whether a non production environment exists
pub fn contains_non_prod(environments: &[Environment]) -> bool {
    has_stage(environments, Stage::HorsProd)
}

/// Which stages a project currently has, computed once per hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StagePresence {
    /// A `prod` environment exists
    pub prod: bool,
    /// Any other environment exists
    pub hors_prod: bool,
}

impl StagePresence {
    /// Presence of both stages among `environments`
    pub fn of(environments: &[Environment]) -> Self {
        Self {
            prod: contains_prod(environments),
            hors_prod: contains_non_prod(environments),
        }
    }

    /// Whether `stage` is present
    pub fn contains(&self, stage: Stage) -> bool {
        match stage {
            Stage::Prod => self.prod,
            Stage::HorsProd => self.hors_prod,
        }
    }
}
