//! Job and workflow schedules.

use serde::{Deserialize, Serialize};

use crate::variant::{Variant, VariantSpec};

const CRON_FIELDS: &[&str] = &["cron_expression", "timezone", "infrastructure_id", "device_id"];

/// When a job or workflow runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schedule {
    /// Run a single time, right away.
    Once(OnceSchedule),
    /// Run on a cron expression.
    Cron(CronSchedule),
}

/// A run-once schedule. It carries no fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnceSchedule {}

/// A recurring schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CronSchedule {
    /// Cron expression.
    pub cron_expression: String,
    /// Timezone the expression is evaluated in.
    pub timezone: String,
    /// Infrastructure that triggers the runs.
    pub infrastructure_id: String,
    /// Device bound to the schedule, if any.
    pub device_id: String,
}

impl Schedule {
    /// A run-once schedule.
    pub fn once() -> Self {
        Self::Once(OnceSchedule {})
    }
}

impl Variant for Schedule {
    const ENTITY: &'static str = "schedule";
    const SPECS: &'static [VariantSpec] = &[
        VariantSpec {
            name: "once",
            required: &[],
            forbidden: CRON_FIELDS,
        },
        VariantSpec {
            name: "cron",
            required: &["cron_expression", "timezone", "infrastructure_id"],
            forbidden: &[],
        },
    ];

    fn kind(&self) -> &'static str {
        match self {
            Self::Once(_) => "once",
            Self::Cron(_) => "cron",
        }
    }
}
