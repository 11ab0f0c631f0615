//! Static definitions for the pipeline: measure enumerations, the
//! per-stage resource table, retry ceiling, and cluster constants.

/// Retry ceiling per task, consumed by the engine.
pub const MAX_ATTEMPTS: u32 = 5;

pub const DEFAULT_QUEUE: &str = "queue.q";
pub const PROJECT: &str = "proj_nfrqe";
pub const CLUSTER: &str = "slurm";

/// Wall-clock ceiling for one workflow run, in seconds.
pub const WORKFLOW_TIMEOUT_S: u64 = 260_000;
/// How long the engine may hold any single task before giving up on it.
pub const TASK_TIMEOUT_S: u32 = 43_200;

/// GBD rounds preceding the pipeline-specific estimation years.
pub const GBD_ESTIMATION_YEARS: &[i32] = &[1990, 1995, 2000, 2005, 2010, 2015, 2019];

pub const SHORT_COVID_SCRIPT: &str = "src/4_short_covid_multi.R";
pub const SHORT_SAVE_SCRIPT: &str = "src/5_short_save_results.R";
pub const LONG_COVID_SCRIPT: &str = "src/6_long_covid.R";
pub const LONG_SAVE_SCRIPT: &str = "src/7_long_save_results.R";
pub const DIAGNOSTICS_SCRIPT: &str = "src/8_diagnostics.R";

/// Acute-phase severities saved to the db, one save-results task each.
pub const MEASURES_SHORT: &[&str] = &["asymp", "mild", "moderate", "hospital", "icu"];

/// Long-covid symptom clusters and overlaps saved to the db,
/// one save-results task each.
pub const MEASURES_LONG: &[&str] = &[
    "cognitive_severe",
    "fatigue",
    "respiratory_mild",
    "respiratory_moderate",
    "respiratory_severe",
    "cognitive_mild_fatigue",
    "cognitive_severe_fatigue",
    "cognitive_mild_respiratory_mild",
    "cognitive_mild_respiratory_moderate",
    "cognitive_mild_respiratory_severe",
    "cognitive_severe_respiratory_mild",
    "cognitive_severe_respiratory_moderate",
    "cognitive_severe_respiratory_severe",
    "fatigue_respiratory_mild",
    "fatigue_respiratory_moderate",
    "fatigue_respiratory_severe",
    "cognitive_mild_fatigue_respiratory_mild",
    "cognitive_mild_fatigue_respiratory_moderate",
    "cognitive_mild_fatigue_respiratory_severe",
    "cognitive_severe_fatigue_respiratory_mild",
    "cognitive_severe_fatigue_respiratory_moderate",
    "cognitive_severe_fatigue_respiratory_severe",
    "any",
    "midmod",
    "hospital",
    "icu",
    "gbs",
];

/// Pipeline stages, used to look up resource requests.
///
/// The final location's diagnostics task aggregates across all locations
/// and gets its own, larger row in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ShortCovid,
    LongCovid,
    ShortSaveResults,
    LongSaveResults,
    Diagnostics,
    DiagnosticsFinal,
}

impl Stage {
    /// Static resource table: (cores, memory GB, runtime seconds).
    /// Looked up by stage identity, never computed.
    pub fn resources(self) -> (u32, u32, u32) {
        match self {
            Self::ShortCovid => (10, 160, 86_400),
            Self::LongCovid => (20, 400, 86_400),
            Self::ShortSaveResults => (10, 55, 36_000),
            Self::LongSaveResults => (10, 55, 36_000),
            Self::Diagnostics => (2, 30, 1_800),
            Self::DiagnosticsFinal => (20, 300, 54_000),
        }
    }
}
