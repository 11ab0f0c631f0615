use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use crate::fs::Fs;
use crate::settings::Settings;

/// Contents of the run's `metadata.json` file.
///
/// Written once at launch so a crashed run still leaves a record, then
/// rewritten with timing and terminal status when the engine returns.
#[derive(Debug, Serialize)]
pub struct RunMetadata {
    job_name: String,
    output_version: String,
    input_data_version: String,
    db_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
}

impl RunMetadata {
    pub fn init(settings: &Settings) -> Self {
        Self {
            job_name: settings.job_name.clone(),
            output_version: settings.output_version.clone(),
            input_data_version: settings.input_data_version.clone(),
            db_description: settings.db_description.clone(),
            task_count: None,
            elapsed_seconds: None,
            status: None,
        }
    }

    pub fn finalize(&mut self, elapsed: Duration, status: &str, task_count: usize) {
        self.elapsed_seconds = Some(elapsed.as_secs_f64());
        self.status = Some(status.to_owned());
        self.task_count = Some(task_count);
    }

    pub fn write(&self, fs: &Fs) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs.write_file(fs.metadata_json(), &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> RunMetadata {
        RunMetadata {
            job_name: "nf_covid_2024-06-01.01".to_owned(),
            output_version: "2024-06-01.01".to_owned(),
            input_data_version: "2024_05_28.02".to_owned(),
            db_description: "Run 2024-06-01.01".to_owned(),
            task_count: None,
            elapsed_seconds: None,
            status: None,
        }
    }

    #[test]
    fn test_init_omits_terminal_fields() -> Result<()> {
        let json = serde_json::to_string(&metadata())?;
        assert!(json.contains("\"job_name\":\"nf_covid_2024-06-01.01\""));
        assert!(!json.contains("status"));
        assert!(!json.contains("elapsed_seconds"));
        Ok(())
    }

    #[test]
    fn test_finalize_adds_terminal_fields() -> Result<()> {
        let mut metadata = metadata();
        metadata.finalize(Duration::from_secs(90), "done", 41);
        let json = serde_json::to_string(&metadata)?;
        assert!(json.contains("\"status\":\"done\""));
        assert!(json.contains("\"task_count\":41"));
        assert!(json.contains("\"elapsed_seconds\":90.0"));
        Ok(())
    }
}
