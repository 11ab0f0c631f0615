use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;

use graph::Workflow;

use crate::exec::{EngineDriver, Error as ExecError, WorkflowStatus};
use crate::fs::Fs;
use crate::metadata::RunMetadata;
use crate::notify;
use crate::pipeline::constants::WORKFLOW_TIMEOUT_S;
use crate::pipeline::{GraphBuilder, PipelineRun};
use crate::settings::Settings;
use crate::ui::{Timer, Ui};

/// This struct actually runs the command-line app.
pub struct App {
    /// Interpreted command line settings
    settings: Settings,
    /// Filesystem interface
    fs: Fs,
    /// User interface
    ui: Ui,
}

impl App {
    /// Create a new `App`.
    pub fn new(settings: Settings) -> Self {
        let fs = Fs::new(&settings.logs_loc, settings.dry_run);
        let ui = Ui::new(&settings);
        Self { settings, fs, ui }
    }

    /// Assemble the task graph for this run and submit it to the engine.
    pub fn run(mut self) -> Result<()> {
        log::info!("launching NF COVID pipeline run {}", self.settings.job_name);
        log::info!(
            "using {} as hospitalizations and infections input version",
            self.settings.input_data_version
        );

        self.ui
            .verbose_msg(&format!("Using log directory {:?}", self.settings.logs_loc));
        self.fs.ensure_logs_dir_exists(self.settings.verbose > 0)?;

        let run = PipelineRun::from_settings(&self.settings, &self.fs)?;
        log::info!(
            "reading infections and deaths input from {}",
            run.infect_death_input_path
        );

        let wf = self.build_graph(&run)?;
        self.print_summary(&wf);

        if self.settings.dry_run {
            eprintln!("{}", "Dry run; not submitting workflow.".green());
            return Ok(());
        }
        if !self.ui.confirm("Submit workflow to the engine?")? {
            return Ok(());
        }

        let mut metadata = RunMetadata::init(&self.settings);
        metadata.write(&self.fs)?;

        eprintln!("\n{}.\n", "Submitting workflow to the engine".magenta());
        let timer = Timer::now();

        let driver = EngineDriver::new(&self.settings.engine, &self.fs);
        let status = driver
            .run(&wf, Duration::from_secs(WORKFLOW_TIMEOUT_S), true)
            .context("while running workflow")?;

        metadata.finalize(timer.elapsed(), status.as_str(), wf.len());
        metadata.write(&self.fs)?;

        if let Some(email) = &self.settings.email {
            notify::send_completion_email(email, &self.settings.job_name, status, &self.settings.logs_loc)
                .unwrap_or_else(|e| log::warn!("unable to send completion email: {e:?}"));
        }

        self.report(&wf, status)
    }

    fn build_graph(&mut self, run: &PipelineRun) -> Result<Workflow> {
        self.ui.verbose_progress("Creating workflow");
        self.ui.start_timer();

        let wf = GraphBuilder::new(run)?.build()?;

        self.ui.done();
        self.ui.print_elapsed("Creating workflow");
        log::info!("created workflow {} with {} tasks", wf.name(), wf.len());
        Ok(wf)
    }

    fn print_summary(&self, wf: &Workflow) {
        eprintln!("Workflow {} has {} tasks:", wf.name(), wf.len());

        // count per template, preserving stage order:
        let mut counts: Vec<(&str, usize)> = Vec::with_capacity(8);
        for task in wf.tasks() {
            match counts.iter_mut().find(|(name, _)| *name == task.template) {
                Some((_, n)) => *n += 1,
                None => counts.push((&task.template, 1)),
            }
        }
        for (template, n) in counts {
            eprintln!("{n:>6} {template}");
        }
    }

    fn report(&self, wf: &Workflow, status: WorkflowStatus) -> Result<()> {
        if status.is_done() {
            eprintln!(
                "{}",
                format!(
                    "Workflow {} completed successfully! You're awesome! Have a great day!",
                    wf.name()
                )
                .green()
            );
            Ok(())
        } else {
            eprintln!(
                "{} Check the engine db or the error logs in {:?}.",
                format!("Workflow {} did not complete ({status}).", wf.name()).red(),
                self.settings.logs_loc,
            );
            Err(ExecError::WorkflowFailed(status).into())
        }
    }
}
