use anyhow::{Context, Result};

use graph::{ComputeResources, TaskArgs, TaskId, Workflow};

use crate::fs::Fs;
use crate::settings::Settings;

use super::constants::*;
use super::templates::Templates;

/// One long covid pipeline run: everything the task graph is built from.
///
/// Immutable after construction. List-valued parameters are already
/// joined into the comma-separated strings the estimation scripts take
/// on their command lines.
#[derive(Debug)]
pub struct PipelineRun {
    pub output_version: String,
    pub job_name: String,
    pub locations: Vec<i32>,
    pub age_groups: String,
    pub location_set_id: i32,
    pub release_id: i32,
    pub hsp_icu_input_path: String,
    pub infect_death_input_path: String,
    pub definition: &'static str,
    pub estimation_years: String,
    /// GBD rounds plus the pipeline estimation years.
    pub all_gbd_estimation_years: String,
    pub db_description: String,
    pub mark_as_best: bool,
    pub save_incidence: bool,
    pub save_to_db: bool,

    pub r_executable: String,
    pub repo: String,
    /// Task stderr redirection target, under the run's log directory.
    pub stderr_dir: String,
    /// Task stdout redirection target, under the run's log directory.
    pub stdout_dir: String,
}

impl PipelineRun {
    /// Create a new `PipelineRun` from interpreted settings.
    pub fn from_settings(settings: &Settings, fs: &Fs) -> Result<Self> {
        let estimation_years = join_years(&settings.estimation_years);
        let all_gbd_estimation_years =
            format!("{},{}", join_years(GBD_ESTIMATION_YEARS), estimation_years);

        Ok(Self {
            output_version: settings.output_version.clone(),
            job_name: settings.job_name.clone(),
            locations: settings.locations.clone(),
            age_groups: join_years(&settings.age_groups),
            location_set_id: settings.location_set_id,
            release_id: settings.release_id,
            hsp_icu_input_path: settings.hsp_icu_input_path.clone(),
            infect_death_input_path: settings.infect_death_input_path.clone(),
            definition: settings.definition.as_str(),
            estimation_years,
            all_gbd_estimation_years,
            db_description: settings.db_description.clone(),
            mark_as_best: settings.mark_as_best,
            save_incidence: settings.save_incidence,
            save_to_db: settings.save_to_db,

            r_executable: settings.r_executable.clone(),
            repo: settings.repo.clone(),
            stderr_dir: path_str(fs.task_errors_dir())?,
            stdout_dir: path_str(fs.task_output_dir())?,
        })
    }

    fn script(&self, name: &str) -> String {
        format!("{}/{}", self.repo, name)
    }
}

fn join_years(years: &[i32]) -> String {
    let strs: Vec<String> = years.iter().map(i32::to_string).collect();
    strs.join(",")
}

fn path_str(path: std::path::PathBuf) -> Result<String> {
    let s = path
        .to_str()
        .ok_or(crate::fs::Error::PathEncoding)?
        .to_owned();
    Ok(s)
}

/// Assembles the task graph for one `PipelineRun`.
///
/// Per-stage task id lists are owned by the builder and threaded
/// through the build passes; `build` consumes the builder and returns
/// the finished workflow.
pub struct GraphBuilder<'a> {
    run: &'a PipelineRun,
    templates: Templates,
    wf: Workflow,
    short_tasks: Vec<TaskId>,
    long_tasks: Vec<TaskId>,
    diagnostic_tasks: Vec<TaskId>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(run: &'a PipelineRun) -> Result<Self> {
        let templates = Templates::create().context("while creating task templates")?;
        let num_locs = run.locations.len();
        Ok(Self {
            run,
            templates,
            wf: Workflow::create(&run.job_name, CLUSTER, &run.job_name),
            short_tasks: Vec::with_capacity(num_locs),
            long_tasks: Vec::with_capacity(num_locs),
            diagnostic_tasks: Vec::with_capacity(num_locs),
        })
    }

    /// Build the whole graph: estimation tasks per location, save-results
    /// fan-in tasks per measure (when saving to the db), and diagnostics
    /// tasks with the final-location aggregation node.
    pub fn build(mut self) -> Result<Workflow> {
        self.add_estimation_tasks()
            .context("while creating short and long covid tasks")?;

        if self.run.save_to_db {
            self.add_short_save_results_tasks()
                .context("while creating short covid save results tasks")?;
            self.add_long_save_results_tasks()
                .context("while creating long covid save results tasks")?;
        }

        self.add_diagnostics_tasks()
            .context("while creating diagnostics tasks")?;

        Ok(self.wf)
    }

    /// One short covid and one long covid task per location, with the
    /// long task depending on the short task for the same location only.
    fn add_estimation_tasks(&mut self) -> Result<()> {
        for &loc in &self.run.locations {
            let mut args = TaskArgs::new();
            args.set("r_executable", &self.run.r_executable)
                .set("script", self.run.script(SHORT_COVID_SCRIPT))
                .set("location_id", loc)
                .set("output_version", &self.run.output_version)
                .set("hsp_icu_input_path", &self.run.hsp_icu_input_path)
                .set("estimation_years", &self.run.estimation_years)
                .set("age_groups", &self.run.age_groups)
                .set("location_set_id", self.run.location_set_id)
                .set("release_id", self.run.release_id);

            let s_task = self.templates.short_covid.create_task(
                &format!("short_{loc}"),
                self.resources(Stage::ShortCovid),
                MAX_ATTEMPTS,
                &[],
                &args,
            )?;
            let s_id = self.wf.add_task(s_task)?;

            let mut args = TaskArgs::new();
            args.set("r_executable", &self.run.r_executable)
                .set("script", self.run.script(LONG_COVID_SCRIPT))
                .set("location_id", loc)
                .set("output_version", &self.run.output_version)
                .set("definition", self.run.definition)
                .set("hsp_icu_input_path", &self.run.hsp_icu_input_path)
                .set("estimation_years", &self.run.estimation_years)
                .set("age_groups", &self.run.age_groups)
                .set("location_set_id", self.run.location_set_id)
                .set("release_id", self.run.release_id);

            let l_task = self.templates.long_covid.create_task(
                &format!("long_cov_{loc}"),
                self.resources(Stage::LongCovid),
                MAX_ATTEMPTS,
                &[s_id],
                &args,
            )?;
            let l_id = self.wf.add_task(l_task)?;

            self.short_tasks.push(s_id);
            self.long_tasks.push(l_id);
        }
        Ok(())
    }

    /// One save-results task per short covid measure, behind a full
    /// fan-in barrier: it may not start until every location's short
    /// covid estimation has completed.
    fn add_short_save_results_tasks(&mut self) -> Result<()> {
        for measure in MEASURES_SHORT {
            let args = self.save_results_args(SHORT_SAVE_SCRIPT, measure);
            let task = self.templates.short_save_results.create_task(
                &format!("short_save_results_{measure}"),
                self.resources(Stage::ShortSaveResults),
                MAX_ATTEMPTS,
                &self.short_tasks,
                &args,
            )?;
            self.wf.add_task(task)?;
        }
        Ok(())
    }

    /// One save-results task per long covid measure, fanning in from
    /// every location's long covid task.
    fn add_long_save_results_tasks(&mut self) -> Result<()> {
        for measure in MEASURES_LONG {
            let args = self.save_results_args(LONG_SAVE_SCRIPT, measure);
            let task = self.templates.long_save_results.create_task(
                &format!("long_save_results_{measure}"),
                self.resources(Stage::LongSaveResults),
                MAX_ATTEMPTS,
                &self.long_tasks,
                &args,
            )?;
            self.wf.add_task(task)?;
        }
        Ok(())
    }

    /// One diagnostics task per location, each depending on all long and
    /// short covid tasks. The last location doubles as the full-report
    /// aggregation node: it additionally depends on every other
    /// diagnostics task and gets a larger resource allocation.
    fn add_diagnostics_tasks(&mut self) -> Result<()> {
        let Some(&last_loc) = self.run.locations.last() else {
            return Ok(());
        };

        for &loc in &self.run.locations {
            let estimation_upstreams = || {
                self.long_tasks
                    .iter()
                    .chain(&self.short_tasks)
                    .copied()
                    .collect::<Vec<_>>()
            };

            let (stage, all_diagnostics, upstreams) = if loc != last_loc {
                (Stage::Diagnostics, false, estimation_upstreams())
            } else {
                let mut ups = estimation_upstreams();
                ups.extend(&self.diagnostic_tasks);
                (Stage::DiagnosticsFinal, true, ups)
            };

            let mut args = TaskArgs::new();
            args.set("r_executable", &self.run.r_executable)
                .set("script", self.run.script(DIAGNOSTICS_SCRIPT))
                .set("output_version", &self.run.output_version)
                .set("loc_id", loc)
                .set("all_diagnostics", all_diagnostics);

            let task = self.templates.diagnostics.create_task(
                &format!("diagnostics_{loc}"),
                self.resources(stage),
                MAX_ATTEMPTS,
                &upstreams,
                &args,
            )?;
            let id = self.wf.add_task(task)?;

            if loc != last_loc {
                self.diagnostic_tasks.push(id);
            }
        }
        Ok(())
    }

    fn save_results_args(&self, script: &str, measure: &str) -> TaskArgs {
        let mut args = TaskArgs::new();
        args.set("r_executable", &self.run.r_executable)
            .set("script", self.run.script(script))
            .set("output_version", &self.run.output_version)
            .set("measure", measure)
            .set("location_set_id", self.run.location_set_id)
            .set("release_id", self.run.release_id)
            .set("mark_as_best", self.run.mark_as_best)
            .set("save_incidence", self.run.save_incidence)
            .set("all_gbd_estimation_years", &self.run.all_gbd_estimation_years)
            .set("db_description", &self.run.db_description);
        args
    }

    /// Assigns all cluster job specs for one task.
    fn resources(&self, stage: Stage) -> ComputeResources {
        let (cores, memory, runtime) = stage.resources();
        ComputeResources {
            cores,
            memory,
            runtime,
            queue: DEFAULT_QUEUE.to_owned(),
            project: PROJECT.to_owned(),
            stdout: self.run.stdout_dir.clone(),
            stderr: self.run.stderr_dir.clone(),
            working_directory: self.run.repo.clone(),
            seconds_until_timeout: TASK_TIMEOUT_S,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn run(locations: Vec<i32>, save_to_db: bool) -> PipelineRun {
        PipelineRun {
            output_version: "2024-06-01.01".to_owned(),
            job_name: "nf_covid_2024-06-01.01".to_owned(),
            locations,
            age_groups: "2,3,388".to_owned(),
            location_set_id: 35,
            release_id: 9,
            hsp_icu_input_path: "/data/input/hsp_icu/".to_owned(),
            infect_death_input_path: "/data/input/infect_death/".to_owned(),
            definition: "who",
            estimation_years: "2020,2021,2022".to_owned(),
            all_gbd_estimation_years: "1990,2019,2020,2021,2022".to_owned(),
            db_description: "Run 2024-06-01.01".to_owned(),
            mark_as_best: false,
            save_incidence: false,
            save_to_db,

            r_executable: "Rscript".to_owned(),
            repo: "/code/nf-covid".to_owned(),
            stderr_dir: "/data/logs/errors".to_owned(),
            stdout_dir: "/data/logs/output".to_owned(),
        }
    }

    fn build(run: &PipelineRun) -> Workflow {
        GraphBuilder::new(run).unwrap().build().unwrap()
    }

    fn upstream_set(wf: &Workflow, name: &str) -> BTreeSet<String> {
        let id = wf.task_id(name).unwrap_or_else(|| panic!("no task {name}"));
        wf.upstream_names(id)
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn test_task_count() {
        let run = run(vec![101, 102, 528], true);
        let wf = build(&run);
        // short, long, short save x5, long save x27, diagnostics:
        assert_eq!(wf.len(), 2 * 3 + 5 + 27 + 3);
    }

    #[test]
    fn test_task_count_without_save() {
        let run = run(vec![101, 102, 528], false);
        let wf = build(&run);
        assert_eq!(wf.len(), 3 * 3);
    }

    #[test]
    fn test_long_depends_on_own_short_only() {
        let run = run(vec![101, 102, 528], true);
        let wf = build(&run);
        for loc in [101, 102, 528] {
            let ups = upstream_set(&wf, &format!("long_cov_{loc}"));
            assert_eq!(ups, BTreeSet::from([format!("short_{loc}")]));
        }
    }

    #[test]
    fn test_save_results_fan_in() {
        let run = run(vec![101, 102, 528], true);
        let wf = build(&run);

        let all_short: BTreeSet<String> =
            [101, 102, 528].iter().map(|l| format!("short_{l}")).collect();
        let all_long: BTreeSet<String> =
            [101, 102, 528].iter().map(|l| format!("long_cov_{l}")).collect();

        for measure in MEASURES_SHORT {
            let ups = upstream_set(&wf, &format!("short_save_results_{measure}"));
            assert_eq!(ups, all_short);
        }
        for measure in MEASURES_LONG {
            let ups = upstream_set(&wf, &format!("long_save_results_{measure}"));
            assert_eq!(ups, all_long);
        }
    }

    #[test]
    fn test_diagnostics_upstreams() {
        let run = run(vec![101, 102, 528], true);
        let wf = build(&run);

        let estimation: BTreeSet<String> = [101, 102, 528]
            .iter()
            .flat_map(|l| [format!("short_{l}"), format!("long_cov_{l}")])
            .collect();

        for loc in [101, 102] {
            let ups = upstream_set(&wf, &format!("diagnostics_{loc}"));
            assert_eq!(ups, estimation);
            assert!(!ups.iter().any(|n| n.starts_with("diagnostics_")));
        }

        let mut expected_final = estimation;
        expected_final.insert("diagnostics_101".to_owned());
        expected_final.insert("diagnostics_102".to_owned());
        assert_eq!(upstream_set(&wf, "diagnostics_528"), expected_final);
    }

    #[test]
    fn test_final_diagnostics_resources_strictly_larger() {
        let run = run(vec![101, 102, 528], false);
        let wf = build(&run);

        let per_loc = &wf.get(wf.task_id("diagnostics_101").unwrap()).resources;
        let fin = &wf.get(wf.task_id("diagnostics_528").unwrap()).resources;
        assert!(fin.cores > per_loc.cores);
        assert!(fin.memory > per_loc.memory);
        assert!(fin.runtime > per_loc.runtime);
    }

    #[test]
    fn test_commands_are_rendered() {
        let run = run(vec![101], true);
        let wf = build(&run);

        let short = wf.get(wf.task_id("short_101").unwrap());
        assert_eq!(
            short.command,
            "Rscript /code/nf-covid/src/4_short_covid_multi.R 101 \
             2024-06-01.01 /data/input/hsp_icu/ 2020,2021,2022 \
             2,3,388 35 9"
        );

        let diag = wf.get(wf.task_id("diagnostics_101").unwrap());
        assert_eq!(
            diag.command,
            "Rscript /code/nf-covid/src/8_diagnostics.R 2024-06-01.01 101 true"
        );
    }

    #[test]
    fn test_rebuild_is_isomorphic() {
        let run = run(vec![101, 102, 528], true);
        let first = build(&run);
        let second = build(&run);

        let names = |wf: &Workflow| -> BTreeSet<String> {
            wf.tasks().map(|t| t.name.clone()).collect()
        };
        let edges = |wf: &Workflow| -> BTreeSet<(String, String)> {
            wf.tasks()
                .map(|t| (wf.task_id(&t.name).unwrap(), t))
                .flat_map(|(id, t)| {
                    wf.upstream_names(id)
                        .into_iter()
                        .map(|up| (up.to_owned(), t.name.clone()))
                        .collect::<Vec<_>>()
                })
                .collect()
        };

        assert_eq!(names(&first), names(&second));
        assert_eq!(edges(&first), edges(&second));
    }
}
