use anyhow::Result;

use graph::TaskTemplate;

/// Task templates for the five parts of the pipeline.
///
/// Each is a parameterized command pattern with its slots declared as
/// node args (vary the task identity), task args (per-run values), and
/// op args (tool paths). One set is built per pipeline run and shared
/// by every task of the corresponding stage.
pub struct Templates {
    pub short_covid: TaskTemplate,
    pub long_covid: TaskTemplate,
    pub short_save_results: TaskTemplate,
    pub long_save_results: TaskTemplate,
    pub diagnostics: TaskTemplate,
}

impl Templates {
    pub fn create() -> Result<Self> {
        let short_covid = TaskTemplate::new(
            "short_covid_task",
            "{r_executable} {script} {location_id} \
             {output_version} {hsp_icu_input_path} {estimation_years} \
             {age_groups} {location_set_id} {release_id}",
            &["location_id"],
            &[
                "output_version",
                "hsp_icu_input_path",
                "estimation_years",
                "age_groups",
                "location_set_id",
                "release_id",
            ],
            &["r_executable", "script"],
        )?;

        let long_covid = TaskTemplate::new(
            "long_covid_task",
            "{r_executable} {script} {location_id} \
             {output_version} {definition} {hsp_icu_input_path} \
             {estimation_years} {age_groups} {location_set_id} \
             {release_id}",
            &["location_id"],
            &[
                "output_version",
                "definition",
                "hsp_icu_input_path",
                "estimation_years",
                "age_groups",
                "location_set_id",
                "release_id",
            ],
            &["r_executable", "script"],
        )?;

        let short_save_results = TaskTemplate::new(
            "short_save_results_task",
            "{r_executable} {script} {output_version} {measure} \
             {location_set_id} {release_id} {mark_as_best} \
             {save_incidence} {all_gbd_estimation_years} {db_description}",
            &["measure"],
            &[
                "output_version",
                "location_set_id",
                "release_id",
                "mark_as_best",
                "save_incidence",
                "all_gbd_estimation_years",
                "db_description",
            ],
            &["r_executable", "script"],
        )?;

        let long_save_results = TaskTemplate::new(
            "long_save_results_task",
            "{r_executable} {script} {output_version} \
             {measure} {location_set_id} {release_id} {mark_as_best} \
             {save_incidence} {all_gbd_estimation_years} {db_description}",
            &["measure"],
            &[
                "output_version",
                "location_set_id",
                "release_id",
                "mark_as_best",
                "save_incidence",
                "all_gbd_estimation_years",
                "db_description",
            ],
            &["r_executable", "script"],
        )?;

        let diagnostics = TaskTemplate::new(
            "diagnostics_task",
            "{r_executable} {script} {output_version} \
             {loc_id} {all_diagnostics}",
            &["loc_id", "all_diagnostics"],
            &["output_version"],
            &["r_executable", "script"],
        )?;

        Ok(Self {
            short_covid,
            long_covid,
            short_save_results,
            long_save_results,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_internally_consistent() {
        // every declared arg appears in its command and vice versa,
        // or Templates::create would have errored.
        Templates::create().unwrap();
    }
}
