use std::path::PathBuf;

use anyhow::Result;

use crate::args::Args;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid --definition '{0}' (should be 'who', 'gbd', or '12mo')")]
    InvalidDefinition(String),
    #[error("no locations specified")]
    NoLocations,
}

/// How the acute phase of the disease is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Definition {
    Who,
    Gbd,
    TwelveMo,
}

impl Definition {
    /// The string the estimation scripts expect on their command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Who => "who",
            Self::Gbd => "gbd",
            Self::TwelveMo => "12mo",
        }
    }
}

/// Settings are like Args, except all the logic has been applied:
/// the definition flag is parsed, the db description is defaulted,
/// and the job name, log directory, and input paths are derived.
#[derive(Debug)]
pub struct Settings {
    pub output_version: String,
    pub input_data_version: String,
    pub definition: Definition,
    pub locations: Vec<i32>,
    pub age_groups: Vec<i32>,
    pub location_set_id: i32,
    pub release_id: i32,
    pub estimation_years: Vec<i32>,
    pub save_to_db: bool,
    pub db_description: String,
    pub mark_as_best: bool,
    pub save_incidence: bool,

    /// `nf_covid_{output_version}`; doubles as the engine workflow args.
    pub job_name: String,
    /// Per-run log directory: `{logs_root}/{date}/{job_name}/`.
    pub logs_loc: PathBuf,
    pub hsp_icu_input_path: String,
    pub infect_death_input_path: String,
    pub repo: String,
    pub r_executable: String,
    pub engine: String,
    pub email: Option<String>,

    pub yes: bool,
    pub verbose: u8,
    pub dry_run: bool,
}

impl TryFrom<Args> for Settings {
    type Error = anyhow::Error;
    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let definition = match args.definition.as_str() {
            "who" => Definition::Who,
            "gbd" => Definition::Gbd,
            "12mo" => Definition::TwelveMo,
            other => return Err(Error::InvalidDefinition(other.to_owned()).into()),
        };

        if args.locations.is_empty() {
            return Err(Error::NoLocations.into());
        }

        let job_name = format!("nf_covid_{}", args.output_version);

        // date prefix of the output version, e.g. "2022-03-29" of "2022-03-29.05"
        let date = args
            .output_version
            .split('.')
            .next()
            .unwrap_or(&args.output_version);

        let mut logs_loc = PathBuf::from(&args.logs_root);
        logs_loc.push(date);
        logs_loc.push(&job_name);

        let hsp_icu_input_path = format!(
            "{}/hospitalization_icu/{}/reference/output_draws/",
            args.input_root, args.input_data_version
        );
        let infect_death_input_path = format!(
            "{}/infections_deaths/{}/daily/",
            args.input_root, args.input_data_version
        );

        // if no db description is given, label the run with its version:
        let db_description = args
            .db_description
            .unwrap_or_else(|| format!("Run {}", args.output_version));

        Ok(Self {
            output_version: args.output_version,
            input_data_version: args.input_data_version,
            definition,
            locations: args.locations,
            age_groups: args.age_groups,
            location_set_id: args.location_set_id,
            release_id: args.release_id,
            estimation_years: args.estimation_years,
            save_to_db: args.save_to_db,
            db_description,
            mark_as_best: args.mark_as_best,
            save_incidence: args.save_incidence,

            job_name,
            logs_loc,
            hsp_icu_input_path,
            infect_death_input_path,
            repo: args.repo,
            r_executable: args.r_executable,
            engine: args.engine,
            email: args.email,

            yes: args.yes,
            verbose: args.verbose,
            dry_run: args.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args {
            output_version: "2024-06-01.03".to_owned(),
            input_data_version: "2024_05_28.02".to_owned(),
            definition: "who".to_owned(),
            locations: vec![33, 34],
            age_groups: vec![2, 3],
            location_set_id: 35,
            release_id: 9,
            estimation_years: vec![2020, 2021],
            save_to_db: false,
            db_description: None,
            mark_as_best: false,
            save_incidence: false,
            input_root: "/data/input".to_owned(),
            logs_root: "/data/logs".to_owned(),
            repo: "/code/nf-covid".to_owned(),
            r_executable: "Rscript".to_owned(),
            engine: "jobmon".to_owned(),
            email: None,
            yes: true,
            verbose: 0,
            dry_run: false,
        }
    }

    #[test]
    fn test_derived_values() -> Result<()> {
        let settings: Settings = args().try_into()?;
        assert_eq!(settings.job_name, "nf_covid_2024-06-01.03");
        assert_eq!(
            settings.logs_loc,
            PathBuf::from("/data/logs/2024-06-01/nf_covid_2024-06-01.03")
        );
        assert_eq!(
            settings.hsp_icu_input_path,
            "/data/input/hospitalization_icu/2024_05_28.02/reference/output_draws/"
        );
        assert_eq!(settings.db_description, "Run 2024-06-01.03");
        assert_eq!(settings.definition, Definition::Who);
        Ok(())
    }

    #[test]
    fn test_db_description_passthrough() -> Result<()> {
        let mut args = args();
        args.db_description = Some("resubmission after node outage".to_owned());
        let settings: Settings = args.try_into()?;
        assert_eq!(settings.db_description, "resubmission after node outage");
        Ok(())
    }

    #[test]
    fn test_invalid_definition() {
        let mut args = args();
        args.definition = "whoo".to_owned();
        let err = Settings::try_from(args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidDefinition(..))
        ));
    }
}
