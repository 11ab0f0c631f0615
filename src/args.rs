use clap::Parser;

const CMD_NAME: &str = "nfcovid";
const DEFAULT_INPUT_ROOT: &str = "/mnt/covid/pub/input_data";
const DEFAULT_LOGS_ROOT: &str = "/mnt/covid/logs/jobmon";
const DEFAULT_REPO: &str = "/opt/nf-covid";
const DEFAULT_R_EXECUTABLE: &str =
    "/opt/singularity/execRscript.sh -i /opt/images/rstudio.img -s";
const DEFAULT_ENGINE: &str = "jobmon";

/// Stores our command-line args format.
#[derive(Parser)]
#[command(name = CMD_NAME, version, about = None, long_about = None)]
pub struct Args {
    /// Output version label, formatted yyyy-mm-dd.<run> e.g. 2022-03-29.05
    #[arg(long, value_name = "VERSION")]
    pub output_version: String,

    /// Hospitalizations and infections input data version,
    /// formatted yyyy_mm_dd.<run> e.g. 2022_03_25.06
    #[arg(long, value_name = "VERSION")]
    pub input_data_version: String,

    /// How the acute phase is defined ('who', 'gbd', or '12mo')
    #[arg(long, value_name = "DEF")]
    pub definition: String,

    /// Location id to run the pipeline on (repeat for each location)
    #[arg(short, long = "location", value_name = "ID", required = true)]
    pub locations: Vec<i32>,

    /// Age group id to run the pipeline on (repeat for each age group)
    #[arg(short, long = "age-group", value_name = "ID", required = true)]
    pub age_groups: Vec<i32>,

    /// The location set the locations were drawn from, e.g. 35 for modeling locs
    #[arg(long, value_name = "ID")]
    pub location_set_id: i32,

    /// The release id to use for shared functions, e.g. 9
    #[arg(long, value_name = "ID")]
    pub release_id: i32,

    /// Estimation year (starts after 2019; repeat for each year)
    #[arg(short, long = "estimation-year", value_name = "YEAR", required = true)]
    pub estimation_years: Vec<i32>,

    /// Save results to the Epi db
    #[arg(long)]
    pub save_to_db: bool,

    /// Description to attach to the db run; defaults to "Run <output version>"
    #[arg(long, value_name = "TEXT")]
    pub db_description: Option<String>,

    /// Mark the run as best if saving to the Epi db
    #[arg(long)]
    pub mark_as_best: bool,

    /// Save incidence (measure 6) for all MEs, not just asymp
    #[arg(long)]
    pub save_incidence: bool,

    /// Root directory of pipeline input data
    #[arg(long, value_name = "DIR", default_value = DEFAULT_INPUT_ROOT)]
    #[arg(env = "NF_COVID_INPUT_ROOT")]
    pub input_root: String,

    /// Directory that per-run log directories are created under
    #[arg(long, value_name = "DIR", default_value = DEFAULT_LOGS_ROOT)]
    #[arg(env = "NF_COVID_LOGS_ROOT")]
    pub logs_root: String,

    /// Checkout of the NF COVID estimation scripts
    #[arg(long, value_name = "DIR", default_value = DEFAULT_REPO)]
    #[arg(env = "NF_COVID_REPO")]
    pub repo: String,

    /// Wrapper command used to run R scripts on the cluster
    #[arg(long, value_name = "CMD", default_value = DEFAULT_R_EXECUTABLE)]
    #[arg(env = "NF_COVID_R_EXECUTABLE")]
    pub r_executable: String,

    /// Workflow engine executable the task graph is submitted to
    #[arg(long, value_name = "CMD", default_value = DEFAULT_ENGINE)]
    #[arg(env = "NF_COVID_ENGINE")]
    pub engine: String,

    /// Email address to notify when the workflow finishes
    #[arg(long, value_name = "ADDR")]
    pub email: Option<String>,

    /// Bypass user confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Print additional debugging info (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Dry run; assemble and summarize the graph but don't submit it.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}
