fn main() -> Result<(), anyhow::Error> {
    nf_covid_pipeline::run()
}
