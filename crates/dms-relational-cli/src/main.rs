use dms_relational_cli::DmsRelationalCli;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    DmsRelationalCli::new().parse_and_run()
}
