mod cli;
mod config;
mod copy;
mod render;

pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cmd = cli::parse_args(&args)?;
    match cmd {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Copy(args) => copy::run(args).await,
        cli::Command::Render(args) => render::run(args),
    }
}
