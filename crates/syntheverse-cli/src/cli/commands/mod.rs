use super::args::*;

pub mod chain;
pub mod doctor;
pub mod evaluate;
pub mod pipeline;
pub mod rag;
pub mod reports;

use crate::exit_codes::EXIT_SUCCESS;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config = cli.config.as_deref();
    match cli.cmd {
        Command::Rag(args) => rag::run(args, config).await,
        Command::Evaluate(args) => evaluate::run(args, config).await,
        Command::Hash(args) => chain::hash(args),
        Command::Submit(args) => chain::submit(args, config).await,
        Command::Validate(args) => chain::validate(args, config).await,
        Command::Pending(args) => chain::pending(args, config).await,
        Command::Summary(args) => reports::summary(args, config).await,
        Command::Snapshot(args) => reports::snapshot(args, config).await,
        Command::Balance => reports::balance(config).await,
        Command::Pipeline(args) => pipeline::run(args, config).await,
        Command::Doctor(args) => doctor::run(args, config).await,
        Command::Version => {
            println!("syntheverse {}", env!("CARGO_PKG_VERSION"));
            Ok(EXIT_SUCCESS)
        }
    }
}
