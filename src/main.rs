use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod core;
mod store;
mod utils;

/// UK take-home pay and car ownership cost calculator
#[derive(Parser, Debug)]
#[command(name = "payc", version, about)]
struct Cli {
    /// JSON file holding saved salary and car inputs
    #[arg(long, global = true, value_name = "FILE", default_value = "payc-store.json")]
    store: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Take-home pay breakdown for a gross salary
    Salary(cmd::salary::SalaryCommand),
    /// Running costs and ownership forecast for one or more cars
    Car(cmd::car::CarCommand),
    /// List the supported tax years
    Years(cmd::years::YearsCommand),
    /// Print the car input formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    log::debug!("{:?}", cli);

    match &cli.command {
        Command::Salary(salary) => salary.exec(&cli.store),
        Command::Car(car) => car.exec(&cli.store),
        Command::Years(years) => years.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
