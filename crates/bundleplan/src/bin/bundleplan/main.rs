mod cli;

use bundleplan::changeset::ChangeRecord;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("BUNDLEPLAN_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Plan(plan_cli) => plan(plan_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn plan(cli: cli::PlanCommand) -> anyhow::Result<()> {
    let bundle = load(&cli.input)?;
    bundleplan::validate::validate(&bundle)?;

    let records = bundleplan::plan::changes(&bundle).collect::<Result<Vec<_>, _>>()?;

    output(&cli.output, &records)?;
    Ok(())
}

fn load(input: &cli::InputArgs) -> anyhow::Result<bundleplan::bundle::Bundle> {
    if let Some(file_path) = &input.file {
        return Ok(bundleplan::bundle::Bundle::load_file(file_path)?);
    }

    let stdin = std::io::read_to_string(std::io::stdin())?;
    Ok(bundleplan::bundle::Bundle::from_yaml(&stdin)?)
}

fn output(output: &cli::OutputArgs, records: &[ChangeRecord]) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), records)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), records)?,
    };

    Ok(())
}

/// (bundleplan-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    use cli::DevSubCommand::*;

    let bundle = load(&cli.input)?;

    match cli.command {
        Bundle => println!("{bundle:#?}"),
        Changes => {
            let records = bundleplan::plan::changes(&bundle).collect::<Result<Vec<_>, _>>()?;
            println!("{records:#?}")
        }
    }

    Ok(())
}
