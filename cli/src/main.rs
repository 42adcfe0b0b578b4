use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use specweave::{Context, Execution, Generator, KotlinGenerator, Pipeline, Target, Variant, ZodGenerator};

#[derive(Parser, Debug)]
#[command(name = "specweave", version, about = "Generate API clients for every OpenAPI spec in a directory")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the generation units and the edges wired into the task graph
    Plan {
        #[command(flatten)]
        opts: Opts,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the wired task graph as a Mermaid flowchart
    Graph {
        #[command(flatten)]
        opts: Opts,
    },
    /// Run the external generator for every spec
    Generate {
        #[command(flatten)]
        opts: Opts,
        /// Run generation units on all cores
        #[arg(long)]
        parallel: bool,
        /// Ignore up-to-date stamps
        #[arg(long)]
        force: bool,
        /// Generator executable, defaults to the variant's usual tool
        #[arg(long)]
        generator: Option<String>,
    },
}

#[derive(Args, Debug, Clone)]
struct Opts {
    /// Directory containing the specs
    #[arg(long, default_value = "openApi")]
    specs: Utf8PathBuf,
    /// Generation root, defaults to `build/generated` or `generated/typescript`
    #[arg(long)]
    out: Option<Utf8PathBuf>,
    /// Prefix of every generated package
    #[arg(long, default_value = "com")]
    namespace: String,
    #[arg(long, value_enum, default_value = "graph")]
    variant: VariantArg,
    /// Restrict the host build to these targets, e.g. `jvm,iosArm64`
    #[arg(long, value_delimiter = ',', value_parser = parse_target)]
    target: Vec<Target>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum VariantArg {
    Graph,
    Script,
}

fn parse_target(name: &str) -> Result<Target, String> {
    Target::parse(name).ok_or_else(|| format!("unknown target '{name}'"))
}

impl Opts {
    fn context(&self) -> Context {
        let variant = match self.variant {
            VariantArg::Graph => Variant::Graph,
            VariantArg::Script => Variant::Script,
        };

        let out = self.out.clone().unwrap_or_else(|| match variant {
            Variant::Graph => Utf8PathBuf::from("build/generated"),
            Variant::Script => Utf8PathBuf::from("generated/typescript"),
        });

        let mut ctx = Context::new(&self.specs, out)
            .namespace_root(&self.namespace)
            .variant(variant);

        if !self.target.is_empty() {
            ctx = ctx.targets(self.target.iter().copied());
        }

        ctx
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{} {err:#}", style("error:").red().bold());
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    specweave::init_logging()?;

    match cli.command {
        Command::Plan { opts, json } => {
            let plan = Pipeline::new(opts.context()).plan()?;

            if json {
                println!("{}", plan.to_json()?);
                return Ok(());
            }

            if plan.registry.is_empty() {
                println!("{}", style("No OpenAPI specs found").yellow());
                return Ok(());
            }

            for unit in &plan.registry {
                println!(
                    "{:<20} {:<36} {}",
                    style(&unit.id).bold(),
                    unit.task_name(),
                    unit.spec.file_name()
                );
                println!("{:<20} {}", "", unit.api_package);
            }
            println!(
                "{} consumers, {} edges",
                plan.report.consumers.len(),
                plan.report.edges.len()
            );
        }
        Command::Graph { opts } => {
            let plan = Pipeline::new(opts.context()).plan()?;
            print!("{}", plan.graph);
        }
        Command::Generate {
            opts,
            parallel,
            force,
            generator,
        } => {
            let execution = if parallel {
                Execution::Parallel
            } else {
                Execution::Sequential
            };
            let ctx = opts.context().execution(execution).force(force);

            let generator: Box<dyn Generator> = match (ctx.variant, generator) {
                (Variant::Graph, Some(program)) => Box::new(KotlinGenerator::new().program(program)),
                (Variant::Graph, None) => Box::new(KotlinGenerator::new()),
                (Variant::Script, Some(program)) => Box::new(ZodGenerator::new().program(program)),
                (Variant::Script, None) => Box::new(ZodGenerator::new()),
            };

            let diagnostics = Pipeline::new(ctx).run(generator.as_ref())?;
            tracing::debug!(total = ?diagnostics.total_time(), "generator time");
            println!("{diagnostics}");
        }
    }

    Ok(())
}
