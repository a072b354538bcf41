use clap::Parser;
use env_logger::Env;
use hexstep::console::AppBuilder;
use hexstep::debugger::process::Child;
use nix::unistd::Pid;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the program to debug
    #[clap(required_unless_present = "pid", conflicts_with = "pid")]
    debugee: Option<String>,

    /// Attach to a running process by its pid
    #[clap(short, long)]
    pid: Option<i32>,

    /// File used to load and save the console history
    #[clap(long, env = "HS_HISTORY")]
    history: Option<PathBuf>,

    /// Arguments passed to the debugee
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn start(args: Args) -> anyhow::Result<()> {
    let process = match (args.pid, args.debugee) {
        (Some(pid), _) => Child::attach(Pid::from_raw(pid))?,
        (None, Some(program)) => Child::launch(program, args.args)?,
        (None, None) => anyhow::bail!("nothing to debug, set a program or a pid"),
    };

    let mut builder = AppBuilder::new();
    if let Some(history) = args.history {
        builder = builder.with_history(history);
    }
    builder.build(process)?.run()
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if let Err(e) = start(args) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
