use std::env;
use std::process;

use vena::error::ShellError;
use vena::flags::Flags;
use vena::shell::Shell;

fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off"));
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn run(args: &[String]) -> Result<i32, ShellError> {
    let mut flags = Flags::new();
    flags.parse(args)?;

    if flags.is_set("help") {
        flags.print_help();
        return Ok(0);
    }

    if flags.is_set("version") {
        println!("Vena {}", env!("CARGO_PKG_VERSION"));
        return Ok(0);
    }

    init_logging(flags.is_set("debug"));

    let mut shell = Shell::new(&flags)?;
    shell.run()
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let code = match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("vena: {}", e);
            e.exit_code()
        }
    };
    process::exit(code);
}
