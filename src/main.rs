use clap::Parser as ClapParser;
use std::io::Read;
use tracing_subscriber::EnvFilter;
use vimscript_vm::{EvalError, Interp, Options};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opt = Opt::parse();
    let options = Options {
        ignorecase: opt.ignorecase,
        maxfuncdepth: opt.maxfuncdepth,
        ..Options::default()
    };
    let mut interp = Interp::new(options);

    let res = if let Some(expr) = &opt.eval {
        interp.eval(expr).map(|v| println!("{}", v.to_echo()))
    } else {
        match read_input(opt.file.as_deref()) {
            Ok(text) => interp.source(&text),
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(2);
            }
        }
    };

    match res {
        Err(e) => fail(&e),
        Ok(()) if interp.did_emsg() => std::process::exit(1),
        Ok(()) => {}
    }
}

fn read_input(file: Option<&str>) -> std::io::Result<String> {
    match file {
        Some(f) => std::fs::read_to_string(f),
        None => {
            let mut s = String::new();
            std::io::stdin().lock().read_to_string(&mut s)?;
            Ok(s)
        }
    }
}

fn fail(e: &EvalError) -> ! {
    eprintln!("{}", e);
    std::process::exit(1)
}

#[derive(clap::Parser)]
#[clap(about, version, author)]
struct Opt {
    /// Evaluate the given expression and print its value.
    #[clap(short, long)]
    eval: Option<String>,

    /// Run the given file as a script. Reads the script from stdin when
    /// neither this nor `--eval` is given.
    #[clap(short, long)]
    file: Option<String>,

    /// Ignore case when comparing strings with operators without `#` or `?`.
    #[clap(long)]
    ignorecase: bool,

    /// Maximum depth of nested function calls.
    #[clap(long, default_value = "100")]
    maxfuncdepth: usize,
}
