use std::env;
use std::ffi::OsString;
use std::io::{self, BufWriter, Write};
use std::process;

use exprcc::{CompileError, CompileResult, tokenizer};

fn run(arg: &OsString) -> CompileResult<()> {
  let expr = tokenizer::decode(arg.as_encoded_bytes())?;
  log::debug!("compiling {expr:?}");

  let stdout = io::stdout();
  let mut out = BufWriter::new(stdout.lock());
  exprcc::compile(expr, &mut out)?;
  out.flush().map_err(|source| CompileError::Emit { source })
}

fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

  let args: Vec<OsString> = env::args_os().collect();
  if args.len() != 2 {
    let program = args
      .first()
      .map(|arg| arg.to_string_lossy().into_owned())
      .unwrap_or_else(|| "exprcc".to_string());
    eprintln!("usage: {program} <expr>");
    process::exit(1);
  }

  if let Err(err) = run(&args[1]) {
    eprintln!("{err}");
    process::exit(1);
  }
}
