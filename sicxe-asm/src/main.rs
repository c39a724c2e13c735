use clap::Parser as CParser;
use sicxe_asm::assemble;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(CParser)]
#[command(name = "sicas")]
#[command(about = "Two-pass assembler for the sicvm machine")]
struct Args {
    input: PathBuf,

    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let source = match fs::read_to_string(&args.input) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("cannot read {}: {}", args.input.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let assembly = assemble(&source);
    for diagnostic in &assembly.diagnostics {
        eprintln!(
            "{}:{}: {}",
            args.input.display(),
            diagnostic.line,
            diagnostic.kind
        );
    }

    let output = args
        .output
        .unwrap_or_else(|| args.input.with_extension("obj"));
    if let Err(err) = fs::write(&output, &assembly.object) {
        eprintln!("cannot write {}: {}", output.display(), err);
        return ExitCode::FAILURE;
    }
    println!(
        "wrote {} bytes to {}",
        assembly.object.len(),
        output.display()
    );

    if assembly.diagnostics.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
