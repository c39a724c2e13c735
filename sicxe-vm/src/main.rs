use clap::Parser as CParser;
use sicxe_vm::disasm;
use sicxe_vm::errors::State;
use sicxe_vm::loader;
use sicxe_vm::machine::Machine;
use std::path::PathBuf;

#[derive(CParser)]
#[command(name = "sicvm")]
#[command(about = "24-bit word machine emulator")]
struct Args {
    /// Object file produced by the assembler
    input: PathBuf,

    /// Execute at most this many instructions, then stop
    #[arg(short, long)]
    steps: Option<u64>,

    /// Print a disassembly listing of the loaded program and exit
    #[arg(short, long)]
    disasm: bool,

    /// Dump registers after execution
    #[arg(short, long)]
    registers: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut machine = Machine::new();
    let loaded = loader::load_file(&mut machine, &args.input)?;

    if args.disasm {
        disasm::dump_memory(machine.memory(), 0, loaded);
        return Ok(());
    }

    let state = match args.steps {
        Some(limit) => {
            let mut state = machine.state();
            for _ in 0..limit {
                state = machine.step();
                if state.is_halted() {
                    break;
                }
            }
            state
        }
        None => machine.run(),
    };

    match state {
        State::Halted(reason) => println!("halted: {}", reason),
        other => println!("stopped while {:?}", other),
    }
    if args.registers {
        disasm::dump_registers(&machine);
    }

    Ok(())
}
