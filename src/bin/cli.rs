//! Entrypoint for CLI
use std::{
    env,
    error::Error,
    fs,
    time::{Duration, Instant},
};

use chip8_vm::{constants::*, prelude::*, Clock, Hz, IMPL_VERSION};
use log::info;

static USAGE: &str = r#"
usage: chip8 CMD FILE [HZ]

commands:
    run     Run the target ROM file, at an optional clock frequency
    dis     Disassemble the target ROM into a readable listing

examples:
    chip8 run breakout.rom
    chip8 run breakout.rom 500
    chip8 dis breakout.rom
"#;

fn run_bytecode(filepath: impl AsRef<str>, clock_frequency: Option<Hz>) -> Chip8Result<()> {
    println!("Running Bytecode Interpreter");

    let bytecode = fs::read(filepath.as_ref())?;

    let conf = Chip8Conf { clock_frequency };

    // Unconfigured frequency means an unthrottled interpreter.
    let mut cpu_clock = Clock::new(conf.clock_frequency.unwrap_or_default().into());
    let mut timer_clock = Clock::new(Duration::from_nanos(CLOCK_CYCLE_TIME));

    let mut vm = Chip8Vm::new(conf);
    vm.load_bytecode(bytecode.as_slice())?;

    let start = Instant::now();

    loop {
        cpu_clock.wait();

        if timer_clock.tick() {
            vm.tick_timers();
        }

        let pc = vm.program_counter();
        match vm.step()? {
            // A jump to its own address means the program is done and
            // spinning in place.
            Flow::Jump if vm.program_counter() == pc => {
                info!("halt: jump to self at 0x{pc:04X}");
                break;
            }
            // Running headless, so no keypad input is ever coming.
            Flow::KeyWait => {
                info!("halt: waiting for keypad input at 0x{pc:04X}");
                break;
            }
            _ => {}
        }
    }

    let end = Instant::now();

    println!(
        "time taken: {}ms",
        end.duration_since(start).as_nanos() as f64 / 1000000.0
    ); // to millis

    if vm.take_redraw() {
        println!("{}", vm.dump_display()?);
    }

    if vm.sound_active() {
        info!("buzzer is active at halt");
    }

    Ok(())
}

fn disassemble(filepath: impl AsRef<str>) -> Chip8Result<()> {
    let bytecode = fs::read(filepath.as_ref())?;

    Disassembler::new(bytecode.as_slice()).print_bytecode();

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    match parse_args() {
        Some(Cmd::Run { filepath, clock_hz }) => run_bytecode(filepath, clock_hz.map(Hz))?,
        Some(Cmd::Dis { filepath }) => disassemble(filepath)?,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    }

    Ok(())
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(cmd) => match cmd.as_str() {
            "run" => Some(Cmd::Run {
                filepath: consume_arg(&mut args)?,
                clock_hz: args.next().and_then(|arg| arg.parse().ok()),
            }),
            "dis" => Some(Cmd::Dis {
                filepath: consume_arg(&mut args)?,
            }),
            _ => None,
        },
        None => None,
    }
}

/// Consumes the next argument, bailing out of parsing if it doesn't exist.
fn consume_arg(args: &mut impl Iterator<Item = String>) -> Option<String> {
    args.next()
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run {
        filepath: String,
        clock_hz: Option<u64>,
    },
    /// Disassemble
    Dis { filepath: String },
}
