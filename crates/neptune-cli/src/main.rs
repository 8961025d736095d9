//! Headless Neptune VM runner: assembles a source file, runs it to
//! completion, and reports the final register/flag state (spec.md §5's
//! host thread, without the rendering/input collaborators it hands off to).

use neptune_asm::parse_numeric;
use neptune_vm::Vm;

struct Args {
    source_path: String,
    base: Option<u32>,
    trace: bool,
    dump_vram: Option<String>,
}

fn parse_args(raw: &[String]) -> Args {
    let mut base = None;
    let mut trace = false;
    let mut dump_vram = None;
    let mut positionals = Vec::new();

    let mut i = 0;
    while i < raw.len() {
        match raw[i].as_str() {
            "--trace" => trace = true,
            "--base" => {
                i += 1;
                let value = raw.get(i).unwrap_or_else(|| usage_error("--base requires an address"));
                base = Some(parse_numeric(value).unwrap_or_else(|| usage_error(&format!("invalid --base address: {value}"))));
            }
            "--dump-vram" => {
                i += 1;
                let path = raw.get(i).unwrap_or_else(|| usage_error("--dump-vram requires a path"));
                dump_vram = Some(path.clone());
            }
            other => positionals.push(other.to_string()),
        }
        i += 1;
    }

    let Some(source_path) = positionals.into_iter().next() else {
        usage_error("missing <source> file");
    };

    Args { source_path, base, trace, dump_vram }
}

fn usage_error(message: &str) -> ! {
    eprintln!("error: {message}");
    eprintln!("Usage: neptune-cli [--base <addr>] [--trace] [--dump-vram <path>] <source.nas>");
    std::process::exit(1);
}

fn main() {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&raw);

    let source = std::fs::read_to_string(&args.source_path).unwrap_or_else(|e| {
        eprintln!("failed to read {}: {e}", args.source_path);
        std::process::exit(1);
    });

    let mut vm = Vm::new();
    let base_address = args.base.unwrap_or_else(|| vm.memory_map().program_start());

    if let Err(e) = vm.assemble_and_load(&source, base_address) {
        eprintln!("assembly error: {e}");
        std::process::exit(1);
    }

    while !vm.is_halted() {
        if args.trace {
            let pc = vm.pc();
            match vm.disassemble_at(pc) {
                Ok((text, _)) => println!("{pc:#010x}: {text}"),
                Err(e) => eprintln!("{pc:#010x}: <decode error: {e}>"),
            }
        }
        if let Err(e) = vm.step() {
            eprintln!("execution error at {:#010x}: {e}", vm.pc());
            report_state(&vm);
            std::process::exit(1);
        }
    }

    report_state(&vm);

    if let Some(path) = args.dump_vram {
        let bytes = vm.vram_snapshot();
        if let Err(e) = std::fs::write(&path, &bytes) {
            eprintln!("failed to write vram dump to {path}: {e}");
            std::process::exit(1);
        }
        println!("Wrote {} bytes of VRAM to {path}", bytes.len());
    }
}

fn report_state(vm: &Vm) {
    let snap = vm.snapshot();
    println!("halted: {}", snap.halted);
    println!("pc={:#010x} sp={:#010x} hp={:#010x}", snap.pc, snap.sp, snap.hp);
    println!("flags: z={} n={} c={} v={}", snap.flags.z, snap.flags.n, snap.flags.c, snap.flags.v);
    for (i, value) in snap.general.iter().enumerate() {
        if *value != 0 {
            println!("r{i} = {value:#010x}");
        }
    }
}
