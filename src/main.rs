use std::{env, fs, path::Path, process};

use cinder::bytecode::Bytecode;
use cinder::bytecode::compile::Compiler;
use cinder::bytecode::disasm::print_bc;
use cinder::lang::node::*;
use cinder::runtime::{Session, Vm};

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();

    let help = args.contains(&"--help".to_string()) || args.contains(&"-h".to_string());
    let disasm = args.contains(&"--disasm".to_string());
    let emit_demo = args.contains(&"--emit-demo".to_string());

    if help {
        print_usage();
        return;
    }

    // first non-flag argument is the filename
    let filename = args.iter().skip(1).find(|a| !a.starts_with('-'));

    match filename {
        Some(filename) => {
            if emit_demo {
                write_demo(filename);
                return;
            }

            ensure_extension(filename);
            let bytecode = load_bytecode(filename);

            if disasm {
                print_bc(&bytecode);
            } else {
                run_bytecode(&bytecode);
            }
        }
        None => {
            if args.len() == 1 {
                run_demo();
            } else {
                print_usage();
                process::exit(1);
            }
        }
    }
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    // RUST_LOG overrides; warnings only by default
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_usage() {
    println!("CINDER - bytecode compiler and stack VM");
    println!();
    println!("Usage:");
    println!("  cinder                        Run demo programs in one session");
    println!("  cinder <file.cbc>             Run a compiled bytecode file");
    println!("  cinder --disasm <file.cbc>    Show constants and disassembly");
    println!("  cinder --emit-demo <file>     Compile the demo program to a file");
    println!("  cinder --help, -h             Show this help");
}

fn ensure_extension(filename: &str) {
    let path = Path::new(filename);
    if path.extension().and_then(|e| e.to_str()) != Some("cbc") {
        eprintln!("Error: expected a .cbc file, got {}", filename);
        process::exit(1);
    }
}

fn load_bytecode(filename: &str) -> Bytecode {
    let bytes = match fs::read(filename) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", filename, e);
            process::exit(1);
        }
    };

    match Bytecode::from_bytes(&bytes) {
        Ok(bytecode) => bytecode,
        Err(e) => {
            eprintln!("Invalid bytecode in '{}': {}", filename, e);
            process::exit(1);
        }
    }
}

fn run_bytecode(bytecode: &Bytecode) {
    let mut vm = Vm::new(bytecode);

    if let Err(e) = vm.run() {
        eprintln!("{}", e);
        process::exit(1);
    }

    println!("{}", vm.last_popped_stack_elem());
}

/// let x = 5; if (x > 3) { x * 2 } else { 0 }
fn demo_program() -> Program {
    Program::new(vec![
        let_stmt("x", int(5)),
        expr_stmt(if_else(
            infix(ident("x"), ">", int(3)),
            vec![expr_stmt(infix(ident("x"), "*", int(2)))],
            Some(vec![expr_stmt(int(0))]),
        )),
    ])
}

fn write_demo(filename: &str) {
    let mut compiler = Compiler::new();
    if let Err(e) = compiler.compile(&demo_program()) {
        eprintln!("{}", e);
        process::exit(1);
    }

    let bytes = match compiler.bytecode().to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    if let Err(e) = fs::write(filename, &bytes) {
        eprintln!("Failed to write '{}': {}", filename, e);
        process::exit(1);
    }

    println!("wrote {} bytes to {}", bytes.len(), filename);
}

fn run_demo() {
    let submissions: Vec<(&str, Program)> = vec![
        ("1 + 2", program_of(vec![infix(int(1), "+", int(2))])),
        (
            "50 / 2 * 2 + 10 - 5",
            program_of(vec![infix(
                infix(infix(infix(int(50), "/", int(2)), "*", int(2)), "+", int(10)),
                "-",
                int(5),
            )]),
        ),
        ("-7 / 2", program_of(vec![infix(prefix("-", int(7)), "/", int(2))])),
        ("1 < 2", program_of(vec![infix(int(1), "<", int(2))])),
        ("!5", program_of(vec![prefix("!", int(5))])),
        ("!!5", program_of(vec![prefix("!", prefix("!", int(5)))])),
        ("let x = 5;", Program::new(vec![let_stmt("x", int(5))])),
        ("x + 1", program_of(vec![infix(ident("x"), "+", int(1))])),
        (
            "if (x > 3) { 10 } else { 20 }",
            program_of(vec![if_else(
                infix(ident("x"), ">", int(3)),
                vec![expr_stmt(int(10))],
                Some(vec![expr_stmt(int(20))]),
            )]),
        ),
        (
            "if (false) { 10 }",
            program_of(vec![if_else(boolean(false), vec![expr_stmt(int(10))], None)]),
        ),
        ("true + 1", program_of(vec![infix(boolean(true), "+", int(1))])),
        ("y", program_of(vec![ident("y")])),
        ("x * 2", program_of(vec![infix(ident("x"), "*", int(2))])),
    ];

    let mut session = Session::new();

    for (source, program) in &submissions {
        match session.eval(program) {
            Ok(value) => println!("{:<32} => {}", source, value),
            Err(e) => println!("{:<32} => {}", source, e),
        }
    }
}
