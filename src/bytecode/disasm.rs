use crate::bytecode::ir::{Bytecode, Instructions};
use crate::bytecode::op::{Definition, lookup, read_operands};
use std::fmt;

impl fmt::Display for Instructions {
    /// One line per instruction: `0000 OpConstant 1`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.as_bytes();
        let mut ip = 0;

        while ip < bytes.len() {
            let def = match lookup(bytes[ip]) {
                Ok(def) => def,
                Err(e) => {
                    writeln!(f, "ERROR: {}", e)?;
                    ip += 1;
                    continue;
                }
            };

            match read_operands(def, &bytes[ip + 1..]) {
                Some((operands, read)) => {
                    writeln!(f, "{:04} {}", ip, format_instruction(def, &operands))?;
                    ip += 1 + read;
                }
                None => {
                    writeln!(f, "{:04} {} <truncated>", ip, def.name)?;
                    break;
                }
            }
        }

        Ok(())
    }
}

fn format_instruction(def: &Definition, operands: &[usize]) -> String {
    let mut line = def.name.to_string();
    for operand in operands {
        line.push(' ');
        line.push_str(&operand.to_string());
    }
    line
}

/// Collect the absolute targets of every jump in the stream.
fn collect_jump_targets(bytes: &[u8]) -> Vec<usize> {
    use crate::bytecode::op::Opcode;

    let mut targets = Vec::new();
    let mut ip = 0;

    while ip < bytes.len() {
        let Ok(op) = Opcode::try_from(bytes[ip]) else {
            ip += 1;
            continue;
        };
        let def = op.definition();
        let Some((operands, read)) = read_operands(def, &bytes[ip + 1..]) else {
            break;
        };

        if matches!(op, Opcode::Jump | Opcode::JumpNotTruthy) && !targets.contains(&operands[0]) {
            targets.push(operands[0]);
        }

        ip += 1 + read;
    }

    targets
}

/// Print disassembly of a bytecode program
pub fn print_bc(bc: &Bytecode) {
    println!("════════════════════════════════════════");
    println!(" constants ({})", bc.constants.len());
    println!("════════════════════════════════════════");
    for (i, value) in bc.constants.iter().enumerate() {
        println!("{:04}   {:<8} {}", i, value.type_name(), value);
    }
    println!();

    println!("════════════════════════════════════════");
    println!(" main ({} bytes)", bc.instructions.len());
    println!("════════════════════════════════════════");

    let jump_targets = collect_jump_targets(bc.instructions.as_bytes());

    for line in bc.instructions.to_string().lines() {
        let is_target = line
            .get(..4)
            .and_then(|ip| ip.parse::<usize>().ok())
            .is_some_and(|ip| jump_targets.contains(&ip));

        if is_target {
            println!("► {}", line);
        } else {
            println!("  {}", line);
        }
    }
    println!();
}
