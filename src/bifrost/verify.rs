//! Validation of lowered sequences.
//!
//! Checks the dataflow shape every special-function sequence must have before
//! it is handed to register allocation: operands only reference values that
//! were written earlier in the sequence (or the node's own source), nothing
//! reads the destination the sequence is defining, each
//! temporary is written once, the node's destination is written exactly once
//! and by the last instruction, and typed reads agree with the producer.

use hashbrown::HashMap;
use thiserror::Error;

use super::inst::{AluType, Inst, InstClass, Reg};
use crate::ir::AluInstr;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("instruction {index} reads {reg} before it is written")]
    ForwardReference { index: usize, reg: Reg },

    #[error("instruction {index} reads {reg}, the destination being defined")]
    ReadsDestination { index: usize, reg: Reg },

    #[error("instruction {index} writes {reg}, which was already written")]
    TempReused { index: usize, reg: Reg },

    #[error("no instruction writes the destination {dest}")]
    MissingFinalWriter { dest: Reg },

    #[error("instructions {first} and {second} both write the destination {dest}")]
    MultipleFinalWriters { first: usize, second: usize, dest: Reg },

    #[error("destination {dest} is written by instruction {index}, which is not last")]
    FinalWriterNotLast { index: usize, dest: Reg },

    #[error("instruction {index} reads {reg} as {expected} but it was written as {found}")]
    TypeMismatch {
        index: usize,
        reg: Reg,
        expected: AluType,
        found: AluType,
    },
}

/// Verify the sequence emitted for `instr`.
pub fn verify_sequence(seq: &[Inst], instr: &AluInstr) -> Result<(), VerifyError> {
    let dest = Reg::Value(instr.dest);
    let source = Reg::Value(instr.src.value);

    let mut written: HashMap<Reg, (AluType, InstClass)> = HashMap::new();
    let mut final_writer = None;

    for (index, inst) in seq.iter().enumerate() {
        for (slot, reg) in inst.reg_sources() {
            if reg == dest {
                return Err(VerifyError::ReadsDestination { index, reg });
            }
            if reg == source {
                continue;
            }
            let Some(&(found, producer)) = written.get(&reg) else {
                return Err(VerifyError::ForwardReference { index, reg });
            };
            if producer.is_data_movement() {
                continue;
            }
            if let Some(expected) = inst.src_types[slot] {
                if expected != found {
                    return Err(VerifyError::TypeMismatch {
                        index,
                        reg,
                        expected,
                        found,
                    });
                }
            }
        }

        if inst.dest == dest {
            if let Some(first) = final_writer {
                return Err(VerifyError::MultipleFinalWriters {
                    first,
                    second: index,
                    dest,
                });
            }
            final_writer = Some(index);
        } else if written.contains_key(&inst.dest) {
            return Err(VerifyError::TempReused {
                index,
                reg: inst.dest,
            });
        }
        written.insert(inst.dest, (inst.dest_type, inst.class));
    }

    match final_writer {
        None => Err(VerifyError::MissingFinalWriter { dest }),
        Some(index) if index + 1 != seq.len() => {
            Err(VerifyError::FinalWriterNotLast { index, dest })
        }
        Some(_) => Ok(()),
    }
}
