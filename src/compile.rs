//! Command recording and peephole optimization.
//!
//! Recording is a pure function of an already-finalized definition tree.
//! Constant-length arrays are unrolled into per-element programs, which lets
//! the optimizer merge fixed reads across field and element boundaries; the
//! fixed-layout run of an unrolled array collapses into a single copy.

use crate::{
    command::{Command, CommandKind},
    definition::{DefId, Definition},
    error::SchemaError,
};

/// Records and optimizes the command buffer for one definition.
///
/// Every definition reachable through the fields must already be finalized.
/// The one exception is the definition being compiled itself, which is still
/// mid-finalization; encountering it (or any other unfinalized definition)
/// below the root therefore means the type recurses into itself, and no
/// finite unrolled program exists for it.
pub(crate) fn compile(defs: &[Definition], id: DefId) -> Result<Vec<Command>, SchemaError> {
    let commands = record_definition(defs, id)?;
    Ok(optimize(commands))
}

fn record_definition(defs: &[Definition], id: DefId) -> Result<Vec<Command>, SchemaError> {
    let def = &defs[id.0];
    if def.has_fields() {
        record_complex(defs, id)
    } else if def.is_string() {
        Ok(vec![record_string(def)])
    } else if def.size() > 0 {
        Ok(vec![record_fixed(def, 1)])
    } else {
        // Zero-sized leaf: nothing to read.
        Ok(Vec::new())
    }
}

fn record_complex(defs: &[Definition], id: DefId) -> Result<Vec<Command>, SchemaError> {
    let mut out = Vec::new();
    for field in defs[id.0].fields() {
        let child = field.resolved.ok_or_else(|| SchemaError::UnresolvedField {
            definition: defs[id.0].name().to_string(),
            field: field.name.clone(),
        })?;
        if !defs[child.0].is_valid() {
            return Err(SchemaError::RecursiveDefinition {
                definition: defs[child.0].name().to_string(),
            });
        }
        let mut commands = if field.is_array {
            record_array(defs, child, field.array_size)?
        } else {
            record_definition(defs, child)?
        };
        for cmd in &mut commands {
            cmd.label = format!("{}({})", field.name, cmd.label);
        }
        out.extend(commands);
    }
    Ok(out)
}

fn record_array(
    defs: &[Definition],
    elem: DefId,
    array_size: i32,
) -> Result<Vec<Command>, SchemaError> {
    let elem_def = &defs[elem.0];

    if array_size >= 0 {
        // Constant length: unroll the element programs.
        let length = array_size as u32;
        let mut subcommands = Vec::new();
        if elem_def.is_string() {
            for _ in 0..length {
                subcommands.push(record_string(elem_def));
            }
        } else if elem_def.has_constant_size() {
            // The whole run is one contiguous copy.
            subcommands.push(record_fixed(elem_def, array_size as usize));
        } else {
            for _ in 0..length {
                subcommands.extend(record_definition(defs, elem)?);
            }
        }
        Ok(vec![Command {
            label: elem_def.name().to_string(),
            kind: CommandKind::ConstantArray {
                size: elem_def.size(),
                length,
                subcommands,
            },
        }])
    } else if elem_def.has_constant_size() {
        // Dynamic count of fixed-layout elements: a single bulk copy.
        Ok(vec![Command {
            label: elem_def.name().to_string(),
            kind: CommandKind::DynamicRead {
                size: elem_def.size(),
            },
        }])
    } else {
        // Dynamic length: record the program for one element and dispatch
        // it per element at translation time.
        let subcommands = if elem_def.is_string() {
            vec![record_string(elem_def)]
        } else if elem_def.has_constant_size() {
            vec![record_fixed(elem_def, 1)]
        } else {
            record_definition(defs, elem)?
        };
        Ok(vec![Command {
            label: elem_def.name().to_string(),
            kind: CommandKind::DynamicArray {
                size: elem_def.size(),
                subcommands,
            },
        }])
    }
}

fn record_string(def: &Definition) -> Command {
    Command {
        label: def.name().to_string(),
        kind: CommandKind::StringRead,
    }
}

fn record_fixed(def: &Definition, count: usize) -> Command {
    Command {
        label: def.name().to_string(),
        kind: CommandKind::FixedRead {
            size: count * def.size(),
        },
    }
}

/// One-rule peephole pass: adjacent fixed reads coalesce into a single copy
/// (sizes added, labels joined with `+`). Array subcommand lists are
/// optimized recursively; other commands pass through. Idempotent.
pub(crate) fn optimize(input: Vec<Command>) -> Vec<Command> {
    let mut out: Vec<Command> = Vec::with_capacity(input.len());

    for cmd in input {
        let Command { label, kind } = cmd;
        match kind {
            CommandKind::FixedRead { size } => {
                let merged = match out.last_mut() {
                    Some(Command {
                        label: top_label,
                        kind: CommandKind::FixedRead { size: top_size },
                    }) => {
                        top_label.push('+');
                        top_label.push_str(&label);
                        *top_size += size;
                        true
                    }
                    _ => false,
                };
                if !merged {
                    out.push(Command {
                        label,
                        kind: CommandKind::FixedRead { size },
                    });
                }
            }
            CommandKind::ConstantArray {
                size,
                length,
                subcommands,
            } => out.push(Command {
                label,
                kind: CommandKind::ConstantArray {
                    size,
                    length,
                    subcommands: optimize(subcommands),
                },
            }),
            CommandKind::DynamicArray { size, subcommands } => out.push(Command {
                label,
                kind: CommandKind::DynamicArray {
                    size,
                    subcommands: optimize(subcommands),
                },
            }),
            other => out.push(Command { label, kind: other }),
        }
    }

    out
}
