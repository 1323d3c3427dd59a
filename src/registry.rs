//! Registry owning all definitions and driving finalization.

use std::collections::HashMap;

use crate::{
    compile,
    definition::{DefId, Definition, Finalization, OFFSET_PAIR_SIZE},
    error::SchemaError,
};

/// Built-in leaf types seeded into every registry: `(name, size, is_string)`.
///
/// `time` and `duration` are two u32s; `string` and `json` occupy the
/// 8-byte offset-pair slot and carry their bodies in the string arena.
const PRIMITIVES: &[(&str, usize, bool)] = &[
    ("bool", 1, false),
    ("uint8", 1, false),
    ("int8", 1, false),
    ("uint16", 2, false),
    ("int16", 2, false),
    ("uint32", 4, false),
    ("int32", 4, false),
    ("uint64", 8, false),
    ("int64", 8, false),
    ("float32", 4, false),
    ("float64", 8, false),
    ("time", 8, false),
    ("duration", 8, false),
    ("string", OFFSET_PAIR_SIZE, true),
    ("json", OFFSET_PAIR_SIZE, true),
];

/// Insertion-ordered arena of [`Definition`]s with a name index.
///
/// Two-phase construction: [`create`](Self::create) and
/// [`Definition::add_field`] may run in any order and leave definitions
/// incomplete; a single [`finalize_all`](Self::finalize_all) then resolves
/// type references, computes sizes, and compiles command buffers.
///
/// `DefId` handles are indices into the arena and stay stable for the
/// registry's lifetime, including across [`create`](Self::create) calls that
/// replace an existing name.
pub struct DefinitionRegistry {
    defs: Vec<Definition>,
    index: HashMap<String, DefId>,
}

impl DefinitionRegistry {
    /// A registry pre-seeded with the built-in primitive types.
    pub fn new() -> Self {
        let mut registry = Self {
            defs: Vec::with_capacity(PRIMITIVES.len()),
            index: HashMap::with_capacity(PRIMITIVES.len()),
        };
        for &(name, size, is_string) in PRIMITIVES {
            registry.insert(Definition::leaf(name, size, is_string));
        }
        registry
    }

    /// Inserts a new empty record definition under `name`, replacing any
    /// existing definition with that name, and returns it for field
    /// registration.
    pub fn create(&mut self, name: &str) -> &mut Definition {
        let id = match self.index.get(name) {
            Some(&id) => {
                // Reuse the slot so handles cached in other definitions'
                // fields keep pointing at the live definition for this name.
                self.defs[id.0] = Definition::record(name);
                id
            }
            None => self.insert(Definition::record(name)),
        };
        &mut self.defs[id.0]
    }

    /// Looks up a definition by type name.
    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.index.get(name).map(|id| &self.defs[id.0])
    }

    /// Finalizes every definition: resolves field types, computes sizes, and
    /// compiles command buffers. Fails on the first definition that cannot
    /// be finalized, naming it in the error.
    ///
    /// Iteration order is irrelevant: finalization is memoized and resolves
    /// dependencies on demand, so definitions may be registered in any order.
    /// Calling this twice is a no-op for already-finalized definitions.
    pub fn finalize_all(&mut self) -> Result<(), SchemaError> {
        for id in 0..self.defs.len() {
            self.finalize(DefId(id))?;
        }
        Ok(())
    }

    fn insert(&mut self, def: Definition) -> DefId {
        let id = DefId(self.defs.len());
        self.index.insert(def.name().to_string(), id);
        self.defs.push(def);
        id
    }

    /// Finalizes one definition, recursing into its field types.
    ///
    /// On failure the definition is left `Pending` (invalid and unusable);
    /// whatever size it accumulated is meaningless until the schema is fixed
    /// and `finalize_all` runs again.
    fn finalize(&mut self, id: DefId) -> Result<(), SchemaError> {
        if self.defs[id.0].state() == Finalization::Finalized {
            return Ok(());
        }

        self.defs[id.0].set_state(Finalization::InProgress);
        if self.defs[id.0].has_fields() {
            // Leaf types keep the size given at construction; records
            // recompute theirs from scratch.
            self.defs[id.0].reset_size();
            for i in 0..self.defs[id.0].fields().len() {
                if let Err(err) = self.finalize_field(id, i) {
                    self.defs[id.0].set_state(Finalization::Pending);
                    return Err(err);
                }
            }
        }

        match compile::compile(&self.defs, id) {
            Ok(commands) => {
                self.defs[id.0].set_commands(commands);
                self.defs[id.0].set_state(Finalization::Finalized);
                Ok(())
            }
            Err(err) => {
                self.defs[id.0].set_state(Finalization::Pending);
                Err(err)
            }
        }
    }

    fn finalize_field(&mut self, id: DefId, field_index: usize) -> Result<(), SchemaError> {
        let (child, is_array) = {
            let field = &self.defs[id.0].fields()[field_index];
            let child = match field.resolved {
                Some(child) => child,
                None => match self.index.get(field.type_name.as_str()) {
                    Some(&child) => child,
                    None => {
                        return Err(SchemaError::UnknownFieldType {
                            definition: self.defs[id.0].name().to_string(),
                            field: field.name.clone(),
                            type_name: field.type_name.clone(),
                        });
                    }
                },
            };
            (child, field.is_array)
        };
        self.defs[id.0].field_mut(field_index).resolved = Some(child);

        match self.defs[child.0].state() {
            Finalization::Finalized => {}
            Finalization::InProgress => {
                // The child is on the finalization stack: a by-value cycle.
                // Array fields break the recursion (their footprint is the
                // fixed offset-pair slot); anything else has no finite size.
                if !is_array {
                    return Err(SchemaError::CyclicDefinition {
                        definition: self.defs[id.0].name().to_string(),
                        field: self.defs[id.0].fields()[field_index].name.clone(),
                    });
                }
            }
            Finalization::Pending => self.finalize(child)?,
        }

        let child_size = self.defs[child.0].size();
        let footprint = self.defs[id.0].fields()[field_index].footprint(child_size);
        self.defs[id.0].grow_size(footprint);

        if is_array
            || self.defs[child.0].is_string()
            || !self.defs[child.0].has_constant_size()
        {
            self.defs[id.0].clear_constant_size();
        }
        Ok(())
    }
}

impl Default for DefinitionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
