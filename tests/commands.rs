use msg2bin::{Command, CommandKind, CommandTag, DefinitionRegistry};

// ── helpers ──────────────────────────────────────────────────────────────────

/// Finalizes and returns the flattened command tags for `name`.
fn flatten(registry: &mut DefinitionRegistry, name: &str) -> Vec<CommandTag> {
    registry.finalize_all().expect("finalize should succeed");
    registry
        .get(name)
        .expect("definition should exist")
        .flatten_commands()
}

/// Asserts the optimizer fixpoint: no two adjacent fixed reads survive at
/// any nesting level.
fn assert_no_adjacent_fixed_reads(commands: &[Command]) {
    for pair in commands.windows(2) {
        assert!(
            !(matches!(pair[0].kind, CommandKind::FixedRead { .. })
                && matches!(pair[1].kind, CommandKind::FixedRead { .. })),
            "adjacent fixed reads left unmerged: {:?} / {:?}",
            pair[0].label,
            pair[1].label
        );
    }
    for cmd in commands {
        assert_no_adjacent_fixed_reads(cmd.subcommands());
    }
}

// ── compiled shapes ───────────────────────────────────────────────────────────

#[test]
fn merges_adjacent_primitive_reads() {
    let mut registry = DefinitionRegistry::new();
    let def = registry.create("msgs/Pair");
    def.add_field("int32", "a", false, -1);
    def.add_field("int32", "b", false, -1);

    assert_eq!(flatten(&mut registry, "msgs/Pair"), vec![CommandTag::FixedRead]);
    let def = registry.get("msgs/Pair").expect("definition should exist");
    let cmd = &def.commands()[0];
    assert!(matches!(cmd.kind, CommandKind::FixedRead { size: 8 }));
    assert_eq!(cmd.label, "a(int32)+b(int32)");
}

#[test]
fn merges_reads_across_nested_record_boundaries() {
    let mut registry = DefinitionRegistry::new();
    let inner = registry.create("msgs/Inner");
    inner.add_field("int32", "c", false, -1);
    inner.add_field("int32", "d", false, -1);
    let outer = registry.create("msgs/Nested");
    outer.add_field("int32", "a", false, -1);
    outer.add_field("msgs/Inner", "b", false, -1);

    assert_eq!(flatten(&mut registry, "msgs/Nested"), vec![CommandTag::FixedRead]);
    let def = registry.get("msgs/Nested").expect("definition should exist");
    let cmd = &def.commands()[0];
    assert!(matches!(cmd.kind, CommandKind::FixedRead { size: 12 }));
    assert_eq!(cmd.label, "a(int32)+b(c(int32))+b(d(int32))");
}

#[test]
fn compiles_string_fields_to_string_reads() {
    let mut registry = DefinitionRegistry::new();
    let def = registry.create("msgs/Named");
    def.add_field("string", "name", false, -1);

    assert_eq!(flatten(&mut registry, "msgs/Named"), vec![CommandTag::StringRead]);
}

#[test]
fn compiles_header_to_a_merged_read_and_a_string() {
    let mut registry = DefinitionRegistry::new();
    let header = registry.create("std_msgs/Header");
    header.add_field("uint32", "seq", false, -1);
    header.add_field("time", "stamp", false, -1);
    header.add_field("string", "frame_id", false, -1);

    assert_eq!(
        flatten(&mut registry, "std_msgs/Header"),
        vec![CommandTag::FixedRead, CommandTag::StringRead]
    );
    let def = registry.get("std_msgs/Header").expect("definition should exist");
    assert!(matches!(def.commands()[0].kind, CommandKind::FixedRead { size: 12 }));
    assert_eq!(def.commands()[0].label, "seq(uint32)+stamp(time)");
    assert_eq!(def.commands()[1].label, "frame_id(string)");
}

#[test]
fn merges_constant_arrays_of_primitives_into_one_read() {
    let mut registry = DefinitionRegistry::new();
    let def = registry.create("msgs/Vec4");
    def.add_field("int16", "v", true, 4);

    assert_eq!(
        flatten(&mut registry, "msgs/Vec4"),
        vec![CommandTag::ConstantArray, CommandTag::FixedRead]
    );
    let def = registry.get("msgs/Vec4").expect("definition should exist");
    let CommandKind::ConstantArray {
        size,
        length,
        ref subcommands,
    } = def.commands()[0].kind
    else {
        panic!("expected a constant array command");
    };
    assert_eq!(size, 2);
    assert_eq!(length, 4);
    assert!(matches!(subcommands[0].kind, CommandKind::FixedRead { size: 8 }));
}

#[test]
fn compiles_dynamic_arrays_of_constant_size_elements_to_bulk_reads() {
    let mut registry = DefinitionRegistry::new();
    let bytes = registry.create("fake_msgs/HasByteArray");
    bytes.add_field("uint8", "byte_array", true, -1);
    let points = registry.create("msgs/Cloud");
    points.add_field("msgs/Point", "points", true, -1);
    let point = registry.create("msgs/Point");
    point.add_field("float64", "x", false, -1);
    point.add_field("float64", "y", false, -1);
    registry.finalize_all().expect("finalize should succeed");

    let bytes = registry
        .get("fake_msgs/HasByteArray")
        .expect("definition should exist");
    assert_eq!(bytes.flatten_commands(), vec![CommandTag::DynamicRead]);
    assert!(matches!(bytes.commands()[0].kind, CommandKind::DynamicRead { size: 1 }));

    let cloud = registry.get("msgs/Cloud").expect("definition should exist");
    assert_eq!(cloud.flatten_commands(), vec![CommandTag::DynamicRead]);
    assert!(matches!(cloud.commands()[0].kind, CommandKind::DynamicRead { size: 16 }));
}

#[test]
fn wraps_string_elements_of_dynamic_arrays() {
    let mut registry = DefinitionRegistry::new();
    let def = registry.create("msgs/StringList");
    def.add_field("string", "xs", true, -1);

    assert_eq!(
        flatten(&mut registry, "msgs/StringList"),
        vec![CommandTag::DynamicArray, CommandTag::StringRead]
    );
}

#[test]
fn unrolls_constant_arrays_of_strings() {
    let mut registry = DefinitionRegistry::new();
    let def = registry.create("msgs/Tags");
    def.add_field("string", "tags", true, 3);

    assert_eq!(
        flatten(&mut registry, "msgs/Tags"),
        vec![
            CommandTag::ConstantArray,
            CommandTag::StringRead,
            CommandTag::StringRead,
            CommandTag::StringRead
        ]
    );
}

#[test]
fn compiles_dynamic_arrays_of_variable_size_records() {
    let mut registry = DefinitionRegistry::new();
    let item = registry.create("msgs/Item");
    item.add_field("uint32", "id", false, -1);
    item.add_field("string", "name", false, -1);
    let list = registry.create("msgs/ItemList");
    list.add_field("msgs/Item", "items", true, -1);

    assert_eq!(
        flatten(&mut registry, "msgs/ItemList"),
        vec![
            CommandTag::DynamicArray,
            CommandTag::FixedRead,
            CommandTag::StringRead
        ]
    );
}

#[test]
fn merges_fixed_reads_across_unrolled_element_boundaries() {
    // Element layout: fixed / string / fixed. Unrolling two elements puts
    // the trailing fixed read of one element next to the leading fixed read
    // of the next, and the optimizer fuses them.
    let mut registry = DefinitionRegistry::new();
    let elem = registry.create("msgs/Span");
    elem.add_field("int32", "start", false, -1);
    elem.add_field("string", "label", false, -1);
    elem.add_field("int32", "end", false, -1);
    let def = registry.create("msgs/TwoSpans");
    def.add_field("msgs/Span", "spans", true, 2);

    assert_eq!(
        flatten(&mut registry, "msgs/TwoSpans"),
        vec![
            CommandTag::ConstantArray,
            CommandTag::FixedRead,
            CommandTag::StringRead,
            CommandTag::FixedRead,
            CommandTag::StringRead,
            CommandTag::FixedRead
        ]
    );
    let def = registry.get("msgs/TwoSpans").expect("definition should exist");
    let subcommands = def.commands()[0].subcommands();
    // end(...) of element 0 fused with start(...) of element 1.
    assert!(matches!(subcommands[2].kind, CommandKind::FixedRead { size: 8 }));
}

#[test]
fn primitives_compile_to_empty_command_buffers() {
    let mut registry = DefinitionRegistry::new();
    registry.finalize_all().expect("finalize should succeed");
    let def = registry.get("uint32").expect("primitive should be seeded");
    assert!(def.flatten_commands().is_empty());
}

#[test]
fn leaves_no_adjacent_fixed_reads_anywhere() {
    let mut registry = DefinitionRegistry::new();
    let header = registry.create("std_msgs/Header");
    header.add_field("uint32", "seq", false, -1);
    header.add_field("time", "stamp", false, -1);
    header.add_field("string", "frame_id", false, -1);
    let elem = registry.create("msgs/Span");
    elem.add_field("int32", "start", false, -1);
    elem.add_field("string", "label", false, -1);
    elem.add_field("int32", "end", false, -1);
    let big = registry.create("msgs/Everything");
    big.add_field("std_msgs/Header", "header", false, -1);
    big.add_field("msgs/Span", "spans", true, 3);
    big.add_field("float64", "x", false, -1);
    big.add_field("float64", "y", false, -1);
    big.add_field("msgs/Span", "extra", true, -1);
    registry.finalize_all().expect("finalize should succeed");

    let def = registry.get("msgs/Everything").expect("definition should exist");
    assert_no_adjacent_fixed_reads(def.commands());
}
