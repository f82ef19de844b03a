//! Tests for building a database from encoded DWARF sections

use std::collections::HashMap;
use std::sync::Arc;

use gimli::write::{Address as WriteAddress, AttributeValue, DwarfUnit, EndianVec, Expression, Sections, Unit, UnitEntryId};
use gimli::{DwAt, DwTag, Encoding, Format, LittleEndian, RunTimeEndian, SectionId};
use mirror_core::prelude::*;
use mirror_core::source::{DebugSource, DwarfSource};

fn add(unit: &mut Unit, parent: UnitEntryId, tag: DwTag, attrs: Vec<(DwAt, AttributeValue)>) -> UnitEntryId
{
    let id = unit.add(parent, tag);
    let entry = unit.get_mut(id);
    for (name, value) in attrs {
        entry.set(name, value);
    }
    id
}

fn name(text: &str) -> (DwAt, AttributeValue)
{
    (gimli::DW_AT_name, AttributeValue::String(text.as_bytes().to_vec()))
}

fn size(bytes: u64) -> (DwAt, AttributeValue)
{
    (gimli::DW_AT_byte_size, AttributeValue::Udata(bytes))
}

fn type_ref(target: UnitEntryId) -> (DwAt, AttributeValue)
{
    (gimli::DW_AT_type, AttributeValue::UnitRef(target))
}

fn decl(line: u64) -> Vec<(DwAt, AttributeValue)>
{
    vec![
        (gimli::DW_AT_decl_file, AttributeValue::Udata(1)),
        (gimli::DW_AT_decl_line, AttributeValue::Udata(line)),
    ]
}

fn address_expression(address: u64) -> AttributeValue
{
    let mut expression = Expression::new();
    expression.op_addr(WriteAddress::Constant(address));
    AttributeValue::Exprloc(expression)
}

/// Encode one compilation unit:
///
/// ```c++
/// namespace geo { struct Point { int x; int y; }; }
/// class Shape { virtual double area(); int id(); };
/// int Shape::id() { ... }          // at 0x4000
/// enum Sign : short { Minus = -1, Plus = 1 };
/// int counter;                     // at 0x8000
/// ```
///
/// `counter` carries a `mirror_annotation_` declaration on the line before.
fn encode() -> HashMap<SectionId, Vec<u8>>
{
    let encoding = Encoding {
        format: Format::Dwarf32,
        version: 4,
        address_size: 8,
    };
    let mut dwarf = DwarfUnit::new(encoding);
    let unit = &mut dwarf.unit;
    let root = unit.root();

    let int = add(unit, root, gimli::DW_TAG_base_type, vec![name("int"), size(4)]);
    let double = add(unit, root, gimli::DW_TAG_base_type, vec![name("double"), size(8)]);
    let short = add(unit, root, gimli::DW_TAG_base_type, vec![name("short int"), size(2)]);

    let geo = add(unit, root, gimli::DW_TAG_namespace, vec![name("geo")]);
    let point = add(unit, geo, gimli::DW_TAG_structure_type, vec![name("Point"), size(8)]);
    for (field, offset) in [("x", 0), ("y", 4)] {
        add(
            unit,
            point,
            gimli::DW_TAG_member,
            vec![
                name(field),
                type_ref(int),
                (gimli::DW_AT_data_member_location, AttributeValue::Udata(offset)),
            ],
        );
    }

    let shape = add(unit, root, gimli::DW_TAG_class_type, vec![name("Shape"), size(16)]);
    let this = add(unit, root, gimli::DW_TAG_pointer_type, vec![type_ref(shape), size(8)]);

    let mut slot = Expression::new();
    slot.op_constu(2);
    let area = add(
        unit,
        shape,
        gimli::DW_TAG_subprogram,
        vec![
            name("area"),
            type_ref(double),
            (gimli::DW_AT_virtuality, AttributeValue::Virtuality(gimli::DW_VIRTUALITY_virtual)),
            (gimli::DW_AT_vtable_elem_location, AttributeValue::Exprloc(slot)),
            (gimli::DW_AT_declaration, AttributeValue::Flag(true)),
        ],
    );
    add(
        unit,
        area,
        gimli::DW_TAG_formal_parameter,
        vec![type_ref(this), (gimli::DW_AT_artificial, AttributeValue::Flag(true))],
    );

    let id = add(
        unit,
        shape,
        gimli::DW_TAG_subprogram,
        vec![
            name("id"),
            type_ref(int),
            (gimli::DW_AT_declaration, AttributeValue::Flag(true)),
            (gimli::DW_AT_linkage_name, AttributeValue::String(b"_ZN5Shape2idEv".to_vec())),
        ],
    );
    add(
        unit,
        id,
        gimli::DW_TAG_formal_parameter,
        vec![type_ref(this), (gimli::DW_AT_artificial, AttributeValue::Flag(true))],
    );

    add(
        unit,
        root,
        gimli::DW_TAG_subprogram,
        vec![
            (gimli::DW_AT_specification, AttributeValue::UnitRef(id)),
            (gimli::DW_AT_low_pc, AttributeValue::Address(WriteAddress::Constant(0x4000))),
        ],
    );

    let sign = add(unit, root, gimli::DW_TAG_enumeration_type, vec![name("Sign"), size(2), type_ref(short)]);
    add(
        unit,
        sign,
        gimli::DW_TAG_enumerator,
        vec![name("Minus"), (gimli::DW_AT_const_value, AttributeValue::Sdata(-1))],
    );
    add(
        unit,
        sign,
        gimli::DW_TAG_enumerator,
        vec![name("Plus"), (gimli::DW_AT_const_value, AttributeValue::Udata(1))],
    );

    let mut annotation = vec![
        name("mirror_annotation_counter"),
        type_ref(int),
        (gimli::DW_AT_const_value, AttributeValue::Udata(12)),
    ];
    annotation.extend(decl(20));
    add(unit, root, gimli::DW_TAG_variable, annotation);

    let mut counter = vec![name("counter"), type_ref(int), (gimli::DW_AT_location, address_expression(0x8000))];
    counter.extend(decl(21));
    add(unit, root, gimli::DW_TAG_variable, counter);

    write_sections(&mut dwarf)
}

fn write_sections(dwarf: &mut DwarfUnit) -> HashMap<SectionId, Vec<u8>>
{
    let mut sections = Sections::new(EndianVec::new(LittleEndian));
    dwarf.write(&mut sections).unwrap();

    let mut encoded = HashMap::new();
    sections
        .for_each(|id, data| {
            encoded.insert(id, data.slice().to_vec());
            Ok::<(), gimli::write::Error>(())
        })
        .unwrap();
    encoded
}

fn source(encoded: &HashMap<SectionId, Vec<u8>>) -> DwarfSource
{
    DwarfSource::load(RunTimeEndian::Little, |id| {
        encoded
            .get(&id)
            .map(|bytes| Arc::<[u8]>::from(bytes.as_slice()))
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()))
    })
    .unwrap()
}

fn load() -> DwarfSource
{
    source(&encode())
}

/// `int`, then a variable whose location expression cannot be decoded, then
/// `struct Point { int x; }` and a well-formed global.
fn encode_with_bad_location() -> HashMap<SectionId, Vec<u8>>
{
    let mut dwarf = DwarfUnit::new(Encoding {
        format: Format::Dwarf32,
        version: 4,
        address_size: 8,
    });
    let unit = &mut dwarf.unit;
    let root = unit.root();

    let int = add(unit, root, gimli::DW_TAG_base_type, vec![name("int"), size(4)]);
    add(
        unit,
        root,
        gimli::DW_TAG_variable,
        vec![
            name("weird"),
            type_ref(int),
            (gimli::DW_AT_location, AttributeValue::Exprloc(Expression::raw(vec![0xff]))),
        ],
    );
    let point = add(unit, root, gimli::DW_TAG_structure_type, vec![name("Point"), size(4)]);
    add(
        unit,
        point,
        gimli::DW_TAG_member,
        vec![
            name("x"),
            type_ref(int),
            (gimli::DW_AT_data_member_location, AttributeValue::Udata(0)),
        ],
    );
    add(
        unit,
        root,
        gimli::DW_TAG_variable,
        vec![name("ok"), type_ref(int), (gimli::DW_AT_location, address_expression(0x9000))],
    );

    write_sections(&mut dwarf)
}

#[test]
fn test_dwarf_source_reads_unit_headers()
{
    let source = load();
    assert_eq!(source.unit_count(), 1);
    assert_eq!(source.pointer_size(), 8);
    assert_eq!(source.units().unwrap().len(), 1);
}

#[test]
fn test_records_and_namespaces_from_dwarf()
{
    let db = Database::build(&load(), &BuildOptions::default()).unwrap();

    let point = db.type_of("geo::Point").unwrap().record().unwrap();
    assert_eq!(point.size(), 8);
    assert_eq!(point.field("y").unwrap().offset(), 4);
    assert_eq!(point.field("y").unwrap().ty().name(), "int");
    assert_eq!(db.namespace("geo").unwrap().nested_types().count(), 1);
}

#[test]
fn test_methods_from_dwarf()
{
    let db = Database::build(&load(), &BuildOptions::default()).unwrap();
    let shape = db.type_of("class Shape").unwrap().record().unwrap();

    let area = shape.method("area").unwrap();
    assert_eq!(area.vtable_index(), Some(2));
    assert_eq!(area.address(), None);
    assert_eq!(area.return_type().name(), "double");

    let id = shape.method("id").unwrap();
    assert_eq!(id.address(), Some(Address::new(0x4000)));
    assert_eq!(id.parameters().count(), 0);
    assert_eq!(id.linkage_name().unwrap().raw(), "_ZN5Shape2idEv");
    assert_eq!(db.function_at(Address::new(0x4000)).unwrap().name(), "id");
}

#[test]
fn test_enum_constants_from_dwarf()
{
    let db = Database::build(&load(), &BuildOptions::default()).unwrap();
    let sign = db.type_of("Sign").unwrap().enumeration().unwrap();

    assert_eq!(sign.value("Minus").unwrap().get::<i16>().unwrap(), -1);
    assert_eq!(sign.value("Plus").unwrap().get::<i16>().unwrap(), 1);
}

#[test]
fn test_variables_and_annotations_from_dwarf()
{
    let db = Database::build(&load(), &BuildOptions::default()).unwrap();
    let counter = db.root_namespace().variable("counter").unwrap();

    assert_eq!(counter.address(), Address::new(0x8000));
    let annotation = counter.annotation("int").unwrap();
    assert_eq!(annotation.payload(), &AnnotationPayload::Inline(12i32.to_le_bytes().to_vec()));
    assert_eq!(db.stats().annotations_attached, 1);
    assert_eq!(db.stats().units, 1);
}

#[test]
fn test_undecodable_attribute_skips_only_its_entry()
{
    let db = Database::build(&source(&encode_with_bad_location()), &BuildOptions::default()).unwrap();

    assert_eq!(db.stats().units_abandoned, 0);
    assert_eq!(db.type_of("int").unwrap().size(), 4);
    assert_eq!(db.type_of("Point").unwrap().record().unwrap().field("x").unwrap().offset(), 0);

    let root = db.root_namespace();
    assert!(root.variable("weird").unwrap_err().is_not_found());
    assert_eq!(root.variable("ok").unwrap().address(), Address::new(0x9000));
}
