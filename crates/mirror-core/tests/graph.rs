//! Tests for graph construction: types, scopes, members and lookups

use mirror_core::prelude::*;
use mirror_core::source::{DebugSource, Entry, EntryOffset, MemorySource, RunTimeEndian, Tag};

fn build(source: &MemorySource) -> Database
{
    Database::build(source, &BuildOptions::default()).unwrap()
}

fn base(source: &mut MemorySource, parent: EntryOffset, name: &str, size: u64) -> EntryOffset
{
    source.add(parent, Tag::BaseType).with_name(name).with_byte_size(size).offset()
}

fn point(source: &mut MemorySource, parent: EntryOffset, int: EntryOffset) -> EntryOffset
{
    let point = source
        .add(parent, Tag::StructureType)
        .with_name("Point")
        .with_byte_size(8)
        .offset();
    source.add(point, Tag::Member).with_name("x").with_type(int).with_member_offset(0);
    source.add(point, Tag::Member).with_name("y").with_type(int).with_member_offset(4);
    point
}

#[test]
fn test_record_fields_and_offsets()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let int = base(&mut source, unit, "int", 4);
    point(&mut source, unit, int);

    let db = build(&source);
    let point = db.type_of("Point").unwrap().record().unwrap();
    assert_eq!(point.size(), 8);
    assert_eq!(point.layout(), RecordLayout::Struct);
    assert_eq!(point.field_count(), 2);

    let names: Vec<&str> = point.fields().map(|field| field.name()).collect();
    assert_eq!(names, vec!["x", "y"]);
    assert_eq!(point.field("x").unwrap().offset(), 0);
    assert_eq!(point.field("y").unwrap().offset(), 4);
    assert_eq!(point.field("y").unwrap().full_name(), "::Point::y");
    assert_eq!(point.field("y").unwrap().ty().name(), "int");
    assert_eq!(point.field("y").unwrap().owner(), point);
}

#[test]
fn test_type_lookup_accepts_qualified_and_keyword_names()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let int = base(&mut source, unit, "int", 4);
    point(&mut source, unit, int);

    let db = build(&source);
    let by_name = db.type_of("Point").unwrap();
    assert_eq!(by_name.full_name(), "::Point");
    assert_eq!(db.type_of("::Point").unwrap(), by_name);
    assert_eq!(db.type_of("struct Point").unwrap(), by_name);
    assert_eq!(db.type_of("  Point ").unwrap(), by_name);
    assert!(db.type_of("class Point").unwrap_err().is_not_found());
}

#[test]
fn test_missing_type_is_not_found()
{
    let mut source = MemorySource::default();
    source.unit();

    let db = build(&source);
    let err = db.type_of("Nowhere").unwrap_err();
    assert!(err.is_not_found());
    let message = format!("{}", err);
    assert!(message.contains("Nowhere"));
}

#[test]
fn test_namespaces_merge_across_units()
{
    let mut source = MemorySource::default();

    let first = source.unit();
    let int = base(&mut source, first, "int", 4);
    let geo = source.add(first, Tag::Namespace).with_name("geo").offset();
    point(&mut source, geo, int);

    let second = source.unit();
    let geo = source.add(second, Tag::Namespace).with_name("geo").offset();
    source.add(geo, Tag::StructureType).with_name("Line").with_byte_size(16);

    let db = build(&source);
    let geo = db.namespace("geo").unwrap();
    assert_eq!(db.namespace("::geo").unwrap(), geo);
    assert_eq!(geo.full_name(), "::geo");
    assert!(!geo.is_root());
    assert!(geo.parent().unwrap().is_root());

    let nested: Vec<&str> = geo.nested_types().map(|ty| ty.name()).collect();
    assert_eq!(nested, vec!["Point", "Line"]);
    assert_eq!(db.root_namespace().namespaces().count(), 1);

    let point = db.type_of("geo::Point").unwrap();
    assert_eq!(point.full_name(), "::geo::Point");
    assert_eq!(point.parent().unwrap().as_namespace().unwrap(), geo);
    assert_eq!(db.type_of("::geo::Line").unwrap().size(), 16);
    assert!(db.namespace("geo::missing").unwrap_err().is_not_found());
}

#[test]
fn test_nested_namespaces_reopened_in_two_units()
{
    let mut source = MemorySource::default();
    for _ in 0..2 {
        let unit = source.unit();
        let foo = source.add(unit, Tag::Namespace).with_name("Foo").offset();
        source.add(foo, Tag::Namespace).with_name("Bar");
    }

    let db = build(&source);
    let root = db.root_namespace();
    assert_eq!(root.namespaces().count(), 1);
    let foo = root.nested_namespace("Foo").unwrap();
    assert_eq!(foo.namespaces().count(), 1);
    let bar = foo.nested_namespace("Bar").unwrap();
    assert_eq!(bar.full_name(), "::Foo::Bar");
    assert_eq!(db.namespace("Foo::Bar").unwrap(), bar);
    assert!(foo.nested_namespace("Baz").unwrap_err().is_not_found());
}

#[test]
fn test_anonymous_namespace_is_transparent()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let hidden = source.add(unit, Tag::Namespace).offset();
    source.add(hidden, Tag::StructureType).with_name("Hidden").with_byte_size(1);

    let db = build(&source);
    let ty = db.type_of("Hidden").unwrap();
    assert_eq!(ty.full_name(), "::Hidden");
    assert!(ty.parent().unwrap().as_namespace().unwrap().is_root());
    assert_eq!(db.root_namespace().namespaces().count(), 0);
}

#[test]
fn test_enum_constants_are_sized_to_the_enum()
{
    let mut source = MemorySource::new(8, RunTimeEndian::Little);
    let unit = source.unit();
    let color = source
        .add(unit, Tag::EnumerationType)
        .with_name("Color")
        .with_byte_size(4)
        .offset();
    source.add(color, Tag::Enumerator).with_name("Red").with_const_value(0);
    source.add(color, Tag::Enumerator).with_name("Green").with_const_value(1);

    let db = build(&source);
    let color = db.type_of("enum Color").unwrap().enumeration().unwrap();
    assert_eq!(color.size(), 4);
    assert_eq!(color.constants().count(), 2);

    let green = color.value("Green").unwrap();
    assert_eq!(green.bytes(), &[1, 0, 0, 0]);
    assert_eq!(green.get::<i32>().unwrap(), 1);
    assert_eq!(green.full_name(), "::Color::Green");
    assert_eq!(green.owner().as_type(), color.as_type());

    match green.get::<i64>() {
        Err(MirrorError::SizeMismatch { expected, actual }) => {
            assert_eq!(expected, 8);
            assert_eq!(actual, 4);
        }
        other => panic!("Expected SizeMismatch, got {:?}", other.map(|_| ())),
    }
    assert!(color.value("Blue").unwrap_err().is_not_found());
}

#[test]
fn test_signed_enumerator_in_narrow_enum()
{
    let mut source = MemorySource::new(8, RunTimeEndian::Little);
    let unit = source.unit();
    let small = source
        .add(unit, Tag::EnumerationType)
        .with_name("Small")
        .with_byte_size(2)
        .offset();
    source.add(small, Tag::Enumerator).with_name("Neg").with_signed_const_value(-1);

    let db = build(&source);
    let neg = db.type_of("Small").unwrap().enumeration().unwrap().value("Neg").unwrap();
    assert_eq!(neg.bytes(), &[0xff, 0xff]);
    assert_eq!(neg.get::<i16>().unwrap(), -1);
}

#[test]
fn test_enumerator_of_unsupported_width_is_skipped()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let odd = source
        .add(unit, Tag::EnumerationType)
        .with_name("Odd")
        .with_byte_size(3)
        .offset();
    source.add(odd, Tag::Enumerator).with_name("A").with_const_value(1);

    let db = build(&source);
    let odd = db.type_of("Odd").unwrap().enumeration().unwrap();
    assert_eq!(odd.constants().count(), 0);
    assert!(db.stats().entries_skipped >= 1);
}

#[test]
fn test_repeated_references_resolve_to_one_node()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let int = base(&mut source, unit, "int", 4);
    let point = point(&mut source, unit, int);
    let line = source
        .add(unit, Tag::StructureType)
        .with_name("Line")
        .with_byte_size(16)
        .offset();
    source.add(line, Tag::Member).with_name("from").with_type(point).with_member_offset(0);
    source.add(line, Tag::Member).with_name("to").with_type(point).with_member_offset(8);

    let db = build(&source);
    let line = db.type_of("Line").unwrap().record().unwrap();
    let from = line.field("from").unwrap().ty();
    let to = line.field("to").unwrap().ty();
    assert_eq!(from.id(), to.id());
    assert_eq!(from.id(), db.type_of("Point").unwrap().id());
    assert!(db.stats().cache_hits > 0);
    assert_eq!(db.types().filter(|ty| ty.name() == "Point").count(), 1);
}

#[test]
fn test_primitive_spellings_are_normalized()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    base(&mut source, unit, "long unsigned int", 8);
    base(&mut source, unit, "char", 1);
    base(&mut source, unit, "signed char", 1);
    base(&mut source, unit, "unsigned char", 1);

    let db = build(&source);
    let ulong = db.type_of("long unsigned int").unwrap();
    assert_eq!(db.type_of("unsigned long").unwrap().id(), ulong.id());
    assert_eq!(db.type_of("unsigned long int").unwrap().id(), ulong.id());
    assert_eq!(ulong.primitive_kind(), Some(PrimitiveKind::UnsignedLong));
    assert_eq!(ulong.category(), TypeCategory::Primitive(PrimitiveKind::UnsignedLong));

    let plain = db.type_of("char").unwrap().id();
    let signed = db.type_of("signed char").unwrap().id();
    let unsigned = db.type_of("unsigned char").unwrap().id();
    assert_ne!(plain, signed);
    assert_ne!(plain, unsigned);
    assert_ne!(signed, unsigned);
}

#[test]
fn test_void_is_always_present()
{
    let mut source = MemorySource::default();
    source.unit();

    let db = build(&source);
    let void = db.type_of("void").unwrap();
    assert_eq!(void.size(), 0);
    assert_eq!(void.primitive_kind(), Some(PrimitiveKind::Void));
}

#[test]
fn test_pointer_types()
{
    let mut source = MemorySource::new(4, RunTimeEndian::Little);
    let unit = source.unit();
    let int = base(&mut source, unit, "int", 4);
    source.add(unit, Tag::PointerType).with_type(int).with_byte_size(4);
    source.add(unit, Tag::PointerType).with_byte_size(4);

    let db = build(&source);
    let int_ptr = db.type_of("int*").unwrap();
    assert!(int_ptr.is_pointer());
    assert_eq!(int_ptr.size(), 4);
    assert_eq!(int_ptr.category(), TypeCategory::Pointer);
    assert_eq!(int_ptr.pointee().unwrap(), db.type_of("int").unwrap());

    let void_ptr = db.type_of("void*").unwrap();
    assert_eq!(void_ptr.pointee().unwrap().name(), "void");
    assert!(db.type_of("int").unwrap().pointee().is_none());
}

#[test]
fn test_pointer_without_size_is_skipped()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let byte = base(&mut source, unit, "char", 1);
    source.add(unit, Tag::PointerType).with_type(byte);

    let db = build(&source);
    assert!(db.type_of("char*").unwrap_err().is_not_found());
    assert!(db.stats().entries_skipped >= 1);
}

#[test]
fn test_const_and_alias_without_underlying_type_are_skipped()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let bare_const = source.add(unit, Tag::ConstType).offset();
    source.add(unit, Tag::Typedef).with_name("Nothing");
    source.add(unit, Tag::PointerType).with_type(bare_const).with_byte_size(8);

    let db = build(&source);
    assert!(db.type_of("void const").unwrap_err().is_not_found());
    assert!(db.type_of("void const*").unwrap_err().is_not_found());
    assert!(db.type_of("Nothing").unwrap_err().is_not_found());
    assert!(db.stats().entries_skipped >= 3);
}

#[test]
fn test_const_alias_and_volatile()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let int = base(&mut source, unit, "int", 4);
    let double = base(&mut source, unit, "double", 8);
    source.add(unit, Tag::ConstType).with_type(int);
    let meters = source.add(unit, Tag::Typedef).with_name("Meters").with_type(double).offset();
    let volatile = source.add(unit, Tag::VolatileType).with_type(int).offset();
    let sample = source
        .add(unit, Tag::StructureType)
        .with_name("Sample")
        .with_byte_size(16)
        .offset();
    source.add(sample, Tag::Member).with_name("flag").with_type(volatile).with_member_offset(0);
    source.add(sample, Tag::Member).with_name("length").with_type(meters).with_member_offset(8);

    let db = build(&source);
    let const_int = db.type_of("int const").unwrap();
    assert_eq!(const_int.category(), TypeCategory::Const);
    assert_eq!(const_int.size(), 4);
    assert_eq!(const_int.underlying().unwrap(), db.type_of("int").unwrap());

    let meters = db.type_of("Meters").unwrap();
    assert_eq!(meters.category(), TypeCategory::Alias);
    assert_eq!(meters.size(), 8);
    assert_eq!(meters.strip(), db.type_of("double").unwrap());

    let sample = db.type_of("Sample").unwrap().record().unwrap();
    assert_eq!(sample.field("flag").unwrap().ty().name(), "int");
    assert_eq!(sample.field("length").unwrap().size(), 8);
}

#[test]
fn test_null_pointer_type_takes_pointer_size()
{
    let mut source = MemorySource::new(4, RunTimeEndian::Little);
    let unit = source.unit();
    source.add(unit, Tag::UnspecifiedType).with_name("decltype(nullptr)");

    let db = build(&source);
    let nullptr = db.type_of("decltype(nullptr)").unwrap();
    assert_eq!(nullptr.category(), TypeCategory::Unspecified);
    assert_eq!(nullptr.size(), 4);
}

#[test]
fn test_supertypes_and_transitive_ancestors()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let a = source.add(unit, Tag::ClassType).with_name("A").with_byte_size(4).offset();
    let b = source.add(unit, Tag::ClassType).with_name("B").with_byte_size(8).offset();
    let b_alias = source.add(unit, Tag::Typedef).with_name("BAlias").with_type(b).offset();
    let c = source.add(unit, Tag::ClassType).with_name("C").with_byte_size(12).offset();
    source.add(c, Tag::Inheritance).with_type(b_alias).with_member_offset(0);
    source.add(b, Tag::Inheritance).with_type(a).with_member_offset(0);

    let db = build(&source);
    let a = db.type_of("A").unwrap();
    let b = db.type_of("B").unwrap();
    let c = db.type_of("class C").unwrap().record().unwrap();

    let direct: Vec<&str> = c.supertypes().map(|base| base.name()).collect();
    assert_eq!(direct, vec!["B"]);
    assert!(c.is_ancestor(&b));
    assert!(c.is_ancestor(&a));
    assert_eq!(c.ancestors().count(), 2);
    assert!(!a.record().unwrap().is_ancestor(&c.as_type()));
    assert!(!c.is_ancestor(&c.as_type()));
}

#[test]
fn test_forward_reference_is_attached_when_declared()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let int = base(&mut source, unit, "int", 4);
    let holder = source
        .add(unit, Tag::StructureType)
        .with_name("Holder")
        .with_byte_size(8)
        .offset();
    let later = source
        .add(unit, Tag::StructureType)
        .with_name("Later")
        .with_byte_size(8)
        .offset();
    source.add(later, Tag::Member).with_name("value").with_type(int).with_member_offset(0);
    source.add(holder, Tag::Member).with_name("later").with_type(later).with_member_offset(0);

    let db = build(&source);
    let later = db.type_of("Later").unwrap();
    assert!(later.parent().unwrap().as_namespace().unwrap().is_root());
    assert_eq!(later.record().unwrap().field_count(), 1);
    let through_field = db.type_of("Holder").unwrap().record().unwrap().field("later").unwrap().ty();
    assert_eq!(through_field.id(), later.id());
}

#[test]
fn test_type_reached_only_by_reference_is_detached()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let opaque_scope = source.add(unit, Tag::Other(0x4109)).offset();
    let ghost = source
        .add(opaque_scope, Tag::StructureType)
        .with_name("Ghost")
        .with_byte_size(4)
        .offset();
    let visible = source
        .add(unit, Tag::StructureType)
        .with_name("Visible")
        .with_byte_size(4)
        .offset();
    source.add(visible, Tag::Member).with_name("ghost").with_type(ghost).with_member_offset(0);

    let db = build(&source);
    let ghost = db.type_of("Visible").unwrap().record().unwrap().field("ghost").unwrap().ty();
    assert_eq!(ghost.name(), "Ghost");
    match ghost.parent() {
        Err(MirrorError::Detached(name)) => assert_eq!(name, "Ghost"),
        other => panic!("Expected Detached, got {:?}", other.map(|_| ())),
    }
    assert!(db.type_of("Ghost").unwrap_err().is_not_found());
}

#[test]
fn test_anonymous_records_get_numbered_names()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    source.add(unit, Tag::StructureType).with_byte_size(4);
    source.add(unit, Tag::UnionType).with_byte_size(8);

    let db = build(&source);
    assert_eq!(db.type_of("anonymous#0").unwrap().size(), 4);
    let second = db.type_of("anonymous#1").unwrap();
    assert_eq!(second.category(), TypeCategory::Record(RecordLayout::Union));
}

#[test]
fn test_union_members_default_to_offset_zero()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let int = base(&mut source, unit, "int", 4);
    let double = base(&mut source, unit, "double", 8);
    let value = source
        .add(unit, Tag::UnionType)
        .with_name("Value")
        .with_byte_size(8)
        .offset();
    source.add(value, Tag::Member).with_name("i").with_type(int);
    source.add(value, Tag::Member).with_name("d").with_type(double);

    let db = build(&source);
    let value = db.type_of("union Value").unwrap().record().unwrap();
    assert_eq!(value.field("i").unwrap().offset(), 0);
    assert_eq!(value.field("d").unwrap().offset(), 0);
}

#[test]
fn test_struct_member_without_offset_is_skipped()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let int = base(&mut source, unit, "int", 4);
    let broken = source
        .add(unit, Tag::StructureType)
        .with_name("Broken")
        .with_byte_size(4)
        .offset();
    source.add(broken, Tag::Member).with_name("lost").with_type(int);

    let db = build(&source);
    let broken = db.type_of("Broken").unwrap().record().unwrap();
    assert_eq!(broken.field_count(), 0);
    assert!(broken.field("lost").unwrap_err().is_not_found());
}

#[test]
fn test_declaration_never_replaces_definition()
{
    let mut source = MemorySource::default();

    let first = source.unit();
    source.add(first, Tag::StructureType).with_name("Opaque").declaration();
    source.add(first, Tag::StructureType).with_name("Settled").with_byte_size(2);

    let second = source.unit();
    let int = base(&mut source, second, "int", 4);
    let opaque = source
        .add(second, Tag::StructureType)
        .with_name("Opaque")
        .with_byte_size(16)
        .offset();
    source.add(opaque, Tag::Member).with_name("data").with_type(int).with_member_offset(0);
    source.add(second, Tag::StructureType).with_name("Settled").declaration();

    let db = build(&source);
    let opaque = db.type_of("Opaque").unwrap();
    assert!(!opaque.is_declaration());
    assert_eq!(opaque.size(), 16);
    assert_eq!(opaque.record().unwrap().field_count(), 1);

    let settled = db.type_of("Settled").unwrap();
    assert!(!settled.is_declaration());
    assert_eq!(settled.size(), 2);
}

#[test]
fn test_same_type_from_two_units_compares_equal()
{
    let mut source = MemorySource::default();

    let first = source.unit();
    let int = base(&mut source, first, "int", 4);
    point(&mut source, first, int);

    let second = source.unit();
    let int = base(&mut source, second, "int", 4);
    let other_point = point(&mut source, second, int);
    let line = source
        .add(second, Tag::StructureType)
        .with_name("Line")
        .with_byte_size(16)
        .offset();
    source.add(line, Tag::Member).with_name("from").with_type(other_point).with_member_offset(0);

    let db = build(&source);
    let registered = db.type_of("Point").unwrap();
    let from = db.type_of("Line").unwrap().record().unwrap().field("from").unwrap().ty();
    assert_ne!(from.id(), registered.id());
    assert_eq!(from, registered);
    assert_ne!(db.type_of("Line").unwrap(), registered);
}

#[test]
fn test_nested_type_inside_record()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let outer = source
        .add(unit, Tag::StructureType)
        .with_name("Outer")
        .with_byte_size(4)
        .offset();
    source.add(outer, Tag::StructureType).with_name("Inner").with_byte_size(2);

    let db = build(&source);
    let outer = db.type_of("Outer").unwrap().record().unwrap();
    let inner = outer.nested_type("Inner").unwrap();
    assert_eq!(inner.full_name(), "::Outer::Inner");
    assert_eq!(db.type_of("Outer::Inner").unwrap(), inner);
    assert_eq!(inner.parent().unwrap().as_record().unwrap(), outer);
    assert_eq!(outer.field_count(), 0);
}

/// Builds `class Shape` with a virtual method, an out-of-line method
/// definition and a method taking an unnamed parameter.
fn shape_source() -> MemorySource
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let int = base(&mut source, unit, "int", 4);
    let double = base(&mut source, unit, "double", 8);
    let shape = source
        .add(unit, Tag::ClassType)
        .with_name("Shape")
        .with_byte_size(16)
        .offset();
    let this = source.add(unit, Tag::PointerType).with_type(shape).with_byte_size(8).offset();

    source.add(shape, Tag::Member).with_name("id_").with_type(int).with_member_offset(8);

    let area = source
        .add(shape, Tag::Subprogram)
        .with_name("area")
        .with_type(double)
        .with_vtable_slot(2)
        .offset();
    source.add(area, Tag::FormalParameter).with_type(this).artificial();

    let id = source
        .add(shape, Tag::Subprogram)
        .with_name("id")
        .with_type(int)
        .with_linkage_name("_ZNK5Shape2idEv")
        .offset();
    source.add(id, Tag::FormalParameter).with_type(this).artificial();

    let scale = source
        .add(shape, Tag::Subprogram)
        .with_name("scale")
        .with_low_pc(0x4100)
        .offset();
    source.add(scale, Tag::FormalParameter).with_type(this).artificial();
    source.add(scale, Tag::FormalParameter).with_name("factor").with_type(double);
    source.add(scale, Tag::FormalParameter).with_type(int);

    source.add(unit, Tag::Subprogram).with_specification(id).with_low_pc(0x4000);
    source.add(unit, Tag::Subprogram).with_specification(area).with_low_pc(0x4200);
    source
}

#[test]
fn test_virtual_method_has_slot_and_no_address()
{
    let db = build(&shape_source());
    let shape = db.type_of("class Shape").unwrap().record().unwrap();
    let area = shape.method("area").unwrap();

    assert!(area.is_method());
    assert!(area.is_virtual());
    assert_eq!(area.vtable_index(), Some(2));
    assert_eq!(area.address(), None);
    assert_eq!(area.return_type().name(), "double");
    assert_eq!(area.parameters().count(), 0);
    assert_eq!(area.full_name(), "::Shape::area");
}

#[test]
fn test_out_of_line_definition_gives_declaration_its_address()
{
    let db = build(&shape_source());
    let shape = db.type_of("Shape").unwrap().record().unwrap();
    let id = shape.method("id").unwrap();

    assert!(!id.is_virtual());
    assert_eq!(id.address(), Some(Address::new(0x4000)));
    assert_eq!(id.linkage_name().unwrap().raw(), "_ZNK5Shape2idEv");
    assert_eq!(db.function_at(Address::new(0x4000)).unwrap().id(), id.id());
    assert_eq!(db.function_at(Address::new(0x4100)).unwrap().name(), "scale");
    assert!(db.function_at(Address::new(0x4200)).unwrap_err().is_not_found());
}

#[test]
fn test_method_parameters_skip_implicit_object()
{
    let db = build(&shape_source());
    let scale = db.type_of("Shape").unwrap().record().unwrap().method("scale").unwrap();

    let parameters: Vec<ParameterInfo<'_>> = scale.parameters().collect();
    assert_eq!(parameters.len(), 2);
    assert_eq!(parameters[0].name(), "factor");
    assert_eq!(parameters[0].index(), 0);
    assert_eq!(parameters[0].ty().name(), "double");
    assert_eq!(parameters[1].name(), "param1");
    assert_eq!(parameters[1].ty().name(), "int");
    assert_eq!(scale.return_type().name(), "void");
    assert_eq!(
        scale.owner().unwrap().as_record().unwrap(),
        db.type_of("Shape").unwrap().record().unwrap()
    );
}

#[test]
fn test_methods_are_not_fields()
{
    let db = build(&shape_source());
    let shape = db.type_of("Shape").unwrap().record().unwrap();
    assert_eq!(shape.field_count(), 1);
    assert_eq!(shape.methods().count(), 3);
    assert!(shape.method("missing").unwrap_err().is_not_found());
}

#[test]
fn test_namespace_functions_and_variables()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let int = base(&mut source, unit, "int", 4);
    let math = source.add(unit, Tag::Namespace).with_name("math").offset();
    let square = source
        .add(math, Tag::Subprogram)
        .with_name("square")
        .with_type(int)
        .with_low_pc(0x1000)
        .offset();
    source.add(square, Tag::FormalParameter).with_name("x").with_type(int);
    source.add(math, Tag::Variable).with_name("counter").with_type(int).with_location(0x3000);
    source.add(math, Tag::Variable).with_name("local_only").with_type(int);

    let db = build(&source);
    let math = db.namespace("math").unwrap();
    let square = math.function("square").unwrap();
    assert!(!square.is_method());
    assert_eq!(square.full_name(), "::math::square");
    assert_eq!(square.address(), Some(Address::new(0x1000)));
    assert_eq!(square.parameters().next().unwrap().name(), "x");

    let counter = math.variable("counter").unwrap();
    assert_eq!(counter.address(), Address::new(0x3000));
    assert_eq!(counter.ty().name(), "int");
    assert_eq!(counter.full_name(), "::math::counter");
    assert!(math.variable("local_only").unwrap_err().is_not_found());
    assert!(math.function("cube").unwrap_err().is_not_found());
}

#[test]
fn test_load_bias_shifts_every_address()
{
    let mut source = MemorySource::default();
    let unit = source.unit();
    let int = base(&mut source, unit, "int", 4);
    source.add(unit, Tag::Subprogram).with_name("main").with_type(int).with_low_pc(0x1000);
    source.add(unit, Tag::Variable).with_name("global").with_type(int).with_location(0x2000);

    let options = BuildOptions::default().with_load_bias(0x5555_0000);
    let db = Database::build(&source, &options).unwrap();
    let root = db.root_namespace();
    assert_eq!(root.function("main").unwrap().address(), Some(Address::new(0x5555_1000)));
    assert_eq!(root.variable("global").unwrap().address(), Address::new(0x5555_2000));
    assert_eq!(db.function_at(Address::new(0x5555_1000)).unwrap().name(), "main");
}

#[test]
fn test_build_stats_count_the_walk()
{
    let mut source = MemorySource::default();
    let first = source.unit();
    let int = base(&mut source, first, "int", 4);
    point(&mut source, first, int);
    source.unit();

    let db = build(&source);
    let stats = db.stats();
    assert_eq!(stats.units, 2);
    assert_eq!(stats.units_abandoned, 0);
    assert_eq!(stats.fields, 2);
    assert_eq!(stats.namespaces, 1);
    // void, int and Point
    assert_eq!(stats.types, 3);
    assert_eq!(db.types().count(), 3);
    assert_eq!(db.pointer_size(), 8);
}

/// Source whose child list fails for one entry.
struct UnreadableChildren
{
    inner: MemorySource,
    broken: EntryOffset,
}

impl DebugSource for UnreadableChildren
{
    fn units(&self) -> MirrorResult<Vec<EntryOffset>>
    {
        self.inner.units()
    }

    fn entry(&self, offset: EntryOffset) -> MirrorResult<Entry>
    {
        self.inner.entry(offset)
    }

    fn children(&self, offset: EntryOffset) -> MirrorResult<Vec<Entry>>
    {
        if offset == self.broken {
            return Err(MirrorError::Dwarf("iterating entry children: unexpected end".to_string()));
        }
        self.inner.children(offset)
    }

    fn pointer_size(&self) -> u64
    {
        self.inner.pointer_size()
    }

    fn endian(&self) -> RunTimeEndian
    {
        self.inner.endian()
    }
}

#[test]
fn test_unreadable_subtree_keeps_its_siblings()
{
    let mut inner = MemorySource::default();
    let unit = inner.unit();
    let int = base(&mut inner, unit, "int", 4);
    let outer = inner.add(unit, Tag::Namespace).with_name("outer").offset();
    let broken = inner.add(outer, Tag::Namespace).with_name("broken").offset();
    inner.add(broken, Tag::StructureType).with_name("Lost").with_byte_size(4);
    inner.add(outer, Tag::StructureType).with_name("Kept").with_byte_size(4);
    point(&mut inner, unit, int);

    let source = UnreadableChildren { inner, broken };
    let db = Database::build(&source, &BuildOptions::default()).unwrap();

    assert_eq!(db.stats().units_abandoned, 0);
    assert!(db.stats().entries_skipped >= 1);
    assert_eq!(db.type_of("outer::Kept").unwrap().size(), 4);
    assert_eq!(db.type_of("Point").unwrap().record().unwrap().field_count(), 2);
    assert!(db.type_of("outer::broken::Lost").unwrap_err().is_not_found());
    assert!(db.namespace("outer::broken").is_ok());
}

#[test]
fn test_method_defined_in_another_unit_gets_its_address()
{
    let mut source = MemorySource::default();
    let declare = |source: &mut MemorySource| {
        let unit = source.unit();
        let double = base(source, unit, "double", 8);
        let point = source
            .add(unit, Tag::StructureType)
            .with_name("Point")
            .with_byte_size(16)
            .offset();
        let norm = source
            .add(point, Tag::Subprogram)
            .with_name("norm")
            .with_type(double)
            .declaration()
            .offset();
        (unit, norm)
    };
    declare(&mut source);
    let (second, norm) = declare(&mut source);
    source.add(second, Tag::Subprogram).with_specification(norm).with_low_pc(0x1000);

    let db = build(&source);
    let point = db.type_of("Point").unwrap().record().unwrap();
    let method = point.method("norm").unwrap();
    assert_eq!(method.address(), Some(Address::new(0x1000)));
    assert_eq!(db.function_at(Address::new(0x1000)).unwrap().id(), method.id());
}
