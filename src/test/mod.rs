//! Crafted metadata used by the unit tests.
//!
//! The default data set describes a small module:
//!
//! ```text
//! Module     app.dll
//! TypeRef    System.Object            -> AssemblyRef mscorlib
//! TypeDef 1  <Module>
//! TypeDef 2  Ns.X : System.Object     fields f1 f2   methods m1
//! TypeDef 3  Z    : System.Object     fields f3                    nested in X
//! TypeDef 4  Ns.Y                                    methods m2
//! ModuleRef  native.dll
//! ```

use std::collections::HashMap;

use crate::metadata::{
    streams::TablesStreamBuilder,
    tables::{
        AssemblyRefRaw, CodedIndexType, FieldPtrRaw, FieldRaw, MethodDefRaw, ModuleRaw,
        ModuleRefRaw, NestedClassRaw, TableId, TypeDefRaw, TypeRefRaw,
    },
    view::MetadataStreams,
};

pub const TEST_MVID: [u8; 16] = [
    0x6B, 0x2A, 0x1C, 0x8E, 0x3D, 0x4F, 0x41, 0x9A, 0x8C, 0x5E, 0x7B, 0x11, 0x02, 0xD3, 0xE4, 0xF5,
];

/// `#Strings` heap assembled from a fixed list of names
pub struct StringHeap {
    data: Vec<u8>,
    offsets: HashMap<&'static str, u32>,
}

impl StringHeap {
    pub fn new(names: &[&'static str]) -> Self {
        let mut data = vec![0u8];
        let mut offsets = HashMap::new();
        for name in names {
            offsets.insert(*name, data.len() as u32);
            data.extend_from_slice(name.as_bytes());
            data.push(0);
        }
        StringHeap { data, offsets }
    }

    pub fn at(&self, name: &str) -> u32 {
        self.offsets[name]
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

fn default_strings() -> StringHeap {
    StringHeap::new(&[
        "app.dll",
        "<Module>",
        "X",
        "Y",
        "Z",
        "Ns",
        "f1",
        "f2",
        "f3",
        "m1",
        "m2",
        "Object",
        "System",
        "mscorlib",
        "native.dll",
    ])
}

/// GUID heap with a single entry, index 1
pub fn guid_heap() -> Vec<u8> {
    TEST_MVID.to_vec()
}

/// Blob heap where index 1 holds the field signature `06 08` (FIELD int32)
pub fn blob_heap() -> Vec<u8> {
    vec![0x00, 0x02, 0x06, 0x08]
}

fn crafted_builder(strings: &StringHeap, nesting: &[(u32, u32)]) -> TablesStreamBuilder {
    let object = CodedIndexType::TypeDefOrRef
        .encode(TableId::TypeRef, 1)
        .unwrap();

    let mut builder = TablesStreamBuilder::new();
    builder.push(ModuleRaw {
        name: strings.at("app.dll"),
        mvid: 1,
        ..Default::default()
    });
    builder.push(TypeRefRaw {
        resolution_scope: CodedIndexType::ResolutionScope
            .encode(TableId::AssemblyRef, 1)
            .unwrap(),
        type_name: strings.at("Object"),
        type_namespace: strings.at("System"),
        ..Default::default()
    });

    for (name, namespace, extends, field_list, method_list) in [
        ("<Module>", 0, 0, 1, 1),
        ("X", strings.at("Ns"), object, 1, 1),
        ("Z", 0, object, 3, 2),
        ("Y", strings.at("Ns"), 0, 4, 2),
    ] {
        builder.push(TypeDefRaw {
            flags: if extends == 0 { 0 } else { 0x0010_0001 },
            type_name: strings.at(name),
            type_namespace: namespace,
            extends,
            field_list,
            method_list,
            ..Default::default()
        });
    }

    for name in ["f1", "f2", "f3"] {
        builder.push(FieldRaw {
            flags: 1,
            name: strings.at(name),
            signature: 1,
            ..Default::default()
        });
    }

    for name in ["m1", "m2"] {
        builder.push(MethodDefRaw {
            rva: 0x2050,
            flags: 6,
            name: strings.at(name),
            signature: 1,
            param_list: 1,
            ..Default::default()
        });
    }

    builder.push(ModuleRefRaw {
        name: strings.at("native.dll"),
        ..Default::default()
    });
    builder.push(AssemblyRefRaw {
        major_version: 4,
        name: strings.at("mscorlib"),
        ..Default::default()
    });
    for &(nested_class, enclosing_class) in nesting {
        builder.push(NestedClassRaw {
            nested_class,
            enclosing_class,
            ..Default::default()
        });
    }

    builder
}

fn crafted_with_nesting(nesting: &[(u32, u32)]) -> MetadataStreams {
    let strings = default_strings();
    let tables = crafted_builder(&strings, nesting).build().unwrap();

    MetadataStreams {
        tables,
        strings: Some(strings.into_bytes()),
        guids: Some(guid_heap()),
        blobs: Some(blob_heap()),
    }
}

/// The crafted `#~` stream on its own
pub fn crafted_tables_stream() -> Vec<u8> {
    crafted_builder(&default_strings(), &[(3, 2)])
        .build()
        .unwrap()
}

/// The crafted `#~` stream together with all heaps
pub fn crafted_streams() -> MetadataStreams {
    crafted_with_nesting(&[(3, 2)])
}

/// Crafted data where `Z` is additionally nested in itself
pub fn crafted_streams_with_nesting_cycle() -> MetadataStreams {
    crafted_with_nesting(&[(3, 2), (3, 3)])
}

/// Crafted data where `Z` is nested in a type row that does not exist
pub fn crafted_streams_with_dangling_nesting() -> MetadataStreams {
    crafted_with_nesting(&[(3, 99)])
}

/// Two types where `Outer` owns both fields through a `FieldPtr` table in reverse order
pub fn crafted_streams_with_field_ptr() -> MetadataStreams {
    let strings = StringHeap::new(&["app.dll", "<Module>", "Outer", "first", "second"]);

    let mut builder = TablesStreamBuilder::new();
    builder.push(ModuleRaw {
        name: strings.at("app.dll"),
        mvid: 1,
        ..Default::default()
    });
    for name in ["<Module>", "Outer"] {
        builder.push(TypeDefRaw {
            type_name: strings.at(name),
            field_list: 1,
            method_list: 1,
            ..Default::default()
        });
    }
    for field in [2, 1] {
        builder.push(FieldPtrRaw {
            field,
            ..Default::default()
        });
    }
    for name in ["first", "second"] {
        builder.push(FieldRaw {
            flags: 1,
            name: strings.at(name),
            signature: 1,
            ..Default::default()
        });
    }

    MetadataStreams {
        tables: builder.build().unwrap(),
        strings: Some(strings.into_bytes()),
        guids: Some(guid_heap()),
        blobs: Some(blob_heap()),
    }
}
