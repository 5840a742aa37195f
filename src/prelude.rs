//! # cilmeta Prelude
//!
//! Re-exports the types most callers need to decode a tables stream, walk its object graph
//! and write code segments. Import it with `use cilmeta::prelude::*;`.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cilmeta operations
pub use crate::Error;

/// The result type used throughout cilmeta
pub use crate::Result;

/// Decoder settings
pub use crate::metadata::config::MetadataConfig;

// ================================================================================================
// Tables Stream
// ================================================================================================

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

/// Header, decoder and encoder of the `#~` stream
pub use crate::metadata::streams::{
    TablesHeader, TablesStream, TablesStreamBuilder, TablesStreamFlags,
};

/// Heap accessors
pub use crate::metadata::streams::{Blob, Guid, Strings};

/// Owned stream buffers and their decoders
pub use crate::metadata::view::{MetadataStreams, MetadataView};

// ================================================================================================
// Table Identifiers, Layouts and Rows
// ================================================================================================

/// Table kinds, reference widths and layouts
pub use crate::metadata::tables::{
    CodedIndex, CodedIndexType, MetadataTable, TableId, TableInfo, TableInfoRef, TableLayout,
    TableLayouts,
};

/// Row traits and the union over all row types
pub use crate::metadata::tables::{RowReadable, RowWritable, TableRow, TableRowData};

/// Raw rows of the tables the object graph materializes
pub use crate::metadata::tables::{
    AssemblyRefRaw, FieldPtrRaw, FieldRaw, MethodDefRaw, MethodPtrRaw, ModuleRaw, ModuleRefRaw,
    NestedClassRaw, TypeDefRaw, TypeRefRaw,
};

// ================================================================================================
// Object Graph
// ================================================================================================

/// Image, entity union and lazy building blocks
pub use crate::metadata::members::{
    Deferred, MetadataImage, MetadataMember, Owned, OwnedCollection, Owner, WeakMember,
};

/// Entities
pub use crate::metadata::members::{
    AssemblyReference, FieldDefinition, MethodDefinition, ModuleDefinition, ModuleReference,
    NestedClass, TypeDefinition, TypeReference,
};

// ================================================================================================
// Code Segments
// ================================================================================================

/// Segments, fixups and address assignment
pub use crate::code::{
    AddressAssignment, AddressFixup, AddressFixupKind, CodeImage, CodeSegment, SegmentId,
    SegmentPlacement, SegmentState, SymbolId, SymbolTable,
};

/// Memory-mapped output file
pub use crate::Output;
