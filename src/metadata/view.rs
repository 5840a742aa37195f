//! Owned metadata streams together with the decoders borrowing them.
//!
//! [`MetadataView`] takes ownership of the raw stream buffers handed over by whatever located
//! them inside an image, and keeps the parsed [`TablesStream`] and heap views next to them.
//! Nothing here resolves cross references; that is done by
//! [`MetadataImage`](crate::metadata::members::MetadataImage).
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilmeta::metadata::view::{MetadataStreams, MetadataView};
//! use cilmeta::metadata::tables::TableId;
//!
//! # fn example(tables: Vec<u8>, strings: Vec<u8>) -> cilmeta::Result<()> {
//! let view = MetadataView::from_streams(MetadataStreams {
//!     tables,
//!     strings: Some(strings),
//!     ..Default::default()
//! })?;
//!
//! let module = view.tables().row(TableId::Module, 1)?;
//! println!("{}", view.string_at(module.columns()[1])?);
//! # Ok(())
//! # }
//! ```

use ouroboros::self_referencing;

use crate::{
    metadata::{
        config::MetadataConfig,
        streams::{Blob, Guid, Strings, TablesStream},
    },
    Result,
};

/// The raw bytes of the streams a metadata image consists of
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataStreams {
    /// The `#~` stream
    pub tables: Vec<u8>,
    /// The `#Strings` heap
    pub strings: Option<Vec<u8>>,
    /// The `#GUID` heap
    pub guids: Option<Vec<u8>>,
    /// The `#Blob` heap
    pub blobs: Option<Vec<u8>>,
}

/// Decoded views over a [`MetadataStreams`]
pub struct MetadataViewData<'a> {
    /// The tables stream
    pub tables: TablesStream<'a>,
    /// The `#Strings` heap, if present
    pub strings: Option<Strings<'a>>,
    /// The `#GUID` heap, if present
    pub guids: Option<Guid<'a>>,
    /// The `#Blob` heap, if present
    pub blobs: Option<Blob<'a>>,
}

impl<'a> MetadataViewData<'a> {
    fn from_streams(streams: &'a MetadataStreams, config: &MetadataConfig) -> Result<Self> {
        Ok(MetadataViewData {
            tables: TablesStream::with_config(&streams.tables, config)?,
            strings: streams.strings.as_deref().map(Strings::from).transpose()?,
            guids: streams.guids.as_deref().map(Guid::from).transpose()?,
            blobs: streams.blobs.as_deref().map(Blob::from).transpose()?,
        })
    }
}

#[self_referencing]
/// Owns the stream buffers and the decoders that borrow from them.
///
/// The view is immutable once built and can be shared between threads.
pub struct MetadataView {
    source: MetadataStreams,
    config: MetadataConfig,
    #[borrows(source)]
    #[not_covariant]
    data: MetadataViewData<'this>,
}

impl MetadataView {
    /// Decodes `streams` with the default configuration.
    ///
    /// # Errors
    /// Returns an error if the tables stream or one of the heaps is malformed.
    pub fn from_streams(streams: MetadataStreams) -> Result<Self> {
        Self::from_streams_with_config(streams, MetadataConfig::default())
    }

    /// Decodes `streams` with `config`.
    ///
    /// # Errors
    /// Returns an error if the tables stream or one of the heaps is malformed.
    pub fn from_streams_with_config(
        streams: MetadataStreams,
        config: MetadataConfig,
    ) -> Result<Self> {
        MetadataView::try_new(streams, config, |source| {
            MetadataViewData::from_streams(source, &config)
        })
    }

    /// The raw stream bytes this view was built from
    #[must_use]
    pub fn streams(&self) -> &MetadataStreams {
        self.borrow_source()
    }

    /// The configuration this view was decoded with
    #[must_use]
    pub fn config(&self) -> &MetadataConfig {
        self.borrow_config()
    }

    /// The decoded tables stream
    #[must_use]
    pub fn tables(&self) -> &TablesStream {
        self.with_data(|data| &data.tables)
    }

    /// The `#Strings` heap
    #[must_use]
    pub fn strings(&self) -> Option<&Strings> {
        self.with_data(|data| data.strings.as_ref())
    }

    /// The `#GUID` heap
    #[must_use]
    pub fn guids(&self) -> Option<&Guid> {
        self.with_data(|data| data.guids.as_ref())
    }

    /// The `#Blob` heap
    #[must_use]
    pub fn blobs(&self) -> Option<&Blob> {
        self.with_data(|data| data.blobs.as_ref())
    }

    /// Resolves a `#Strings` column value. Index 0 is the empty string, also without a heap.
    ///
    /// # Errors
    /// Returns a format error if the heap is missing or `index` does not point at a valid string.
    pub fn string_at(&self, index: u32) -> Result<&str> {
        if index == 0 {
            return Ok("");
        }

        match self.strings() {
            Some(strings) => strings.get(index as usize),
            None => Err(malformed_error!(
                "String index {} without a #Strings heap",
                index
            )),
        }
    }

    /// Resolves a `#GUID` column value, 0 meaning no GUID.
    ///
    /// # Errors
    /// Returns a format error if the heap is missing or `index` is past its end.
    pub fn guid_at(&self, index: u32) -> Result<Option<uguid::Guid>> {
        if index == 0 {
            return Ok(None);
        }

        match self.guids() {
            Some(guids) => guids.get(index as usize).map(Some),
            None => Err(malformed_error!("GUID index {} without a #GUID heap", index)),
        }
    }

    /// Resolves a `#Blob` column value. Index 0 is the empty blob, also without a heap.
    ///
    /// # Errors
    /// Returns a format error if the heap is missing or the blob runs past its end.
    pub fn blob_at(&self, index: u32) -> Result<&[u8]> {
        if index == 0 {
            return Ok(&[]);
        }

        match self.blobs() {
            Some(blobs) => blobs.get(index as usize),
            None => Err(malformed_error!("Blob index {} without a #Blob heap", index)),
        }
    }
}
