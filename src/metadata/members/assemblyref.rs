use std::{fmt, sync::Arc};

use crate::metadata::{
    members::{Deferred, MetadataImage},
    tables::{AssemblyRefRaw, TableId},
    token::Token,
};

/// A four part assembly version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssemblyVersion {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
    /// Build number
    pub build: u16,
    /// Revision number
    pub revision: u16,
}

impl AssemblyVersion {
    /// Creates a version from its four parts
    #[must_use]
    pub fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        AssemblyVersion {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// An `AssemblyRef` entity
#[derive(Debug)]
pub struct AssemblyReference {
    /// Token of the row
    pub token: Token,
    /// Referenced version
    pub version: Deferred<AssemblyVersion>,
    /// `AssemblyFlags`
    pub flags: Deferred<u32>,
    /// Public key or its token, empty if the reference is not strong-named
    pub public_key_or_token: Deferred<Vec<u8>>,
    /// Simple name
    pub name: Deferred<String>,
    /// Culture, empty for the neutral culture
    pub culture: Deferred<String>,
    /// Hash of the referenced assembly
    pub hash_value: Deferred<Vec<u8>>,
}

impl AssemblyReference {
    /// Creates a reference that is not backed by a table row
    #[must_use]
    pub fn new(name: &str, version: AssemblyVersion) -> Arc<Self> {
        Arc::new(AssemblyReference {
            token: Token::from_parts(TableId::AssemblyRef, 0),
            version: Deferred::new(version),
            flags: Deferred::new(0),
            public_key_or_token: Deferred::new(Vec::new()),
            name: Deferred::new(name.to_string()),
            culture: Deferred::new(String::new()),
            hash_value: Deferred::new(Vec::new()),
        })
    }

    pub(crate) fn from_row(image: &MetadataImage, row: &AssemblyRefRaw) -> Arc<Self> {
        let part = |value: u32| u16::try_from(value).unwrap_or(u16::MAX);
        let version = AssemblyVersion::new(
            part(row.major_version),
            part(row.minor_version),
            part(row.build_number),
            part(row.revision_number),
        );
        let (public_key, name, culture, hash) =
            (row.public_key_or_token, row.name, row.culture, row.hash_value);

        Arc::new(AssemblyReference {
            token: row.token,
            version: Deferred::new(version),
            flags: Deferred::new(row.flags),
            public_key_or_token: image
                .lazy(move |image| Ok(image.view().blob_at(public_key)?.to_vec())),
            name: image.lazy(move |image| Ok(image.view().string_at(name)?.to_string())),
            culture: image.lazy(move |image| Ok(image.view().string_at(culture)?.to_string())),
            hash_value: image.lazy(move |image| Ok(image.view().blob_at(hash)?.to_vec())),
        })
    }

    /// Display name, `name, Version=a.b.c.d, Culture=neutral`
    ///
    /// # Errors
    /// Returns an error if the name or culture can't be read.
    pub fn display_name(&self) -> crate::Result<String> {
        let culture = self.culture.get()?;
        Ok(format!(
            "{}, Version={}, Culture={}",
            self.name.get()?,
            self.version.get()?,
            if culture.is_empty() { "neutral" } else { &culture }
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::crafted_streams;

    #[test]
    fn crafted_reference() {
        let image = MetadataImage::from_streams(crafted_streams()).unwrap();
        let mscorlib = image
            .assembly_reference(Token::from_parts(TableId::AssemblyRef, 1))
            .unwrap()
            .unwrap();

        assert_eq!(mscorlib.version.get().unwrap(), AssemblyVersion::new(4, 0, 0, 0));
        assert_eq!(
            mscorlib.display_name().unwrap(),
            "mscorlib, Version=4.0.0.0, Culture=neutral"
        );
        assert!(mscorlib.public_key_or_token.get().unwrap().is_empty());

        let native = image
            .module_reference(Token::from_parts(TableId::ModuleRef, 1))
            .unwrap()
            .unwrap();
        assert_eq!(native.name.get().unwrap(), "native.dll");
    }
}
