//! Primitive type catalogues
//!
//! Every compilation needs the primitive types its documents refer to
//! without qualification. Conceptual documents use the EDM catalogue in the
//! `Edm` namespace; storage documents use the catalogue of their store
//! provider. A catalogue is anything implementing [`ProviderManifest`].

use std::fmt;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::namespaces::{Dialect, EDM_NAMESPACE};

use super::facets::{FacetDescription, FacetName, FacetValue};
use super::kinds::NodeKind;
use super::model::{Model, NodeId};

/// Kinds of primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrimitiveKind {
    /// Binary data
    Binary,
    /// Boolean
    Boolean,
    /// Unsigned 8-bit integer
    Byte,
    /// Date and time
    DateTime,
    /// Date and time with offset
    DateTimeOffset,
    /// Fixed-point decimal
    Decimal,
    /// 64-bit floating point
    Double,
    /// GUID
    Guid,
    /// 16-bit integer
    Int16,
    /// 32-bit integer
    Int32,
    /// 64-bit integer
    Int64,
    /// Signed 8-bit integer
    SByte,
    /// 32-bit floating point
    Single,
    /// Text
    String,
    /// Time of day
    Time,
    /// Any geography value
    Geography,
    /// Geography point
    GeographyPoint,
    /// Geography line string
    GeographyLineString,
    /// Geography polygon
    GeographyPolygon,
    /// Geography multi point
    GeographyMultiPoint,
    /// Geography multi line string
    GeographyMultiLineString,
    /// Geography multi polygon
    GeographyMultiPolygon,
    /// Geography collection
    GeographyCollection,
    /// Any geometry value
    Geometry,
    /// Geometry point
    GeometryPoint,
    /// Geometry line string
    GeometryLineString,
    /// Geometry polygon
    GeometryPolygon,
    /// Geometry multi point
    GeometryMultiPoint,
    /// Geometry multi line string
    GeometryMultiLineString,
    /// Geometry multi polygon
    GeometryMultiPolygon,
    /// Geometry collection
    GeometryCollection,
}

impl PrimitiveKind {
    /// Every primitive kind, in catalogue order
    pub const ALL: [PrimitiveKind; 31] = [
        PrimitiveKind::Binary,
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::DateTime,
        PrimitiveKind::DateTimeOffset,
        PrimitiveKind::Decimal,
        PrimitiveKind::Double,
        PrimitiveKind::Guid,
        PrimitiveKind::Int16,
        PrimitiveKind::Int32,
        PrimitiveKind::Int64,
        PrimitiveKind::SByte,
        PrimitiveKind::Single,
        PrimitiveKind::String,
        PrimitiveKind::Time,
        PrimitiveKind::Geography,
        PrimitiveKind::GeographyPoint,
        PrimitiveKind::GeographyLineString,
        PrimitiveKind::GeographyPolygon,
        PrimitiveKind::GeographyMultiPoint,
        PrimitiveKind::GeographyMultiLineString,
        PrimitiveKind::GeographyMultiPolygon,
        PrimitiveKind::GeographyCollection,
        PrimitiveKind::Geometry,
        PrimitiveKind::GeometryPoint,
        PrimitiveKind::GeometryLineString,
        PrimitiveKind::GeometryPolygon,
        PrimitiveKind::GeometryMultiPoint,
        PrimitiveKind::GeometryMultiLineString,
        PrimitiveKind::GeometryMultiPolygon,
        PrimitiveKind::GeometryCollection,
    ];

    /// Get the kind name
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Binary => "Binary",
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::Byte => "Byte",
            PrimitiveKind::DateTime => "DateTime",
            PrimitiveKind::DateTimeOffset => "DateTimeOffset",
            PrimitiveKind::Decimal => "Decimal",
            PrimitiveKind::Double => "Double",
            PrimitiveKind::Guid => "Guid",
            PrimitiveKind::Int16 => "Int16",
            PrimitiveKind::Int32 => "Int32",
            PrimitiveKind::Int64 => "Int64",
            PrimitiveKind::SByte => "SByte",
            PrimitiveKind::Single => "Single",
            PrimitiveKind::String => "String",
            PrimitiveKind::Time => "Time",
            PrimitiveKind::Geography => "Geography",
            PrimitiveKind::GeographyPoint => "GeographyPoint",
            PrimitiveKind::GeographyLineString => "GeographyLineString",
            PrimitiveKind::GeographyPolygon => "GeographyPolygon",
            PrimitiveKind::GeographyMultiPoint => "GeographyMultiPoint",
            PrimitiveKind::GeographyMultiLineString => "GeographyMultiLineString",
            PrimitiveKind::GeographyMultiPolygon => "GeographyMultiPolygon",
            PrimitiveKind::GeographyCollection => "GeographyCollection",
            PrimitiveKind::Geometry => "Geometry",
            PrimitiveKind::GeometryPoint => "GeometryPoint",
            PrimitiveKind::GeometryLineString => "GeometryLineString",
            PrimitiveKind::GeometryPolygon => "GeometryPolygon",
            PrimitiveKind::GeometryMultiPoint => "GeometryMultiPoint",
            PrimitiveKind::GeometryMultiLineString => "GeometryMultiLineString",
            PrimitiveKind::GeometryMultiPolygon => "GeometryMultiPolygon",
            PrimitiveKind::GeometryCollection => "GeometryCollection",
        }
    }

    /// Look a kind up by name (ordinal)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }

    /// Range of integral kinds usable as enum underlying types
    pub fn integral_range(&self) -> Option<(i64, i64)> {
        match self {
            PrimitiveKind::Byte => Some((u8::MIN as i64, u8::MAX as i64)),
            PrimitiveKind::SByte => Some((i8::MIN as i64, i8::MAX as i64)),
            PrimitiveKind::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            PrimitiveKind::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            PrimitiveKind::Int64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Whether this is an integral kind
    pub fn is_integral(&self) -> bool {
        self.integral_range().is_some()
    }

    /// Whether this is a geography kind
    pub fn is_geography(&self) -> bool {
        self.as_str().starts_with("Geography")
    }

    /// Whether this is a spatial kind
    pub fn is_spatial(&self) -> bool {
        self.is_geography() || self.as_str().starts_with("Geometry")
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One primitive type offered by a catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrimitiveTypeDescriptor {
    /// Type name within the catalogue namespace
    pub name: String,
    /// Primitive kind
    pub kind: PrimitiveKind,
    /// Facets the type accepts
    pub facets: Vec<FacetDescription>,
}

impl PrimitiveTypeDescriptor {
    /// Create a descriptor
    pub fn new(name: impl Into<String>, kind: PrimitiveKind, facets: Vec<FacetDescription>) -> Self {
        Self {
            name: name.into(),
            kind,
            facets,
        }
    }
}

/// A catalogue of primitive types supplied by a provider
pub trait ProviderManifest: fmt::Debug + Send + Sync {
    /// Namespace the types live in
    fn namespace(&self) -> &str;

    /// Types in catalogue order
    fn primitive_types(&self) -> &[PrimitiveTypeDescriptor];

    /// Find a type by name
    fn find_type(&self, name: &str) -> Option<&PrimitiveTypeDescriptor> {
        self.primitive_types().iter().find(|t| t.name == name)
    }
}

/// The EDM primitive type catalogue
#[derive(Debug)]
pub struct EdmProviderManifest {
    types: Vec<PrimitiveTypeDescriptor>,
}

static EDM_PROVIDER_MANIFEST: Lazy<EdmProviderManifest> = Lazy::new(EdmProviderManifest::build);

/// The process-wide EDM catalogue
pub fn edm_provider_manifest() -> &'static EdmProviderManifest {
    &EDM_PROVIDER_MANIFEST
}

impl EdmProviderManifest {
    fn build() -> Self {
        let types = PrimitiveKind::ALL
            .iter()
            .map(|kind| {
                PrimitiveTypeDescriptor::new(kind.as_str(), *kind, Self::facets_for(*kind))
            })
            .collect();
        Self { types }
    }

    fn facets_for(kind: PrimitiveKind) -> Vec<FacetDescription> {
        let max_length = FacetDescription::new(FacetName::MaxLength).with_range(0, i32::MAX as i64);
        let fixed_length = FacetDescription::new(FacetName::FixedLength);
        match kind {
            PrimitiveKind::Binary => vec![max_length, fixed_length],
            PrimitiveKind::String => vec![
                max_length,
                fixed_length,
                FacetDescription::new(FacetName::Unicode).with_default(FacetValue::Bool(true)),
                FacetDescription::new(FacetName::Collation),
            ],
            PrimitiveKind::Decimal => vec![
                FacetDescription::new(FacetName::Precision).with_range(1, 255),
                FacetDescription::new(FacetName::Scale).with_range(0, 255),
            ],
            PrimitiveKind::DateTime | PrimitiveKind::DateTimeOffset | PrimitiveKind::Time => {
                vec![FacetDescription::new(FacetName::Precision).with_range(0, 255)]
            }
            spatial if spatial.is_spatial() => {
                let default_srid = if spatial.is_geography() { 4326 } else { 0 };
                vec![
                    FacetDescription::new(FacetName::Srid)
                        .with_range(0, i32::MAX as i64)
                        .with_default(FacetValue::Integer(default_srid)),
                    FacetDescription::new(FacetName::IsStrict)
                        .with_default(FacetValue::Bool(false))
                        .constant(),
                ]
            }
            _ => Vec::new(),
        }
    }
}

impl ProviderManifest for EdmProviderManifest {
    fn namespace(&self) -> &str {
        EDM_NAMESPACE
    }

    fn primitive_types(&self) -> &[PrimitiveTypeDescriptor] {
        &self.types
    }
}

/// A catalogue built from a compiled provider manifest document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestCatalog {
    namespace: String,
    types: Vec<PrimitiveTypeDescriptor>,
}

impl ManifestCatalog {
    /// Create a catalogue from descriptors
    pub fn new(namespace: impl Into<String>, types: Vec<PrimitiveTypeDescriptor>) -> Self {
        Self {
            namespace: namespace.into(),
            types,
        }
    }

    /// Build a catalogue from a provider manifest document in `model`
    ///
    /// Types whose primitive kind could not be determined are left out.
    pub fn from_model(model: &Model, document: NodeId) -> Result<Self> {
        let schema = model
            .schema(document)
            .ok_or_else(|| Error::Value(format!("node {} is not a document", document)))?;
        if schema.dialect != Dialect::ProviderManifest {
            return Err(Error::Value(format!(
                "document is a {} document, not a provider manifest",
                schema.dialect
            )));
        }
        let namespace = schema
            .namespace
            .clone()
            .ok_or_else(|| Error::Value("provider manifest declares no namespace".to_string()))?;

        let types = schema
            .types
            .iter()
            .filter_map(|id| match &model[*id].kind {
                NodeKind::PrimitiveType(data) => {
                    let name = model[*id].name.clone()?;
                    Some(PrimitiveTypeDescriptor::new(name, data.kind?, data.facets.clone()))
                }
                _ => None,
            })
            .collect();

        Ok(Self { namespace, types })
    }
}

impl ProviderManifest for ManifestCatalog {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn primitive_types(&self) -> &[PrimitiveTypeDescriptor] {
        &self.types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_kind_names() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(PrimitiveKind::from_name("int32"), None);
    }

    #[test]
    fn test_integral_kinds() {
        assert!(PrimitiveKind::Byte.is_integral());
        assert!(!PrimitiveKind::Decimal.is_integral());
        assert_eq!(PrimitiveKind::SByte.integral_range(), Some((-128, 127)));
    }

    #[test]
    fn test_spatial_kinds() {
        assert!(PrimitiveKind::GeographyPoint.is_geography());
        assert!(PrimitiveKind::GeometryCollection.is_spatial());
        assert!(!PrimitiveKind::GeometryPoint.is_geography());
        assert!(!PrimitiveKind::String.is_spatial());
    }

    #[test]
    fn test_edm_catalogue() {
        let edm = edm_provider_manifest();
        assert_eq!(edm.namespace(), "Edm");
        assert_eq!(edm.primitive_types().len(), PrimitiveKind::ALL.len());

        let string = edm.find_type("String").unwrap();
        assert!(string.facets.iter().any(|f| f.name == FacetName::Unicode));

        let point = edm.find_type("GeographyPoint").unwrap();
        let is_strict = point
            .facets
            .iter()
            .find(|f| f.name == FacetName::IsStrict)
            .unwrap();
        assert!(is_strict.is_constant);

        assert!(edm.find_type("Int32").unwrap().facets.is_empty());
        assert!(std::ptr::eq(edm, edm_provider_manifest()));
    }

    #[test]
    fn test_manifest_catalog_new() {
        let catalog = ManifestCatalog::new(
            "Store",
            vec![PrimitiveTypeDescriptor::new("int", PrimitiveKind::Int32, Vec::new())],
        );
        assert_eq!(catalog.namespace(), "Store");
        assert_eq!(catalog.find_type("int").map(|t| t.kind), Some(PrimitiveKind::Int32));
        assert!(catalog.find_type("Int").is_none());
    }
}
