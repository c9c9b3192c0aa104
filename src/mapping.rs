use std::fmt;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use serde::{Deserialize, Serialize};

use crate::data::{ColumnType, FromValue, Value, ValueFormat, parse_typed_value};
use crate::error::{CsvError, Result};
use crate::mapper::MapperKind;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKey {
    Index(usize),
    Name(String),
}

impl ColumnKey {
    pub fn name(name: impl Into<String>) -> Self {
        ColumnKey::Name(name.into())
    }

    pub fn kind(&self) -> MapperKind {
        match self {
            ColumnKey::Index(_) => MapperKind::ByIndex,
            ColumnKey::Name(_) => MapperKind::ByName,
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Index(index) => write!(f, "#{index}"),
            ColumnKey::Name(name) => write!(f, "\"{name}\""),
        }
    }
}

impl From<usize> for ColumnKey {
    fn from(index: usize) -> Self {
        ColumnKey::Index(index)
    }
}

impl From<&str> for ColumnKey {
    fn from(name: &str) -> Self {
        ColumnKey::Name(name.to_string())
    }
}

impl From<String> for ColumnKey {
    fn from(name: String) -> Self {
        ColumnKey::Name(name)
    }
}

pub trait Converter: Send + Sync {
    fn convert(&self, raw: &str) -> AnyResult<Value>;
}

impl<F> Converter for F
where
    F: Fn(&str) -> AnyResult<Value> + Send + Sync,
{
    fn convert(&self, raw: &str) -> AnyResult<Value> {
        self(raw)
    }
}

#[derive(Clone)]
pub enum Conversion {
    Typed {
        column_type: ColumnType,
        format: Option<ValueFormat>,
    },
    Custom(Arc<dyn Converter>),
}

impl Conversion {
    pub fn typed(column_type: ColumnType) -> Self {
        Conversion::Typed {
            column_type,
            format: None,
        }
    }

    /// Empty fields have nothing to convert and are rejected.
    pub fn apply(&self, raw: &str) -> AnyResult<Value> {
        match self {
            Conversion::Typed {
                column_type,
                format,
            } => parse_typed_value(raw, column_type, format.as_ref())?
                .ok_or_else(|| anyhow::anyhow!("Empty value cannot be converted to {column_type}")),
            Conversion::Custom(converter) => converter.convert(raw),
        }
    }
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conversion::Typed {
                column_type,
                format,
            } => f
                .debug_struct("Typed")
                .field("column_type", column_type)
                .field("format", format)
                .finish(),
            Conversion::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

type Setter<T> = Arc<dyn Fn(&mut T, Value) -> AnyResult<()> + Send + Sync>;

pub struct PropertyMapping<T> {
    property: String,
    key: ColumnKey,
    required: bool,
    ignored: bool,
    conversion: Conversion,
    setter: Setter<T>,
}

impl<T> PropertyMapping<T> {
    pub fn new<F>(
        property: impl Into<String>,
        key: impl Into<ColumnKey>,
        column_type: ColumnType,
        setter: F,
    ) -> Self
    where
        F: Fn(&mut T, Value) -> AnyResult<()> + Send + Sync + 'static,
    {
        Self {
            property: property.into(),
            key: key.into(),
            required: false,
            ignored: false,
            conversion: Conversion::typed(column_type),
            setter: Arc::new(setter),
        }
    }

    /// Typed shorthand: the column type follows `V`.
    pub fn field<V, F>(property: impl Into<String>, key: impl Into<ColumnKey>, assign: F) -> Self
    where
        T: 'static,
        V: FromValue + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self::new(property, key, V::COLUMN_TYPE, move |target: &mut T, value| {
            assign(target, V::from_value(value)?);
            Ok(())
        })
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn ignored(mut self, ignored: bool) -> Self {
        self.ignored = ignored;
        self
    }

    pub fn format(mut self, value_format: ValueFormat) -> Self {
        if let Conversion::Typed { format, .. } = &mut self.conversion {
            *format = Some(value_format);
        }
        self
    }

    pub fn date_format(self, pattern: impl Into<String>) -> Self {
        self.format(ValueFormat::pattern(pattern))
    }

    pub fn localized_number(self, decimal_separator: char, grouping: Option<char>) -> Self {
        self.format(ValueFormat::localized_number(decimal_separator, grouping))
    }

    pub fn converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.conversion = Conversion::Custom(converter);
        self
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn key(&self) -> &ColumnKey {
        &self.key
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    pub fn conversion(&self) -> &Conversion {
        &self.conversion
    }

    pub(crate) fn assign(&self, target: &mut T, value: Value) -> AnyResult<()> {
        (self.setter)(target, value)
    }
}

impl<T> fmt::Debug for PropertyMapping<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMapping")
            .field("property", &self.property)
            .field("key", &self.key)
            .field("required", &self.required)
            .field("ignored", &self.ignored)
            .field("conversion", &self.conversion)
            .finish()
    }
}

type Factory<T> = Box<dyn Fn() -> AnyResult<T> + Send + Sync>;

pub struct MappingTable<T> {
    record: String,
    properties: Vec<PropertyMapping<T>>,
    mapper: Option<MapperKind>,
    factory: Factory<T>,
}

impl<T: Default + 'static> Default for MappingTable<T> {
    fn default() -> Self {
        Self::new(|| Ok(T::default()))
    }
}

impl<T> MappingTable<T> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> AnyResult<T> + Send + Sync + 'static,
    {
        Self {
            record: std::any::type_name::<T>().to_string(),
            properties: Vec::new(),
            mapper: None,
            factory: Box::new(factory),
        }
    }

    pub fn with_record_name(mut self, record: impl Into<String>) -> Self {
        self.record = record.into();
        self
    }

    pub fn property(mut self, mapping: PropertyMapping<T>) -> Self {
        self.properties.push(mapping);
        self
    }

    pub fn push(&mut self, mapping: PropertyMapping<T>) {
        self.properties.push(mapping);
    }

    pub fn with_mapper(mut self, mapper: MapperKind) -> Self {
        self.mapper = Some(mapper);
        self
    }

    pub fn properties(&self) -> &[PropertyMapping<T>] {
        &self.properties
    }

    pub fn active_properties(&self) -> impl Iterator<Item = &PropertyMapping<T>> {
        self.properties.iter().filter(|p| !p.is_ignored())
    }

    pub fn find(&self, property: &str) -> Option<&PropertyMapping<T>> {
        self.properties.iter().find(|p| p.property == property)
    }

    /// Explicit mapper, or the one implied by the keys when they all agree.
    /// A table without active properties maps by index.
    pub fn mapper_kind(&self) -> Result<MapperKind> {
        if let Some(kind) = self.mapper {
            return Ok(kind);
        }
        let mut kinds = self.active_properties().map(|p| p.key.kind());
        let Some(first) = kinds.next() else {
            return Ok(MapperKind::ByIndex);
        };
        if kinds.all(|kind| kind == first) {
            Ok(first)
        } else {
            Err(CsvError::invalid_config(format!(
                "mapping for {} mixes column indices and column names; choose a mapper explicitly",
                self.record
            )))
        }
    }

    pub fn instantiate(&self) -> Result<T> {
        (self.factory)().map_err(|err| CsvError::Instantiation {
            record: self.record.clone(),
            source: err.into(),
        })
    }
}

impl<T> fmt::Debug for MappingTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingTable")
            .field("record", &self.record)
            .field("properties", &self.properties)
            .field("mapper", &self.mapper)
            .finish()
    }
}
