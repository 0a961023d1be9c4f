//! Macro that turns the RVTools sheet layouts into Arrow schemas, row types and batch wrappers.

use arrow::datatypes::Schema;

use crate::SchemaError;

/// Runtime schema check: every declared column must exist with its declared type.
pub fn __check_columns(
    table: &'static str,
    expected: &Schema,
    actual: &Schema,
) -> Result<(), SchemaError> {
    for field in expected.fields() {
        let found = actual
            .field_with_name(field.name())
            .map_err(|_| SchemaError::MissingColumn {
                table,
                column: field.name().to_string(),
            })?;
        if found.data_type() != field.data_type() {
            return Err(SchemaError::ColumnType {
                table,
                column: field.name().to_string(),
                expected: field.data_type().clone(),
                actual: found.data_type().clone(),
            });
        }
    }
    Ok(())
}

/// Map DSL token -> Arrow DataType.
#[macro_export]
macro_rules! __ty_to_arrow {
    ( Utf8 ) => { ::arrow::datatypes::DataType::Utf8 };
    ( UInt32 ) => { ::arrow::datatypes::DataType::UInt32 };
    ( Float64 ) => { ::arrow::datatypes::DataType::Float64 };
}

/// Map DSL token -> Arrow array type.
#[macro_export]
macro_rules! __ty_to_array {
    ( Utf8 ) => { ::arrow::array::StringArray };
    ( UInt32 ) => { ::arrow::array::UInt32Array };
    ( Float64 ) => { ::arrow::array::Float64Array };
}

/// Map DSL token -> owned Rust value type used in row structs.
#[macro_export]
macro_rules! __ty_to_rust {
    ( Utf8 ) => { ::std::string::String };
    ( UInt32 ) => { u32 };
    ( Float64 ) => { f64 };
}

/// Declarative table definitions. Generates schemas, row structs and batch wrappers.
#[macro_export]
macro_rules! define_tables {
    (
        $(
            table $Name:ident ( $Row:ident ) {
                sheet: $sheet:path,
                fields: {
                    $( $fname:ident : $fty:ident = [ $( $header:literal ),+ $(,)? ] ),* $(,)?
                }
            }
        ),* $(,)?
    ) => {
        $(
            #[doc = concat!("Owned row of the `", stringify!($Name), "` table.")]
            #[derive(Clone, Debug, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
            pub struct $Row {
                $( pub $fname: $crate::__ty_to_rust!($fty), )*
            }

            #[doc = concat!("Typed wrapper over the `", stringify!($Name), "` Arrow batch.")]
            #[derive(Clone, Debug)]
            pub struct $Name {
                inner: ::std::sync::Arc<::arrow::record_batch::RecordBatch>,
            }

            impl $Name {
                /// Sheet the table is read from.
                pub const SHEET: $crate::sheet::Sheet = $sheet;

                /// Column name -> accepted sheet headers, canonical spelling first.
                pub const HEADERS: &'static [(&'static str, &'static [&'static str])] = &[
                    $( (stringify!($fname), &[ $( $header ),+ ]), )*
                ];

                /// Arrow schema for this table.
                pub fn schema() -> ::arrow::datatypes::Schema {
                    ::arrow::datatypes::Schema::new(vec![
                        $(
                            ::arrow::datatypes::Field::new(
                                stringify!($fname),
                                $crate::__ty_to_arrow!($fty),
                                false,
                            ),
                        )*
                    ])
                }

                /// Wrap an existing batch after checking its columns.
                pub fn new(
                    inner: ::std::sync::Arc<::arrow::record_batch::RecordBatch>,
                ) -> Result<Self, $crate::SchemaError> {
                    $crate::macros::__check_columns(
                        stringify!($Name),
                        &Self::schema(),
                        inner.schema().as_ref(),
                    )?;
                    Ok(Self { inner })
                }

                /// Zero-row table.
                pub fn empty() -> Self {
                    let schema = ::std::sync::Arc::new(Self::schema());
                    Self {
                        inner: ::std::sync::Arc::new(
                            ::arrow::record_batch::RecordBatch::new_empty(schema),
                        ),
                    }
                }

                /// Build a batch from owned rows.
                pub fn from_rows(rows: &[$Row]) -> Result<Self, $crate::SchemaError> {
                    let columns: Vec<::arrow::array::ArrayRef> = vec![
                        $(
                            ::std::sync::Arc::new(<$crate::__ty_to_array!($fty)>::from(
                                rows.iter().map(|r| r.$fname.clone()).collect::<Vec<_>>(),
                            )),
                        )*
                    ];
                    let batch = ::arrow::record_batch::RecordBatch::try_new(
                        ::std::sync::Arc::new(Self::schema()),
                        columns,
                    )?;
                    Ok(Self { inner: ::std::sync::Arc::new(batch) })
                }

                /// Copy the batch out into owned rows.
                pub fn rows(&self) -> Result<Vec<$Row>, $crate::SchemaError> {
                    $( let $fname = self.$fname()?; )*
                    Ok((0..self.inner.num_rows())
                        .map(|i| $Row {
                            $( $fname: $fname.value(i).into(), )*
                        })
                        .collect())
                }

                /// Keep the rows where `mask` is true.
                pub fn filter(
                    &self,
                    mask: &::arrow::array::BooleanArray,
                ) -> Result<Self, $crate::SchemaError> {
                    let batch = ::arrow::compute::filter_record_batch(&self.inner, mask)?;
                    Ok(Self { inner: ::std::sync::Arc::new(batch) })
                }

                pub fn num_rows(&self) -> usize {
                    self.inner.num_rows()
                }

                pub fn is_empty(&self) -> bool {
                    self.inner.num_rows() == 0
                }

                /// Underlying Arrow batch.
                pub fn inner(&self) -> &::std::sync::Arc<::arrow::record_batch::RecordBatch> {
                    &self.inner
                }

                $(
                    pub fn $fname(&self) -> Result<&$crate::__ty_to_array!($fty), $crate::SchemaError> {
                        self.inner
                            .column_by_name(stringify!($fname))
                            .and_then(|col| {
                                ::arrow::array::Array::as_any(&**col)
                                    .downcast_ref::<$crate::__ty_to_array!($fty)>()
                            })
                            .ok_or_else(|| $crate::SchemaError::MissingColumn {
                                table: stringify!($Name),
                                column: stringify!($fname).to_string(),
                            })
                    }
                )*
            }
        )*
    };
}
