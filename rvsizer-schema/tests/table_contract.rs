use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rvsizer_schema::*;

fn vm(name: &str, state: &str) -> VmInfoRow {
    VmInfoRow {
        vm: name.into(),
        powerstate: state.into(),
        cpus: 2,
        memory_mib: 4096.0,
        provisioned_mib: 10240.0,
        in_use_mib: 2048.0,
    }
}

#[test]
fn schemas_declare_canonical_headers() {
    assert_eq!(VmInfo::SHEET.name(), "vInfo");
    assert_eq!(VmMemory::SHEET.name(), "vMemory");
    assert_eq!(VmPartition::SHEET.name(), "vPartition");

    let info = VmInfo::schema();
    assert_eq!(info.fields().len(), VmInfo::HEADERS.len());
    assert_eq!(info.field_with_name("cpus").unwrap().data_type(), &DataType::UInt32);

    let (column, headers) = VmInfo::HEADERS[4];
    assert_eq!(column, "provisioned_mib");
    assert_eq!(headers, &["Provisioned MB", "Provisioned MiB"]);
}

#[test]
fn rows_survive_arrow_conversion() {
    let rows = vec![vm("web-01", "poweredOn"), vm("db-01", "poweredOff")];
    let table = VmInfo::from_rows(&rows).unwrap();
    assert_eq!(table.num_rows(), 2);
    assert_eq!(table.vm().unwrap().value(1), "db-01");
    assert_eq!(table.rows().unwrap(), rows);
}

#[test]
fn new_rejects_batch_without_required_column() {
    let schema = Arc::new(Schema::new(vec![Field::new("vm", DataType::Utf8, false)]));
    let columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(vec!["a"]))];
    let batch = RecordBatch::try_new(schema, columns).unwrap();

    let err = VmMemory::new(Arc::new(batch)).unwrap_err();
    assert!(
        matches!(err, SchemaError::MissingColumn { ref column, .. } if column == "consumed_mib"),
        "{err}"
    );
}

#[test]
fn new_rejects_mistyped_column() {
    let schema = Arc::new(Schema::new(vec![
        Field::new("vm", DataType::Utf8, false),
        Field::new("consumed_mib", DataType::Utf8, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec!["a"])),
        Arc::new(StringArray::from(vec!["12"])),
    ];
    let batch = RecordBatch::try_new(schema, columns).unwrap();

    assert!(matches!(
        VmPartition::new(Arc::new(batch)),
        Err(SchemaError::ColumnType { .. })
    ));
}

#[test]
fn inventory_partition_splits_every_table_by_name() {
    let rows = InventoryRows {
        vm_info: vec![vm("a", "poweredOn"), vm("b", "poweredOn")],
        memory: vec![
            VmMemoryRow { vm: "a".into(), consumed_mib: 100.0 },
            VmMemoryRow { vm: "b".into(), consumed_mib: 200.0 },
        ],
        partitions: vec![
            VmPartitionRow { vm: "b".into(), consumed_mib: 10.0 },
            VmPartitionRow { vm: "b".into(), consumed_mib: 20.0 },
            VmPartitionRow { vm: "orphan".into(), consumed_mib: 5.0 },
        ],
    };
    let inv = Inventory::from_rows(&rows).unwrap();

    let (hit, rest) = inv.partition_by_vm(|name| name == "b").unwrap();
    assert_eq!(hit.vm_count(), 1);
    assert_eq!(hit.memory.num_rows(), 1);
    assert_eq!(hit.partitions.num_rows(), 2);
    assert_eq!(rest.vm_count(), 1);
    assert_eq!(rest.partitions.num_rows(), 1);

    let consumed: &Float64Array = rest.memory.consumed_mib().unwrap();
    assert_eq!(consumed.value(0), 100.0);
}

#[test]
fn empty_tables_have_schema_and_no_rows() {
    let inv = Inventory::empty();
    assert!(inv.vm_info.is_empty());
    assert_eq!(inv.rows().unwrap(), InventoryRows::default());
}
