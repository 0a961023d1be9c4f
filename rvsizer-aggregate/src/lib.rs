use arrow::array::Float64Array;
use rvsizer_schema::SchemaError;
use rvsizer_scope::{vm_names, PolicyScope, ScopeError, ScopedInventory};
use rvsizer_types::{PerPolicy, Policy, PowerState, Summary, MIB_PER_GIB};
use tracing::{debug, warn};

/// Where the Consumed policy's storage total comes from.
///
/// Each kept VM contributes once: either through its partition rows or, when it
/// reports none, through its vInfo in-use MiB.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConsumedStorage {
    pub partitions_mib: f64,
    /// Powered-off VMs without partition rows.
    pub powered_off_in_use_mib: f64,
    /// Running VMs without partition rows (no guest tools reporting).
    pub unreported_in_use_mib: f64,
}

impl ConsumedStorage {
    pub fn total_mib(&self) -> f64 {
        self.partitions_mib + self.powered_off_in_use_mib + self.unreported_in_use_mib
    }
}

pub fn consumed_storage(scope: &PolicyScope) -> Result<ConsumedStorage, SchemaError> {
    let kept = &scope.kept;
    let reporting = vm_names(kept.partitions.vm()?);

    let info = &kept.vm_info;
    let (names, states, in_use) = (info.vm()?, info.powerstate()?, info.in_use_mib()?);
    let unreported_in_use_mib = (0..info.num_rows())
        .filter(|&i| !PowerState::parse(states.value(i)).is_off())
        .filter(|&i| !reporting.contains(names.value(i)))
        .map(|i| in_use.value(i))
        .sum();

    Ok(ConsumedStorage {
        partitions_mib: total(kept.partitions.consumed_mib()?),
        powered_off_in_use_mib: scope.carried_in_use_mib,
        unreported_in_use_mib,
    })
}

/// Summary of one policy's kept view. Fails when the view holds no VMs.
pub fn summarize(scope: &PolicyScope, powered_off: usize) -> Result<Summary, ScopeError> {
    let kept = &scope.kept;
    if kept.vm_count() == 0 {
        return Err(ScopeError::NoVms {
            policy: scope.policy,
        });
    }

    let vms = kept.vm_count() as u64;
    let cpus: u64 = kept
        .vm_info
        .cpus()?
        .values()
        .iter()
        .map(|&c| u64::from(c))
        .sum();

    let (ram_mib, storage_mib) = match scope.policy {
        Policy::Provisioned => (
            total(kept.vm_info.memory_mib()?),
            total(kept.vm_info.provisioned_mib()?),
        ),
        Policy::Used => (
            total(kept.memory.consumed_mib()?),
            total(kept.vm_info.in_use_mib()?),
        ),
        Policy::Consumed => (
            total(kept.memory.consumed_mib()?),
            consumed_storage(scope)?.total_mib(),
        ),
    };

    let ram_gib = ram_mib / MIB_PER_GIB;
    let storage_gib = storage_mib / MIB_PER_GIB;
    let summary = Summary {
        vms,
        cpus,
        ram_gib,
        storage_gib,
        rcpu: cpus.div_ceil(vms),
        rram: per_vm_ceil(ram_gib, vms),
        rsto: per_vm_ceil(storage_gib, vms),
        powered_off: powered_off as u64,
    };
    debug!(policy = %scope.policy, ?summary, "summarized");
    Ok(summary)
}

pub fn summarize_all(scoped: &ScopedInventory) -> PerPolicy<Result<Summary, ScopeError>> {
    scoped.scopes.map(|policy, scope| {
        let summary = summarize(scope, scoped.powered_off_count);
        if let Err(e) = &summary {
            warn!(%policy, error = %e, "summary unavailable");
        }
        summary
    })
}

fn total(column: &Float64Array) -> f64 {
    column.values().iter().sum()
}

fn per_vm_ceil(total: f64, vms: u64) -> u64 {
    (total / vms as f64).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvsizer_schema::{Inventory, InventoryRows, VmInfoRow, VmMemoryRow, VmPartitionRow};
    use rvsizer_scope::apply;
    use rvsizer_types::ScopeOptions;

    fn vm(name: &str, state: &str, cpus: u32, memory_mib: f64, in_use_mib: f64) -> VmInfoRow {
        VmInfoRow {
            vm: name.into(),
            powerstate: state.into(),
            cpus,
            memory_mib,
            provisioned_mib: in_use_mib * 2.0,
            in_use_mib,
        }
    }

    fn scoped(rows: InventoryRows, options: ScopeOptions) -> ScopedInventory {
        apply(&Inventory::from_rows(&rows).unwrap(), &options).unwrap()
    }

    fn keep_all() -> ScopeOptions {
        ScopeOptions::shared(false, Vec::<String>::new())
    }

    #[test]
    fn per_vm_cpu_rounds_up() {
        let rows = InventoryRows {
            vm_info: vec![
                vm("a", "poweredOn", 4, 1024.0, 0.0),
                vm("b", "poweredOn", 4, 1024.0, 0.0),
                vm("c", "poweredOn", 2, 1024.0, 0.0),
            ],
            ..Default::default()
        };
        let s = summarize(scoped(rows, keep_all()).scope(Policy::Provisioned), 0).unwrap();
        assert_eq!(s.vms, 3);
        assert_eq!(s.cpus, 10);
        assert_eq!(s.rcpu, 4);
        assert_eq!(s.ram_gib, 3.0);
        assert_eq!(s.rram, 1);
    }

    #[test]
    fn policies_read_their_own_columns() {
        let rows = InventoryRows {
            vm_info: vec![
                vm("a", "poweredOn", 2, 8192.0, 3072.0),
                vm("b", "poweredOn", 2, 8192.0, 1024.0),
            ],
            memory: vec![
                VmMemoryRow { vm: "a".into(), consumed_mib: 2048.0 },
                VmMemoryRow { vm: "b".into(), consumed_mib: 1024.0 },
            ],
            partitions: vec![
                VmPartitionRow { vm: "a".into(), consumed_mib: 1536.0 },
                VmPartitionRow { vm: "b".into(), consumed_mib: 512.0 },
            ],
        };
        let scoped = scoped(rows, keep_all());
        let all = summarize_all(&scoped);

        let provisioned = all.provisioned.as_ref().unwrap();
        assert_eq!(provisioned.ram_gib, 16.0);
        assert_eq!(provisioned.storage_gib, 8.0);
        assert_eq!(provisioned.rsto, 4);

        let used = all.used.as_ref().unwrap();
        assert_eq!(used.ram_gib, 3.0);
        assert_eq!(used.rram, 2);
        assert_eq!(used.storage_gib, 4.0);

        let consumed = all.consumed.as_ref().unwrap();
        assert_eq!(consumed.ram_gib, 3.0);
        assert_eq!(consumed.storage_gib, 2.0);
        assert_eq!(consumed.rsto, 1);
    }

    #[test]
    fn consumed_storage_counts_each_vm_once() {
        let rows = InventoryRows {
            vm_info: vec![
                vm("reporting", "poweredOn", 1, 0.0, 9999.0),
                vm("no-tools", "poweredOn", 1, 0.0, 1024.0),
                vm("off-bare", "poweredOff", 1, 0.0, 2048.0),
                vm("off-stale", "poweredOff", 1, 0.0, 4096.0),
            ],
            memory: vec![],
            partitions: vec![
                VmPartitionRow { vm: "reporting".into(), consumed_mib: 100.0 },
                VmPartitionRow { vm: "reporting".into(), consumed_mib: 300.0 },
                VmPartitionRow { vm: "off-stale".into(), consumed_mib: 600.0 },
            ],
        };
        let scoped = scoped(rows, keep_all());
        let storage = consumed_storage(scoped.scope(Policy::Consumed)).unwrap();

        assert_eq!(
            storage,
            ConsumedStorage {
                partitions_mib: 1000.0,
                powered_off_in_use_mib: 2048.0,
                unreported_in_use_mib: 1024.0,
            }
        );
        let s = summarize(scoped.scope(Policy::Consumed), scoped.powered_off_count).unwrap();
        assert_eq!(s.storage_gib, 4072.0 / 1024.0);
        assert_eq!(s.powered_off, 2);
    }

    #[test]
    fn powered_off_in_use_is_added_exactly_once() {
        let rows = InventoryRows {
            vm_info: vec![
                vm("on", "poweredOn", 1, 0.0, 0.0),
                vm("off", "poweredOff", 1, 0.0, 2048.0),
            ],
            memory: vec![],
            partitions: vec![VmPartitionRow { vm: "on".into(), consumed_mib: 1024.0 }],
        };
        let scoped = scoped(rows, keep_all());
        let s = summarize(scoped.scope(Policy::Consumed), scoped.powered_off_count).unwrap();
        assert_eq!(s.storage_gib, 3.0);
    }

    #[test]
    fn rows_of_unknown_vms_do_not_inflate_totals() {
        let rows = InventoryRows {
            vm_info: vec![vm("a", "poweredOn", 1, 1024.0, 1024.0)],
            memory: vec![
                VmMemoryRow { vm: "a".into(), consumed_mib: 1024.0 },
                VmMemoryRow { vm: "ghost".into(), consumed_mib: 10240.0 },
            ],
            partitions: vec![
                VmPartitionRow { vm: "a".into(), consumed_mib: 1024.0 },
                VmPartitionRow { vm: "ghost".into(), consumed_mib: 10240.0 },
            ],
        };
        let all = summarize_all(&scoped(rows, keep_all()));

        let used = all.used.as_ref().unwrap();
        assert_eq!(used.vms, 1);
        assert_eq!(used.ram_gib, 1.0);
        assert_eq!(used.rram, 1);

        let consumed = all.consumed.as_ref().unwrap();
        assert_eq!(consumed.ram_gib, 1.0);
        assert_eq!(consumed.storage_gib, 1.0);
        assert_eq!(consumed.rsto, 1);
    }

    #[test]
    fn all_powered_off_and_excluded_reports_no_vms() {
        let rows = InventoryRows {
            vm_info: vec![
                vm("a", "poweredOff", 2, 1024.0, 1024.0),
                vm("b", "poweredOff", 2, 1024.0, 1024.0),
            ],
            ..Default::default()
        };
        let scoped = scoped(rows, ScopeOptions::default());
        for (policy, result) in summarize_all(&scoped).iter() {
            assert!(
                matches!(result, Err(ScopeError::NoVms { policy: p }) if *p == policy),
                "{policy}: {result:?}"
            );
        }
    }

    #[test]
    fn zero_vm_scope_is_an_explicit_error() {
        let rows = InventoryRows {
            vm_info: vec![vm("only", "poweredOn", 2, 1024.0, 1024.0)],
            ..Default::default()
        };
        let scoped = scoped(rows, ScopeOptions::shared(false, ["only"]));
        let all = summarize_all(&scoped);
        for (policy, result) in all.iter() {
            assert!(
                matches!(result, Err(ScopeError::NoVms { policy: p }) if *p == policy),
                "{policy}: {result:?}"
            );
        }
    }
}
