//! Scope filter: derives the per-policy working views of an inventory.
//!
//! Powered-off handling runs once, before any policy-specific exclusion. Every
//! policy then splits the same base view by its own exclusion set, so the three
//! views are independent and never partitions of one filtering pass. Memory
//! and partition rows only count when their VM is in the kept vInfo view.

use std::collections::HashSet;

use arrow::array::StringArray;
use rvsizer_schema::{Inventory, SchemaError, VmInfo, VmKeyed};
use rvsizer_types::{ExclusionSet, PerPolicy, Policy, PowerState, ScopeOptions};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("no VMs remain in scope for the {policy} policy")]
    NoVms { policy: Policy },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Kept and removed views for one policy.
#[derive(Clone, Debug)]
pub struct PolicyScope {
    pub policy: Policy,
    pub kept: Inventory,
    /// Rows dropped by the policy's exclusion set (audit view).
    pub removed: Inventory,
    /// Memory and partition rows whose VM is not in the kept vInfo view.
    pub unmatched: Inventory,
    /// In-use MiB of kept powered-off VMs that report no partitions.
    pub carried_in_use_mib: f64,
}

#[derive(Clone, Debug)]
pub struct ScopedInventory {
    /// Powered-off VMs in the loaded inventory, counted before any filtering.
    pub powered_off_count: usize,
    pub powered_off_excluded: bool,
    /// Rows removed because their VM is powered off (empty unless excluded).
    pub powered_off: Inventory,
    pub scopes: PerPolicy<PolicyScope>,
}

impl ScopedInventory {
    pub fn scope(&self, policy: Policy) -> &PolicyScope {
        self.scopes.get(policy)
    }
}

/// Apply power-state and name exclusions for every policy.
pub fn apply(inventory: &Inventory, options: &ScopeOptions) -> Result<ScopedInventory, ScopeError> {
    let off = powered_off_vms(&inventory.vm_info)?;
    let powered_off_count = off.len();

    let (powered_off, base) = if options.exclude_powered_off {
        inventory.partition_by_vm(|name| off.contains(name))?
    } else {
        (Inventory::empty(), inventory.clone())
    };

    let scopes = PerPolicy::try_from_fn(|policy| {
        scope_for(policy, &base, options.exclusions.get(policy))
    })?;

    info!(
        powered_off = powered_off_count,
        excluded = options.exclude_powered_off,
        "scoped inventory"
    );
    Ok(ScopedInventory {
        powered_off_count,
        powered_off_excluded: options.exclude_powered_off,
        powered_off,
        scopes,
    })
}

fn scope_for(
    policy: Policy,
    base: &Inventory,
    excluded: &ExclusionSet,
) -> Result<PolicyScope, ScopeError> {
    let (removed, named) = base.partition_by_vm(|name| excluded.contains(name))?;
    let (kept, unmatched) = join_on_vm_info(named)?;
    let carried_in_use_mib = carried_in_use_mib(&kept)?;
    debug!(
        %policy,
        kept = kept.vm_count(),
        removed = removed.vm_count(),
        unmatched_memory = unmatched.memory.num_rows(),
        unmatched_partitions = unmatched.partitions.num_rows(),
        carried_in_use_mib,
        "policy scope"
    );
    Ok(PolicyScope {
        policy,
        kept,
        removed,
        unmatched,
        carried_in_use_mib,
    })
}

/// Left join anchored on vInfo: (joined view, memory/partition rows with no VM).
fn join_on_vm_info(view: Inventory) -> Result<(Inventory, Inventory), SchemaError> {
    let (memory, orphan_memory, partitions, orphan_partitions) = {
        let known = vm_names(view.vm_info.vm()?);
        let (memory, orphan_memory) = view.memory.partition_by_vm(|name| known.contains(name))?;
        let (partitions, orphan_partitions) =
            view.partitions.partition_by_vm(|name| known.contains(name))?;
        (memory, orphan_memory, partitions, orphan_partitions)
    };
    Ok((
        Inventory {
            vm_info: view.vm_info,
            memory,
            partitions,
        },
        Inventory {
            vm_info: VmInfo::empty(),
            memory: orphan_memory,
            partitions: orphan_partitions,
        },
    ))
}

/// Names of VMs whose power state is off.
pub fn powered_off_vms(vm_info: &VmInfo) -> Result<HashSet<String>, SchemaError> {
    let names = vm_info.vm()?;
    let states = vm_info.powerstate()?;
    Ok((0..vm_info.num_rows())
        .filter(|&i| PowerState::parse(states.value(i)).is_off())
        .map(|i| names.value(i).to_string())
        .collect())
}

/// Distinct non-null names of a VM key column.
pub fn vm_names(column: &StringArray) -> HashSet<&str> {
    column.iter().flatten().collect()
}

fn carried_in_use_mib(kept: &Inventory) -> Result<f64, SchemaError> {
    let reporting = vm_names(kept.partitions.vm()?);
    let info = &kept.vm_info;
    let (names, states, in_use) = (info.vm()?, info.powerstate()?, info.in_use_mib()?);
    Ok((0..info.num_rows())
        .filter(|&i| PowerState::parse(states.value(i)).is_off())
        .filter(|&i| !reporting.contains(names.value(i)))
        .map(|i| in_use.value(i))
        .sum())
}
