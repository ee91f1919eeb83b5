use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use pgen_schemas::{ItemKey, RequesterId};

use crate::{SupplyError, SupplySource};

/// In-process supply: per-requester balances behind one mutex.
///
/// `set_online(false)` makes it report [`SupplyError::Unavailable`];
/// `fail_commits(true)` makes every commit fail after a successful simulate.
#[derive(Debug)]
pub struct MemorySupply {
    name: String,
    online: AtomicBool,
    failing: AtomicBool,
    balances: Mutex<HashMap<(RequesterId, ItemKey), u64>>,
}

impl MemorySupply {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            online: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            balances: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(RequesterId, ItemKey), u64>> {
        self.balances.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn credit(&self, requester: &RequesterId, unit: &ItemKey, quantity: u64) {
        let mut map = self.lock();
        let slot = map.entry((*requester, unit.clone())).or_insert(0);
        *slot = slot.saturating_add(quantity);
    }

    pub fn balance(&self, requester: &RequesterId, unit: &ItemKey) -> u64 {
        self.lock()
            .get(&(*requester, unit.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn fail_commits(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), SupplyError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SupplyError::Unavailable {
                source: self.name.clone(),
                reason: "offline".to_string(),
            })
        }
    }
}

impl SupplySource for MemorySupply {
    fn name(&self) -> &str {
        &self.name
    }

    fn simulate_debit(
        &self,
        requester: &RequesterId,
        unit: &ItemKey,
        _quantity: u64,
    ) -> Result<u64, SupplyError> {
        self.check_online()?;
        Ok(self.balance(requester, unit))
    }

    fn commit_debit(
        &self,
        requester: &RequesterId,
        unit: &ItemKey,
        quantity: u64,
    ) -> Result<(), SupplyError> {
        self.check_online()?;
        if self.failing.load(Ordering::SeqCst) {
            return Err(SupplyError::CommitFailed {
                source: self.name.clone(),
                reason: "injected failure".to_string(),
            });
        }
        let mut map = self.lock();
        let slot = map.entry((*requester, unit.clone())).or_insert(0);
        if *slot < quantity {
            return Err(SupplyError::CommitFailed {
                source: self.name.clone(),
                reason: format!("balance {} below {quantity}", *slot),
            });
        }
        *slot -= quantity;
        Ok(())
    }
}
