use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use hashbrown::{HashMap, HashSet};

use crate::env::{Env, EnvFrame};
use crate::value::Value;

/// Registry size below which expired entries are not pruned on allocation.
const PRUNE_FLOOR: usize = 1024;

/// External pin counts, keyed by frame address.
#[derive(Default)]
pub struct RootTable {
    counts: RefCell<HashMap<usize, (Weak<EnvFrame>, usize)>>,
}

impl RootTable {
    fn pin(&self, env: &Env) {
        let mut counts = self.counts.borrow_mut();
        let entry = counts
            .entry(env.addr())
            .or_insert_with(|| (Rc::downgrade(&env.0), 0));
        entry.1 += 1;
    }

    fn unpin(&self, env: &Env) {
        let mut counts = self.counts.borrow_mut();
        if let Some(entry) = counts.get_mut(&env.addr()) {
            entry.1 -= 1;
            if entry.1 == 0 {
                counts.remove(&env.addr());
            }
        }
    }

    pub fn count(&self, env: &Env) -> usize {
        self.counts
            .borrow()
            .get(&env.addr())
            .map_or(0, |(_, count)| *count)
    }

    fn live_roots(&self) -> Vec<Env> {
        self.counts
            .borrow()
            .values()
            .filter(|(_, count)| *count > 0)
            .filter_map(|(weak, _)| weak.upgrade().map(Env))
            .collect()
    }
}

/// Keeps an environment alive across collections for as long as it exists.
pub struct EnvRoot {
    env: Env,
    table: Rc<RootTable>,
}

impl EnvRoot {
    pub fn env(&self) -> &Env {
        &self.env
    }
}

impl Clone for EnvRoot {
    fn clone(&self) -> Self {
        self.table.pin(&self.env);
        EnvRoot {
            env: self.env.clone(),
            table: self.table.clone(),
        }
    }
}

impl Drop for EnvRoot {
    fn drop(&mut self) {
        self.table.unpin(&self.env);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Environments reached from the roots.
    pub marked: usize,
    /// Unreachable environments whose links were severed.
    pub swept: usize,
    /// Live registered environments after the sweep.
    pub registered: usize,
}

/// Tracks every environment the evaluator allocates so cycles through
/// closures can be found and broken.
pub struct Heap {
    registry: RefCell<Vec<Weak<EnvFrame>>>,
    roots: Rc<RootTable>,
    constructed: Cell<usize>,
    prune_at: Cell<usize>,
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            registry: RefCell::new(Vec::new()),
            roots: Rc::new(RootTable::default()),
            constructed: Cell::new(0),
            prune_at: Cell::new(PRUNE_FLOOR),
        }
    }

    /// Allocate and register a new environment.
    pub fn alloc(&self, parent: Option<Env>) -> Env {
        let env = Env::new(parent);
        let mut registry = self.registry.borrow_mut();
        if registry.len() >= self.prune_at.get() {
            registry.retain(|weak| weak.strong_count() > 0);
            self.prune_at.set((registry.len() * 2).max(PRUNE_FLOOR));
        }
        registry.push(Rc::downgrade(&env.0));
        self.constructed.set(self.constructed.get() + 1);
        tracing::trace!(target: "vau::env", env = ?env, "allocated environment");
        env
    }

    pub fn root(&self, env: &Env) -> EnvRoot {
        self.roots.pin(env);
        EnvRoot {
            env: env.clone(),
            table: self.roots.clone(),
        }
    }

    pub fn root_count(&self, env: &Env) -> usize {
        self.roots.count(env)
    }

    /// Environments ever allocated through this heap.
    pub fn constructed_count(&self) -> usize {
        self.constructed.get()
    }

    /// Registered environments that are still alive.
    pub fn registered_count(&self) -> usize {
        self.registry
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Mark from `extra_roots` and every pinned environment, then sever every
    /// registered environment that was not reached.
    pub fn collect(&self, extra_roots: &[Env]) -> CollectStats {
        let mut marker = Marker::default();
        for env in extra_roots.iter().cloned().chain(self.roots.live_roots()) {
            marker.mark_env(env);
        }
        marker.process_worklist();

        let doomed: Vec<Env> = {
            let mut registry = self.registry.borrow_mut();
            registry.retain(|weak| weak.strong_count() > 0);
            registry
                .iter()
                .filter_map(|weak| weak.upgrade().map(Env))
                .filter(|env| !marker.envs.contains(&env.addr()))
                .collect()
        };
        for env in &doomed {
            env.sever();
        }
        let swept = doomed.len();
        drop(doomed);

        let registered = {
            let mut registry = self.registry.borrow_mut();
            registry.retain(|weak| weak.strong_count() > 0);
            registry.len()
        };
        let stats = CollectStats {
            marked: marker.envs.len(),
            swept,
            registered,
        };
        tracing::debug!(
            target: "vau::gc",
            marked = stats.marked,
            swept = stats.swept,
            registered = stats.registered,
            "collection finished"
        );
        stats
    }

    /// Sever every registered environment, rooted or not. For teardown of
    /// the owning interpreter; returns how many were severed.
    pub fn sever_all(&self) -> usize {
        let live: Vec<Env> = self
            .registry
            .borrow()
            .iter()
            .filter_map(|weak| weak.upgrade().map(Env))
            .collect();
        for env in &live {
            env.sever();
        }
        let severed = live.len();
        drop(live);
        self.registry
            .borrow_mut()
            .retain(|weak| weak.strong_count() > 0);
        tracing::debug!(target: "vau::gc", severed, "released all environments");
        severed
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct Marker {
    envs: HashSet<usize>,
    values: HashSet<usize>,
    env_worklist: Vec<Env>,
    value_worklist: Vec<Value>,
}

impl Marker {
    fn mark_env(&mut self, env: Env) {
        if self.envs.insert(env.addr()) {
            self.env_worklist.push(env);
        }
    }

    fn mark_value(&mut self, value: Value) {
        let addr = match &value {
            Value::Pair(p) => Rc::as_ptr(p) as usize,
            Value::Operative(op) => Rc::as_ptr(op) as usize,
            Value::Mutable(m) => Rc::as_ptr(m) as usize,
            Value::Environment(env) => {
                self.mark_env(env.clone());
                return;
            }
            _ => return,
        };
        if self.values.insert(addr) {
            self.value_worklist.push(value);
        }
    }

    fn process_worklist(&mut self) {
        loop {
            if let Some(env) = self.env_worklist.pop() {
                for value in env.local_values() {
                    self.mark_value(value);
                }
                if let Some(parent) = env.parent() {
                    self.mark_env(parent);
                }
            } else if let Some(value) = self.value_worklist.pop() {
                match &value {
                    Value::Pair(p) => {
                        self.mark_value(p.head.clone());
                        self.mark_value(p.tail.clone());
                    }
                    Value::Operative(op) => {
                        self.mark_env(op.closure.clone());
                        self.mark_value(op.body.clone());
                    }
                    Value::Mutable(m) => self.mark_value(m.get()),
                    _ => {}
                }
            } else {
                break;
            }
        }
    }
}
