//! The IR module — the aggregate the whole pipeline operates on.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::arena::{Arena, Handle, UniqueArena};
use crate::block::Block;
use crate::constant::ConstantStore;
use crate::func::Function;
use crate::inst::{Instruction, Op};
use crate::types::Type;
use crate::value::Value;

/// A Shade IR module.
///
/// Owns every entity arena plus a root block holding the module-scope
/// declarations (`var`, `let`, `override`). The front end mutates a module
/// up to the validation gate; downstream consumers treat it as immutable.
#[derive(Clone, Debug)]
pub struct Module {
    /// Interned type arena.
    pub types: UniqueArena<Type>,
    /// Interned constant store.
    pub constants: ConstantStore,
    /// All values.
    pub values: Arena<Value>,
    /// All instructions.
    pub instructions: Arena<Instruction>,
    /// All blocks.
    pub blocks: Arena<Block>,
    /// Functions in declaration order.
    pub functions: Arena<Function>,
    /// The module-scope block.
    pub root_block: Handle<Block>,
    /// Debug names for values.
    pub names: HashMap<Handle<Value>, String>,
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

impl Module {
    /// Creates an empty module with a fresh root block.
    pub fn new() -> Self {
        let mut blocks = Arena::new();
        let root_block = blocks.append(Block {
            params: Vec::new(),
            insts: Vec::new(),
            owner: Some(crate::block::BlockOwner::Module),
        });
        Self {
            types: UniqueArena::new(),
            constants: ConstantStore::new(),
            values: Arena::new(),
            instructions: Arena::new(),
            blocks,
            functions: Arena::new(),
            root_block,
            names: HashMap::new(),
        }
    }

    /// The debug name of a value, if one was assigned.
    pub fn name_of(&self, value: Handle<Value>) -> Option<&str> {
        self.names.get(&value).map(String::as_str)
    }

    /// All blocks reachable from a function's body, in pre-order.
    ///
    /// Uses an explicit worklist; control flow can nest arbitrarily deep.
    pub fn function_blocks(&self, func: Handle<Function>) -> Vec<Handle<Block>> {
        let mut out = Vec::new();
        let mut stack: Vec<Handle<Block>> = Vec::new();
        stack.extend(self.functions[func].block);
        while let Some(block) = stack.pop() {
            out.push(block);
            for &inst in self.blocks[block].insts.iter().rev() {
                let children = self.instructions[inst].op.child_blocks();
                for child in children.into_iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }

    /// The set of functions a function calls directly.
    pub fn callees(&self, func: Handle<Function>) -> BTreeSet<Handle<Function>> {
        let mut out = BTreeSet::new();
        for block in self.function_blocks(func) {
            for &inst in &self.blocks[block].insts {
                if let Op::UserCall { func: callee } = self.instructions[inst].op {
                    out.insert(callee);
                }
            }
        }
        out
    }

    /// Functions ordered so every callee precedes its callers.
    ///
    /// The ordering is deterministic: among ready functions, the one with
    /// the smaller handle is emitted first. Functions stuck in a call cycle
    /// are appended in handle order at the end; rejecting cycles is the
    /// validator's job, not this query's.
    pub fn dependency_order(&self) -> Vec<Handle<Function>> {
        let n = self.functions.len();
        let mut callers: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut pending = vec![0usize; n];

        for (handle, _) in self.functions.iter() {
            for callee in self.callees(handle) {
                pending[handle.index()] += 1;
                callers[callee.index()].push(handle.index());
            }
        }

        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
        let mut order: Vec<Handle<Function>> = Vec::with_capacity(n);
        let mut emitted = vec![false; n];

        while let Some(&idx) = ready.iter().next() {
            ready.remove(&idx);
            emitted[idx] = true;
            order.push(Handle::new(idx as u32));
            for &caller in &callers[idx] {
                pending[caller] -= 1;
                if pending[caller] == 0 {
                    ready.insert(caller);
                }
            }
        }

        for (idx, done) in emitted.iter().enumerate() {
            if !done {
                order.push(Handle::new(idx as u32));
            }
        }
        order
    }

    /// Values that were never attached to a producing instruction.
    ///
    /// Useful for asserting builder hygiene in tests.
    pub fn detached_results(&self) -> Vec<Handle<Value>> {
        self.values
            .iter()
            .filter_map(|(handle, value)| match value.kind {
                crate::value::ValueKind::InstructionResult { inst: None } => Some(handle),
                _ => None,
            })
            .collect()
    }

    /// Entry points, in declaration order.
    pub fn entry_points(&self) -> impl Iterator<Item = (Handle<Function>, &Function)> {
        self.functions.iter().filter(|(_, f)| f.is_entry_point())
    }
}

/// Tracks the set of instructions a traversal has visited.
///
/// Backed by a plain bit vector over the instruction arena; the validator
/// uses it for orphaned-instruction detection.
#[derive(Clone, Debug)]
pub struct InstVisitSet {
    visited: Vec<bool>,
}

impl InstVisitSet {
    /// Creates a set sized for the module's instruction arena.
    pub fn for_module(module: &Module) -> Self {
        Self {
            visited: vec![false; module.instructions.len()],
        }
    }

    /// Marks an instruction visited; returns `false` if it already was.
    pub fn visit(&mut self, inst: Handle<Instruction>) -> bool {
        let slot = &mut self.visited[inst.index()];
        let fresh = !*slot;
        *slot = true;
        fresh
    }

    /// Returns `true` if the instruction has been visited.
    pub fn contains(&self, inst: Handle<Instruction>) -> bool {
        self.visited[inst.index()]
    }

    /// Handles of instructions never visited.
    pub fn unvisited(&self, module: &Module) -> Vec<Handle<Instruction>> {
        module
            .instructions
            .iter()
            .filter(|(h, _)| !self.visited[h.index()])
            .map(|(h, _)| h)
            .collect()
    }
}

/// Dead-simple reachability over the call graph: every function reachable
/// from `roots` by following direct calls.
pub fn transitive_callees(
    module: &Module,
    roots: &[Handle<Function>],
) -> HashSet<Handle<Function>> {
    let mut seen: HashSet<Handle<Function>> = roots.iter().copied().collect();
    let mut stack: Vec<Handle<Function>> = roots.to_vec();
    while let Some(func) = stack.pop() {
        for callee in module.callees(func) {
            if seen.insert(callee) {
                stack.push(callee);
            }
        }
    }
    seen
}
