//! The module validator.
//!
//! Validation runs in two phases over one pass of the module:
//!
//! 1. A structural pass driven by an explicit task list (never recursion;
//!    control flow can nest deeper than any native stack): blocks push
//!    lexical scopes, instructions are checked for operand/result shape and
//!    scope visibility, and a control stack tracks active `if`/`loop`/
//!    `switch` nesting for exit checking.
//! 2. A semantic pass over the instructions the structural pass visited,
//!    re-deriving every result type from the overload tables and comparing
//!    it against the declared type.
//!
//! Global passes follow: usage-record consistency, orphaned instructions,
//! the recursion ban, discard reachability, shader-IO rules, and binding
//! rules. Diagnostics accumulate; the caller gets every discoverable error
//! in one run.

use std::collections::{HashMap, HashSet};

use shade_ir::{
    dump_module, transitive_callees, ArraySize, Block, Function, Handle, InstVisitSet,
    Instruction, Module, Op, Stage, Type, TypeInner, Usage, Value, ValueKind,
};

use crate::capabilities::Capabilities;
use crate::diag::{DiagKind, Diagnostic, ValidationError};
use crate::{io, overload};

/// Validates a module against the given capability set.
///
/// On failure the error carries every diagnostic found plus a disassembly
/// of the module.
pub fn validate(module: &Module, capabilities: Capabilities) -> Result<(), ValidationError> {
    let mut validator = Validator::new(module, capabilities);
    validator.run();
    if validator.diags.is_empty() {
        Ok(())
    } else {
        log::debug!(
            "validation failed with {} diagnostic(s)",
            validator.diags.len()
        );
        Err(ValidationError {
            diagnostics: validator.diags,
            disassembly: dump_module(module),
        })
    }
}

/// Which region of its control instruction a block is.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Region {
    IfArm,
    LoopInitializer,
    LoopBody,
    LoopContinuing,
    SwitchCase,
}

/// One active control instruction on the control stack.
#[derive(Clone, Copy, Debug)]
struct ControlFrame {
    inst: Handle<Instruction>,
    region: Region,
}

/// A pending unit of traversal work. Tasks are processed LIFO so nested
/// blocks complete before their parent block continues.
enum Task {
    OpenBlock {
        block: Handle<Block>,
        frame: Option<ControlFrame>,
        /// Scopes the matching close pops. Loop child blocks nest their
        /// scopes, so only the last child pops the whole chain.
        pop_scopes: usize,
    },
    CheckInst {
        block: Handle<Block>,
        inst: Handle<Instruction>,
        is_last: bool,
    },
    /// Declares a control instruction's results after its children.
    DeclareResults { inst: Handle<Instruction> },
    CloseBlock {
        pop_scopes: usize,
        pop_control: bool,
    },
}

struct Validator<'a> {
    module: &'a Module,
    caps: Capabilities,
    diags: Vec<Diagnostic>,

    // Lexical scope tracking.
    in_scope: HashSet<Handle<Value>>,
    scope_frames: Vec<Vec<Handle<Value>>>,

    control: Vec<ControlFrame>,
    tasks: Vec<Task>,

    visited: InstVisitSet,
    visited_blocks: Vec<bool>,
    ordered: Vec<Handle<Instruction>>,

    current_function: Option<Handle<Function>>,
    discard_functions: HashSet<Handle<Function>>,

    // Loop-continuing approximation: loops whose body has hit its first
    // direct `continue`, and the values defined after it.
    seen_continue: HashSet<Handle<Instruction>>,
    loop_poisoned: HashMap<Handle<Instruction>, HashSet<Handle<Value>>>,
}

impl<'a> Validator<'a> {
    fn new(module: &'a Module, caps: Capabilities) -> Self {
        Self {
            module,
            caps,
            diags: Vec::new(),
            in_scope: HashSet::new(),
            scope_frames: Vec::new(),
            control: Vec::new(),
            tasks: Vec::new(),
            visited: InstVisitSet::for_module(module),
            visited_blocks: vec![false; module.blocks.len()],
            ordered: Vec::new(),
            current_function: None,
            discard_functions: HashSet::new(),
            seen_continue: HashSet::new(),
            loop_poisoned: HashMap::new(),
        }
    }

    fn run(&mut self) {
        // Module root block.
        self.walk(self.module.root_block, None);

        // Root declarations stay visible for every function.
        self.push_scope();
        if let Some(root) = self.module.blocks.try_get(self.module.root_block) {
            for &inst in &root.insts {
                if let Some(record) = self.module.instructions.try_get(inst) {
                    for &result in &record.results {
                        self.declare_quiet(result);
                    }
                }
            }
        }

        // Function bodies.
        for (handle, func) in self.module.functions.iter() {
            self.current_function = Some(handle);
            let Some(body) = func.block else {
                self.error(
                    DiagKind::Structural,
                    None,
                    format!(
                        "function '{}' has no body block",
                        func.name.as_deref().unwrap_or("_")
                    ),
                );
                continue;
            };
            self.push_scope();
            for &param in &func.params {
                self.check_function_param(handle, param);
            }
            self.walk(body, None);
            self.pop_scope();
        }
        self.current_function = None;
        self.pop_scope();

        // Global passes.
        self.check_values();
        self.check_constants();
        self.check_orphans();
        self.check_recursion();
        self.check_discards();
        self.check_type_capabilities();
        io::check_entry_points(self.module, self.caps, &mut self.diags);
        io::check_bindings(self.module, self.caps, &mut self.diags);

        // Semantic pass over everything the structural pass visited.
        let ordered = std::mem::take(&mut self.ordered);
        for inst in ordered {
            self.check_semantics(inst);
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics and scope helpers
    // ------------------------------------------------------------------

    fn error(
        &mut self,
        kind: DiagKind,
        inst: Option<Handle<Instruction>>,
        message: impl Into<String>,
    ) {
        self.diags.push(Diagnostic {
            kind,
            message: message.into(),
            inst,
        });
    }

    fn push_scope(&mut self) {
        self.scope_frames.push(Vec::new());
    }

    fn pop_scope(&mut self) {
        let frame = self.scope_frames.pop().expect("scope stack underflow");
        for value in frame {
            self.in_scope.remove(&value);
        }
    }

    /// Declares a value in the innermost scope; `false` if already declared.
    fn declare(&mut self, value: Handle<Value>) -> bool {
        if !self.in_scope.insert(value) {
            return false;
        }
        self.scope_frames
            .last_mut()
            .expect("a scope is always active during traversal")
            .push(value);
        true
    }

    /// Declares without caring whether the value was declared before.
    fn declare_quiet(&mut self, value: Handle<Value>) {
        self.declare(value);
    }

    fn value_name(&self, value: Handle<Value>) -> String {
        match self.module.name_of(value) {
            Some(name) => format!("%{name}"),
            None => format!("%{}", value.index()),
        }
    }

    // ------------------------------------------------------------------
    // Structural pass
    // ------------------------------------------------------------------

    /// Walks one block tree with the task list.
    fn walk(&mut self, block: Handle<Block>, frame: Option<ControlFrame>) {
        debug_assert!(self.tasks.is_empty());
        self.tasks.push(Task::OpenBlock {
            block,
            frame,
            pop_scopes: 1,
        });
        while let Some(task) = self.tasks.pop() {
            match task {
                Task::OpenBlock {
                    block,
                    frame,
                    pop_scopes,
                } => self.open_block(block, frame, pop_scopes),
                Task::CheckInst {
                    block,
                    inst,
                    is_last,
                } => self.check_inst(block, inst, is_last),
                Task::DeclareResults { inst } => self.declare_results(inst),
                Task::CloseBlock {
                    pop_scopes,
                    pop_control,
                } => {
                    if pop_control {
                        self.control.pop();
                    }
                    for _ in 0..pop_scopes {
                        self.pop_scope();
                    }
                }
            }
        }
    }

    fn open_block(&mut self, block: Handle<Block>, frame: Option<ControlFrame>, pop_scopes: usize) {
        // Push the scope, the control frame, and the matching close task
        // up front so the stacks stay balanced on malformed input.
        let pop_control = frame.is_some();
        if let Some(frame) = frame {
            self.control.push(frame);
        }
        self.push_scope();
        self.tasks.push(Task::CloseBlock {
            pop_scopes,
            pop_control,
        });

        let Some(record) = self.module.blocks.try_get(block) else {
            self.error(
                DiagKind::Structural,
                None,
                format!("block handle {block:?} is out of bounds"),
            );
            return;
        };
        if std::mem::replace(&mut self.visited_blocks[block.index()], true) {
            self.error(
                DiagKind::Structural,
                None,
                format!("block {block:?} is owned by more than one place"),
            );
            return;
        }

        // Block parameters: only multi-in regions may declare them.
        let params_allowed = matches!(
            frame.map(|f| f.region),
            Some(Region::LoopBody | Region::LoopContinuing | Region::SwitchCase)
        );
        if !record.params.is_empty() && !params_allowed {
            self.error(
                DiagKind::Structural,
                None,
                format!("block {block:?} cannot declare parameters"),
            );
        }
        for &param in &record.params {
            match self.module.values.try_get(param) {
                None => self.error(
                    DiagKind::Structural,
                    None,
                    format!("block parameter {param:?} is out of bounds"),
                ),
                Some(value) => match value.kind {
                    ValueKind::BlockParam { block: owner } if owner == block => {
                        if !self.declare(param) {
                            let name = self.value_name(param);
                            self.error(
                                DiagKind::Structural,
                                None,
                                format!("value {name} is declared more than once"),
                            );
                        }
                    }
                    _ => {
                        let name = self.value_name(param);
                        self.error(
                            DiagKind::Structural,
                            None,
                            format!("value {name} is not a parameter of block {block:?}"),
                        );
                    }
                },
            }
        }

        // Terminator presence. The module root block is declaration-only
        // and exempt.
        let is_root = block == self.module.root_block;
        if !is_root {
            let terminated = record
                .insts
                .last()
                .and_then(|&inst| self.module.instructions.try_get(inst))
                .is_some_and(|record| record.op.is_terminator());
            if !terminated {
                self.error(
                    DiagKind::Structural,
                    None,
                    format!("block {block:?} is missing a terminator"),
                );
            }
        }

        let len = record.insts.len();
        for (index, &inst) in record.insts.iter().enumerate().rev() {
            self.tasks.push(Task::CheckInst {
                block,
                inst,
                is_last: index + 1 == len,
            });
        }
    }

    fn check_inst(&mut self, block: Handle<Block>, inst: Handle<Instruction>, is_last: bool) {
        let Some(record) = self.module.instructions.try_get(inst) else {
            self.error(
                DiagKind::Structural,
                None,
                format!("instruction handle {inst:?} is out of bounds"),
            );
            return;
        };
        if !self.visited.visit(inst) {
            self.error(
                DiagKind::Structural,
                Some(inst),
                "instruction appears in more than one block",
            );
            return;
        }
        self.ordered.push(inst);

        if record.block != Some(block) {
            self.error(
                DiagKind::Structural,
                Some(inst),
                format!(
                    "instruction is not owned by the block that contains it (claims {:?})",
                    record.block
                ),
            );
        }
        if record.op.is_terminator() && !is_last {
            self.error(
                DiagKind::Structural,
                Some(inst),
                "terminator must be the last instruction in its block",
            );
        }

        let is_root = block == self.module.root_block;
        if is_root && !matches!(record.op, Op::Var { .. } | Op::Let | Op::Override { .. }) {
            self.error(
                DiagKind::Structural,
                Some(inst),
                format!(
                    "'{}' is not allowed in the module root block; only var, let, and override are",
                    record.op.name()
                ),
            );
        }

        // Capability-gated instructions.
        match record.op {
            Op::Phony if !self.caps.contains(Capabilities::ALLOW_PHONY_INSTRUCTIONS) => {
                self.error(
                    DiagKind::Semantic,
                    Some(inst),
                    "phony instructions require the phony-instructions capability",
                );
            }
            Op::Override { .. } if !self.caps.contains(Capabilities::ALLOW_OVERRIDES) => {
                self.error(
                    DiagKind::Semantic,
                    Some(inst),
                    "override declarations require the overrides capability",
                );
            }
            Op::Let if is_root && !self.caps.contains(Capabilities::ALLOW_MODULE_SCOPE_LETS) => {
                self.error(
                    DiagKind::Semantic,
                    Some(inst),
                    "module-scope let declarations require the module-scope-lets capability",
                );
            }
            _ => {}
        }

        // Operands: existence, usage records, scope.
        for (index, &operand) in record.operands.iter().enumerate() {
            match self.module.values.try_get(operand) {
                None => self.error(
                    DiagKind::Structural,
                    Some(inst),
                    format!("operand {index} references a value outside the module"),
                ),
                Some(value) => {
                    let usage = Usage {
                        inst,
                        operand: index as u32,
                    };
                    if !value.uses.contains(&usage) {
                        let name = self.value_name(operand);
                        self.error(
                            DiagKind::Structural,
                            Some(inst),
                            format!("operand {name} has no matching usage record"),
                        );
                    }
                    if !value.is_constant() && !self.in_scope.contains(&operand) {
                        let name = self.value_name(operand);
                        self.error(
                            DiagKind::Structural,
                            Some(inst),
                            format!("operand {name} is not in scope"),
                        );
                    }
                    if self.poisoned_in_context(operand) {
                        let name = self.value_name(operand);
                        self.error(
                            DiagKind::Structural,
                            Some(inst),
                            format!(
                                "value {name} is used in the continuing block but created after the loop's first continue"
                            ),
                        );
                    }
                }
            }
        }

        // Results: back-reference integrity.
        for &result in &record.results {
            match self.module.values.try_get(result) {
                None => self.error(
                    DiagKind::Structural,
                    Some(inst),
                    format!("result {result:?} references a value outside the module"),
                ),
                Some(value) => match value.kind {
                    ValueKind::InstructionResult { inst: Some(owner) } if owner == inst => {}
                    ValueKind::InstructionResult { inst: Some(_) } => {
                        let name = self.value_name(result);
                        self.error(
                            DiagKind::Structural,
                            Some(inst),
                            format!("result {name} claims a different producing instruction"),
                        );
                    }
                    ValueKind::InstructionResult { inst: None } => {
                        let name = self.value_name(result);
                        self.error(
                            DiagKind::Structural,
                            Some(inst),
                            format!("result {name} was never attached to its instruction"),
                        );
                    }
                    _ => {
                        let name = self.value_name(result);
                        self.error(
                            DiagKind::Structural,
                            Some(inst),
                            format!("result {name} is not an instruction-result value"),
                        );
                    }
                },
            }
        }

        self.check_placement(block, inst, record, is_last);

        if record.op.is_control() {
            // Children run first, then the results become visible.
            self.tasks.push(Task::DeclareResults { inst });
            match &record.op {
                Op::If {
                    true_block,
                    false_block,
                } => {
                    for &child in [*false_block, *true_block].iter() {
                        self.tasks.push(Task::OpenBlock {
                            block: child,
                            frame: Some(ControlFrame {
                                inst,
                                region: Region::IfArm,
                            }),
                            pop_scopes: 1,
                        });
                    }
                }
                Op::Loop {
                    initializer,
                    body,
                    continuing,
                } => {
                    // The initializer scope encloses the body scope, which
                    // encloses the continuing scope; the last child block
                    // pops them all.
                    let mut children = Vec::new();
                    if let Some(init) = initializer {
                        children.push((*init, Region::LoopInitializer));
                    }
                    children.push((*body, Region::LoopBody));
                    if let Some(cont) = continuing {
                        children.push((*cont, Region::LoopContinuing));
                    }
                    self.push_loop_children(inst, children);
                }
                Op::Switch { cases } => {
                    for case in cases.iter().rev() {
                        self.tasks.push(Task::OpenBlock {
                            block: case.block,
                            frame: Some(ControlFrame {
                                inst,
                                region: Region::SwitchCase,
                            }),
                            pop_scopes: 1,
                        });
                    }
                }
                _ => unreachable!("is_control covers exactly these"),
            }
        } else {
            self.declare_results(inst);
        }
    }

    /// Queues a loop's child blocks so their scopes nest (initializer
    /// encloses body, body encloses continuing) instead of being siblings:
    /// continuing blocks see body values, which is what makes the
    /// after-first-continue restriction a check rather than a scope rule.
    fn push_loop_children(
        &mut self,
        inst: Handle<Instruction>,
        children: Vec<(Handle<Block>, Region)>,
    ) {
        let count = children.len();
        for (position, (block, region)) in children.into_iter().enumerate().rev() {
            let is_final = position + 1 == count;
            self.tasks.push(Task::OpenBlock {
                block,
                frame: Some(ControlFrame { inst, region }),
                // The final child pops every scope the chain opened.
                pop_scopes: if is_final { count } else { 0 },
            });
        }
    }

    /// Declares an instruction's results, recording loop-body poisoning.
    fn declare_results(&mut self, inst: Handle<Instruction>) {
        let Some(record) = self.module.instructions.try_get(inst) else {
            return;
        };
        let poison_loop = match self.control.last() {
            Some(frame) if frame.region == Region::LoopBody => {
                let body = match self.module.instructions.try_get(frame.inst) {
                    Some(loop_rec) => match loop_rec.op {
                        Op::Loop { body, .. } => Some(body),
                        _ => None,
                    },
                    None => None,
                };
                if self.seen_continue.contains(&frame.inst) && record.block == body {
                    Some(frame.inst)
                } else {
                    None
                }
            }
            _ => None,
        };
        for &result in &record.results.clone() {
            if self.module.values.try_get(result).is_none() {
                continue; // already reported
            }
            if !self.declare(result) {
                let name = self.value_name(result);
                self.error(
                    DiagKind::Structural,
                    Some(inst),
                    format!("value {name} is declared more than once"),
                );
            }
            if let Some(loop_inst) = poison_loop {
                self.loop_poisoned
                    .entry(loop_inst)
                    .or_default()
                    .insert(result);
            }
        }
    }

    /// Returns `true` if the operand is used inside a continuing block and
    /// was created after the loop's first continue.
    fn poisoned_in_context(&self, operand: Handle<Value>) -> bool {
        for frame in self.control.iter().rev() {
            match frame.region {
                Region::IfArm => continue,
                Region::LoopContinuing => {
                    return self
                        .loop_poisoned
                        .get(&frame.inst)
                        .is_some_and(|set| set.contains(&operand));
                }
                _ => return false,
            }
        }
        false
    }

    fn check_function_param(&mut self, func: Handle<Function>, param: Handle<Value>) {
        match self.module.values.try_get(param) {
            None => self.error(
                DiagKind::Structural,
                None,
                format!("function parameter {param:?} is out of bounds"),
            ),
            Some(value) => match value.kind {
                ValueKind::FunctionParam { func: owner, .. } if owner == func => {
                    if !self.declare(param) {
                        let name = self.value_name(param);
                        self.error(
                            DiagKind::Structural,
                            None,
                            format!("value {name} is declared more than once"),
                        );
                    }
                }
                _ => {
                    let name = self.value_name(param);
                    self.error(
                        DiagKind::Structural,
                        None,
                        format!("value {name} is not a parameter of its claimed function"),
                    );
                }
            },
        }
    }

    // ------------------------------------------------------------------
    // Control placement
    // ------------------------------------------------------------------

    fn check_placement(
        &mut self,
        block: Handle<Block>,
        inst: Handle<Instruction>,
        record: &Instruction,
        is_last: bool,
    ) {
        match record.op {
            Op::ExitIf { if_ } => {
                if self.check_exit_target(inst, if_, "exit_if") {
                    if !matches!(
                        self.module.instructions.try_get(if_).map(|r| &r.op),
                        Some(Op::If { .. })
                    ) {
                        self.error(
                            DiagKind::Structural,
                            Some(inst),
                            "exit_if target is not an if instruction",
                        );
                    }
                }
            }
            Op::ExitLoop { loop_ } => {
                if self.check_exit_target(inst, loop_, "exit_loop") {
                    match self.target_region(loop_) {
                        Some(Region::LoopInitializer) => self.error(
                            DiagKind::Structural,
                            Some(inst),
                            "exit_loop is not allowed in a loop initializer",
                        ),
                        _ => {}
                    }
                    if !matches!(
                        self.module.instructions.try_get(loop_).map(|r| &r.op),
                        Some(Op::Loop { .. })
                    ) {
                        self.error(
                            DiagKind::Structural,
                            Some(inst),
                            "exit_loop target is not a loop instruction",
                        );
                    }
                }
            }
            Op::ExitSwitch { switch } => {
                if self.check_exit_target(inst, switch, "exit_switch") {
                    if !matches!(
                        self.module.instructions.try_get(switch).map(|r| &r.op),
                        Some(Op::Switch { .. })
                    ) {
                        self.error(
                            DiagKind::Structural,
                            Some(inst),
                            "exit_switch target is not a switch instruction",
                        );
                    }
                }
            }
            Op::Continue { loop_ } => {
                match self.innermost_non_if() {
                    Some(frame) if frame.inst == loop_ && frame.region == Region::LoopBody => {
                        // The first continue starts the restriction on what
                        // the continuing block may use from the body.
                        self.seen_continue.insert(loop_);
                    }
                    Some(frame) if frame.inst == loop_ => self.error(
                        DiagKind::Structural,
                        Some(inst),
                        "continue is only allowed inside the loop body",
                    ),
                    Some(_) => self.error(
                        DiagKind::Structural,
                        Some(inst),
                        "continue jumps over other control instructions",
                    ),
                    None => self.error(
                        DiagKind::Structural,
                        Some(inst),
                        "continue outside of any loop",
                    ),
                }
            }
            Op::NextIteration { loop_ } => match self.innermost_non_if() {
                Some(frame)
                    if frame.inst == loop_
                        && matches!(
                            frame.region,
                            Region::LoopInitializer | Region::LoopContinuing
                        ) => {}
                Some(frame) if frame.inst == loop_ => self.error(
                    DiagKind::Structural,
                    Some(inst),
                    "next_iteration is only allowed in a loop initializer or continuing block",
                ),
                Some(_) => self.error(
                    DiagKind::Structural,
                    Some(inst),
                    "next_iteration jumps over other control instructions",
                ),
                None => self.error(
                    DiagKind::Structural,
                    Some(inst),
                    "next_iteration outside of any loop",
                ),
            },
            Op::BreakIf { loop_ } => {
                let continuing = match self.module.instructions.try_get(loop_).map(|r| &r.op) {
                    Some(Op::Loop { continuing, .. }) => *continuing,
                    _ => None,
                };
                if continuing != Some(block) || !is_last {
                    self.error(
                        DiagKind::Structural,
                        Some(inst),
                        "break_if must be the last instruction of its loop's continuing block",
                    );
                }
            }
            Op::Return { func } => {
                if self.current_function != Some(func) {
                    self.error(
                        DiagKind::Structural,
                        Some(inst),
                        "return targets a function other than the one containing it",
                    );
                }
            }
            Op::Discard => {
                if let Some(func) = self.current_function {
                    self.discard_functions.insert(func);
                }
            }
            Op::Var { .. } => {
                let is_root = block == self.module.root_block;
                if let Some(space) = self.var_space(record) {
                    if is_root && space == shade_ir::AddressSpace::Function {
                        self.error(
                            DiagKind::Semantic,
                            Some(inst),
                            "module-scope var cannot use the function address space",
                        );
                    }
                    if !is_root && space != shade_ir::AddressSpace::Function {
                        self.error(
                            DiagKind::Semantic,
                            Some(inst),
                            format!(
                                "function-scope var must use the function address space, not {space}"
                            ),
                        );
                    }
                }
            }
            Op::Override { .. } => {
                if block != self.module.root_block {
                    self.error(
                        DiagKind::Structural,
                        Some(inst),
                        "override declarations are only allowed in the module root block",
                    );
                }
            }
            _ => {}
        }
    }

    fn var_space(&self, record: &Instruction) -> Option<shade_ir::AddressSpace> {
        let result = *record.results.first()?;
        let ty = self.module.values.try_get(result)?.ty;
        match self.module.types.try_get(ty)?.inner {
            TypeInner::Pointer { space, .. } | TypeInner::Reference { space, .. } => Some(space),
            _ => None,
        }
    }

    fn innermost_non_if(&self) -> Option<&ControlFrame> {
        self.control
            .iter()
            .rev()
            .find(|frame| frame.region != Region::IfArm)
    }

    /// The region recorded for an enclosing control instruction.
    fn target_region(&self, target: Handle<Instruction>) -> Option<Region> {
        self.control
            .iter()
            .rev()
            .find(|frame| frame.inst == target)
            .map(|frame| frame.region)
    }

    /// Walks outward looking for the exit's target. Enclosing `if`s are
    /// transparent; any other intervening control instruction is an error.
    /// Returns `true` when the target was found cleanly.
    fn check_exit_target(
        &mut self,
        inst: Handle<Instruction>,
        target: Handle<Instruction>,
        what: &str,
    ) -> bool {
        if self.control.is_empty() {
            self.error(
                DiagKind::Structural,
                Some(inst),
                format!("{what} outside of any control instruction"),
            );
            return false;
        }
        for frame in self.control.iter().rev() {
            if frame.inst == target {
                return true;
            }
            if frame.region == Region::IfArm {
                continue;
            }
            self.error(
                DiagKind::Structural,
                Some(inst),
                format!("{what} jumps over other control instructions"),
            );
            return false;
        }
        self.error(
            DiagKind::Structural,
            Some(inst),
            format!("{what} target is not an enclosing control instruction"),
        );
        false
    }

    // ------------------------------------------------------------------
    // Global passes
    // ------------------------------------------------------------------

    /// Cross-checks every value's type handle, owner back-reference, and
    /// usage records against the rest of the module.
    fn check_values(&mut self) {
        for (handle, value) in self.module.values.iter() {
            if self.module.types.try_get(value.ty).is_none() {
                let name = self.value_name(handle);
                self.error(
                    DiagKind::Structural,
                    None,
                    format!("value {name} has an out-of-bounds type handle"),
                );
                continue;
            }
            match value.kind {
                ValueKind::Constant { value: constant } => {
                    match self.module.constants.try_get(constant) {
                        None => {
                            let name = self.value_name(handle);
                            self.error(
                                DiagKind::Structural,
                                None,
                                format!("value {name} wraps an out-of-bounds constant"),
                            );
                        }
                        Some(data) if data.ty() != value.ty => {
                            let name = self.value_name(handle);
                            self.error(
                                DiagKind::Structural,
                                None,
                                format!("value {name} disagrees with its constant's type"),
                            );
                        }
                        Some(_) => {}
                    }
                }
                ValueKind::InstructionResult { inst: Some(inst) } => {
                    let listed = self
                        .module
                        .instructions
                        .try_get(inst)
                        .is_some_and(|record| record.results.contains(&handle));
                    if !listed {
                        let name = self.value_name(handle);
                        self.error(
                            DiagKind::Structural,
                            None,
                            format!("result {name} is not listed by its producing instruction"),
                        );
                    }
                }
                ValueKind::InstructionResult { inst: None } => {
                    let name = self.value_name(handle);
                    self.error(
                        DiagKind::Structural,
                        None,
                        format!("result {name} was never attached to an instruction"),
                    );
                }
                ValueKind::FunctionParam { func, .. } => {
                    let listed = self
                        .module
                        .functions
                        .try_get(func)
                        .is_some_and(|f| f.params.contains(&handle));
                    if !listed {
                        let name = self.value_name(handle);
                        self.error(
                            DiagKind::Structural,
                            None,
                            format!("parameter {name} is not listed by its function"),
                        );
                    }
                }
                ValueKind::BlockParam { block } => {
                    let listed = self
                        .module
                        .blocks
                        .try_get(block)
                        .is_some_and(|b| b.params.contains(&handle));
                    if !listed {
                        let name = self.value_name(handle);
                        self.error(
                            DiagKind::Structural,
                            None,
                            format!("block parameter {name} is not listed by its block"),
                        );
                    }
                }
            }

            // Usage records must point at real operand slots, exactly once.
            let mut seen: HashSet<(Handle<Instruction>, u32)> = HashSet::new();
            for usage in &value.uses {
                if !seen.insert((usage.inst, usage.operand)) {
                    let name = self.value_name(handle);
                    self.error(
                        DiagKind::Structural,
                        None,
                        format!("value {name} has a duplicate usage record"),
                    );
                    continue;
                }
                let matches_slot = self
                    .module
                    .instructions
                    .try_get(usage.inst)
                    .and_then(|record| record.operands.get(usage.operand as usize))
                    .is_some_and(|&operand| operand == handle);
                if !matches_slot {
                    let name = self.value_name(handle);
                    self.error(
                        DiagKind::Structural,
                        None,
                        format!("value {name} has a dangling usage record"),
                    );
                }
            }
        }
    }

    /// The constant store's entries must agree with their declared types.
    fn check_constants(&mut self) {
        for (handle, constant) in self.module.constants.iter() {
            let Some(ty) = self.module.types.try_get(constant.ty()) else {
                self.error(
                    DiagKind::Structural,
                    None,
                    format!("constant {handle:?} has an out-of-bounds type handle"),
                );
                continue;
            };
            match *constant {
                shade_ir::ConstantValue::Scalar { value, .. } => {
                    if ty.inner != TypeInner::Scalar(value.scalar()) {
                        self.error(
                            DiagKind::Structural,
                            None,
                            format!("scalar constant {value} disagrees with its declared type"),
                        );
                    }
                }
                shade_ir::ConstantValue::Composite { ref elements, .. } => {
                    let expected = ty.inner.composite_element_count();
                    if expected != Some(elements.len() as u32) {
                        self.error(
                            DiagKind::Structural,
                            None,
                            format!(
                                "composite constant {handle:?} has {} element(s) but its type expects {:?}",
                                elements.len(),
                                expected
                            ),
                        );
                    }
                    for &element in elements {
                        if self.module.constants.try_get(element).is_none() {
                            self.error(
                                DiagKind::Structural,
                                None,
                                format!("composite constant {handle:?} has an out-of-bounds element"),
                            );
                        }
                    }
                }
                shade_ir::ConstantValue::Splat { value, count, .. } => {
                    let expected = ty.inner.composite_element_count();
                    if expected != Some(count) {
                        self.error(
                            DiagKind::Structural,
                            None,
                            format!(
                                "splat constant {handle:?} repeats {count} time(s) but its type expects {expected:?}"
                            ),
                        );
                    }
                    if self.module.constants.try_get(value).is_none() {
                        self.error(
                            DiagKind::Structural,
                            None,
                            format!("splat constant {handle:?} has an out-of-bounds element"),
                        );
                    }
                }
            }
        }
    }

    fn check_orphans(&mut self) {
        for inst in self.visited.unvisited(self.module) {
            self.error(
                DiagKind::Structural,
                Some(inst),
                "orphaned instruction: not reachable from any block",
            );
        }
    }

    /// No function may call itself, directly or transitively.
    fn check_recursion(&mut self) {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Grey,
            Black,
        }
        let n = self.module.functions.len();
        let mut colors = vec![Color::White; n];

        for (root, _) in self.module.functions.iter() {
            if colors[root.index()] != Color::White {
                continue;
            }
            // Iterative DFS with an explicit stack of (function, callees).
            let mut stack = vec![(root, self.module.callees(root).into_iter())];
            colors[root.index()] = Color::Grey;
            loop {
                let next_callee = match stack.last_mut() {
                    Some((_, callees)) => callees.next(),
                    None => break,
                };
                match next_callee {
                    Some(callee) => {
                        if self.module.functions.try_get(callee).is_none() {
                            self.error(
                                DiagKind::Structural,
                                None,
                                "call references a function outside the module",
                            );
                            continue;
                        }
                        match colors[callee.index()] {
                            Color::White => {
                                colors[callee.index()] = Color::Grey;
                                stack.push((callee, self.module.callees(callee).into_iter()));
                            }
                            Color::Grey => {
                                let name = self.module.functions[callee]
                                    .name
                                    .clone()
                                    .unwrap_or_else(|| format!("{callee:?}"));
                                self.error(
                                    DiagKind::Semantic,
                                    None,
                                    format!(
                                        "recursive function calls are not allowed: '{name}' calls itself transitively"
                                    ),
                                );
                            }
                            Color::Black => {}
                        }
                    }
                    None => {
                        let (func, _) = stack.pop().expect("stack is non-empty here");
                        colors[func.index()] = Color::Black;
                    }
                }
            }
        }
    }

    /// Discard terminates a fragment invocation; reaching one from any
    /// other stage is an error.
    fn check_discards(&mut self) {
        if self.discard_functions.is_empty() {
            return;
        }
        let entry_points: Vec<_> = self.module.entry_points().map(|(h, _)| h).collect();
        for entry in entry_points {
            let func = &self.module.functions[entry];
            if func.stage == Some(Stage::Fragment) {
                continue;
            }
            let reachable = transitive_callees(self.module, &[entry]);
            if reachable
                .iter()
                .any(|f| self.discard_functions.contains(f))
            {
                let name = func.name.clone().unwrap_or_else(|| "_".into());
                let stage = func.stage.expect("entry points have a stage");
                self.error(
                    DiagKind::Semantic,
                    None,
                    format!(
                        "discard is only valid in a fragment entry point; '{name}' is a {stage} entry point"
                    ),
                );
            }
        }
    }

    /// Types whose very presence needs a capability.
    fn check_type_capabilities(&mut self) {
        let module = self.module;
        for (_, ty) in module.types.iter() {
            let rendered = || shade_ir::format_type(ty, &module.types);
            match ty.inner {
                TypeInner::Reference { .. } => {
                    if !self.caps.contains(Capabilities::ALLOW_REF_TYPES) {
                        self.error(
                            DiagKind::Semantic,
                            None,
                            format!("reference types require the ref-types capability: {}", rendered()),
                        );
                    }
                }
                TypeInner::Scalar(s)
                | TypeInner::Vector { scalar: s, .. }
                | TypeInner::Matrix { scalar: s, .. }
                | TypeInner::Atomic(s) => {
                    if s.kind.is_integer() && s.width == 1
                        && !self.caps.contains(Capabilities::ALLOW_8BIT_INTEGERS)
                    {
                        self.error(
                            DiagKind::Semantic,
                            None,
                            format!("8-bit integers require the 8bit-integers capability: {}", rendered()),
                        );
                    }
                    if s.kind.is_integer() && s.width == 8
                        && !self.caps.contains(Capabilities::ALLOW_64BIT_INTEGERS)
                    {
                        self.error(
                            DiagKind::Semantic,
                            None,
                            format!("64-bit integers require the 64bit-integers capability: {}", rendered()),
                        );
                    }
                }
                TypeInner::Struct { ref members, .. } => {
                    for member in members {
                        if let Some(member_ty) = module.types.try_get(member.ty) {
                            if matches!(member_ty.inner, TypeInner::Pointer { .. })
                                && !self
                                    .caps
                                    .contains(Capabilities::ALLOW_POINTERS_IN_STRUCTURES)
                            {
                                self.error(
                                    DiagKind::Semantic,
                                    None,
                                    format!(
                                        "pointers in structures require the pointers-in-structures capability: {}",
                                        rendered()
                                    ),
                                );
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

// ----------------------------------------------------------------------
// Semantic pass
// ----------------------------------------------------------------------

impl<'a> Validator<'a> {
    fn check_semantics(&mut self, inst: Handle<Instruction>) {
        let Some(record) = self.module.instructions.try_get(inst) else {
            return;
        };
        match &record.op {
            Op::Binary { op } => {
                if !self.check_counts(inst, record, 2, Some(2), Some(1)) {
                    return;
                }
                let (Some(lhs), Some(rhs), Some(declared)) = (
                    self.operand_inner(record, 0),
                    self.operand_inner(record, 1),
                    self.result_inner(record, 0),
                ) else {
                    return;
                };
                match overload::binary_result(&self.module.types, *op, lhs, rhs) {
                    Ok(expected) => self.expect_result(inst, &expected, declared),
                    Err(message) => self.error(DiagKind::Type, Some(inst), message),
                }
            }
            Op::Unary { op } => {
                if !self.check_counts(inst, record, 1, Some(1), Some(1)) {
                    return;
                }
                let (Some(operand), Some(declared)) = (
                    self.operand_inner(record, 0),
                    self.result_inner(record, 0),
                ) else {
                    return;
                };
                match overload::unary_result(&self.module.types, *op, operand) {
                    Ok(expected) => self.expect_result(inst, &expected, declared),
                    Err(message) => self.error(DiagKind::Type, Some(inst), message),
                }
            }
            Op::BuiltinCall { builtin } => {
                if record.results.len() != 1 {
                    self.error(
                        DiagKind::Structural,
                        Some(inst),
                        "builtin call must have exactly one result",
                    );
                    return;
                }
                let mut args = Vec::with_capacity(record.operands.len());
                for index in 0..record.operands.len() {
                    match self.operand_inner(record, index) {
                        Some(inner) => args.push(inner),
                        None => return,
                    }
                }
                let Some(declared) = self.result_inner(record, 0) else {
                    return;
                };
                match overload::builtin_result(&self.module.types, *builtin, &args) {
                    Ok(expected) => self.expect_result(inst, &expected, declared),
                    Err(message) => self.error(DiagKind::Type, Some(inst), message),
                }
            }
            Op::Convert => {
                if !self.check_counts(inst, record, 1, Some(1), Some(1)) {
                    return;
                }
                let (Some(from), Some(to)) = (
                    self.operand_inner(record, 0),
                    self.result_inner(record, 0),
                ) else {
                    return;
                };
                if let Err(message) = overload::convert_allowed(&self.module.types, from, to) {
                    self.error(DiagKind::Type, Some(inst), message);
                }
            }
            Op::Bitcast => {
                if !self.check_counts(inst, record, 1, Some(1), Some(1)) {
                    return;
                }
                let (Some(from), Some(to)) = (
                    self.operand_inner(record, 0),
                    self.result_inner(record, 0),
                ) else {
                    return;
                };
                if let Err(message) = overload::bitcast_allowed(&self.module.types, from, to) {
                    self.error(DiagKind::Type, Some(inst), message);
                }
            }
            Op::Access => self.check_access(inst, record),
            Op::Construct => self.check_construct(inst, record),
            Op::Swizzle { indices } => self.check_swizzle(inst, record, indices),
            Op::Let => {
                if !self.check_counts(inst, record, 1, Some(1), Some(1)) {
                    return;
                }
                let (Some(operand), Some(declared)) = (
                    self.operand_inner(record, 0),
                    self.result_inner(record, 0),
                ) else {
                    return;
                };
                let operand = operand.clone();
                self.expect_result(inst, &operand, declared);
            }
            Op::Load => self.check_load(inst, record),
            Op::Store => self.check_store(inst, record),
            Op::LoadVectorElement => self.check_load_vector_element(inst, record),
            Op::StoreVectorElement => self.check_store_vector_element(inst, record),
            Op::Var { .. } => self.check_var(inst, record),
            Op::Override { .. } => {
                if !self.check_counts(inst, record, 0, Some(1), Some(1)) {
                    return;
                }
                let Some(declared) = self.result_inner(record, 0) else {
                    return;
                };
                if !matches!(declared, TypeInner::Scalar(_)) {
                    self.error(
                        DiagKind::Type,
                        Some(inst),
                        "override declarations must have a scalar type",
                    );
                    return;
                }
                if !record.operands.is_empty() {
                    let declared = declared.clone();
                    if let Some(init) = self.operand_inner(record, 0) {
                        let init = init.clone();
                        self.expect_result(inst, &declared, &init);
                    }
                }
            }
            Op::Phony => {
                self.check_counts(inst, record, 1, Some(1), Some(0));
            }
            Op::Discard | Op::Unreachable => {
                self.check_counts(inst, record, 0, Some(0), Some(0));
            }
            Op::If { .. } => {
                if !self.check_counts(inst, record, 1, Some(1), None) {
                    return;
                }
                if let Some(cond) = self.operand_inner(record, 0) {
                    if *cond != TypeInner::Scalar(shade_ir::Scalar::BOOL) {
                        let found = overload::render(&self.module.types, cond);
                        self.error(
                            DiagKind::Type,
                            Some(inst),
                            format!("if condition must be bool, found {found}"),
                        );
                    }
                }
            }
            Op::Loop { .. } => {
                self.check_counts(inst, record, 0, Some(0), None);
            }
            Op::Switch { cases } => self.check_switch(inst, record, cases),
            Op::ExitIf { if_ } => self.check_exit_args(inst, record, *if_, "exit_if"),
            Op::ExitLoop { loop_ } => self.check_exit_args(inst, record, *loop_, "exit_loop"),
            Op::ExitSwitch { switch } => self.check_exit_args(inst, record, *switch, "exit_switch"),
            Op::Continue { loop_ } => {
                let Some(Op::Loop { continuing, .. }) =
                    self.module.instructions.try_get(*loop_).map(|r| &r.op)
                else {
                    return;
                };
                let params = continuing
                    .and_then(|block| self.module.blocks.try_get(block))
                    .map(|block| block.params.clone())
                    .unwrap_or_default();
                self.check_branch_args(inst, record, &record.operands, &params, "continue");
            }
            Op::NextIteration { loop_ } => {
                let Some(Op::Loop { body, .. }) =
                    self.module.instructions.try_get(*loop_).map(|r| &r.op)
                else {
                    return;
                };
                let params = self
                    .module
                    .blocks
                    .try_get(*body)
                    .map(|block| block.params.clone())
                    .unwrap_or_default();
                self.check_branch_args(inst, record, &record.operands, &params, "next_iteration");
            }
            Op::BreakIf { loop_ } => self.check_break_if(inst, record, *loop_),
            Op::Return { func } => self.check_return(inst, record, *func),
            Op::UserCall { func } => self.check_call(inst, record, *func),
        }
    }

    // ------------------------------------------------------------------
    // Semantic helpers
    // ------------------------------------------------------------------

    /// Resolves an operand's type shape, if every handle on the way is valid.
    fn operand_inner(&self, record: &Instruction, index: usize) -> Option<&'a TypeInner> {
        let &operand = record.operands.get(index)?;
        let value = self.module.values.try_get(operand)?;
        Some(&self.module.types.try_get(value.ty)?.inner)
    }

    fn result_inner(&self, record: &Instruction, index: usize) -> Option<&'a TypeInner> {
        let &result = record.results.get(index)?;
        let value = self.module.values.try_get(result)?;
        Some(&self.module.types.try_get(value.ty)?.inner)
    }

    fn inner_of(&self, ty: Handle<Type>) -> Option<&'a TypeInner> {
        Some(&self.module.types.try_get(ty)?.inner)
    }

    fn expect_result(&mut self, inst: Handle<Instruction>, expected: &TypeInner, found: &TypeInner) {
        if expected != found {
            let expected = overload::render(&self.module.types, expected);
            let found = overload::render(&self.module.types, found);
            self.error(
                DiagKind::Type,
                Some(inst),
                format!("result type mismatch: expected {expected}, found {found}"),
            );
        }
    }

    /// Checks operand and result counts; reports and returns `false` on
    /// mismatch. `results: None` skips the result-count check.
    fn check_counts(
        &mut self,
        inst: Handle<Instruction>,
        record: &Instruction,
        min_ops: usize,
        max_ops: Option<usize>,
        results: Option<usize>,
    ) -> bool {
        let ops = record.operands.len();
        let ops_ok = ops >= min_ops && max_ops.map_or(true, |max| ops <= max);
        if !ops_ok {
            let expected = match max_ops {
                Some(max) if max == min_ops => format!("{min_ops}"),
                Some(max) => format!("{min_ops}..={max}"),
                None => format!("at least {min_ops}"),
            };
            self.error(
                DiagKind::Structural,
                Some(inst),
                format!(
                    "'{}' expects {expected} operand(s), found {ops}",
                    record.op.name()
                ),
            );
            return false;
        }
        if let Some(expected) = results {
            if record.results.len() != expected {
                self.error(
                    DiagKind::Structural,
                    Some(inst),
                    format!(
                        "'{}' expects {expected} result(s), found {}",
                        record.op.name(),
                        record.results.len()
                    ),
                );
                return false;
            }
        }
        true
    }

    fn check_access(&mut self, inst: Handle<Instruction>, record: &Instruction) {
        if !self.check_counts(inst, record, 2, None, Some(1)) {
            return;
        }
        let Some(object) = self.operand_inner(record, 0) else {
            return;
        };

        // Through a memory view, access walks the store type and the
        // result is a pointer preserving address space and access mode.
        let (mut current, view) = match *object {
            TypeInner::Pointer {
                base,
                space,
                access,
            }
            | TypeInner::Reference {
                base,
                space,
                access,
            } => match self.inner_of(base) {
                Some(inner) => (inner.clone(), Some((space, access))),
                None => return,
            },
            ref other => (other.clone(), None),
        };

        for index in 1..record.operands.len() {
            let Some(index_inner) = self.operand_inner(record, index) else {
                return;
            };
            let index_ok = matches!(
                index_inner,
                TypeInner::Scalar(s) if s.kind.is_integer() && s.width == 4
            );
            if !index_ok {
                let found = overload::render(&self.module.types, index_inner);
                self.error(
                    DiagKind::Type,
                    Some(inst),
                    format!("access index must be i32 or u32, found {found}"),
                );
                return;
            }
            let const_index = self.constant_index(record, index);

            current = match current {
                TypeInner::Vector { size, scalar } => {
                    if let Some(value) = const_index {
                        if value >= size as u64 {
                            self.error(
                                DiagKind::Semantic,
                                Some(inst),
                                format!("invalid index value {value} for vec{}", size as u32),
                            );
                            return;
                        }
                    }
                    TypeInner::Scalar(scalar)
                }
                TypeInner::Matrix {
                    columns,
                    rows,
                    scalar,
                } => {
                    if let Some(value) = const_index {
                        if value >= columns as u64 {
                            self.error(
                                DiagKind::Semantic,
                                Some(inst),
                                format!(
                                    "invalid index value {value} for a {}-column matrix",
                                    columns as u32
                                ),
                            );
                            return;
                        }
                    }
                    TypeInner::Vector { size: rows, scalar }
                }
                TypeInner::Array { base, size, .. } => {
                    if let (Some(value), ArraySize::Constant(count)) = (const_index, size) {
                        if value >= u64::from(count) {
                            self.error(
                                DiagKind::Semantic,
                                Some(inst),
                                format!("invalid index value {value} for array<_, {count}>"),
                            );
                            return;
                        }
                    }
                    match self.inner_of(base) {
                        Some(inner) => inner.clone(),
                        None => return,
                    }
                }
                TypeInner::Struct { ref members, .. } => {
                    let Some(value) = const_index else {
                        self.error(
                            DiagKind::Semantic,
                            Some(inst),
                            "struct members must be accessed with constant indices",
                        );
                        return;
                    };
                    let Some(member) = members.get(value as usize) else {
                        self.error(
                            DiagKind::Semantic,
                            Some(inst),
                            format!(
                                "invalid index value {value} for a struct with {} members",
                                members.len()
                            ),
                        );
                        return;
                    };
                    match self.inner_of(member.ty) {
                        Some(inner) => inner.clone(),
                        None => return,
                    }
                }
                other => {
                    let found = overload::render(&self.module.types, &other);
                    self.error(
                        DiagKind::Type,
                        Some(inst),
                        format!("cannot index into {found}"),
                    );
                    return;
                }
            };
        }

        let Some(declared) = self.result_inner(record, 0) else {
            return;
        };
        match view {
            None => {
                let declared = declared.clone();
                self.expect_result(inst, &current, &declared);
            }
            Some((space, access)) => {
                let ok = match *declared {
                    TypeInner::Pointer {
                        base,
                        space: result_space,
                        access: result_access,
                    }
                    | TypeInner::Reference {
                        base,
                        space: result_space,
                        access: result_access,
                    } => {
                        result_space == space
                            && result_access == access
                            && self.inner_of(base).is_some_and(|b| *b == current)
                    }
                    _ => false,
                };
                if !ok {
                    let current = overload::render(&self.module.types, &current);
                    let declared = overload::render(&self.module.types, declared);
                    self.error(
                        DiagKind::Type,
                        Some(inst),
                        format!(
                            "access through a memory view must produce ptr<{space}, {current}, {access}>, found {declared}",
                            space = space,
                            access = access,
                        ),
                    );
                }
            }
        }
    }

    /// The compile-time value of an integer constant operand, if it is one.
    fn constant_index(&self, record: &Instruction, index: usize) -> Option<u64> {
        let &operand = record.operands.get(index)?;
        let value = self.module.values.try_get(operand)?;
        let ValueKind::Constant { value: constant } = value.kind else {
            return None;
        };
        match self.module.constants.try_get(constant)? {
            shade_ir::ConstantValue::Scalar { value, .. } => value.index_value(),
            _ => None,
        }
    }

    fn check_construct(&mut self, inst: Handle<Instruction>, record: &Instruction) {
        if !self.check_counts(inst, record, 0, None, Some(1)) {
            return;
        }
        let Some(declared) = self.result_inner(record, 0) else {
            return;
        };
        if !declared.is_constructible() {
            let found = overload::render(&self.module.types, declared);
            self.error(
                DiagKind::Type,
                Some(inst),
                format!("{found} is not constructible"),
            );
            return;
        }
        // A zero-argument construct is the zero value and is always legal.
        if record.operands.is_empty() {
            return;
        }

        let mut args = Vec::with_capacity(record.operands.len());
        for index in 0..record.operands.len() {
            match self.operand_inner(record, index) {
                Some(inner) => args.push(inner),
                None => return,
            }
        }

        let ok = match *declared {
            TypeInner::Scalar(scalar) => {
                args.len() == 1 && *args[0] == TypeInner::Scalar(scalar)
            }
            TypeInner::Vector { size, scalar } => {
                if args.len() == 1 && *args[0] == TypeInner::Scalar(scalar) {
                    true // splat
                } else {
                    let mut components = 0u32;
                    let mut compatible = true;
                    for arg in &args {
                        match **arg {
                            TypeInner::Scalar(s) if s == scalar => components += 1,
                            TypeInner::Vector { size, scalar: s } if s == scalar => {
                                components += size as u32
                            }
                            _ => {
                                compatible = false;
                                break;
                            }
                        }
                    }
                    compatible && components == size as u32
                }
            }
            TypeInner::Matrix {
                columns,
                rows,
                scalar,
            } => {
                args.len() == columns as usize
                    && args.iter().all(|arg| {
                        **arg == TypeInner::Vector { size: rows, scalar }
                    })
            }
            TypeInner::Array { base, size, .. } => {
                let expected = match size {
                    ArraySize::Constant(count) => count as usize,
                    ArraySize::Dynamic => usize::MAX, // unreachable: not constructible
                };
                args.len() == expected
                    && self
                        .inner_of(base)
                        .is_some_and(|elem| args.iter().all(|arg| *arg == elem))
            }
            TypeInner::Struct { ref members, .. } => {
                args.len() == members.len()
                    && members.iter().zip(&args).all(|(member, arg)| {
                        self.inner_of(member.ty).is_some_and(|m| m == *arg)
                    })
            }
            _ => false,
        };
        if !ok {
            let found = overload::render(&self.module.types, declared);
            let rendered: Vec<_> = args
                .iter()
                .map(|a| overload::render(&self.module.types, a))
                .collect();
            self.error(
                DiagKind::Type,
                Some(inst),
                format!(
                    "cannot construct {found} from ({})",
                    rendered.join(", ")
                ),
            );
        }
    }

    fn check_swizzle(&mut self, inst: Handle<Instruction>, record: &Instruction, indices: &[u32]) {
        if !self.check_counts(inst, record, 1, Some(1), Some(1)) {
            return;
        }
        let Some(object) = self.operand_inner(record, 0) else {
            return;
        };
        let TypeInner::Vector { size, scalar } = *object else {
            let found = overload::render(&self.module.types, object);
            self.error(
                DiagKind::Type,
                Some(inst),
                format!("swizzle source must be a vector, found {found}"),
            );
            return;
        };
        if indices.is_empty() || indices.len() > 4 {
            self.error(
                DiagKind::Structural,
                Some(inst),
                format!("swizzle must have 1 to 4 indices, found {}", indices.len()),
            );
            return;
        }
        for &index in indices {
            if index >= size as u32 {
                self.error(
                    DiagKind::Semantic,
                    Some(inst),
                    format!("invalid index value {index} for vec{}", size as u32),
                );
                return;
            }
        }
        let expected = match indices.len() {
            1 => TypeInner::Scalar(scalar),
            count => TypeInner::Vector {
                size: shade_ir::VectorSize::from_count(count as u32)
                    .expect("count is 2, 3, or 4 here"),
                scalar,
            },
        };
        if let Some(declared) = self.result_inner(record, 0) {
            let declared = declared.clone();
            self.expect_result(inst, &expected, &declared);
        }
    }

    /// Resolves a memory-view operand to (store type, access), reporting
    /// when it is not a view or the store type is atomic.
    fn memory_view(
        &mut self,
        inst: Handle<Instruction>,
        record: &Instruction,
        what: &str,
    ) -> Option<(TypeInner, shade_ir::Access)> {
        let object = self.operand_inner(record, 0)?;
        match *object {
            TypeInner::Pointer { base, access, .. } | TypeInner::Reference { base, access, .. } => {
                let store = self.inner_of(base)?.clone();
                if matches!(store, TypeInner::Atomic(_)) {
                    self.error(
                        DiagKind::Type,
                        Some(inst),
                        "atomic values must be accessed with atomic builtins",
                    );
                    return None;
                }
                Some((store, access))
            }
            ref other => {
                let found = overload::render(&self.module.types, other);
                self.error(
                    DiagKind::Type,
                    Some(inst),
                    format!("{what} must be a pointer, found {found}"),
                );
                None
            }
        }
    }

    fn check_load(&mut self, inst: Handle<Instruction>, record: &Instruction) {
        if !self.check_counts(inst, record, 1, Some(1), Some(1)) {
            return;
        }
        let Some((store, access)) = self.memory_view(inst, record, "load source") else {
            return;
        };
        if !access.contains(shade_ir::Access::LOAD) {
            self.error(
                DiagKind::Semantic,
                Some(inst),
                "load from a write-only memory view",
            );
        }
        if let Some(declared) = self.result_inner(record, 0) {
            let declared = declared.clone();
            self.expect_result(inst, &store, &declared);
        }
    }

    fn check_store(&mut self, inst: Handle<Instruction>, record: &Instruction) {
        if !self.check_counts(inst, record, 2, Some(2), Some(0)) {
            return;
        }
        let Some((store, access)) = self.memory_view(inst, record, "store destination") else {
            return;
        };
        if !access.contains(shade_ir::Access::STORE) {
            self.error(
                DiagKind::Semantic,
                Some(inst),
                "store to a read-only memory view",
            );
        }
        if let Some(value) = self.operand_inner(record, 1) {
            let value = value.clone();
            self.expect_result(inst, &store, &value);
        }
    }

    fn vector_view(
        &mut self,
        inst: Handle<Instruction>,
        record: &Instruction,
        what: &str,
    ) -> Option<(shade_ir::Scalar, shade_ir::Access)> {
        let (store, access) = self.memory_view(inst, record, what)?;
        match store {
            TypeInner::Vector { scalar, .. } => Some((scalar, access)),
            other => {
                let found = overload::render(&self.module.types, &other);
                self.error(
                    DiagKind::Type,
                    Some(inst),
                    format!("{what} must point at a vector, found {found}"),
                );
                None
            }
        }
    }

    fn check_index_operand(&mut self, inst: Handle<Instruction>, record: &Instruction, index: usize) {
        if let Some(index_inner) = self.operand_inner(record, index) {
            let ok = matches!(
                index_inner,
                TypeInner::Scalar(s) if s.kind.is_integer() && s.width == 4
            );
            if !ok {
                let found = overload::render(&self.module.types, index_inner);
                self.error(
                    DiagKind::Type,
                    Some(inst),
                    format!("element index must be i32 or u32, found {found}"),
                );
            }
        }
    }

    fn check_load_vector_element(&mut self, inst: Handle<Instruction>, record: &Instruction) {
        if !self.check_counts(inst, record, 2, Some(2), Some(1)) {
            return;
        }
        let Some((scalar, access)) = self.vector_view(inst, record, "load_vector_element source")
        else {
            return;
        };
        if !access.contains(shade_ir::Access::LOAD) {
            self.error(
                DiagKind::Semantic,
                Some(inst),
                "load from a write-only memory view",
            );
        }
        self.check_index_operand(inst, record, 1);
        if let Some(declared) = self.result_inner(record, 0) {
            let declared = declared.clone();
            self.expect_result(inst, &TypeInner::Scalar(scalar), &declared);
        }
    }

    fn check_store_vector_element(&mut self, inst: Handle<Instruction>, record: &Instruction) {
        if !self.check_counts(inst, record, 3, Some(3), Some(0)) {
            return;
        }
        let Some((scalar, access)) = self.vector_view(inst, record, "store_vector_element target")
        else {
            return;
        };
        if !access.contains(shade_ir::Access::STORE) {
            self.error(
                DiagKind::Semantic,
                Some(inst),
                "store to a read-only memory view",
            );
        }
        self.check_index_operand(inst, record, 1);
        if let Some(value) = self.operand_inner(record, 2) {
            let value = value.clone();
            self.expect_result(inst, &TypeInner::Scalar(scalar), &value);
        }
    }

    fn check_var(&mut self, inst: Handle<Instruction>, record: &Instruction) {
        if !self.check_counts(inst, record, 0, Some(1), Some(1)) {
            return;
        }
        let Some(declared) = self.result_inner(record, 0) else {
            return;
        };
        let (base, space, access) = match *declared {
            TypeInner::Pointer {
                base,
                space,
                access,
            }
            | TypeInner::Reference {
                base,
                space,
                access,
            } => (base, space, access),
            ref other => {
                let found = overload::render(&self.module.types, other);
                self.error(
                    DiagKind::Type,
                    Some(inst),
                    format!("var result must be a pointer, found {found}"),
                );
                return;
            }
        };
        if space == shade_ir::AddressSpace::Uniform && access != shade_ir::Access::LOAD {
            self.error(
                DiagKind::Semantic,
                Some(inst),
                "uniform variables must be read-only",
            );
        }
        if !record.operands.is_empty() {
            if space.is_resource() {
                self.error(
                    DiagKind::Semantic,
                    Some(inst),
                    format!("var in the {space} address space cannot have an initializer"),
                );
            }
            let (Some(init), Some(store)) =
                (self.operand_inner(record, 0), self.inner_of(base))
            else {
                return;
            };
            let (init, store) = (init.clone(), store.clone());
            self.expect_result(inst, &store, &init);
        }
    }

    fn check_switch(
        &mut self,
        inst: Handle<Instruction>,
        record: &Instruction,
        cases: &[shade_ir::SwitchCase],
    ) {
        if !self.check_counts(inst, record, 1, Some(1), None) {
            return;
        }
        let Some(selector) = self.operand_inner(record, 0) else {
            return;
        };
        let selector_ok = matches!(
            selector,
            TypeInner::Scalar(s) if s.kind.is_integer() && s.width == 4
        );
        if !selector_ok {
            let found = overload::render(&self.module.types, selector);
            self.error(
                DiagKind::Type,
                Some(inst),
                format!("switch selector must be i32 or u32, found {found}"),
            );
            return;
        }

        let mut default_count = 0usize;
        let mut seen_values: HashSet<Handle<shade_ir::ConstantValue>> = HashSet::new();
        for case in cases {
            for selector_entry in &case.selectors {
                match *selector_entry {
                    shade_ir::CaseSelector::Default => default_count += 1,
                    shade_ir::CaseSelector::Value(constant) => {
                        match self.module.constants.try_get(constant) {
                            None => self.error(
                                DiagKind::Structural,
                                Some(inst),
                                "switch case selector references an out-of-bounds constant",
                            ),
                            Some(data) => {
                                let matches_selector = self
                                    .inner_of(data.ty())
                                    .is_some_and(|inner| inner == selector);
                                if !matches_selector {
                                    self.error(
                                        DiagKind::Type,
                                        Some(inst),
                                        "switch case selector type does not match the condition",
                                    );
                                }
                                // Interning makes equal values share handles.
                                if !seen_values.insert(constant) {
                                    self.error(
                                        DiagKind::Semantic,
                                        Some(inst),
                                        "duplicate switch case selector",
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
        if default_count != 1 {
            self.error(
                DiagKind::Semantic,
                Some(inst),
                format!("switch must have exactly one default case, found {default_count}"),
            );
        }
    }

    /// Exit argument lists must match the target's declared results.
    fn check_exit_args(
        &mut self,
        inst: Handle<Instruction>,
        record: &Instruction,
        target: Handle<Instruction>,
        what: &str,
    ) {
        let Some(target_record) = self.module.instructions.try_get(target) else {
            return; // reported structurally
        };
        let results = target_record.results.clone();
        self.check_branch_args(inst, record, &record.operands, &results, what);
    }

    /// Compares a branch's argument list against a list of receiving values
    /// (control-instruction results or block parameters).
    fn check_branch_args(
        &mut self,
        inst: Handle<Instruction>,
        _record: &Instruction,
        args: &[Handle<Value>],
        receivers: &[Handle<Value>],
        what: &str,
    ) {
        if args.len() != receivers.len() {
            self.error(
                DiagKind::Structural,
                Some(inst),
                format!(
                    "{what} provides {} value(s) but the target expects {}",
                    args.len(),
                    receivers.len()
                ),
            );
            return;
        }
        for (&arg, &receiver) in args.iter().zip(receivers) {
            let arg_inner = self
                .module
                .values
                .try_get(arg)
                .and_then(|v| self.inner_of(v.ty));
            let receiver_inner = self
                .module
                .values
                .try_get(receiver)
                .and_then(|v| self.inner_of(v.ty));
            if let (Some(arg_inner), Some(receiver_inner)) = (arg_inner, receiver_inner) {
                if arg_inner != receiver_inner {
                    let expected = overload::render(&self.module.types, receiver_inner);
                    let found = overload::render(&self.module.types, arg_inner);
                    self.error(
                        DiagKind::Type,
                        Some(inst),
                        format!("{what} value mismatch: expected {expected}, found {found}"),
                    );
                }
            }
        }
    }

    fn check_break_if(
        &mut self,
        inst: Handle<Instruction>,
        record: &Instruction,
        loop_: Handle<Instruction>,
    ) {
        if record.operands.is_empty() {
            self.error(
                DiagKind::Structural,
                Some(inst),
                "break_if is missing its condition operand",
            );
            return;
        }
        if let Some(cond) = self.operand_inner(record, 0) {
            if *cond != TypeInner::Scalar(shade_ir::Scalar::BOOL) {
                let found = overload::render(&self.module.types, cond);
                self.error(
                    DiagKind::Type,
                    Some(inst),
                    format!("break_if condition must be bool, found {found}"),
                );
            }
        }
        let Some(target) = self.module.instructions.try_get(loop_) else {
            return;
        };
        let Op::Loop { body, .. } = target.op else {
            return;
        };
        // After the condition: exit values matching the loop results, then
        // next-iteration values matching the body parameters.
        let results = target.results.clone();
        let body_params = self
            .module
            .blocks
            .try_get(body)
            .map(|block| block.params.clone())
            .unwrap_or_default();
        let expected_len = 1 + results.len() + body_params.len();
        if record.operands.len() != expected_len {
            self.error(
                DiagKind::Structural,
                Some(inst),
                format!(
                    "break_if expects {expected_len} operand(s) (condition, {} exit value(s), {} next-iteration value(s)), found {}",
                    results.len(),
                    body_params.len(),
                    record.operands.len()
                ),
            );
            return;
        }
        let exit_args = &record.operands[1..1 + results.len()];
        self.check_branch_args(inst, record, exit_args, &results, "break_if exit");
        let next_args = &record.operands[1 + results.len()..];
        self.check_branch_args(inst, record, next_args, &body_params, "break_if next-iteration");
    }

    fn check_return(
        &mut self,
        inst: Handle<Instruction>,
        record: &Instruction,
        func: Handle<Function>,
    ) {
        let Some(function) = self.module.functions.try_get(func) else {
            return;
        };
        match (function.return_type, record.operands.len()) {
            (None, 0) => {}
            (None, _) => self.error(
                DiagKind::Type,
                Some(inst),
                "return provides a value but the function returns nothing",
            ),
            (Some(_), 0) => self.error(
                DiagKind::Type,
                Some(inst),
                "return is missing the function's return value",
            ),
            (Some(ty), 1) => {
                let (Some(expected), Some(found)) =
                    (self.inner_of(ty), self.operand_inner(record, 0))
                else {
                    return;
                };
                let (expected, found) = (expected.clone(), found.clone());
                self.expect_result(inst, &expected, &found);
            }
            (Some(_), n) => self.error(
                DiagKind::Structural,
                Some(inst),
                format!("return expects at most one operand, found {n}"),
            ),
        }
    }

    fn check_call(
        &mut self,
        inst: Handle<Instruction>,
        record: &Instruction,
        func: Handle<Function>,
    ) {
        let Some(callee) = self.module.functions.try_get(func) else {
            return; // reported by the recursion pass
        };
        let name = callee.name.clone().unwrap_or_else(|| "_".into());
        if callee.is_entry_point() {
            self.error(
                DiagKind::Semantic,
                Some(inst),
                format!("entry point '{name}' cannot be called"),
            );
        }
        let params = callee.params.clone();
        if record.operands.len() != params.len() {
            self.error(
                DiagKind::Structural,
                Some(inst),
                format!(
                    "call to '{name}' provides {} argument(s) but it takes {}",
                    record.operands.len(),
                    params.len()
                ),
            );
        } else {
            self.check_branch_args(inst, record, &record.operands, &params, "call argument");
        }
        match (callee.return_type, record.results.len()) {
            (None, 0) => {}
            (Some(ty), 1) => {
                let (Some(expected), Some(found)) =
                    (self.inner_of(ty), self.result_inner(record, 0))
                else {
                    return;
                };
                let (expected, found) = (expected.clone(), found.clone());
                self.expect_result(inst, &expected, &found);
            }
            (_, found) => self.error(
                DiagKind::Structural,
                Some(inst),
                format!("call to '{name}' has {found} result(s)"),
            ),
        }
    }
}
