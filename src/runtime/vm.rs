use tracing::{debug, trace};

use crate::bytecode::Op;

use super::{
    code::Code,
    runtime_error::{RuntimeError, RuntimeErrorKind},
    stack::ValueStack,
};

#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Abort after this many executed instructions. Unbounded by default.
    pub max_steps: Option<usize>,
    pub max_stack_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_steps: None,
            max_stack_size: 1 << 20,
        }
    }
}

/// Fetch-decode-execute loop over linked instructions or encoded bytes.
///
/// Both front ends share `execute`, so a program behaves identically on
/// either as long as it was linked for the matching addressing.
pub struct Vm<'a, C: ?Sized> {
    code: &'a C,
    stack: ValueStack,
    ip: usize,
    halted: bool,
    steps: usize,
    config: VmConfig,
}

/// Executes the linker's instruction list directly (index addressing).
pub type InstructionVm<'a> = Vm<'a, [Op]>;

/// Executes an encoded artifact (byte addressing).
pub type ByteVm<'a> = Vm<'a, [u8]>;

impl<'a, C: Code + ?Sized> Vm<'a, C> {
    pub fn new(code: &'a C) -> Self {
        Self::with_config(code, VmConfig::default())
    }

    pub fn with_config(code: &'a C, config: VmConfig) -> Self {
        Self {
            code,
            stack: ValueStack::new(),
            ip: 0,
            halted: false,
            steps: 0,
            config,
        }
    }

    /// Stack contents, bottom to top.
    pub fn stack(&self) -> &[i32] {
        self.stack.as_slice()
    }

    /// Top of stack, i.e. the program's result after the bootstrap exits.
    pub fn result(&self) -> Option<i32> {
        self.stack.top()
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Run until `EXIT`.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while !self.halted {
            self.step()?;
        }

        debug!(
            steps = self.steps,
            depth = self.stack.len(),
            result = ?self.result(),
            "program halted"
        );
        Ok(())
    }

    /// Execute a single instruction.
    pub fn step(&mut self) -> Result<(), RuntimeError> {
        if self.halted {
            return Ok(());
        }

        let address = self.ip;
        let at = move |kind| RuntimeError::new(kind, address);

        if address >= self.code.end() {
            return Err(at(RuntimeErrorKind::MissingExit));
        }

        self.check_steps().map_err(at)?;

        let (op, size) = self.code.fetch(address).map_err(at)?;
        trace!(address, op = %op, depth = self.stack.len(), "step");

        self.ip = address + size;
        self.execute(op).map_err(at)?;
        self.check_stack().map_err(at)
    }

    fn check_steps(&mut self) -> Result<(), RuntimeErrorKind> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps
            && self.steps > max
        {
            return Err(RuntimeErrorKind::StepLimitExceeded(max));
        }

        Ok(())
    }

    fn check_stack(&self) -> Result<(), RuntimeErrorKind> {
        if self.stack.len() > self.config.max_stack_size {
            return Err(RuntimeErrorKind::StackLimitExceeded(
                self.config.max_stack_size,
            ));
        }

        Ok(())
    }

    fn execute(&mut self, op: Op) -> Result<(), RuntimeErrorKind> {
        match op {
            // Literals
            Op::LoadConstant(v) => self.stack.push(v),
            Op::LoadRelative(depth) => {
                let v = self.stack.peek(depth)?;
                self.stack.push(v);
            }
            Op::LoadLabel(label) => return Err(RuntimeErrorKind::UnlinkedLabel(label)),

            // Stack slots
            Op::Store(depth) => {
                let v = self.stack.pop()?;
                self.stack.set(depth, v)?;
            }
            Op::Pop(count) => self.stack.discard(count)?,

            // Control flow
            Op::Jump => {
                let target = self.stack.pop()?;
                self.jump(target)?;
            }
            Op::JumpWhenZero => {
                let target = self.stack.pop()?;
                let condition = self.stack.pop()?;
                if condition == 0 {
                    self.jump(target)?;
                }
            }
            Op::Exit => {
                self.ip = self.code.end();
                self.halted = true;
            }

            // Arithmetic
            Op::Add => self.binary(|l, r| Ok(l.wrapping_add(r)))?,
            Op::Sub => self.binary(|l, r| Ok(l.wrapping_sub(r)))?,
            Op::Mul => self.binary(|l, r| Ok(l.wrapping_mul(r)))?,
            Op::Div => self.binary(|l, r| {
                if r == 0 {
                    return Err(RuntimeErrorKind::DivisionByZero);
                }
                Ok(l.wrapping_div(r))
            })?,
            Op::Mod => self.binary(|l, r| {
                if r == 0 {
                    return Err(RuntimeErrorKind::DivisionByZero);
                }
                Ok(l.wrapping_rem(r))
            })?,

            // Comparison
            Op::Eq => self.binary(|l, r| Ok((l == r) as i32))?,
            Op::Gt => self.binary(|l, r| Ok((l > r) as i32))?,
            Op::Lt => self.binary(|l, r| Ok((l < r) as i32))?,
            Op::Ge => self.binary(|l, r| Ok((l >= r) as i32))?,
            Op::Le => self.binary(|l, r| Ok((l <= r) as i32))?,
        }

        Ok(())
    }

    /// Pop `left` then `right`, push `f(left, right)`.
    fn binary(
        &mut self,
        f: impl FnOnce(i32, i32) -> Result<i32, RuntimeErrorKind>,
    ) -> Result<(), RuntimeErrorKind> {
        let left = self.stack.pop()?;
        let right = self.stack.pop()?;
        self.stack.push(f(left, right)?);
        Ok(())
    }

    fn jump(&mut self, target: i32) -> Result<(), RuntimeErrorKind> {
        let end = self.code.end();
        match usize::try_from(target) {
            Ok(address) if address <= end => {
                self.ip = address;
                Ok(())
            }
            _ => Err(RuntimeErrorKind::AddressOutOfRange { target, end }),
        }
    }
}

/// Run linked instructions to completion and return the final stack.
pub fn run_instructions(ops: &[Op]) -> Result<Vec<i32>, RuntimeError> {
    let mut vm = InstructionVm::new(ops);
    vm.run()?;
    Ok(vm.stack().to_vec())
}

/// Run an encoded artifact to completion and return the final stack.
pub fn run_bytes(code: &[u8]) -> Result<Vec<i32>, RuntimeError> {
    let mut vm = ByteVm::new(code);
    vm.run()?;
    Ok(vm.stack().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::encode::encode;

    fn run(ops: &[Op]) -> Result<Vec<i32>, RuntimeError> {
        run_instructions(ops)
    }

    #[test]
    fn test_operand_order() {
        // left is the value on top of the stack
        let stack = run(&[
            Op::LoadConstant(3),
            Op::LoadConstant(10),
            Op::Sub,
            Op::Exit,
        ])
        .unwrap();

        assert_eq!(stack, vec![7]);
    }

    #[test]
    fn test_comparisons_yield_one_or_zero() {
        for (op, expected) in [
            (Op::Gt, 1),
            (Op::Lt, 0),
            (Op::Ge, 1),
            (Op::Le, 0),
            (Op::Eq, 0),
        ] {
            let stack = run(&[Op::LoadConstant(4), Op::LoadConstant(5), op.clone(), Op::Exit])
                .unwrap();
            assert_eq!(stack, vec![expected], "{:?}", op);
        }
    }

    #[test]
    fn test_division_truncates_toward_zero() {
        let stack = run(&[
            Op::LoadConstant(2),
            Op::LoadConstant(-7),
            Op::Div,
            Op::LoadConstant(2),
            Op::LoadConstant(-7),
            Op::Mod,
            Op::Exit,
        ])
        .unwrap();

        assert_eq!(stack, vec![-3, -1]);
    }

    #[test]
    fn test_division_by_zero() {
        let err = run(&[
            Op::LoadConstant(0),
            Op::LoadConstant(1),
            Op::Div,
            Op::Exit,
        ])
        .unwrap_err();

        assert_eq!(err, RuntimeError::new(RuntimeErrorKind::DivisionByZero, 2));
    }

    #[test]
    fn test_store_and_load_relative() {
        let stack = run(&[
            Op::LoadConstant(1),
            Op::LoadConstant(2),
            Op::LoadConstant(9),
            Op::Store(1),
            Op::LoadRelative(1),
            Op::Exit,
        ])
        .unwrap();

        assert_eq!(stack, vec![9, 2, 9]);
    }

    #[test]
    fn test_jump_when_zero() {
        let taken = run(&[
            Op::LoadConstant(0),
            Op::LoadConstant(4),
            Op::JumpWhenZero,
            Op::LoadConstant(1),
            Op::Exit,
        ])
        .unwrap();
        assert!(taken.is_empty());

        let fallthrough = run(&[
            Op::LoadConstant(5),
            Op::LoadConstant(4),
            Op::JumpWhenZero,
            Op::LoadConstant(1),
            Op::Exit,
        ])
        .unwrap();
        assert_eq!(fallthrough, vec![1]);
    }

    #[test]
    fn test_pop() {
        let stack = run(&[
            Op::LoadConstant(1),
            Op::LoadConstant(2),
            Op::LoadConstant(3),
            Op::Pop(2),
            Op::Exit,
        ])
        .unwrap();

        assert_eq!(stack, vec![1]);
    }

    #[test]
    fn test_missing_exit() {
        let err = run(&[Op::LoadConstant(1)]).unwrap_err();

        assert_eq!(err, RuntimeError::new(RuntimeErrorKind::MissingExit, 1));
    }

    #[test]
    fn test_unlinked_label() {
        let err = run(&[Op::LoadLabel("main".into())]).unwrap_err();

        assert_eq!(err.kind, RuntimeErrorKind::UnlinkedLabel("main".into()));
    }

    #[test]
    fn test_jump_out_of_range() {
        let err = run(&[Op::LoadConstant(99), Op::Jump]).unwrap_err();

        assert_eq!(
            err.kind,
            RuntimeErrorKind::AddressOutOfRange { target: 99, end: 2 }
        );
    }

    #[test]
    fn test_slot_out_of_range() {
        let err = run(&[Op::LoadRelative(0)]).unwrap_err();

        assert_eq!(
            err.kind,
            RuntimeErrorKind::SlotOutOfRange { depth: 0, len: 0 }
        );
    }

    #[test]
    fn test_step_limit() {
        // jump to self forever
        let ops = [Op::LoadConstant(0), Op::Jump];
        let config = VmConfig {
            max_steps: Some(100),
            ..VmConfig::default()
        };

        let mut vm = InstructionVm::with_config(&ops, config);
        let err = vm.run().unwrap_err();

        assert_eq!(err.kind, RuntimeErrorKind::StepLimitExceeded(100));
    }

    #[test]
    fn test_stack_limit_blames_the_push() {
        let ops = [
            Op::LoadConstant(1),
            Op::LoadConstant(2),
            Op::LoadConstant(3),
            Op::Exit,
        ];
        let config = VmConfig {
            max_steps: None,
            max_stack_size: 2,
        };

        let mut vm = InstructionVm::with_config(&ops, config);
        let err = vm.run().unwrap_err();

        assert_eq!(
            err,
            RuntimeError::new(RuntimeErrorKind::StackLimitExceeded(2), 2)
        );
    }

    #[test]
    fn test_stack_limit_allows_exact_depth() {
        let ops = [
            Op::LoadConstant(1),
            Op::LoadConstant(2),
            Op::LoadConstant(3),
            Op::Exit,
        ];
        let config = VmConfig {
            max_steps: None,
            max_stack_size: 3,
        };

        let mut vm = InstructionVm::with_config(&ops, config);
        vm.run().unwrap();

        assert_eq!(vm.stack(), &[1, 2, 3]);
    }

    #[test]
    fn test_arithmetic_wraps() {
        let stack = run(&[
            Op::LoadConstant(1),
            Op::LoadConstant(i32::MAX),
            Op::Add,
            Op::Exit,
        ])
        .unwrap();

        assert_eq!(stack, vec![i32::MIN]);
    }

    #[test]
    fn test_byte_vm_matches_instruction_vm() {
        // no jumps, so index and byte addressing agree on the program
        let ops = vec![
            Op::LoadConstant(6),
            Op::LoadConstant(7),
            Op::Mul,
            Op::LoadRelative(0),
            Op::LoadConstant(2),
            Op::Store(1),
            Op::Exit,
        ];
        let bytes = encode(&ops).unwrap();

        assert_eq!(run_bytes(&bytes).unwrap(), run_instructions(&ops).unwrap());
    }

    #[test]
    fn test_byte_vm_invalid_opcode() {
        let err = run_bytes(&[0x10, 0, 0, 0, 1, 0x7f]).unwrap_err();

        assert_eq!(err.address, 5);
        assert!(matches!(err.kind, RuntimeErrorKind::Decode(_)));
    }

    #[test]
    fn test_step_by_step() {
        let ops = [Op::LoadConstant(1), Op::Exit];
        let mut vm = InstructionVm::new(&ops);

        vm.step().unwrap();
        assert_eq!(vm.ip(), 1);
        assert_eq!(vm.stack(), &[1]);
        assert!(!vm.is_halted());

        vm.step().unwrap();
        assert!(vm.is_halted());
        assert_eq!(vm.ip(), 2);
        assert_eq!(vm.result(), Some(1));
    }
}
