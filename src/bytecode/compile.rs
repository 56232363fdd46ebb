use std::collections::HashMap;

use tracing::debug;

use crate::{
    bytecode::{
        Op,
        chunk::{Chunk, ChunkKind},
        compile_error::CompileError,
        emit::Emitter,
        frame::{Slot, StackFrame},
    },
    lang::{Call, Expression, Function, Program, Statement},
};

/// Name of the synthetic entry chunk. The leading dot keeps it out of the
/// identifier namespace, like every generated label.
pub const BOOTSTRAP_CHUNK: &str = ".bootstrap";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Emit the bootstrap chunk that calls `entry` and exits.
    pub bootstrap: bool,
    /// Function the bootstrap chunk calls.
    pub entry: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            bootstrap: true,
            entry: "main".to_string(),
        }
    }
}

/// Lowers a syntax tree into one chunk per function, plus the bootstrap.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bootstrap(mut self, bootstrap: bool) -> Self {
        self.options.bootstrap = bootstrap;
        self
    }

    pub fn entry(mut self, entry: impl Into<String>) -> Self {
        self.options.entry = entry.into();
        self
    }

    pub fn compile_program(&self, program: &Program) -> Result<Vec<Chunk>, CompileError> {
        let functions = FunctionTable::new(program)?;

        let mut chunks = Vec::with_capacity(program.functions.len() + 1);

        if self.options.bootstrap {
            let bootstrap = BootstrapCompiler::new(&functions, &self.options.entry).compile()?;
            debug!(
                instructions = bootstrap.len(),
                entry = %self.options.entry,
                "compiled bootstrap"
            );
            chunks.push(bootstrap);
        }

        for function in &program.functions {
            let chunk = FunctionCompiler::new(function, &functions).compile()?;
            debug!(function = %chunk.name, instructions = chunk.len(), "compiled function");
            chunks.push(chunk);
        }

        Ok(chunks)
    }
}

// =============================================================================
// Function table
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct FunctionInfo<'a> {
    decl: &'a Function,
    /// Parameters plus declared locals of the callee.
    locals_size: usize,
}

/// Call-target lookup shared by every chunk compiler of one program.
#[derive(Debug)]
struct FunctionTable<'a> {
    functions: HashMap<&'a str, FunctionInfo<'a>>,
}

impl<'a> FunctionTable<'a> {
    fn new(program: &'a Program) -> Result<Self, CompileError> {
        let mut functions = HashMap::with_capacity(program.functions.len());

        for decl in &program.functions {
            let info = FunctionInfo {
                decl,
                locals_size: StackFrame::new(decl).locals_size(),
            };
            if functions.insert(decl.name.as_str(), info).is_some() {
                return Err(CompileError::duplicate_function(&decl.name));
            }
        }

        Ok(Self { functions })
    }

    fn resolve(&self, name: &str) -> Result<FunctionInfo<'a>, CompileError> {
        self.functions
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::unknown_function(name))
    }
}

// =============================================================================
// Calling convention
// =============================================================================

/// Shared by the bootstrap and function compilers: everything needed to emit
/// a call sequence.
trait CallEmitter<'a> {
    fn emitter(&mut self) -> &mut Emitter;

    fn functions(&self) -> &'a FunctionTable<'a>;

    fn fresh_label(&mut self, kind: &str) -> String;

    /// Generate `expression`, leaving one value on the stack.
    ///
    /// `compensation` counts values pushed above the current frame that the
    /// frame layout does not know about (reserved call slots and already
    /// evaluated arguments of enclosing calls).
    fn expression(
        &mut self,
        expression: &Expression,
        compensation: i32,
    ) -> Result<(), CompileError>;

    /// Emit a call. On completion the callee's result is on top of the stack.
    ///
    /// ```text
    ///   LOAD_CONST   0           ; return value slot
    ///   LOAD_LABEL   .ret        ; return address slot
    ///   <arguments>
    ///   LOAD_CONST   0           ; once per callee local
    ///   LOAD_LABEL   callee
    ///   JUMP
    /// .ret:
    /// ```
    fn call(&mut self, call: &Call, compensation: i32) -> Result<(), CompileError> {
        let callee = self.functions().resolve(&call.name)?;

        let parameters = callee.decl.parameters.len();
        if call.arguments.len() != parameters {
            return Err(CompileError::arity_mismatch(
                &call.name,
                parameters,
                call.arguments.len(),
            ));
        }

        let return_label = self.fresh_label("ret");

        let emitter = self.emitter();
        emitter.emit_commented(
            Op::LoadConstant(0),
            format!("call {}: return value", call.name),
        );
        emitter.emit_commented(
            Op::LoadLabel(return_label.clone()),
            format!("call {}: return address", call.name),
        );

        for (index, argument) in call.arguments.iter().enumerate() {
            self.expression(argument, compensation + 2 + index as i32)?;
        }

        for _ in parameters..callee.locals_size {
            self.emitter()
                .emit_commented(Op::LoadConstant(0), format!("call {}: local", call.name));
        }

        let emitter = self.emitter();
        emitter.emit_commented(
            Op::LoadLabel(call.name.clone()),
            format!("call {}: address", call.name),
        );
        emitter.emit_commented(Op::Jump, format!("call {}: jump", call.name));
        emitter.label_next(return_label);

        Ok(())
    }
}

// =============================================================================
// Bootstrap
// =============================================================================

struct BootstrapCompiler<'a> {
    functions: &'a FunctionTable<'a>,
    entry: &'a str,
    emitter: Emitter,
    label_counter: usize,
}

impl<'a> BootstrapCompiler<'a> {
    fn new(functions: &'a FunctionTable<'a>, entry: &'a str) -> Self {
        Self {
            functions,
            entry,
            emitter: Emitter::new(),
            label_counter: 0,
        }
    }

    fn compile(mut self) -> Result<Chunk, CompileError> {
        if self.functions.resolve(self.entry).is_err() {
            return Err(CompileError::missing_entry(self.entry));
        }

        self.call(&Call::new(self.entry, Vec::new()), 0)?;
        self.emitter.emit_commented(Op::Exit, "exit");

        self.emitter
            .into_chunk(BOOTSTRAP_CHUNK, ChunkKind::Bootstrap)
    }
}

impl<'a> CallEmitter<'a> for BootstrapCompiler<'a> {
    fn emitter(&mut self) -> &mut Emitter {
        &mut self.emitter
    }

    fn functions(&self) -> &'a FunctionTable<'a> {
        self.functions
    }

    fn fresh_label(&mut self, kind: &str) -> String {
        let label = format!("{}.{}{}", BOOTSTRAP_CHUNK, kind, self.label_counter);
        self.label_counter += 1;
        label
    }

    fn expression(&mut self, expression: &Expression, _: i32) -> Result<(), CompileError> {
        Err(CompileError::internal(format!(
            "bootstrap chunk cannot evaluate expression {}",
            expression
        )))
    }
}

// =============================================================================
// Functions
// =============================================================================

struct FunctionCompiler<'a> {
    function: &'a Function,
    functions: &'a FunctionTable<'a>,
    frame: StackFrame,
    emitter: Emitter,
    label_counter: usize,
}

impl<'a> FunctionCompiler<'a> {
    fn new(function: &'a Function, functions: &'a FunctionTable<'a>) -> Self {
        Self {
            function,
            functions,
            frame: StackFrame::new(function),
            emitter: Emitter::new(),
            label_counter: 0,
        }
    }

    fn compile(mut self) -> Result<Chunk, CompileError> {
        let function = self.function;
        self.block(&function.body)?;

        // Falling off the end returns 0.
        if !matches!(function.body.last(), Some(Statement::Return(_))) {
            self.return_value(&Expression::Integer(0))?;
        }

        self.emitter
            .into_chunk(function.name.clone(), ChunkKind::Function)
    }

    fn block(&mut self, statements: &[Statement]) -> Result<(), CompileError> {
        statements
            .iter()
            .try_for_each(|statement| self.statement(statement))
    }

    fn statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        match statement {
            Statement::Let { name, value } => {
                self.expression(value, 0)?;
                let offset = self.frame.local_offset(name)?;
                self.emitter
                    .emit_commented(Op::Store(offset), format!("let {}", name));
            }

            Statement::When { condition, body } => {
                self.expression(condition, 0)?;
                let skip = self.fresh_label("skip");
                self.emitter.emit(Op::LoadLabel(skip.clone()));
                self.emitter
                    .emit_commented(Op::JumpWhenZero, format!("when {}", condition));
                self.block(body)?;
                self.emitter.label_next(skip);
            }

            Statement::Return(value) => self.return_value(value)?,
        }

        Ok(())
    }

    /// Store the result into the return value slot, unwind the frame and
    /// jump to the return address the caller left below the arguments.
    fn return_value(&mut self, value: &Expression) -> Result<(), CompileError> {
        self.expression(value, 0)?;

        let offset = self.frame.offset(&Slot::ReturnValue)?;
        self.emitter
            .emit_commented(Op::Store(offset), "return value");

        let locals = self.frame.locals_size();
        if locals > 0 {
            self.emitter
                .emit_commented(Op::Pop(locals as i32), "unwind");
        }

        self.emitter.emit_commented(Op::Jump, "return");
        Ok(())
    }
}

impl<'a> CallEmitter<'a> for FunctionCompiler<'a> {
    fn emitter(&mut self) -> &mut Emitter {
        &mut self.emitter
    }

    fn functions(&self) -> &'a FunctionTable<'a> {
        self.functions
    }

    fn fresh_label(&mut self, kind: &str) -> String {
        let label = format!(".{}.{}{}", self.function.name, kind, self.label_counter);
        self.label_counter += 1;
        label
    }

    fn expression(
        &mut self,
        expression: &Expression,
        compensation: i32,
    ) -> Result<(), CompileError> {
        match expression {
            Expression::Integer(value) => self.emitter.emit(Op::LoadConstant(*value)),

            Expression::Identifier(name) => {
                let offset = self.frame.local_offset(name)? + compensation;
                self.emitter
                    .emit_commented(Op::LoadRelative(offset), name.clone());
            }

            Expression::Binary {
                left,
                operator,
                right,
            } => {
                self.expression(right, compensation)?;
                self.frame.grow();
                self.expression(left, compensation)?;
                self.frame.grow();

                self.emitter.emit(Op::for_operator(*operator));

                self.frame.shrink()?;
                self.frame.shrink()?;
            }

            Expression::Call(call) => self.call(call, compensation)?,
        }

        Ok(())
    }
}
