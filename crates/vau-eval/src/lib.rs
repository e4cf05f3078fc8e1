mod control;
mod eval;

use std::path::Path;

use vau_core::{CollectStats, Env, EnvRoot, EvalContext, Value, VauError};

pub use control::{install_booleans, register_control};
pub use eval::{apply, bind_parameters, eval_string, eval_value, EvalResult};

/// Populate a fresh environment in `ctx`'s heap with every builtin and the
/// Church booleans, and install the evaluator as `ctx`'s eval callback.
pub fn create_global_environment(ctx: &EvalContext) -> Env {
    ctx.set_eval_fn(eval_value);
    let env = ctx.heap.alloc(None);
    register_control(&env);
    vau_stdlib::register_stdlib(&env);
    install_booleans(ctx, &env);
    env
}

/// The interpreter holds the runtime context and a pinned global environment.
pub struct Interpreter {
    pub ctx: EvalContext,
    global: EnvRoot,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let ctx = EvalContext::new();
        let env = create_global_environment(&ctx);
        env.define_str("env", Value::Environment(env.clone()));
        let global = ctx.heap.root(&env);
        Interpreter { ctx, global }
    }

    pub fn global_env(&self) -> &Env {
        self.global.env()
    }

    pub fn eval(&self, expr: &Value) -> EvalResult {
        eval_value(&self.ctx, expr, self.global.env())
    }

    pub fn eval_str(&self, input: &str) -> EvalResult {
        eval_string(&self.ctx, input, self.global.env())
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> EvalResult {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| VauError::Io(format!("{}: {e}", path.display())))?;
        tracing::debug!(target: "vau::eval", path = %path.display(), "loading file");
        self.eval_str(&source)
    }

    /// Run the collector rooted at the global environment and every pinned one.
    pub fn collect(&self) -> CollectStats {
        self.ctx.heap.collect(&[self.global.env().clone()])
    }

    pub fn constructed_env_count(&self) -> usize {
        self.ctx.heap.constructed_count()
    }

    pub fn registered_env_count(&self) -> usize {
        self.ctx.heap.registered_count()
    }

    pub fn call_stack_depth(&self) -> usize {
        self.ctx.call_stack_depth()
    }

    pub fn max_call_stack_depth(&self) -> usize {
        self.ctx.max_call_stack_depth()
    }

    pub fn reset_max_call_stack_depth(&self) {
        self.ctx.reset_max_call_stack_depth()
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        // The global environment refers to itself (`env`, the booleans'
        // closures), so it is never freed by reference counting alone.
        self.ctx.clear_booleans();
        self.ctx.heap.sever_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(interp: &Interpreter, src: &str) -> Value {
        interp.eval_str(src).unwrap()
    }

    #[test]
    fn global_env_binds_itself() {
        let interp = Interpreter::new();
        let env = eval(&interp, "env");
        assert!(env.as_env().unwrap().ptr_eq(interp.global_env()));
    }

    #[test]
    fn eval_str_returns_last_value() {
        let interp = Interpreter::new();
        assert_eq!(eval(&interp, "(define x 5) (+ x 1)"), Value::integer(6));
        assert_eq!(eval(&interp, ""), Value::Nil);
    }

    #[test]
    fn self_tail_call_runs_in_constant_stack() {
        let interp = Interpreter::new();
        eval(
            &interp,
            "(define count-down
               (vau (n) e
                 (do (define k (eval n e))
                     (((= k 0) (vau () () (q done))
                               (vau () e2 (invoke count-down (cons (- k 1) ()))))))))",
        );
        interp.reset_max_call_stack_depth();
        let v = eval(&interp, "(count-down 100000)");
        assert_eq!(v, Value::symbol("done"));
        assert!(interp.max_call_stack_depth() < 50);
    }

    #[test]
    fn self_cycle_is_reclaimed_by_collect() {
        let interp = Interpreter::new();
        let baseline = interp.registered_env_count();
        // Each call leaves a frame holding an operative closed over itself.
        eval(
            &interp,
            "(define make (vau () () (do (define self (vau () () self)) 1)))
             (make)",
        );
        assert_eq!(interp.registered_env_count(), baseline + 1);
        let stats = interp.collect();
        assert_eq!(stats.swept, 1);
        assert_eq!(interp.registered_env_count(), baseline);
    }

    #[test]
    fn collect_keeps_reachable_frames() {
        let interp = Interpreter::new();
        eval(
            &interp,
            "(define make (vau () e (do (define self (vau () () self)) self)))
             (define kept (make))",
        );
        let before = interp.registered_env_count();
        let stats = interp.collect();
        assert_eq!(stats.swept, 0);
        assert_eq!(interp.registered_env_count(), before);
        assert_eq!(eval(&interp, "(= (kept) kept)").to_string(), "true");
    }

    #[test]
    fn nested_error_keeps_the_innermost_trace() {
        let interp = Interpreter::new();
        let depth = 100;
        let src = format!("{}(first 42){}", "(+ 1 ".repeat(depth), ")".repeat(depth));
        let err = interp.eval_str(&src).unwrap_err();
        assert_eq!(err.context(), Some("(first 42)"));
        let trace = err.stack_trace().unwrap();
        assert_eq!(trace.0.len(), depth + 1);
        assert_eq!(trace.0.last().map(String::as_str), Some("(first 42)"));
        assert_eq!(trace.0[0], src);
    }

    #[test]
    fn load_file_missing_is_io_error() {
        let interp = Interpreter::new();
        let err = interp.load_file("/definitely/not/here.vau").unwrap_err();
        assert!(matches!(err.inner(), VauError::Io(_)));
    }

    #[test]
    fn counters_track_allocation() {
        let interp = Interpreter::new();
        let before = interp.constructed_env_count();
        eval(&interp, "((vau (x) () x) 1)");
        assert_eq!(interp.constructed_env_count(), before + 1);
    }
}
