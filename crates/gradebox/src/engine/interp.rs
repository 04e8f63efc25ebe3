//! Embedded interpreter plumbing
//!
//! Drives RustPython for one engine run. Rust owns the control flow and
//! the pure binding/comparison logic; a small Python prelude handles
//! what only the interpreter can do — signature description, default
//! lookup, and the call trampoline. Values cross the boundary as JSON
//! strings through scope globals.

use rustpython_vm as vm;
use vm::builtins::PyBaseException;
use vm::scope::Scope;
use vm::{Interpreter, PyObjectRef, PyRef, PyResult, VirtualMachine};

/// Helpers installed once per engine run, in a scope of their own so
/// the user namespace stays clean. The `__gx_old_*` bindings are
/// pre-seeded so a restore snippet can always run.
pub(crate) const PRELUDE: &str = r#"
import inspect as __gx_inspect
import io as __gx_io
import json as __gx_json
import sys as __gx_sys

__gx_old_stdout = __gx_sys.stdout
__gx_old_stderr = __gx_sys.stderr
__gx_old_stdin = __gx_sys.stdin


def __gx_type_tag(annotation):
    if annotation is __gx_inspect.Parameter.empty or annotation is None or annotation is str:
        return "text"
    if annotation is int:
        return "int"
    if annotation is float:
        return "float"
    if annotation is bool:
        return "bool"
    origin = getattr(annotation, "__origin__", None)
    args = getattr(annotation, "__args__", None) or ()
    if origin is list or annotation is list:
        return "list:" + (__gx_type_tag(args[0]) if args else "text")
    if origin is tuple or annotation is tuple:
        return "tuple:" + (__gx_type_tag(args[0]) if args else "text")
    return "text"


def __gx_describe(func):
    sig = __gx_inspect.signature(func)
    params = []
    for name, param in sig.parameters.items():
        if param.kind in (param.POSITIONAL_ONLY, param.POSITIONAL_OR_KEYWORD):
            kind = "positional"
        elif param.kind == param.KEYWORD_ONLY:
            kind = "keyword"
        else:
            continue
        params.append({
            "name": name,
            "kind": kind,
            "type": __gx_type_tag(param.annotation),
            "has_default": param.default is not __gx_inspect.Parameter.empty,
        })
    return __gx_json.dumps({"name": func.__name__, "params": params})


def __gx_defaults(func):
    sig = __gx_inspect.signature(func)
    return {
        name: param.default
        for name, param in sig.parameters.items()
        if param.default is not __gx_inspect.Parameter.empty
    }


def __gx_materialize(item, ns, defaults):
    src = item["src"]
    if src == "value":
        value = item["value"]
        if item.get("astuple"):
            value = tuple(value)
        return value
    if src == "env":
        return ns[item["name"]]
    return defaults[item["name"]]
"#;

/// Swap the standard streams for fresh capture buffers
pub(crate) const CAPTURE_BEGIN: &str = r#"
__gx_old_stdout = __gx_sys.stdout
__gx_old_stderr = __gx_sys.stderr
__gx_buf_out = __gx_io.StringIO()
__gx_buf_err = __gx_io.StringIO()
__gx_sys.stdout = __gx_buf_out
__gx_sys.stderr = __gx_buf_err
"#;

/// Restore the streams and collect what the case wrote. Reads from the
/// retained buffers, so a submission reassigning sys.stdout cannot
/// break collection.
pub(crate) const CAPTURE_END: &str = r#"
__gx_sys.stdout = __gx_old_stdout
__gx_sys.stderr = __gx_old_stderr
__gx_stdout_text = __gx_buf_out.getvalue()
__gx_stderr_text = __gx_buf_err.getvalue()
"#;

/// Substitute the process stdin with the case's text
pub(crate) const STDIN_SET: &str = r#"
__gx_old_stdin = __gx_sys.stdin
__gx_sys.stdin = __gx_io.StringIO(__gx_stdin_text)
"#;

pub(crate) const STDIN_RESTORE: &str = "__gx_sys.stdin = __gx_old_stdin\n";

/// Seed the case namespace with the structured data mapping
pub(crate) const SEED_DATA: &str = "__gx_case_ns.update(__gx_json.loads(__gx_data_json))\n";

/// Resolve the entry point in the case namespace
pub(crate) const RESOLVE_ENTRY: &str = r#"
__gx_func = __gx_case_ns.get(__gx_entry_name)
__gx_callable = callable(__gx_func)
"#;

/// Describe the entry point's signature and capture its defaults
pub(crate) const DESCRIBE_ENTRY: &str = r#"
__gx_signature_json = __gx_describe(__gx_func)
__gx_defaults_map = __gx_defaults(__gx_func)
"#;

/// List the string keys of the case namespace for the data binder
pub(crate) const NS_KEYS: &str = "__gx_ns_keys_json = __gx_json.dumps([key for key in __gx_case_ns.keys() if isinstance(key, str)])\n";

/// Materialize the call plan and invoke the entry point
pub(crate) const INVOKE: &str = r#"
__gx_plan = __gx_json.loads(__gx_plan_json)
__gx_args = [__gx_materialize(item, __gx_case_ns, __gx_defaults_map) for item in __gx_plan["args"]]
__gx_kwargs = {item["name"]: __gx_materialize(item, __gx_case_ns, __gx_defaults_map) for item in __gx_plan["kwargs"]}
__gx_result = __gx_func(*__gx_args, **__gx_kwargs)
"#;

/// With no entry point, the case's value is the namespace's `result`
/// binding, if any
pub(crate) const RESULT_FROM_NAMESPACE: &str = "__gx_result = __gx_case_ns.get(\"result\")\n";

/// Render the result JSON-round-trip-safe, falling back to its string
/// form when it is not representable
pub(crate) const RESULT_TO_JSON: &str = r#"
try:
    __gx_result_json = __gx_json.dumps(__gx_result, default=str)
except Exception:
    __gx_result_json = __gx_json.dumps(str(__gx_result))
"#;

/// Render the result as comparison text; a missing value renders empty
pub(crate) const RESULT_TO_TEXT: &str =
    "__gx_result_text = \"\" if __gx_result is None else str(__gx_result)\n";

/// Format a caught exception as "ClassName: message"
pub(crate) const FORMAT_ERROR: &str =
    "__gx_error_text = \"%s: %s\" % (type(__gx_exc).__name__, __gx_exc)\n";

/// Build an interpreter with the frozen standard library
pub(crate) fn build_interpreter() -> Interpreter {
    Interpreter::with_init(vm::Settings::default(), |vm| {
        vm.add_native_modules(rustpython_stdlib::get_module_inits());
        vm.add_frozen(rustpython_pylib::FROZEN_STDLIB);
    })
}

/// The engine's own scope: prelude helpers plus per-case scratch
/// bindings, kept apart from the user namespace.
pub(crate) struct EngineScope<'vm> {
    vm: &'vm VirtualMachine,
    scope: Scope,
}

impl<'vm> EngineScope<'vm> {
    /// Create the scope and install the prelude
    pub(crate) fn new(vm: &'vm VirtualMachine) -> PyResult<Self> {
        let scope = vm.new_scope_with_builtins();
        let this = Self { vm, scope };
        this.run(PRELUDE, "<gradebox-prelude>")?;
        Ok(this)
    }

    /// Compile and execute a snippet in this scope
    pub(crate) fn run(&self, source: &str, label: &str) -> PyResult<()> {
        let code = self
            .vm
            .compile(source, vm::compiler::Mode::Exec, label.to_owned())
            .map_err(|err| self.vm.new_syntax_error(&err, Some(source)))?;
        self.vm.run_code_obj(code, self.scope.clone())?;
        Ok(())
    }

    /// Bind a string global
    pub(crate) fn set_str(&self, name: &str, value: &str) -> PyResult<()> {
        self.scope
            .globals
            .set_item(name, self.vm.ctx.new_str(value).into(), self.vm)
    }

    /// Bind an arbitrary object global
    pub(crate) fn set_object(&self, name: &str, value: PyObjectRef) -> PyResult<()> {
        self.scope.globals.set_item(name, value, self.vm)
    }

    /// Read a string global
    pub(crate) fn get_str(&self, name: &str) -> Option<String> {
        self.scope
            .globals
            .get_item(name, self.vm)
            .ok()
            .and_then(|value| value.try_to_value::<String>(self.vm).ok())
    }

    /// Read a bool global
    pub(crate) fn get_bool(&self, name: &str) -> Option<bool> {
        self.scope
            .globals
            .get_item(name, self.vm)
            .ok()
            .and_then(|value| value.try_to_value::<bool>(self.vm).ok())
    }

    /// Format a caught exception as "ClassName: message".
    ///
    /// Runs inside the interpreter so the message matches what the
    /// submission runtime itself would report.
    pub(crate) fn exception_message(&self, exc: PyRef<PyBaseException>) -> String {
        let obj: PyObjectRef = exc.into();
        if self.set_object("__gx_exc", obj).is_ok()
            && self.run(FORMAT_ERROR, "<gradebox-error>").is_ok()
            && let Some(text) = self.get_str("__gx_error_text")
        {
            return text;
        }
        "Error: failed to format exception".to_string()
    }
}
