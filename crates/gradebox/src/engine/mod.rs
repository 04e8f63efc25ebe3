//! In-sandbox execution engine
//!
//! Consumes one serialized [`ExecutionRequest`], executes the submission
//! against each test case in a fresh namespace, and produces the result
//! batch. The submission compiles once; every case gets its own
//! namespace, its own captured streams, and its own comparison under
//! the rules for its input mode.
//!
//! This module is the only code that interprets user source, and it is
//! meant to run inside the OS isolation boundary — the gradebox-engine
//! binary in the pinned runtime image — never in-process with the
//! orchestrator.

use rustpython_vm as vm;
use serde_json::Value;
use vm::builtins::PyCode;
use vm::scope::Scope;
use vm::{PyRef, VirtualMachine};

pub use crate::engine::output::{OUTPUT_LIMIT, sanitize};

use crate::engine::binder::{bind_data_args, bind_stdin_args};
use crate::engine::interp::EngineScope;
use crate::engine::params::FunctionSpec;
use crate::types::{CaseResult, ExecutionRequest, ResultBatch, TestCase};

pub mod binder;
pub mod compare;
mod interp;
pub mod output;
pub mod params;

/// Execute one request batch.
///
/// Never fails: compilation and runtime errors become the affected
/// cases' `error` fields, and results come back in input order.
pub fn run_request(request: &ExecutionRequest) -> ResultBatch {
    let interpreter = interp::build_interpreter();
    let results = interpreter.enter(|vm| run_batch(vm, request));
    ResultBatch { results }
}

fn run_batch(vm: &VirtualMachine, request: &ExecutionRequest) -> Vec<CaseResult> {
    let engine = match EngineScope::new(vm) {
        Ok(engine) => engine,
        Err(_) => {
            let message = "Error: engine initialization failed";
            return request
                .test_cases
                .iter()
                .map(|case| engine_fault(case, message))
                .collect();
        }
    };

    // Compile the submission once; a failure is reported per case, the
    // same text on each, since every case would have failed identically.
    let compiled = vm.compile(
        &request.source,
        vm::compiler::Mode::Exec,
        "<user_code>".to_owned(),
    );

    let mut signature: Option<FunctionSpec> = None;
    request
        .test_cases
        .iter()
        .map(|case| match &compiled {
            Ok(code) => run_case(
                vm,
                &engine,
                code.clone(),
                request.entry_point.as_deref(),
                case,
                &mut signature,
            ),
            Err(err) => build_result(
                case,
                Outcome::Error(format!("SyntaxError: {err}")),
                "",
                "",
            ),
        })
        .collect()
}

/// What one case produced, before comparison
enum Outcome {
    /// Entry point absent or not callable: fixed text, forced fail
    NotFound(String),
    /// A caught error; its text doubles as the actual value
    Error(String),
    /// Entry-point return value in stdin mode, rendered as text
    Text(String),
    /// Structured return value, already JSON-round-tripped
    Structured(Value),
    /// Main-mode stdin run: the comparison value is the captured stdout
    MainOutput,
}

fn run_case(
    vm: &VirtualMachine,
    engine: &EngineScope<'_>,
    code: PyRef<PyCode>,
    entry_point: Option<&str>,
    case: &TestCase,
    signature: &mut Option<FunctionSpec>,
) -> CaseResult {
    let stdin_mode = case.is_stdin_mode();
    let run_as_main = stdin_mode && entry_point.is_none();

    // Fresh namespace per case; nothing leaks between cases
    let user_scope = vm.new_scope_with_builtins();
    let module_name = if run_as_main { "__main__" } else { "user_code" };

    let setup = user_scope
        .globals
        .set_item("__name__", vm.ctx.new_str(module_name).into(), vm)
        .and_then(|_| engine.set_object("__gx_case_ns", user_scope.globals.clone().into()));
    if setup.is_err() {
        return engine_fault(case, "Error: engine case setup failed");
    }

    if engine.run(interp::CAPTURE_BEGIN, "<gradebox-capture>").is_err() {
        return engine_fault(case, "Error: engine capture failed");
    }

    let mut stdin_substituted = false;
    if run_as_main {
        let text = case.stdin.as_deref().unwrap_or("");
        if engine.set_str("__gx_stdin_text", text).is_ok()
            && engine.run(interp::STDIN_SET, "<gradebox-stdin>").is_ok()
        {
            stdin_substituted = true;
        }
    }

    let outcome = execute_case(
        vm,
        engine,
        &user_scope,
        code,
        entry_point,
        case,
        stdin_mode,
        signature,
    );

    // Always restore the streams before building the result
    if stdin_substituted {
        let _ = engine.run(interp::STDIN_RESTORE, "<gradebox-stdin>");
    }
    let _ = engine.run(interp::CAPTURE_END, "<gradebox-capture>");
    let stdout_raw = engine.get_str("__gx_stdout_text").unwrap_or_default();
    let stderr_raw = engine.get_str("__gx_stderr_text").unwrap_or_default();

    build_result(case, outcome, &stdout_raw, &stderr_raw)
}

#[allow(clippy::too_many_arguments)]
fn execute_case(
    vm: &VirtualMachine,
    engine: &EngineScope<'_>,
    user_scope: &Scope,
    code: PyRef<PyCode>,
    entry_point: Option<&str>,
    case: &TestCase,
    stdin_mode: bool,
    signature: &mut Option<FunctionSpec>,
) -> Outcome {
    // Seed the namespace with the case's data mapping, then execute the
    // submission against it
    if let Some(data) = &case.data
        && !data.is_empty()
    {
        let payload = Value::Object(data.clone()).to_string();
        let seeded = engine
            .set_str("__gx_data_json", &payload)
            .and_then(|_| engine.run(interp::SEED_DATA, "<gradebox-seed>"));
        if let Err(exc) = seeded {
            return Outcome::Error(engine.exception_message(exc));
        }
    }

    if let Err(exc) = vm.run_code_obj(code, user_scope.clone()) {
        return Outcome::Error(engine.exception_message(exc));
    }

    let Some(entry_name) = entry_point else {
        if stdin_mode {
            return Outcome::MainOutput;
        }
        // No entry point, structured case: the `result` binding if any
        if let Err(exc) = engine.run(interp::RESULT_FROM_NAMESPACE, "<gradebox-result>") {
            return Outcome::Error(engine.exception_message(exc));
        }
        return structured_outcome(engine);
    };

    let resolved = engine
        .set_str("__gx_entry_name", entry_name)
        .and_then(|_| engine.run(interp::RESOLVE_ENTRY, "<gradebox-resolve>"));
    if let Err(exc) = resolved {
        return Outcome::Error(engine.exception_message(exc));
    }
    if !engine.get_bool("__gx_callable").unwrap_or(false) {
        return Outcome::NotFound(format!("Error: function '{entry_name}' not found"));
    }

    // Refresh the defaults map for this case's function object; the
    // parsed descriptor itself is computed once per submission
    if let Err(exc) = engine.run(interp::DESCRIBE_ENTRY, "<gradebox-describe>") {
        return Outcome::Error(engine.exception_message(exc));
    }
    if signature.is_none() {
        let Some(descriptor) = engine.get_str("__gx_signature_json") else {
            return Outcome::Error("Error: entry point descriptor missing".to_string());
        };
        match FunctionSpec::from_descriptor_json(&descriptor) {
            Ok(spec) => *signature = Some(spec),
            Err(_) => {
                return Outcome::Error("Error: entry point descriptor malformed".to_string());
            }
        }
    }
    let Some(spec) = signature.as_ref() else {
        return Outcome::Error("Error: entry point descriptor missing".to_string());
    };

    let plan = if stdin_mode {
        bind_stdin_args(spec, case.stdin.as_deref().unwrap_or(""))
    } else {
        let keys = match namespace_keys(engine) {
            Ok(keys) => keys,
            Err(message) => return Outcome::Error(message),
        };
        bind_data_args(spec, &keys)
    };
    let plan = match plan {
        Ok(plan) => plan,
        Err(err) => return Outcome::Error(err.0),
    };

    let invoked = engine
        .set_str("__gx_plan_json", &plan.to_json().to_string())
        .and_then(|_| engine.run(interp::INVOKE, "<gradebox-invoke>"));
    if let Err(exc) = invoked {
        return Outcome::Error(engine.exception_message(exc));
    }

    if stdin_mode {
        if let Err(exc) = engine.run(interp::RESULT_TO_TEXT, "<gradebox-result>") {
            return Outcome::Error(engine.exception_message(exc));
        }
        Outcome::Text(engine.get_str("__gx_result_text").unwrap_or_default())
    } else {
        structured_outcome(engine)
    }
}

/// Read back the JSON-round-tripped result value
fn structured_outcome(engine: &EngineScope<'_>) -> Outcome {
    if let Err(exc) = engine.run(interp::RESULT_TO_JSON, "<gradebox-result>") {
        return Outcome::Error(engine.exception_message(exc));
    }
    let Some(text) = engine.get_str("__gx_result_json") else {
        return Outcome::Error("Error: result conversion failed".to_string());
    };
    match serde_json::from_str(&text) {
        Ok(value) => Outcome::Structured(value),
        Err(_) => Outcome::Error("Error: result conversion failed".to_string()),
    }
}

/// List the case namespace's string keys for the data binder
fn namespace_keys(
    engine: &EngineScope<'_>,
) -> Result<std::collections::HashSet<String>, String> {
    if let Err(exc) = engine.run(interp::NS_KEYS, "<gradebox-keys>") {
        return Err(engine.exception_message(exc));
    }
    let Some(text) = engine.get_str("__gx_ns_keys_json") else {
        return Err("Error: namespace inspection failed".to_string());
    };
    serde_json::from_str::<Vec<String>>(&text)
        .map(|keys| keys.into_iter().collect())
        .map_err(|_| "Error: namespace inspection failed".to_string())
}

/// Compare the outcome against the case's expectation and assemble the
/// emitted result.
fn build_result(case: &TestCase, outcome: Outcome, stdout_raw: &str, stderr_raw: &str) -> CaseResult {
    let stdout = output::sanitize(stdout_raw);
    let stderr = output::sanitize(stderr_raw);

    let (actual, passed, error) = if case.is_stdin_mode() {
        let expected_text = output::sanitize(&output::value_to_text(&case.expected));
        let (comparison_text, error, forced_fail) = match &outcome {
            Outcome::NotFound(text) => (text.clone(), None, true),
            Outcome::Error(message) => (message.clone(), Some(message.clone()), false),
            Outcome::Text(text) => (text.clone(), None, false),
            Outcome::MainOutput => (stdout.clone(), None, false),
            Outcome::Structured(value) => (output::value_to_text(value), None, false),
        };
        let actual_text = output::sanitize(&comparison_text);
        let passed = !forced_fail && actual_text == expected_text;
        (Value::String(actual_text), passed, error)
    } else {
        match outcome {
            Outcome::NotFound(text) => (Value::String(text), false, None),
            Outcome::Error(message) => {
                let actual = Value::String(message.clone());
                let passed = compare::json_eq(&actual, &case.expected);
                (actual, passed, Some(message))
            }
            Outcome::Structured(value) => {
                let passed = compare::json_eq(&value, &case.expected);
                (value, passed, None)
            }
            // Text/main outcomes belong to stdin mode; render as text
            Outcome::Text(text) => {
                let actual = Value::String(text);
                let passed = compare::json_eq(&actual, &case.expected);
                (actual, passed, None)
            }
            Outcome::MainOutput => {
                let actual = Value::String(stdout.clone());
                let passed = compare::json_eq(&actual, &case.expected);
                (actual, passed, None)
            }
        }
    };

    CaseResult {
        expected: case.expected.clone(),
        actual,
        passed,
        stdout,
        stderr,
        error,
    }
}

/// A failure of the engine itself, not the submission
fn engine_fault(case: &TestCase, message: &str) -> CaseResult {
    CaseResult {
        expected: case.expected.clone(),
        actual: Value::String(message.to_string()),
        passed: false,
        stdout: String::new(),
        stderr: String::new(),
        error: Some(message.to_string()),
    }
}
